use std::collections::HashMap;

use itertools::Itertools as _;

use crate::{color::ColorTable, Color, Coordinate};

use super::{parse_coordinate, Polygon, Region, SctError};

#[derive(Debug, Default)]
pub(super) struct RegionBuilder {
    current: Option<usize>,
    regions: Vec<Region>,
    by_id: HashMap<String, usize>,
}

impl RegionBuilder {
    /// `REGIONNAME` selects `id`, resuming it when it was seen before.
    pub fn start_region(&mut self, id: &str) {
        let idx = *self.by_id.entry(id.to_string()).or_insert_with(|| {
            self.regions.push(Region {
                id: id.to_string(),
                polygons: vec![],
            });
            self.regions.len() - 1
        });
        self.current = Some(idx);
    }

    pub fn parse_line(
        &mut self,
        parts: &[&str],
        colors: &ColorTable,
        line: usize,
    ) -> Result<(), SctError> {
        let [color @ .., lat, lng] = parts else {
            return Err(SctError::UnrecognizedLine { line });
        };

        if color.is_empty() {
            let point = parse_coordinate(lat, lng, line)?;
            self.push_point(point, line)
        } else {
            let name = color.iter().join(" ");
            let color = colors
                .lookup(&name)
                .ok_or(SctError::UndefinedColor { name, line })?
                .clone();
            let point = parse_coordinate(lat, lng, line)?;
            self.start_polygon(color, point, line)
        }
    }

    fn current_region(&mut self, line: usize) -> Result<&mut Region, SctError> {
        match self.current {
            Some(idx) => Ok(&mut self.regions[idx]),
            None => Err(SctError::MalformedRegion { line }),
        }
    }

    fn start_polygon(
        &mut self,
        color: Color,
        point: Coordinate,
        line: usize,
    ) -> Result<(), SctError> {
        self.current_region(line)?.polygons.push(Polygon {
            color,
            points: vec![point],
        });
        Ok(())
    }

    fn push_point(&mut self, point: Coordinate, line: usize) -> Result<(), SctError> {
        let polygon = self
            .current_region(line)?
            .polygons
            .last_mut()
            .ok_or(SctError::MalformedRegion { line })?;
        polygon.points.push(point);
        Ok(())
    }

    pub fn finish(self) -> Vec<Region> {
        self.regions
    }
}
