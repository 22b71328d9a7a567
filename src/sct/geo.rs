use std::collections::HashMap;

use itertools::Itertools as _;

use crate::{
    color::ColorTable,
    coordinate::{is_latitude, is_longitude},
    Location,
};

use super::{parse_coordinate, registry::WaypointRegistry, Geo, SctError, Segment};

/// Per-category state: segments are grouped under the last non-empty title,
/// which continuation lines inherit.
#[derive(Debug, Default)]
pub(super) struct GeoAccumulator {
    current_title: String,
    groups: Vec<Geo>,
    by_title: HashMap<String, usize>,
}

fn parse_location(
    lat: &str,
    lng: &str,
    registry: &WaypointRegistry,
    line: usize,
) -> Result<Location, SctError> {
    if is_latitude(lat) && is_longitude(lng) {
        parse_coordinate(lat, lng, line).map(Location::Coordinate)
    } else if let Some(waypoint) = registry.resolve(lat) {
        Ok(Location::Waypoint(waypoint.clone()))
    } else {
        Err(SctError::UnresolvedWaypoint {
            name: lat.to_string(),
            line,
        })
    }
}

impl GeoAccumulator {
    pub fn parse_line(
        &mut self,
        parts: &[&str],
        colors: &ColorTable,
        registry: &WaypointRegistry,
        line: usize,
    ) -> Result<(), SctError> {
        let Some(&last) = parts.last() else {
            return Err(SctError::UnrecognizedLine { line });
        };

        let (title, fields, color) = if is_longitude(last) || registry.contains_key(last) {
            let Some(split) = parts.len().checked_sub(4) else {
                return Err(SctError::UnrecognizedLine { line });
            };
            (&parts[..split], &parts[split..], None)
        } else {
            let Some(color) = colors.lookup(last) else {
                return Err(Self::unknown_trailing_token(parts, registry, line));
            };
            let Some(split) = parts.len().checked_sub(5) else {
                return Err(SctError::UnrecognizedLine { line });
            };
            (&parts[..split], &parts[split..split + 4], Some(color.clone()))
        };

        let &[start_lat, start_lng, end_lat, end_lng] = fields else {
            return Err(SctError::UnrecognizedLine { line });
        };
        let segment = Segment {
            start: parse_location(start_lat, start_lng, registry, line)?,
            end: parse_location(end_lat, end_lng, registry, line)?,
            color,
        };

        self.push(&title.iter().join(" "), segment);
        Ok(())
    }

    /// The last token is neither a coordinate, a waypoint nor a color. When
    /// the token before it cannot end a segment either, the end point is a
    /// waypoint that is not declared yet.
    fn unknown_trailing_token(parts: &[&str], registry: &WaypointRegistry, line: usize) -> SctError {
        match parts {
            [.., end, _] if !is_longitude(end) && !registry.contains_key(*end) => {
                SctError::UnresolvedWaypoint {
                    name: (*end).to_string(),
                    line,
                }
            }
            [.., last] => SctError::UndefinedColor {
                name: (*last).to_string(),
                line,
            },
            [] => SctError::UnrecognizedLine { line },
        }
    }

    fn push(&mut self, title: &str, segment: Segment) {
        if !title.is_empty() {
            title.clone_into(&mut self.current_title);
        }

        let idx = *self
            .by_title
            .entry(self.current_title.clone())
            .or_insert_with(|| {
                self.groups.push(Geo {
                    id: self.current_title.clone(),
                    segments: vec![],
                });
                self.groups.len() - 1
            });
        self.groups[idx].segments.push(segment);
    }

    pub fn finish(self) -> Vec<Geo> {
        self.groups
    }
}

#[cfg(test)]
mod test {
    use crate::{
        color::{Color, ColorTable},
        sct::{registry::WaypointRegistry, Geo, SctError, Segment},
        Coordinate, Location, Waypoint,
    };

    use super::GeoAccumulator;

    fn parts(line: &str) -> Vec<&str> {
        line.split_whitespace().collect()
    }

    fn coordinate(lat: &str, lng: &str) -> Location {
        Location::Coordinate(Coordinate::deg_min_sec(lat, lng))
    }

    #[test]
    fn test_title_inheritance() {
        let colors = ColorTable::default();
        let registry = WaypointRegistry::new();
        let mut acc = GeoAccumulator::default();
        for (line, text) in [
            "TMA - Upper Limit - ENCN, Kjevik         N058.43.57.000 E008.34.38.000 N058.41.45.000 E008.38.44.000",
            "                                         N058.41.45.000 E008.38.44.000 N058.28.37.000 E009.02.52.000",
            "Other                                    N058.28.37.000 E009.02.52.000 N058.24.22.000 E009.10.35.000",
            "                                         N058.24.22.000 E009.10.35.000 N058.43.57.000 E008.34.38.000",
            "TMA - Upper Limit - ENCN, Kjevik         N058.28.37.000 E009.02.52.000 N058.24.22.000 E009.10.35.000",
        ]
        .into_iter()
        .enumerate()
        {
            acc.parse_line(&parts(text), &colors, &registry, line + 1).unwrap();
        }

        let groups = acc.finish();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, "TMA - Upper Limit - ENCN, Kjevik");
        assert_eq!(groups[0].segments.len(), 3);
        assert_eq!(groups[1].id, "Other");
        assert_eq!(groups[1].segments.len(), 2);
        assert_eq!(
            groups[1].segments[1],
            Segment {
                start: coordinate("N058.24.22.000", "E009.10.35.000"),
                end: coordinate("N058.43.57.000", "E008.34.38.000"),
                color: None,
            }
        );
    }

    #[test]
    fn test_untitled_group() {
        let mut acc = GeoAccumulator::default();
        acc.parse_line(
            &parts("N058.24.22.000 E009.10.35.000 N058.43.57.000 E008.34.38.000"),
            &ColorTable::default(),
            &WaypointRegistry::new(),
            1,
        )
        .unwrap();
        assert_eq!(
            acc.finish(),
            vec![Geo {
                id: String::new(),
                segments: vec![Segment {
                    start: coordinate("N058.24.22.000", "E009.10.35.000"),
                    end: coordinate("N058.43.57.000", "E008.34.38.000"),
                    color: None,
                }],
            }]
        );
    }

    #[test]
    fn test_colored_segment() {
        let mut colors = ColorTable::default();
        colors.define("COLOR_RMZ", "8421376").unwrap();
        let mut acc = GeoAccumulator::default();
        acc.parse_line(
            &parts("RMZ EDMS N048.57.40.000 E012.23.34.000 N048.56.22.000 E012.39.38.000 color_rmz"),
            &colors,
            &WaypointRegistry::new(),
            1,
        )
        .unwrap();

        let groups = acc.finish();
        assert_eq!(groups[0].id, "RMZ EDMS");
        assert_eq!(
            groups[0].segments[0].color,
            Some(Color::new("COLOR_RMZ", 8_421_376))
        );
    }

    #[test]
    fn test_waypoint_endpoints() {
        let registry = WaypointRegistry::from_iter([
            Waypoint {
                designator: "SKG".to_string(),
                coordinate: Coordinate::deg_min_sec("N068.34.42.070", "E015.02.05.729"),
            },
            Waypoint {
                designator: "AND".to_string(),
                coordinate: Coordinate::deg_min_sec("N069.17.16.180", "E016.08.28.971"),
            },
        ]);
        let mut acc = GeoAccumulator::default();
        acc.parse_line(
            &parts("0 FSS ENTC ALT Route  SKG  SKG  AND  AND"),
            &ColorTable::default(),
            &registry,
            1,
        )
        .unwrap();

        let groups = acc.finish();
        assert_eq!(groups[0].id, "0 FSS ENTC ALT Route");
        assert_eq!(
            groups[0].segments[0].start,
            Location::Waypoint(registry.resolve("SKG").unwrap().clone())
        );
        assert_eq!(
            groups[0].segments[0].end,
            Location::Waypoint(registry.resolve("AND").unwrap().clone())
        );
    }

    #[test]
    fn test_errors() {
        let colors = ColorTable::default();
        let registry = WaypointRegistry::new();
        let mut acc = GeoAccumulator::default();

        assert!(matches!(
            acc.parse_line(&parts("SID N058.24.22.000 E009.10.35.000 GILGU GILGU"), &colors, &registry, 4),
            Err(SctError::UnresolvedWaypoint { name, line: 4 }) if name == "GILGU"
        ));
        assert!(matches!(
            acc.parse_line(&parts("N058.24.22.000 E009.10.35.000 N058.43.57.000 E008.34.38.000 COLOR_X"), &colors, &registry, 5),
            Err(SctError::UndefinedColor { name, line: 5 }) if name == "COLOR_X"
        ));
        assert!(matches!(
            acc.parse_line(&parts("N058.24.22.000 E009.10.35.000"), &colors, &registry, 6),
            Err(SctError::UnrecognizedLine { line: 6 })
        ));
        assert!(matches!(
            acc.parse_line(&parts("N058.24.22.000 E009.10.35.000 N058..57.000 E008.34.38.000"), &colors, &registry, 7),
            Err(SctError::CoordinateFormat { line: 7, .. })
        ));
        assert!(acc.finish().is_empty());
    }

    #[test]
    fn test_unknown_trailing_token() {
        let colors = ColorTable::default();
        let registry = WaypointRegistry::from_iter([Waypoint {
            designator: "GRM".to_string(),
            coordinate: Coordinate::deg_min_sec("N060.11.30.328", "E011.04.27.908"),
        }]);
        let mut acc = GeoAccumulator::default();

        assert!(matches!(
            acc.parse_line(&parts("ENGM SID 01L GRM GRM BAVAD BAVAD"), &colors, &registry, 2),
            Err(SctError::UnresolvedWaypoint { name, line: 2 }) if name == "BAVAD"
        ));
        assert!(matches!(
            acc.parse_line(&parts("ENGM SID 01L N060.27.57.999 E011.05.03.998 GRM GRM COLOR_SID"), &colors, &registry, 3),
            Err(SctError::UndefinedColor { name, line: 3 }) if name == "COLOR_SID"
        ));
    }
}
