use std::io;

use itertools::Itertools as _;
use phf::phf_map;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    color::ColorTable, coordinate::CoordinateError, read_to_string, Color, Coordinate, Location,
};

use self::{
    geo::GeoAccumulator,
    info::Info,
    region::RegionBuilder,
    registry::{Waypoint, WaypointRegistry},
};

mod geo;
pub mod info;
mod region;
pub mod registry;

#[derive(Error, Debug)]
pub enum SctError {
    #[error("failed to read .sct file: {0:?}")]
    FileRead(#[from] io::Error),
    #[error("Error on line {line}: Unknown section type \"{name}\"")]
    UnknownSection { name: String, line: usize },
    #[error("Error on line {line}: Unrecognized line")]
    UnrecognizedLine { line: usize },
    #[error("Error on line {line}: {source}")]
    CoordinateFormat {
        line: usize,
        #[source]
        source: CoordinateError,
    },
    #[error("Error on line {line}: Unresolved waypoint \"{name}\"")]
    UnresolvedWaypoint { name: String, line: usize },
    #[error("Error on line {line}: Undefined color \"{name}\"")]
    UndefinedColor { name: String, line: usize },
    #[error("Error on line {line}: Invalid color definition {name} \"{value}\"")]
    ColorDefine {
        name: String,
        value: String,
        line: usize,
    },
    #[error("Error on line {line}: Region point without a polygon to attach to")]
    MalformedRegion { line: usize },
}

pub type SctResult = Result<Sct, SctError>;

/// A line number together with the comment-stripped line.
type SourceLine = (usize, String);

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Airport {
    pub designator: String,
    pub frequency: String,
    pub coordinate: Coordinate,
    pub class: String,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Fix {
    pub designator: String,
    pub coordinate: Coordinate,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct NDB {
    pub designator: String,
    pub frequency: String,
    pub coordinate: Coordinate,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct VOR {
    pub designator: String,
    pub frequency: String,
    pub coordinate: Coordinate,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Runway {
    pub designators: (String, String),
    pub headings: (f64, f64),
    pub location: (Coordinate, Coordinate),
    pub aerodrome: String,
    pub aerodrome_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Segment {
    pub start: Location,
    pub end: Location,
    pub color: Option<Color>,
}

/// Segments of one geometry category sharing a title.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Geo {
    pub id: String,
    pub segments: Vec<Segment>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Polygon {
    pub color: Color,
    pub points: Vec<Coordinate>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Region {
    pub id: String,
    pub polygons: Vec<Polygon>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Label {
    pub text: String,
    pub coordinate: Coordinate,
    pub color: Color,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Sct {
    pub info: Info,
    pub defines: ColorTable,
    pub vors: Vec<VOR>,
    pub ndbs: Vec<NDB>,
    pub fixes: Vec<Fix>,
    pub airports: Vec<Airport>,
    pub runways: Vec<Runway>,
    pub artcc: Vec<Geo>,
    pub artcc_high: Vec<Geo>,
    pub artcc_low: Vec<Geo>,
    pub sids: Vec<Geo>,
    pub stars: Vec<Geo>,
    pub high_airways: Vec<Geo>,
    pub low_airways: Vec<Geo>,
    pub geo: Vec<Geo>,
    pub regions: Vec<Region>,
    pub labels: Vec<Label>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GeoCategory {
    Artcc,
    ArtccHigh,
    ArtccLow,
    Sid,
    Star,
    HighAirway,
    LowAirway,
    Geo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SectionKind {
    Info,
    Vor,
    Ndb,
    Fixes,
    Airport,
    Runway,
    Geo(GeoCategory),
    Regions,
    Labels,
}

static SECTIONS: phf::Map<&'static str, SectionKind> = phf_map! {
    "INFO" => SectionKind::Info,
    "VOR" => SectionKind::Vor,
    "NDB" => SectionKind::Ndb,
    "FIXES" => SectionKind::Fixes,
    "AIRPORT" => SectionKind::Airport,
    "RUNWAY" => SectionKind::Runway,
    "ARTCC" => SectionKind::Geo(GeoCategory::Artcc),
    "ARTCC HIGH" => SectionKind::Geo(GeoCategory::ArtccHigh),
    "ARTCC LOW" => SectionKind::Geo(GeoCategory::ArtccLow),
    "SID" => SectionKind::Geo(GeoCategory::Sid),
    "STAR" => SectionKind::Geo(GeoCategory::Star),
    "HIGH AIRWAY" => SectionKind::Geo(GeoCategory::HighAirway),
    "LOW AIRWAY" => SectionKind::Geo(GeoCategory::LowAirway),
    "GEO" => SectionKind::Geo(GeoCategory::Geo),
    "REGIONS" => SectionKind::Regions,
    "LABELS" => SectionKind::Labels,
};

fn parse_coordinate(lat: &str, lng: &str, line: usize) -> Result<Coordinate, SctError> {
    Coordinate::parse_deg_min_sec(lat, lng)
        .map_err(|source| SctError::CoordinateFormat { line, source })
}

fn strip_comment(raw: &str) -> &str {
    raw.split_once(';').map_or(raw, |(data, _)| data).trim()
}

/// Mutable state of a single pass over a sector file.
#[derive(Default)]
struct SctBuilder {
    section: Option<SectionKind>,
    info_lines: Vec<SourceLine>,
    info: Info,
    colors: ColorTable,
    registry: WaypointRegistry,
    vors: Vec<VOR>,
    ndbs: Vec<NDB>,
    fixes: Vec<Fix>,
    airports: Vec<Airport>,
    runways: Vec<Runway>,
    geo: [GeoAccumulator; 8],
    regions: RegionBuilder,
    labels: Vec<Label>,
}

impl SctBuilder {
    fn new(registry: WaypointRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    fn parse_line(&mut self, line: usize, raw: &str) -> Result<(), SctError> {
        let data = strip_comment(raw);
        if data.is_empty() {
            return Ok(());
        }

        if let Some(header) = data.strip_prefix('[') {
            return self.switch_section(header, line);
        }

        let parts = data.split_whitespace().collect::<Vec<_>>();
        if let ["#define", define @ ..] = parts.as_slice() {
            return self.define(define, line);
        }

        match self.section {
            None => Err(SctError::UnrecognizedLine { line }),
            Some(SectionKind::Info) => {
                self.info_lines.push((line, data.to_string()));
                Ok(())
            }
            Some(SectionKind::Vor) => {
                let [designator, frequency, lat, lng, ..] = parts.as_slice() else {
                    return Err(SctError::UnrecognizedLine { line });
                };
                let coordinate = parse_coordinate(lat, lng, line)?;
                self.register(designator, &coordinate);
                self.vors.push(VOR {
                    designator: designator.to_string(),
                    frequency: frequency.to_string(),
                    coordinate,
                });
                Ok(())
            }
            Some(SectionKind::Ndb) => {
                let [designator, frequency, lat, lng, ..] = parts.as_slice() else {
                    return Err(SctError::UnrecognizedLine { line });
                };
                let coordinate = parse_coordinate(lat, lng, line)?;
                self.register(designator, &coordinate);
                self.ndbs.push(NDB {
                    designator: designator.to_string(),
                    frequency: frequency.to_string(),
                    coordinate,
                });
                Ok(())
            }
            Some(SectionKind::Fixes) => {
                let [designator, lat, lng, ..] = parts.as_slice() else {
                    return Err(SctError::UnrecognizedLine { line });
                };
                let coordinate = parse_coordinate(lat, lng, line)?;
                self.register(designator, &coordinate);
                self.fixes.push(Fix {
                    designator: designator.to_string(),
                    coordinate,
                });
                Ok(())
            }
            Some(SectionKind::Airport) => {
                let [designator, frequency, lat, lng, class, ..] = parts.as_slice() else {
                    return Err(SctError::UnrecognizedLine { line });
                };
                let coordinate = parse_coordinate(lat, lng, line)?;
                self.register(designator, &coordinate);
                self.airports.push(Airport {
                    designator: designator.to_string(),
                    frequency: frequency.to_string(),
                    coordinate,
                    class: class.to_string(),
                });
                Ok(())
            }
            Some(SectionKind::Runway) => {
                let runway = parse_runway(&parts, line)?;
                self.runways.push(runway);
                Ok(())
            }
            Some(SectionKind::Geo(category)) => self.geo[category as usize].parse_line(
                &parts,
                &self.colors,
                &self.registry,
                line,
            ),
            Some(SectionKind::Regions) => match data.strip_prefix("REGIONNAME") {
                Some(id) if parts.first() == Some(&"REGIONNAME") => {
                    self.regions.start_region(id.trim());
                    Ok(())
                }
                _ => self.regions.parse_line(&parts, &self.colors, line),
            },
            Some(SectionKind::Labels) => {
                let label = parse_label(&parts, &self.colors, line)?;
                self.labels.push(label);
                Ok(())
            }
        }
    }

    fn switch_section(&mut self, header: &str, line: usize) -> Result<(), SctError> {
        let Some((name, _)) = header.rsplit_once(']') else {
            return Err(SctError::UnrecognizedLine { line });
        };
        let name = name.trim().to_uppercase();
        let Some(section) = SECTIONS.get(name.as_str()) else {
            return Err(SctError::UnknownSection { name, line });
        };

        self.close_info()?;
        debug!("line {line}: entering [{name}]");
        self.section = Some(*section);
        Ok(())
    }

    /// Interprets the header once its section ends.
    fn close_info(&mut self) -> Result<(), SctError> {
        if self.section == Some(SectionKind::Info) {
            self.info = Info::from_lines(&self.info_lines)?;
        }
        Ok(())
    }

    fn define(&mut self, parts: &[&str], line: usize) -> Result<(), SctError> {
        let name = parts.first().copied().unwrap_or_default();
        let value = parts.get(1).copied().unwrap_or_default();
        self.colors
            .define(name, value)
            .map_err(|_| SctError::ColorDefine {
                name: name.to_string(),
                value: value.to_string(),
                line,
            })
    }

    fn register(&mut self, designator: &str, coordinate: &Coordinate) {
        self.registry.register(Waypoint {
            designator: designator.to_string(),
            coordinate: coordinate.clone(),
        });
    }

    fn finish(mut self) -> Result<Sct, SctError> {
        self.close_info()?;
        let [artcc, artcc_high, artcc_low, sids, stars, high_airways, low_airways, geo] =
            self.geo.map(GeoAccumulator::finish);

        let sct = Sct {
            info: self.info,
            defines: self.colors,
            vors: self.vors,
            ndbs: self.ndbs,
            fixes: self.fixes,
            airports: self.airports,
            runways: self.runways,
            artcc,
            artcc_high,
            artcc_low,
            sids,
            stars,
            high_airways,
            low_airways,
            geo,
            regions: self.regions.finish(),
            labels: self.labels,
        };
        debug!(
            "parsed {} vors, {} ndbs, {} fixes, {} airports, {} runways, {} regions, {} labels",
            sct.vors.len(),
            sct.ndbs.len(),
            sct.fixes.len(),
            sct.airports.len(),
            sct.runways.len(),
            sct.regions.len(),
            sct.labels.len(),
        );
        Ok(sct)
    }
}

fn parse_runway(parts: &[&str], line: usize) -> Result<Runway, SctError> {
    let [designator, opposite, heading, opposite_heading, start_lat, start_lng, end_lat, end_lng, aerodrome, name @ ..] =
        parts
    else {
        return Err(SctError::UnrecognizedLine { line });
    };
    let parse_heading = |value: &str| {
        value
            .parse::<f64>()
            .ok()
            .filter(|heading| heading.is_finite())
            .ok_or(SctError::UnrecognizedLine { line })
    };

    Ok(Runway {
        designators: (designator.to_string(), opposite.to_string()),
        headings: (parse_heading(heading)?, parse_heading(opposite_heading)?),
        location: (
            parse_coordinate(start_lat, start_lng, line)?,
            parse_coordinate(end_lat, end_lng, line)?,
        ),
        aerodrome: aerodrome.to_string(),
        aerodrome_name: (!name.is_empty()).then(|| name.iter().join(" ")),
    })
}

fn parse_label(parts: &[&str], colors: &ColorTable, line: usize) -> Result<Label, SctError> {
    let [text @ .., lat, lng, color] = parts else {
        return Err(SctError::UnrecognizedLine { line });
    };
    if text.is_empty() {
        return Err(SctError::UnrecognizedLine { line });
    }
    let color = colors
        .lookup(color)
        .ok_or_else(|| SctError::UndefinedColor {
            name: color.to_string(),
            line,
        })?
        .clone();

    Ok(Label {
        text: text.iter().join(" "),
        coordinate: parse_coordinate(lat, lng, line)?,
        color,
    })
}

impl Sct {
    pub fn parse(content: &[u8]) -> SctResult {
        Self::parse_with_registry(content, WaypointRegistry::new())
    }

    /// Parses with `registry` pre-seeded, its waypoints behave as if
    /// declared before the first line.
    pub fn parse_with_registry(content: &[u8], registry: WaypointRegistry) -> SctResult {
        let unparsed_file = read_to_string(content)?;
        let mut builder = SctBuilder::new(registry);
        for (idx, raw) in unparsed_file.lines().enumerate() {
            builder.parse_line(idx + 1, raw)?;
        }
        builder.finish()
    }
}
