use std::{collections::HashMap, io};

use itertools::Itertools as _;
use multimap::MultiMap;
use phf::phf_map;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::{coordinate::CoordinateError, read_to_string, Coordinate};

#[derive(Error, Debug)]
pub enum EseError {
    #[error("failed to read .ese file: {0:?}")]
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
}

/// A controller position from `[POSITIONS]`.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Position {
    pub name: String,
    pub callsign: String,
    pub frequency: String,
    pub identifier: String,
    pub prefix: String,
    pub middle: String,
    pub suffix: String,
    pub squawk_range: Option<(u16, u16)>,
    pub visibility_points: Vec<Coordinate>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FreeText {
    pub text: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct Ese {
    pub positions: HashMap<String, Position>,
    /// free text section -> labels in file order
    pub free_text: MultiMap<String, FreeText>,
}

pub type EseResult = Result<Ese, EseError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Positions,
    SidsStars,
    Airspace,
    Radar,
    FreeText,
    Ground,
}

static SECTIONS: phf::Map<&'static str, Section> = phf_map! {
    "POSITIONS" => Section::Positions,
    "SIDSSTARS" => Section::SidsStars,
    "AIRSPACE" => Section::Airspace,
    "RADAR" => Section::Radar,
    "FREETEXT" => Section::FreeText,
    "GROUND" => Section::Ground,
};

fn parse_coordinate(lat: &str, lng: &str, line: usize) -> Result<Coordinate, EseError> {
    Coordinate::parse_deg_min_sec(lat, lng)
        .map_err(|source| EseError::CoordinateFormat { line, source })
}

fn parse_squawk_range(start: Option<&&str>, end: Option<&&str>) -> Option<(u16, u16)> {
    Some((start?.parse().ok()?, end?.parse().ok()?))
}

fn parse_position(parts: &[&str], line: usize) -> Result<Position, EseError> {
    let [name, callsign, frequency, identifier, middle, prefix, suffix, rest @ ..] = parts else {
        return Err(EseError::UnrecognizedLine { line });
    };
    // two unused fields precede the squawk range
    let squawk_range = parse_squawk_range(rest.get(2), rest.get(3));
    let visibility_points = rest
        .iter()
        .skip(4)
        .filter(|part| !part.is_empty())
        .tuples::<(_, _)>()
        .map(|(lat, lng)| parse_coordinate(lat, lng, line))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Position {
        name: name.to_string(),
        callsign: callsign.to_string(),
        frequency: frequency.to_string(),
        identifier: identifier.to_string(),
        prefix: prefix.to_string(),
        middle: middle.to_string(),
        suffix: suffix.to_string(),
        squawk_range,
        visibility_points,
    })
}

fn parse_free_text(parts: &[&str], line: usize) -> Result<(String, FreeText), EseError> {
    let [lat, lng, section, text @ ..] = parts else {
        return Err(EseError::UnrecognizedLine { line });
    };
    if text.is_empty() {
        return Err(EseError::UnrecognizedLine { line });
    }

    Ok((
        section.to_string(),
        FreeText {
            text: text.join(":"),
            coordinate: parse_coordinate(lat, lng, line)?,
        },
    ))
}

impl Ese {
    pub fn parse(content: &[u8]) -> EseResult {
        let unparsed_file = read_to_string(content)?;
        let mut ese = Ese::default();
        let mut section = None;

        for (idx, raw) in unparsed_file.lines().enumerate() {
            let line = idx + 1;
            let data = raw.trim();
            if data.is_empty() || data.starts_with(';') {
                continue;
            }

            if let Some(header) = data.strip_prefix('[') {
                let Some((name, _)) = header.rsplit_once(']') else {
                    return Err(EseError::UnrecognizedLine { line });
                };
                let name = name.trim().to_uppercase();
                let Some(next) = SECTIONS.get(name.as_str()) else {
                    return Err(EseError::UnknownSection { name, line });
                };
                if matches!(next, Section::Positions | Section::FreeText) {
                    debug!("line {line}: entering [{name}]");
                } else {
                    trace!("line {line}: skipping [{name}]");
                }
                section = Some(*next);
                continue;
            }

            let parts = data.split(':').map(str::trim).collect::<Vec<_>>();
            match section {
                None => return Err(EseError::UnrecognizedLine { line }),
                Some(Section::Positions) => {
                    let position = parse_position(&parts, line)?;
                    ese.positions.insert(position.identifier.clone(), position);
                }
                Some(Section::FreeText) => {
                    let (section, free_text) = parse_free_text(&parts, line)?;
                    ese.free_text.insert(section, free_text);
                }
                Some(Section::SidsStars | Section::Airspace | Section::Radar | Section::Ground) => {}
            }
        }

        debug!(
            "parsed {} positions, {} free text sections",
            ese.positions.len(),
            ese.free_text.len()
        );
        Ok(ese)
    }
}
