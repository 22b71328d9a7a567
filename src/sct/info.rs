use serde::Serialize;
use tracing::warn;

use crate::Coordinate;

use super::{SctError, SourceLine};

/// The positional `[INFO]` block, every slot is left unset when its line is
/// missing.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct Info {
    pub sector_filename: Option<String>,
    pub default_callsign: Option<String>,
    pub default_airport: Option<String>,
    pub center: Option<Coordinate>,
    pub nm_per_lat_degree: Option<f64>,
    pub nm_per_lng_degree: Option<f64>,
    pub magnetic_variation: Option<f64>,
    pub sector_scale: Option<f64>,
}

fn parse_number(line: Option<&SourceLine>) -> Result<Option<f64>, SctError> {
    line.map(|(line, value)| {
        value
            .parse()
            .map_err(|_| SctError::UnrecognizedLine { line: *line })
    })
    .transpose()
}

impl Info {
    pub(super) fn from_lines(lines: &[SourceLine]) -> Result<Self, SctError> {
        let text = |idx: usize| lines.get(idx).map(|(_, value)| value.clone());
        let center = match (lines.get(3), lines.get(4)) {
            (Some((lat_line, lat)), Some((lng_line, lng))) => {
                let coordinate = Coordinate::deg_min_sec(lat.as_str(), lng.as_str());
                coordinate
                    .lat()
                    .map_err(|source| SctError::CoordinateFormat {
                        line: *lat_line,
                        source,
                    })?;
                coordinate
                    .lng()
                    .map_err(|source| SctError::CoordinateFormat {
                        line: *lng_line,
                        source,
                    })?;
                Some(coordinate)
            }
            _ => None,
        };

        if let Some((line, _)) = lines.get(9) {
            warn!(
                "ignoring {} surplus [INFO] lines starting at line {line}",
                lines.len() - 9
            );
        }

        Ok(Self {
            sector_filename: text(0),
            default_callsign: text(1),
            default_airport: text(2),
            center,
            nm_per_lat_degree: parse_number(lines.get(5))?,
            nm_per_lng_degree: parse_number(lines.get(6))?,
            magnetic_variation: parse_number(lines.get(7))?,
            sector_scale: parse_number(lines.get(8))?,
        })
    }
}
