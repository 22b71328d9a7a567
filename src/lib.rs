use std::io;

use serde::Serialize;
use tracing::warn;

pub mod asr;
pub mod color;
pub mod coordinate;
pub mod ese;
pub mod geojson;
pub mod isec;
pub mod sct;

pub use color::Color;
pub use coordinate::Coordinate;
pub use sct::registry::Waypoint;

fn read_to_string(contents: &[u8]) -> Result<String, io::Error> {
    String::from_utf8(contents.to_vec()).or_else(|_| {
        let (string, _, errors) = encoding_rs::WINDOWS_1252.decode(contents);
        if errors {
            warn!("errors while decoding win-1252");
        }
        Ok(string.to_string())
    })
}

/// Endpoint of a line segment, either given literally or by the name of a
/// previously declared waypoint.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub enum Location {
    Coordinate(Coordinate),
    Waypoint(Waypoint),
}

impl Location {
    pub fn coordinate(&self) -> &Coordinate {
        match self {
            Self::Coordinate(coordinate) => coordinate,
            Self::Waypoint(waypoint) => &waypoint.coordinate,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{read_to_string, Coordinate, Location, Waypoint};

    #[test]
    fn test_win1252_fallback() {
        assert_eq!(read_to_string(b"AeroNav M\xfcnchen").unwrap(), "AeroNav München");
        assert_eq!(read_to_string("München".as_bytes()).unwrap(), "München");
    }

    #[test]
    fn test_location_coordinate() {
        let coordinate = Coordinate::deg_min_sec("N048.10.49.418", "E011.48.59.529");
        let waypoint = Location::Waypoint(Waypoint {
            designator: "OTT".to_string(),
            coordinate: coordinate.clone(),
        });
        assert_eq!(waypoint.coordinate(), &coordinate);
        assert_eq!(
            Location::Coordinate(coordinate.clone()).coordinate(),
            &coordinate
        );
    }
}
