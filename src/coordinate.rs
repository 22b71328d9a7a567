use std::f64::consts::PI;

use geo::Coord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

const EARTH_RADIUS: f64 = 6_378_137.0;
const HALF_SIZE: f64 = PI * EARTH_RADIUS;

static LATITUDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[NnSs][0-9.]+$").unwrap());
static LONGITUDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[EeWw][0-9.]+$").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("empty coordinate")]
    Empty,
    #[error("Invalid latitude {0}")]
    InvalidLatitude(String),
    #[error("Invalid longitude {0}")]
    InvalidLongitude(String),
}

/// A position as written in the source file.
///
/// Deg/min/sec strings (`N048.21.13.618`) are kept verbatim and converted to
/// decimal degrees on demand, decimal pairs (from isec.txt or .asr files) are
/// stored as is.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Coordinate {
    DegMinSec { lat: String, lng: String },
    Decimal { lat: f64, lng: f64 },
}

/// Cheap shape check only, the numeric body is validated by the conversion.
pub fn is_latitude(input: &str) -> bool {
    LATITUDE_RE.is_match(input)
}

pub fn is_longitude(input: &str) -> bool {
    LONGITUDE_RE.is_match(input)
}

fn is_digits(input: &str) -> bool {
    !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit())
}

fn deg_min_sec_to_decimal(
    input: &str,
    positive: char,
    negative: char,
    invalid: fn(String) -> CoordinateError,
) -> Result<f64, CoordinateError> {
    let mut chars = input.chars();
    let sign = match chars.next().map(|hemi| hemi.to_ascii_uppercase()) {
        None => return Err(CoordinateError::Empty),
        Some(hemi) if hemi == positive => 1.0,
        Some(hemi) if hemi == negative => -1.0,
        Some(_) => return Err(invalid(input.to_string())),
    };

    let mut parts = chars.as_str().split('.');
    let degrees = parts.next().unwrap_or_default();
    let minutes = parts.next().unwrap_or_default();
    let seconds = parts.next().unwrap_or("0");
    let fraction = parts.next().unwrap_or("0");

    let invalid_input = || invalid(input.to_string());
    let degrees = degrees.parse::<u32>().map_err(|_| invalid_input())?;
    let minutes = minutes.parse::<u32>().map_err(|_| invalid_input())?;
    if !is_digits(seconds) || !is_digits(fraction) {
        return Err(invalid_input());
    }
    let seconds = format!("{seconds}.{fraction}")
        .parse::<f64>()
        .map_err(|_| invalid_input())?;

    let decimal =
        sign * (f64::from(degrees) + f64::from(minutes) / 60.0 + seconds / 3600.0);
    if decimal.is_finite() {
        Ok(decimal)
    } else {
        Err(invalid_input())
    }
}

fn reduce_decimal_precision(decimal: f64) -> f64 {
    (decimal * 1_000_000.0).round() / 1_000_000.0
}

impl Coordinate {
    pub fn deg_min_sec(lat: impl Into<String>, lng: impl Into<String>) -> Self {
        Self::DegMinSec {
            lat: lat.into(),
            lng: lng.into(),
        }
    }

    pub fn decimal(lat: f64, lng: f64) -> Self {
        Self::Decimal { lat, lng }
    }

    /// Builds a deg/min/sec coordinate after checking both the shape and the
    /// numeric body of each half.
    pub fn parse_deg_min_sec(lat: &str, lng: &str) -> Result<Self, CoordinateError> {
        if !is_latitude(lat) {
            return Err(CoordinateError::InvalidLatitude(lat.to_string()));
        }
        if !is_longitude(lng) {
            return Err(CoordinateError::InvalidLongitude(lng.to_string()));
        }
        let coordinate = Self::deg_min_sec(lat, lng);
        coordinate.lat()?;
        coordinate.lng()?;
        Ok(coordinate)
    }

    pub fn lat(&self) -> Result<f64, CoordinateError> {
        match self {
            Self::DegMinSec { lat, .. } => {
                deg_min_sec_to_decimal(lat, 'N', 'S', CoordinateError::InvalidLatitude)
            }
            Self::Decimal { lat, .. } => Ok(*lat),
        }
    }

    pub fn lng(&self) -> Result<f64, CoordinateError> {
        match self {
            Self::DegMinSec { lng, .. } => {
                deg_min_sec_to_decimal(lng, 'E', 'W', CoordinateError::InvalidLongitude)
            }
            Self::Decimal { lng, .. } => Ok(*lng),
        }
    }

    /// Spherical mercator (EPSG:3857) in metres.
    pub fn to_utm(&self) -> Result<Coord, CoordinateError> {
        let lat = self.lat()?;
        let lng = self.lng()?;
        let y = EARTH_RADIUS * (PI * (lat + 90.0) / 360.0).tan().ln();

        Ok(Coord {
            x: HALF_SIZE * lng / 180.0,
            y: y.clamp(-HALF_SIZE, HALF_SIZE),
        })
    }

    /// Decimal WGS84 degrees with 6 decimals (about 10cm).
    pub fn to_wgs84(&self) -> Result<Coord, CoordinateError> {
        Ok(Coord {
            x: reduce_decimal_precision(self.lng()?),
            y: reduce_decimal_precision(self.lat()?),
        })
    }
}
