use std::io;

use geo::Coord;
use multimap::MultiMap;
use pest::{iterators::Pair, Parser};
use pest_derive::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use super::read_to_string;

#[derive(Parser)]
#[grammar = "pest/asr.pest"]
pub struct AsrParser;

#[derive(Error, Debug)]
pub enum AsrError {
    #[error("failed to parse .asr file: {0}")]
    Parse(#[from] pest::error::Error<Rule>),
    #[error("failed to read .asr file: {0}")]
    FileRead(#[from] io::Error),
    #[error("invalid WINDOWAREA in .asr file: {value}")]
    WindowArea { value: String },
}

enum AsrData {
    SectorFile(String),
    SectorTitle(String),
    Artcc(String),
    ArtccHigh(String),
    ArtccLow(String),
    Geo(String),
    Region(String),
    Sid(String),
    Star(String),
    HighAirway(String),
    LowAirway(String),
    Vor(String),
    Ndb(String),
    Fix(String),
    Airport(String),
    FreeText((String, String)),
    Runway((String, String)),
    WindowArea((Coord, Coord)),
}

/// Display selection of a Euroscope .asr file, every list holds the ids of
/// the checked sector file elements.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Asr {
    /// SECTORFILE – The path of the sector file this ASR is used for.
    pub sector_file: String,
    /// SECTORTITLE – Title shown in the popup list.
    pub sector_title: String,
    pub artcc: Vec<String>,
    pub artcc_high: Vec<String>,
    pub artcc_low: Vec<String>,
    pub geo: Vec<String>,
    pub regions: Vec<String>,
    pub sids: Vec<String>,
    pub stars: Vec<String>,
    pub high_airways: Vec<String>,
    pub low_airways: Vec<String>,
    pub vors: Vec<String>,
    pub ndbs: Vec<String>,
    pub fixes: Vec<String>,
    pub airports: Vec<String>,
    /// free text section -> labels (`Free Text:ENBR Parking\PAD 2:freetext`)
    pub free_text: MultiMap<String, String>,
    /// runway name -> checked elements (`Runways:ENGM 01L-19R:centerline`)
    pub runways: MultiMap<String, String>,
    /// WINDOWAREA – Bottom left and top right corner of the scope in degrees.
    pub window_area: Option<(Coord, Coord)>,
}

pub type AsrResult = Result<Asr, AsrError>;

fn parse_window_area(fields: &[&str]) -> Result<(Coord, Coord), AsrError> {
    let invalid = || AsrError::WindowArea {
        value: fields.join(":"),
    };
    let values = fields
        .iter()
        .take(4)
        .map(|field| field.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    let [lat1, lng1, lat2, lng2] = values[..] else {
        return Err(invalid());
    };

    Ok((Coord { x: lng1, y: lat1 }, Coord { x: lng2, y: lat2 }))
}

fn parse_setting(pair: Pair<Rule>) -> Result<Option<AsrData>, AsrError> {
    let fields = pair
        .into_inner()
        .map(|field| field.as_str().trim())
        .collect::<Vec<_>>();
    let [key, rest @ ..] = fields.as_slice() else {
        return Ok(None);
    };
    let first = || rest.first().copied().unwrap_or_default().to_string();

    let data = match *key {
        "" => return Ok(None),
        "SECTORFILE" => AsrData::SectorFile(first()),
        "SECTORTITLE" => AsrData::SectorTitle(first()),
        "ARTCC boundary" => AsrData::Artcc(first()),
        "ARTCC high boundary" => AsrData::ArtccHigh(first()),
        "ARTCC low boundary" => AsrData::ArtccLow(first()),
        "Geo" => AsrData::Geo(first()),
        "Regions" => AsrData::Region(first()),
        "Sids" => AsrData::Sid(first()),
        "Stars" => AsrData::Star(first()),
        "High airways" => AsrData::HighAirway(first()),
        "Low airways" => AsrData::LowAirway(first()),
        "VORs" => AsrData::Vor(first()),
        "NDBs" => AsrData::Ndb(first()),
        "Fixes" => AsrData::Fix(first()),
        "Airports" => AsrData::Airport(first()),
        "Free Text" => {
            let entry = first();
            let (section, label) = entry.split_once('\\').unwrap_or((entry.as_str(), ""));
            AsrData::FreeText((section.to_string(), label.to_string()))
        }
        "Runways" => AsrData::Runway((
            first(),
            rest.get(1).copied().unwrap_or_default().to_string(),
        )),
        "WINDOWAREA" => AsrData::WindowArea(parse_window_area(rest)?),
        key => {
            trace!("ignoring .asr setting {key}");
            return Ok(None);
        }
    };
    Ok(Some(data))
}

impl Asr {
    pub fn parse(content: &[u8]) -> AsrResult {
        let unparsed_file = read_to_string(content)?;
        let pairs = AsrParser::parse(Rule::asr, &unparsed_file)?;

        let mut asr = Asr::default();
        for pair in pairs
            .flat_map(Pair::into_inner)
            .filter(|pair| pair.as_rule() == Rule::setting)
        {
            let Some(data) = parse_setting(pair)? else {
                continue;
            };
            match data {
                AsrData::SectorFile(value) => asr.sector_file = value,
                AsrData::SectorTitle(value) => asr.sector_title = value,
                AsrData::Artcc(id) => asr.artcc.push(id),
                AsrData::ArtccHigh(id) => asr.artcc_high.push(id),
                AsrData::ArtccLow(id) => asr.artcc_low.push(id),
                AsrData::Geo(id) => asr.geo.push(id),
                AsrData::Region(id) => asr.regions.push(id),
                AsrData::Sid(id) => asr.sids.push(id),
                AsrData::Star(id) => asr.stars.push(id),
                AsrData::HighAirway(id) => asr.high_airways.push(id),
                AsrData::LowAirway(id) => asr.low_airways.push(id),
                AsrData::Vor(id) => asr.vors.push(id),
                AsrData::Ndb(id) => asr.ndbs.push(id),
                AsrData::Fix(id) => asr.fixes.push(id),
                AsrData::Airport(id) => asr.airports.push(id),
                AsrData::FreeText((section, label)) => asr.free_text.insert(section, label),
                AsrData::Runway((name, element)) => asr.runways.insert(name, element),
                AsrData::WindowArea(area) => asr.window_area = Some(area),
            }
        }

        Ok(asr)
    }
}
