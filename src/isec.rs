use std::{fmt, io, num::ParseFloatError};

use bevy_derive::{Deref, DerefMut};
use itertools::Itertools;
use multimap::MultiMap;
use pest::{iterators::Pair, Parser};
use pest_derive::Parser;
use serde::Serialize;
use thiserror::Error;

use crate::{read_to_string, Coordinate, Waypoint};

#[derive(Parser)]
#[grammar = "pest/isec.pest"]
pub struct IsecParser;

/// Waypoints of an `isec.txt`, duplicate designators are kept.
#[derive(Clone, Debug, Default, Serialize, Deref, DerefMut)]
pub struct IsecMap(pub MultiMap<String, Waypoint>);

impl fmt::Display for IsecMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, waypoint) in self
            .flat_iter()
            .sorted_by_key(|(designator, _)| *designator)
        {
            let lat = waypoint.coordinate.lat().map_err(|_| fmt::Error)?;
            let lng = waypoint.coordinate.lng().map_err(|_| fmt::Error)?;
            writeln!(f, "{}\t{lat:>10.6}\t{lng:>11.6}\t15", waypoint.designator)?;
        }

        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum IsecError {
    #[error("failed to parse isec.txt: {0}")]
    Parse(#[from] pest::error::Error<Rule>),
    #[error("failed to read isec.txt: {0}")]
    FileRead(#[from] io::Error),
    #[error("invalid number in isec.txt: {0}")]
    Number(#[from] ParseFloatError),
}

pub type IsecResult = Result<IsecMap, IsecError>;

fn parse_coordinate(pair: Pair<Rule>) -> Result<Option<Coordinate>, IsecError> {
    let mut coordinate = pair.into_inner();
    let (Some(lat), Some(lng)) = (coordinate.next(), coordinate.next()) else {
        return Ok(None);
    };
    Ok(Some(Coordinate::decimal(
        lat.as_str().parse()?,
        lng.as_str().parse()?,
    )))
}

fn parse_waypoint(pair: Pair<Rule>) -> Result<Option<Waypoint>, IsecError> {
    let mut isec_line = pair.into_inner();
    let (Some(designator), Some(coordinate)) = (isec_line.next(), isec_line.next()) else {
        return Ok(None);
    };
    Ok(parse_coordinate(coordinate)?.map(|coordinate| Waypoint {
        designator: designator.as_str().to_string(),
        coordinate,
    }))
}

pub fn parse_isec_txt(content: &[u8]) -> IsecResult {
    let unparsed_file = read_to_string(content)?;
    let pairs = IsecParser::parse(Rule::wpts, &unparsed_file)?;

    let mut isec = IsecMap::default();
    for pair in pairs
        .flat_map(Pair::into_inner)
        .filter(|pair| pair.as_rule() == Rule::wpt)
    {
        if let Some(waypoint) = parse_waypoint(pair)? {
            isec.insert(waypoint.designator.clone(), waypoint);
        }
    }

    Ok(isec)
}
