use std::collections::HashSet;
use std::io;
use std::path::Path;

use bevy_derive::Deref;
use geo::{point, Point};
use pest::{iterators::Pair, Parser};
use pest_derive::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::{deg_min_sec_to_decimal, read_to_string};

#[derive(Parser)]
#[grammar = "pest/wpt.pest"]
pub struct WptParser;

#[derive(Error, Debug)]
pub enum WaypointError {
    #[error("failed to parse .wpt file: {0}")]
    Parse(#[from] pest::error::Error<Rule>),
    #[error("failed to read .wpt file: {0}")]
    FileRead(#[from] io::Error),
    #[error("waypoint {name} is defined more than once")]
    Duplicate { name: String },
    #[error("waypoint {name} has an invalid elevation {elevation}")]
    Elevation { name: String, elevation: String },
}

/// How a waypoint is achieved.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
pub enum WaypointKind {
    /// Reached by flying or walking into the cylinder once.
    Touch,
    /// Reached by staying inside the cylinder, on the ground, for the minimum dwell time.
    Land,
    /// Night checkpoint. Defined but never scored.
    Camp,
    None,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Waypoint {
    pub name: String,
    pub coordinate: Point,
    /// Elevation above mean sea level in metres.
    pub msl: i32,
    pub kind: WaypointKind,
    pub points: i32,
}

impl Waypoint {
    /// Decodes points and kind from a competition name like `2X_MCINTO`: the leading digit is
    /// the value, a following `X` marks a land waypoint and `S` a camp.
    #[must_use]
    pub fn from_name(name: &str, coordinate: Point, msl: i32) -> Self {
        let (points, kind) = match name.split_once('_') {
            Some((prefix, _)) => {
                let mut chars = prefix.chars();
                let points = chars
                    .next()
                    .and_then(|c| c.to_digit(10))
                    .map_or_else(
                        || {
                            warn!("waypoint {name}: prefix {prefix} carries no points");
                            0
                        },
                        |digit| digit as i32,
                    );
                let kind = match chars.next() {
                    Some('X') => WaypointKind::Land,
                    Some('S') => WaypointKind::Camp,
                    _ => WaypointKind::Touch,
                };
                (points, kind)
            }
            None => (0, WaypointKind::Touch),
        };

        Waypoint {
            name: name.to_string(),
            coordinate,
            msl,
            kind,
            points,
        }
    }
}

/// The waypoints of one competition in definition order, names unique.
#[derive(Clone, Debug, Default, Serialize, Deref)]
pub struct Waypoints(Vec<Waypoint>);

pub type WaypointsResult = Result<Waypoints, WaypointError>;

impl Waypoints {
    pub fn new(waypoints: impl IntoIterator<Item = Waypoint>) -> WaypointsResult {
        let mut seen = HashSet::new();
        let waypoints = waypoints
            .into_iter()
            .map(|wpt| {
                if seen.insert(wpt.name.clone()) {
                    Ok(wpt)
                } else {
                    Err(WaypointError::Duplicate { name: wpt.name })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Waypoints(waypoints))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Waypoint> {
        self.0.iter().find(|wpt| wpt.name == name)
    }

    pub fn read(path: impl AsRef<Path>) -> WaypointsResult {
        parse_wpt_file(&fs_err::read(path.as_ref())?)
    }
}

fn parse_coordinate_part(pair: Pair<Rule>) -> (char, f64) {
    let mut part = pair.into_inner();
    let hemisphere = part.next().unwrap().as_str().chars().next().unwrap();
    let degrees = part.next().unwrap().as_str().parse().unwrap();
    let minutes = part.next().unwrap().as_str().parse().unwrap();
    let seconds = part.next().unwrap().as_str().parse().unwrap();
    (
        hemisphere,
        deg_min_sec_to_decimal(hemisphere, degrees, minutes, seconds),
    )
}

fn parse_coordinate(first: Pair<Rule>, second: Pair<Rule>) -> Point {
    let first = parse_coordinate_part(first);
    let second = parse_coordinate_part(second);
    let (lat, lng) = match first.0 {
        'N' | 'S' => (first.1, second.1),
        _ => (second.1, first.1),
    };
    point! { x: lng, y: lat }
}

fn parse_wpt(pair: Pair<Rule>) -> Option<Result<Waypoint, WaypointError>> {
    match pair.as_rule() {
        Rule::wpt => {
            let mut wpt = pair.into_inner();
            let name = wpt.next().unwrap().as_str();
            let coordinate = parse_coordinate(wpt.next().unwrap(), wpt.next().unwrap());
            let elevation = wpt.next().unwrap().as_str();
            Some(match elevation.parse() {
                Ok(msl) => Ok(Waypoint::from_name(name, coordinate, msl)),
                Err(_) => Err(WaypointError::Elevation {
                    name: name.to_string(),
                    elevation: elevation.to_string(),
                }),
            })
        }
        Rule::EOI => None,
        rule => unreachable!("{rule:?}"),
    }
}

pub fn parse_wpt_file(content: &[u8]) -> WaypointsResult {
    let unparsed_file = read_to_string(content)?;
    let wpts = WptParser::parse(Rule::wpts, &unparsed_file)?
        .next()
        .unwrap()
        .into_inner()
        .filter_map(parse_wpt)
        .collect::<Result<Vec<_>, _>>()?;
    Waypoints::new(wpts)
}

#[cfg(test)]
pub(crate) fn wanaka_waypoints() -> Waypoints {
    Waypoints::read("fixtures/wanaka.wpt").unwrap()
}
