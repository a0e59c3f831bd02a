//! Catalog wire types.
//!
//! These mirror the JSON served by the catalog and are also what the cache
//! stores, so renames here must keep the serde field names stable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer stop identifier assigned by the catalog.
pub type StopId = i64;

/// A transit line as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogLine {
    /// Human-readable name, e.g. "Linea 4"
    pub name: String,
    /// Stable identifier, e.g. "4"
    pub slug: String,
}

impl CatalogLine {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
        }
    }

    /// Case-insensitive substring match on name or slug.
    ///
    /// An empty query matches every line.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.name.to_lowercase().contains(&query)
            || self.slug.to_lowercase().contains(&query)
    }
}

/// A stop on a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    #[serde(rename = "stop_id")]
    pub id: StopId,
    #[serde(rename = "stop_name")]
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Stop {
    pub fn new(id: StopId, name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id,
            name: name.into(),
            lat,
            lng,
        }
    }
}

/// Both directional stop sequences of a line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStops {
    #[serde(rename = "percorso0")]
    pub outbound: Vec<Stop>,
    #[serde(rename = "percorso1")]
    pub inbound: Vec<Stop>,
}

impl RouteStops {
    /// Take the stops for one direction, dropping the other.
    pub fn into_direction(self, direction: Direction) -> Vec<Stop> {
        match direction {
            Direction::Outbound => self.outbound,
            Direction::Return => self.inbound,
        }
    }
}

/// Error returned for a direction index other than 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid direction {0}: must be 0 (outbound) or 1 (return)")]
pub struct InvalidDirection(pub u8);

/// One of a line's two travel directions.
///
/// Serialized as its index (0 or 1), matching the catalog's
/// `percorso0`/`percorso1` split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Direction {
    #[default]
    Outbound,
    Return,
}

impl Direction {
    pub fn index(self) -> u8 {
        match self {
            Direction::Outbound => 0,
            Direction::Return => 1,
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = InvalidDirection;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Direction::Outbound),
            1 => Ok(Direction::Return),
            other => Err(InvalidDirection(other)),
        }
    }
}

impl From<Direction> for u8 {
    fn from(direction: Direction) -> Self {
        direction.index()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => f.write_str("outbound"),
            Direction::Return => f.write_str("return"),
        }
    }
}

/// Find a stop by id.
pub fn find_stop(stops: &[Stop], id: StopId) -> Option<&Stop> {
    stops.iter().find(|s| s.id == id)
}

/// Display label for a stop id: its name if known, otherwise `Stop <id>`.
pub fn stop_label(stops: &[Stop], id: StopId) -> String {
    find_stop(stops, id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| format!("Stop {id}"))
}
