//! Ledger entities.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{Direction, StopId};

/// Color given to lines added without one.
pub const DEFAULT_COLOR: &str = "#007AFF";

/// Slugs the catalog uses for tram lines.
const TRAM_SLUGS: [&str; 7] = ["3", "4", "9", "10", "15", "16CD", "16CS"];

/// Error returned when parsing a malformed identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identifier: {0:?}")]
pub struct InvalidId(pub String);

macro_rules! ledger_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// A fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl FromStr for $name {
            type Err = InvalidId;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| InvalidId(s.to_string()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

ledger_id!(
    /// Identifier of a [`TransitLine`].
    LineId
);

ledger_id!(
    /// Identifier of a [`Trip`].
    TripId
);

/// Kind of vehicle serving a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransitMode {
    Metro,
    Tram,
    Bus,
}

impl TransitMode {
    /// Guess the mode from a catalog slug.
    ///
    /// Metro slugs start with `METRO` (plus the `M1S` shuttle), a fixed set
    /// of numbers are trams, everything else is a bus.
    pub fn for_slug(slug: &str) -> Self {
        if slug.starts_with("METRO") || slug == "M1S" {
            TransitMode::Metro
        } else if TRAM_SLUGS.contains(&slug) {
            TransitMode::Tram
        } else {
            TransitMode::Bus
        }
    }
}

impl fmt::Display for TransitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitMode::Metro => f.write_str("METRO"),
            TransitMode::Tram => f.write_str("TRAM"),
            TransitMode::Bus => f.write_str("BUS"),
        }
    }
}

/// A line the user rides, with their preferences for it.
///
/// Trips are not stored inline; the ledger indexes them by [`LineId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitLine {
    pub id: LineId,
    /// Catalog slug of the line
    pub name: String,
    pub mode: TransitMode,
    pub color: String,
    pub is_favorite: bool,
    pub last_used: Option<DateTime<Utc>>,
    pub default_start_stop: Option<StopId>,
    pub default_end_stop: Option<StopId>,
    pub direction: Option<Direction>,
}

impl TransitLine {
    /// The saved direction, or outbound when none was chosen.
    pub fn direction_or_default(&self) -> Direction {
        self.direction.unwrap_or_default()
    }
}

/// Fields for inserting a line.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLine {
    /// Explicit identifier; a fresh one is assigned when `None`
    pub id: Option<LineId>,
    pub name: String,
    /// Inferred from the slug when `None`
    pub mode: Option<TransitMode>,
    /// [`DEFAULT_COLOR`] when `None`
    pub color: Option<String>,
    pub is_favorite: bool,
    pub default_start_stop: Option<StopId>,
    pub default_end_stop: Option<StopId>,
    pub direction: Option<Direction>,
}

impl NewLine {
    /// A line for catalog slug `name` with every optional field unset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            mode: None,
            color: None,
            is_favorite: false,
            default_start_stop: None,
            default_end_stop: None,
            direction: None,
        }
    }

    pub fn with_id(mut self, id: LineId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_mode(mut self, mode: TransitMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_default_stops(mut self, start: StopId, end: StopId) -> Self {
        self.default_start_stop = Some(start);
        self.default_end_stop = Some(end);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub(crate) fn into_line(self) -> TransitLine {
        let mode = self.mode.unwrap_or_else(|| TransitMode::for_slug(&self.name));
        TransitLine {
            id: self.id.unwrap_or_default(),
            name: self.name,
            mode,
            color: self.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            is_favorite: self.is_favorite,
            last_used: None,
            default_start_stop: self.default_start_stop,
            default_end_stop: self.default_end_stop,
            direction: self.direction,
        }
    }
}

/// Changes to apply to a line. `None` leaves a field as it is.
///
/// The optional line fields take `Some(None)` to clear the saved value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineUpdate {
    pub is_favorite: Option<bool>,
    pub color: Option<String>,
    pub mode: Option<TransitMode>,
    pub default_start_stop: Option<Option<StopId>>,
    pub default_end_stop: Option<Option<StopId>>,
    pub direction: Option<Option<Direction>>,
}

impl LineUpdate {
    pub(crate) fn apply(self, line: &mut TransitLine) {
        if let Some(is_favorite) = self.is_favorite {
            line.is_favorite = is_favorite;
        }
        if let Some(color) = self.color {
            line.color = color;
        }
        if let Some(mode) = self.mode {
            line.mode = mode;
        }
        if let Some(stop) = self.default_start_stop {
            line.default_start_stop = stop;
        }
        if let Some(stop) = self.default_end_stop {
            line.default_end_stop = stop;
        }
        if let Some(direction) = self.direction {
            line.direction = direction;
        }
    }
}

/// One recorded ride on a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    /// Owning line
    pub line_id: LineId,
    pub start_stop: StopId,
    pub end_stop: StopId,
    pub date: DateTime<Utc>,
    pub distance_km: f64,
    pub co2_saved_kg: f64,
}

/// Fields for appending a trip; only the recorder builds these.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NewTrip {
    pub line_id: LineId,
    /// Direction the stops were resolved in; not stored on the trip
    pub direction: Direction,
    pub start_stop: StopId,
    pub end_stop: StopId,
    pub date: DateTime<Utc>,
    pub distance_km: f64,
    pub co2_saved_kg: f64,
}

impl NewTrip {
    pub(crate) fn into_trip(self) -> Trip {
        Trip {
            id: TripId::new(),
            line_id: self.line_id,
            start_stop: self.start_stop,
            end_stop: self.end_stop,
            date: self.date,
            distance_km: self.distance_km,
            co2_saved_kg: self.co2_saved_kg,
        }
    }
}
