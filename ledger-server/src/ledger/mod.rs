//! The trip ledger.
//!
//! Lines the user rides and the trips recorded on them. A trip refers to
//! its line by id and the store keeps a per-line trip index; deleting a
//! line removes its trips in the same durable write.

mod error;
mod model;
mod stats;
mod store;

pub use error::LedgerError;
pub(crate) use model::NewTrip;
pub use model::{
    DEFAULT_COLOR, InvalidId, LineId, LineUpdate, NewLine, TransitLine, TransitMode, Trip, TripId,
};
pub use stats::{DailyTrips, LedgerStats, LineSummary};
pub use store::LedgerStore;
