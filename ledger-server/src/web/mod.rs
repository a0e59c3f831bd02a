//! Web layer for the trip ledger.
//!
//! A JSON API over the catalog gateway, the ledger and the trip recorder.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
