//! Ledger error types.

use std::path::PathBuf;

use crate::store::StoreError;

use crate::catalog::Direction;

use super::model::{LineId, TripId};

/// Errors from ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No line with this identifier
    #[error("line {0} not found")]
    LineNotFound(LineId),

    /// No trip with this identifier
    #[error("trip {0} not found")]
    TripNotFound(TripId),

    /// A line with this identifier already exists
    #[error("line {0} already exists")]
    DuplicateLine(LineId),

    /// The line's direction changed after the trip's stops were resolved
    #[error("line {line} direction is now {saved}, trip was resolved for {resolved}")]
    DirectionChanged {
        line: LineId,
        resolved: Direction,
        saved: Direction,
    },

    /// A trip metric is negative or not a number
    #[error("invalid {field}: {value}")]
    InvalidMetric { field: &'static str, value: f64 },

    /// The change could not be made durable; the ledger is unchanged
    #[error("failed to persist ledger: {0}")]
    Persist(#[from] StoreError),

    /// The ledger could not be serialized
    #[error("failed to encode ledger: {0}")]
    Encode(#[from] serde_json::Error),

    /// The blocking write task panicked or was cancelled
    #[error("ledger write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The ledger file exists but cannot be read
    #[error("ledger file {path} is unreadable: {message}")]
    Corrupt { path: PathBuf, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let id: LineId = "67e55044-10b1-426f-9247-bb680e5fe0c8".parse().unwrap();
        assert_eq!(
            LedgerError::LineNotFound(id).to_string(),
            "line 67e55044-10b1-426f-9247-bb680e5fe0c8 not found"
        );

        let err = LedgerError::InvalidMetric {
            field: "distance_km",
            value: -1.0,
        };
        assert_eq!(err.to_string(), "invalid distance_km: -1");

        let err = LedgerError::DirectionChanged {
            line: id,
            resolved: Direction::Outbound,
            saved: Direction::Return,
        };
        assert_eq!(
            err.to_string(),
            "line 67e55044-10b1-426f-9247-bb680e5fe0c8 direction is now return, trip was resolved for outbound"
        );

        let err = LedgerError::Corrupt {
            path: PathBuf::from("data/ledger.json"),
            message: "expected value".into(),
        };
        assert_eq!(
            err.to_string(),
            "ledger file data/ledger.json is unreadable: expected value"
        );
    }
}
