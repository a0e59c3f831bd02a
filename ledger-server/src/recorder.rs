//! Recording trips.
//!
//! A trip is recorded against a ledger line and two catalog stop ids. The
//! stops are resolved through the gateway in the line's saved direction,
//! the great-circle distance between them is computed, and the avoided
//! emissions follow from that distance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::catalog::{CatalogError, Direction, Stop, StopId, find_stop};
use crate::gateway::CatalogGateway;
use crate::ledger::{LedgerError, LedgerStore, LineId, NewTrip, Trip};

/// Mean Earth radius.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Emissions avoided per kilometre travelled by public transport instead of car.
pub const CO2_KG_PER_KM: f64 = 0.132;

/// Great-circle distance between two stops.
pub fn haversine_km(from: &Stop, to: &Stop) -> f64 {
    let (lat1, lat2) = (from.lat.to_radians(), to.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (to.lng - from.lng).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn co2_saved_kg(distance_km: f64) -> f64 {
    distance_km * CO2_KG_PER_KM
}

/// Errors from recording a trip.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The stop id is not served by the line in its saved direction
    #[error("stop {stop_id} is not on line {line} ({direction})")]
    UnknownStop {
        stop_id: StopId,
        line: String,
        direction: Direction,
    },

    /// No stop was given and the line has no default to fall back on
    #[error("no {which} stop given and line {line} has no default")]
    MissingStop { which: &'static str, line: LineId },
}

/// Records trips into the ledger, resolving stops through the catalog.
pub struct TripRecorder {
    gateway: Arc<CatalogGateway>,
    ledger: Arc<LedgerStore>,
}

impl TripRecorder {
    pub fn new(gateway: Arc<CatalogGateway>, ledger: Arc<LedgerStore>) -> Self {
        Self { gateway, ledger }
    }

    /// Record a trip on `line_id` between two catalog stops at time `at`.
    ///
    /// Both stops must appear in the line's stop list for its saved
    /// direction. Boarding and alighting at the same stop is a valid,
    /// zero-length trip.
    pub async fn record_trip(
        &self,
        line_id: LineId,
        start_stop: StopId,
        end_stop: StopId,
        at: DateTime<Utc>,
    ) -> Result<Trip, RecordError> {
        let line = self.ledger.line(line_id).await?;
        let direction = line.direction_or_default();
        let stops = self
            .gateway
            .fetch_stops_for_direction(&line.name, direction)
            .await?;

        let resolve = |stop_id: StopId| {
            find_stop(&stops, stop_id).ok_or_else(|| RecordError::UnknownStop {
                stop_id,
                line: line.name.clone(),
                direction,
            })
        };
        let start = resolve(start_stop)?;
        let end = resolve(end_stop)?;

        self.record_between(line_id, direction, start, end, at).await
    }

    /// Like [`record_trip`](Self::record_trip), but a missing stop falls
    /// back to the line's saved default.
    pub async fn record_with_defaults(
        &self,
        line_id: LineId,
        start_stop: Option<StopId>,
        end_stop: Option<StopId>,
        at: DateTime<Utc>,
    ) -> Result<Trip, RecordError> {
        let line = self.ledger.line(line_id).await?;
        let start = start_stop
            .or(line.default_start_stop)
            .ok_or(RecordError::MissingStop {
                which: "start",
                line: line_id,
            })?;
        let end = end_stop
            .or(line.default_end_stop)
            .ok_or(RecordError::MissingStop {
                which: "end",
                line: line_id,
            })?;
        self.record_trip(line_id, start, end, at).await
    }

    /// Record a trip between two stops already resolved in `direction`.
    ///
    /// Fails with [`LedgerError::DirectionChanged`] if the line's saved
    /// direction no longer matches by the time the trip is committed.
    pub async fn record_between(
        &self,
        line_id: LineId,
        direction: Direction,
        start: &Stop,
        end: &Stop,
        at: DateTime<Utc>,
    ) -> Result<Trip, RecordError> {
        let distance_km = haversine_km(start, end);
        let trip = self
            .ledger
            .add_trip(NewTrip {
                line_id,
                direction,
                start_stop: start.id,
                end_stop: end.id,
                date: at,
                distance_km,
                co2_saved_kg: co2_saved_kg(distance_km),
            })
            .await?;

        info!(
            line = %line_id,
            trip = %trip.id,
            from = start.id,
            to = end.id,
            km = trip.distance_km,
            "trip recorded"
        );
        Ok(trip)
    }
}

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;
