//! The ledger: lines, their trips, and the index between them.
//!
//! All state lives in memory behind one write lock and is mirrored to a
//! single JSON file. A mutation runs against a copy of the state, the copy
//! is written to disk, and only then does it replace the live state. The
//! lock is held across the write, so mutations never interleave and a
//! failed write leaves the ledger exactly as it was.
//!
//! The copy, write and swap run on the blocking pool with an owned lock
//! guard. Dropping the caller's future mid-write therefore cannot leave the
//! file ahead of memory.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::store::{StoreError, write_atomic};

use super::error::LedgerError;
use super::model::{LineId, LineUpdate, NewLine, NewTrip, TransitLine, Trip, TripId};
use super::stats::{LedgerStats, LineSummary};

/// Version written to the ledger file.
const FORMAT_VERSION: u32 = 1;

/// On-disk layout. Trips are grouped by line in per-line insertion order.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    lines: Vec<TransitLine>,
    trips: Vec<Trip>,
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    lines: HashMap<LineId, TransitLine>,
    trips: HashMap<TripId, Trip>,
    /// Trip ids per line, in insertion order. Every line has an entry.
    trips_by_line: HashMap<LineId, Vec<TripId>>,
}

impl LedgerState {
    fn line(&self, id: LineId) -> Result<&TransitLine, LedgerError> {
        self.lines.get(&id).ok_or(LedgerError::LineNotFound(id))
    }

    fn sorted_lines(&self) -> Vec<&TransitLine> {
        let mut lines: Vec<&TransitLine> = self.lines.values().collect();
        lines.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        lines
    }

    fn trips_of(&self, line: LineId) -> impl Iterator<Item = &Trip> {
        self.trips_by_line
            .get(&line)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.trips.get(id))
    }

    fn to_file(&self) -> LedgerFile {
        let lines: Vec<TransitLine> = self.sorted_lines().into_iter().cloned().collect();
        let trips = lines
            .iter()
            .flat_map(|line| self.trips_of(line.id))
            .cloned()
            .collect();
        LedgerFile {
            version: FORMAT_VERSION,
            lines,
            trips,
        }
    }

    /// Rebuild state from a file, dropping trips whose line is gone.
    fn from_file(file: LedgerFile) -> Self {
        let mut state = Self::default();
        for line in file.lines {
            state.trips_by_line.insert(line.id, Vec::new());
            state.lines.insert(line.id, line);
        }
        for trip in file.trips {
            let Some(index) = state.trips_by_line.get_mut(&trip.line_id) else {
                warn!(trip = %trip.id, line = %trip.line_id, "dropping trip of unknown line");
                continue;
            };
            if state.trips.contains_key(&trip.id) {
                warn!(trip = %trip.id, "dropping duplicate trip");
                continue;
            }
            index.push(trip.id);
            state.trips.insert(trip.id, trip);
        }
        state
    }
}

/// Durable store of transit lines and their trips.
pub struct LedgerStore {
    /// Backing file; `None` keeps the ledger in memory only
    path: Option<PathBuf>,
    state: Arc<RwLock<LedgerState>>,
}

impl LedgerStore {
    /// Open the ledger at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let state = match fs::read(&path) {
            Ok(bytes) => {
                let file: LedgerFile =
                    serde_json::from_slice(&bytes).map_err(|e| LedgerError::Corrupt {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                if file.version != FORMAT_VERSION {
                    return Err(LedgerError::Corrupt {
                        path,
                        message: format!("unsupported version {}", file.version),
                    });
                }
                LedgerState::from_file(file)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no ledger file, starting empty");
                LedgerState::default()
            }
            Err(e) => return Err(StoreError::Io { path, source: e }.into()),
        };

        info!(
            path = %path.display(),
            lines = state.lines.len(),
            trips = state.trips.len(),
            "ledger opened"
        );

        Ok(Self {
            path: Some(path),
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// A ledger that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Arc::new(RwLock::new(LedgerState::default())),
        }
    }

    /// Add a line, assigning a fresh identifier unless one is given.
    pub async fn insert_line(&self, new: NewLine) -> Result<TransitLine, LedgerError> {
        let line = new.into_line();
        self.mutate(move |state| {
            if state.lines.contains_key(&line.id) {
                return Err(LedgerError::DuplicateLine(line.id));
            }
            state.trips_by_line.insert(line.id, Vec::new());
            state.lines.insert(line.id, line.clone());
            Ok(line)
        })
        .await
    }

    pub async fn line(&self, id: LineId) -> Result<TransitLine, LedgerError> {
        self.state.read().await.line(id).cloned()
    }

    /// Every line, ordered by catalog slug.
    pub async fn lines(&self) -> Vec<TransitLine> {
        let state = self.state.read().await;
        state.sorted_lines().into_iter().cloned().collect()
    }

    pub async fn update_line(
        &self,
        id: LineId,
        update: LineUpdate,
    ) -> Result<TransitLine, LedgerError> {
        self.mutate(move |state| {
            let line = state.lines.get_mut(&id).ok_or(LedgerError::LineNotFound(id))?;
            update.apply(line);
            Ok(line.clone())
        })
        .await
    }

    /// Delete a line together with all of its trips.
    ///
    /// Returns the number of trips removed.
    pub async fn delete_line(&self, id: LineId) -> Result<usize, LedgerError> {
        let removed = self
            .mutate(move |state| {
                state.lines.remove(&id).ok_or(LedgerError::LineNotFound(id))?;
                let trip_ids = state.trips_by_line.remove(&id).unwrap_or_default();
                for trip_id in &trip_ids {
                    state.trips.remove(trip_id);
                }
                Ok(trip_ids.len())
            })
            .await?;

        info!(line = %id, trips = removed, "line deleted");
        Ok(removed)
    }

    /// Append a trip to its line and mark the line as used at the trip date.
    ///
    /// The trip's stops were resolved in `new.direction`; the line must
    /// still be saved with that direction when the trip is committed.
    pub(crate) async fn add_trip(&self, new: NewTrip) -> Result<Trip, LedgerError> {
        check_metric("distance_km", new.distance_km)?;
        check_metric("co2_saved_kg", new.co2_saved_kg)?;

        let direction = new.direction;
        let trip = new.into_trip();
        self.mutate(move |state| {
            let line = state
                .lines
                .get_mut(&trip.line_id)
                .ok_or(LedgerError::LineNotFound(trip.line_id))?;
            let saved = line.direction_or_default();
            if saved != direction {
                return Err(LedgerError::DirectionChanged {
                    line: trip.line_id,
                    resolved: direction,
                    saved,
                });
            }
            line.last_used = Some(trip.date);
            state
                .trips_by_line
                .entry(trip.line_id)
                .or_default()
                .push(trip.id);
            state.trips.insert(trip.id, trip.clone());
            Ok(trip)
        })
        .await
    }

    pub async fn trip(&self, id: TripId) -> Result<Trip, LedgerError> {
        let state = self.state.read().await;
        state.trips.get(&id).cloned().ok_or(LedgerError::TripNotFound(id))
    }

    /// A line's trips in the order they were recorded.
    pub async fn trips_for_line(&self, id: LineId) -> Result<Vec<Trip>, LedgerError> {
        let state = self.state.read().await;
        state.line(id)?;
        Ok(state.trips_of(id).cloned().collect())
    }

    /// Delete one trip. The line and its other trips are untouched.
    pub async fn delete_trip(&self, id: TripId) -> Result<Trip, LedgerError> {
        self.mutate(move |state| {
            let trip = state.trips.remove(&id).ok_or(LedgerError::TripNotFound(id))?;
            if let Some(index) = state.trips_by_line.get_mut(&trip.line_id) {
                index.retain(|t| *t != id);
            }
            Ok(trip)
        })
        .await
    }

    /// The `limit` latest trips across all lines, newest first.
    pub async fn recent_trips(&self, limit: usize) -> Vec<Trip> {
        let state = self.state.read().await;
        let mut trips: Vec<Trip> = state.trips.values().cloned().collect();
        trips.sort_by_key(|t| (Reverse(t.date), t.id));
        trips.truncate(limit);
        trips
    }

    /// Per-line totals, ordered by catalog slug.
    pub async fn line_summaries(&self) -> Vec<LineSummary> {
        let state = self.state.read().await;
        state
            .sorted_lines()
            .into_iter()
            .map(|line| LineSummary::new(line.clone(), state.trips_of(line.id)))
            .collect()
    }

    pub async fn line_summary(&self, id: LineId) -> Result<LineSummary, LedgerError> {
        let state = self.state.read().await;
        let line = state.line(id)?;
        Ok(LineSummary::new(line.clone(), state.trips_of(id)))
    }

    /// Ledger-wide statistics as of `today`.
    pub async fn stats(&self, today: NaiveDate) -> LedgerStats {
        let state = self.state.read().await;
        let lines: Vec<TransitLine> = state.lines.values().cloned().collect();
        let trips: Vec<Trip> = state.trips.values().cloned().collect();
        LedgerStats::compute(&lines, &trips, today)
    }

    /// Apply `change` to a copy of the state, persist the copy, then swap it in.
    async fn mutate<R, F>(&self, change: F) -> Result<R, LedgerError>
    where
        R: Send + 'static,
        F: FnOnce(&mut LedgerState) -> Result<R, LedgerError> + Send + 'static,
    {
        let mut state = self.state.clone().write_owned().await;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<R, LedgerError> {
            let mut next = LedgerState::clone(&state);
            let out = change(&mut next)?;
            if let Some(path) = &path {
                persist(path, &next)?;
            }
            *state = next;
            Ok(out)
        })
        .await?
    }
}

fn persist(path: &Path, state: &LedgerState) -> Result<(), LedgerError> {
    let bytes = serde_json::to_vec_pretty(&state.to_file())?;
    write_atomic(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "ledger written");
    Ok(())
}

fn check_metric(field: &'static str, value: f64) -> Result<(), LedgerError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidMetric { field, value })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
