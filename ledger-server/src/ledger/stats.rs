//! Aggregate figures over the ledger.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use super::model::{LineId, TransitLine, Trip};

/// Number of lines reported as most used.
pub const MOST_USED_LINES: usize = 5;

/// Number of trips reported as recent.
pub const RECENT_TRIPS: usize = 3;

/// Length of the daily trip histogram, ending today.
pub const WEEK_DAYS: u64 = 7;

/// A line together with totals over its trips.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSummary {
    pub line: TransitLine,
    pub trip_count: usize,
    pub distance_km: f64,
    pub co2_saved_kg: f64,
    pub last_trip: Option<DateTime<Utc>>,
}

impl LineSummary {
    pub fn new<'a>(line: TransitLine, trips: impl IntoIterator<Item = &'a Trip>) -> Self {
        let mut summary = Self {
            line,
            trip_count: 0,
            distance_km: 0.0,
            co2_saved_kg: 0.0,
            last_trip: None,
        };
        for trip in trips {
            summary.trip_count += 1;
            summary.distance_km += trip.distance_km;
            summary.co2_saved_kg += trip.co2_saved_kg;
            summary.last_trip = summary.last_trip.max(Some(trip.date));
        }
        summary
    }
}

/// Trips taken on one calendar day (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyTrips {
    pub date: NaiveDate,
    pub trips: usize,
}

/// Ledger-wide statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total_trips: usize,
    pub total_distance_km: f64,
    pub total_co2_saved_kg: f64,
    /// One entry per day, oldest first, ending `today`
    pub week: Vec<DailyTrips>,
    /// Lines with the most trips, most used first
    pub most_used: Vec<LineSummary>,
    /// Latest trips, newest first
    pub recent: Vec<Trip>,
}

impl LedgerStats {
    /// Compute statistics over `lines` and `trips` as seen on `today`.
    pub fn compute(lines: &[TransitLine], trips: &[Trip], today: NaiveDate) -> Self {
        let mut by_line: HashMap<LineId, Vec<&Trip>> = HashMap::new();
        for trip in trips {
            by_line.entry(trip.line_id).or_default().push(trip);
        }

        let mut summaries: Vec<LineSummary> = lines
            .iter()
            .map(|line| {
                let line_trips = by_line.get(&line.id).map(Vec::as_slice).unwrap_or_default();
                LineSummary::new(line.clone(), line_trips.iter().copied())
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.trip_count
                .cmp(&a.trip_count)
                .then_with(|| a.line.name.cmp(&b.line.name))
        });
        summaries.truncate(MOST_USED_LINES);

        let mut recent: Vec<Trip> = trips.to_vec();
        recent.sort_by_key(|t| (Reverse(t.date), t.id));
        recent.truncate(RECENT_TRIPS);

        Self {
            total_trips: trips.len(),
            total_distance_km: trips.iter().map(|t| t.distance_km).sum(),
            total_co2_saved_kg: trips.iter().map(|t| t.co2_saved_kg).sum(),
            week: week_histogram(trips, today),
            most_used: summaries,
            recent,
        }
    }
}

/// Per-day trip counts for the `WEEK_DAYS` days ending `today`.
fn week_histogram(trips: &[Trip], today: NaiveDate) -> Vec<DailyTrips> {
    (0..WEEK_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| DailyTrips {
            date,
            trips: trips.iter().filter(|t| t.date.date_naive() == date).count(),
        })
        .collect()
}
