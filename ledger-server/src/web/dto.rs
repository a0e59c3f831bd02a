//! Data transfer objects for the web API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::{Direction, InvalidDirection, Stop, StopId, stop_label};
use crate::ledger::{LineId, LineSummary, LineUpdate, NewLine, TransitMode, Trip, TripId};

/// Trips returned by `/api/trips/recent` when no limit is given.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Upper bound on `/api/trips/recent?limit=`.
pub const MAX_RECENT_LIMIT: usize = 200;

/// Query for catalog line search.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogLinesQuery {
    /// Substring of the line name or slug; all lines when absent
    pub q: Option<String>,
}

/// Query selecting a travel direction.
#[derive(Debug, Default, Deserialize)]
pub struct DirectionQuery {
    /// 0 (outbound) or 1 (return); outbound when absent
    pub direction: Option<u8>,
}

impl DirectionQuery {
    pub fn direction(&self) -> Result<Direction, InvalidDirection> {
        self.direction.map_or(Ok(Direction::Outbound), Direction::try_from)
    }
}

/// Stops of one direction of a catalog line.
#[derive(Debug, Serialize)]
pub struct StopsResponse {
    pub slug: String,
    pub display_name: String,
    pub direction: Direction,
    pub stops: Vec<Stop>,
}

/// Request to add a line to the ledger.
#[derive(Debug, Deserialize)]
pub struct CreateLineRequest {
    pub id: Option<LineId>,
    /// Catalog slug
    pub name: String,
    pub mode: Option<TransitMode>,
    pub color: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    pub default_start_stop: Option<StopId>,
    pub default_end_stop: Option<StopId>,
    pub direction: Option<Direction>,
}

impl CreateLineRequest {
    /// Validate and convert. The slug must not be blank.
    pub fn into_new_line(self) -> Result<NewLine, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("line name must not be empty".to_string());
        }
        Ok(NewLine {
            id: self.id,
            name: name.to_string(),
            mode: self.mode,
            color: self.color,
            is_favorite: self.is_favorite,
            default_start_stop: self.default_start_stop,
            default_end_stop: self.default_end_stop,
            direction: self.direction,
        })
    }
}

/// Partial update of a line. Absent fields are left unchanged; `null`
/// clears a default stop or the saved direction.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateLineRequest {
    pub is_favorite: Option<bool>,
    pub color: Option<String>,
    pub mode: Option<TransitMode>,
    #[serde(default, deserialize_with = "present")]
    pub default_start_stop: Option<Option<StopId>>,
    #[serde(default, deserialize_with = "present")]
    pub default_end_stop: Option<Option<StopId>>,
    #[serde(default, deserialize_with = "present")]
    pub direction: Option<Option<Direction>>,
}

/// Marks a field that appeared in the body, even as `null`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<UpdateLineRequest> for LineUpdate {
    fn from(req: UpdateLineRequest) -> Self {
        LineUpdate {
            is_favorite: req.is_favorite,
            color: req.color,
            mode: req.mode,
            default_start_stop: req.default_start_stop,
            default_end_stop: req.default_end_stop,
            direction: req.direction,
        }
    }
}

/// Request to record a trip. Missing stops fall back to the line defaults,
/// a missing date to the current time.
#[derive(Debug, Default, Deserialize)]
pub struct RecordTripRequest {
    pub start_stop: Option<StopId>,
    pub end_stop: Option<StopId>,
    pub date: Option<DateTime<Utc>>,
}

/// Query for the recent trips listing.
#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

impl RecentQuery {
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .min(MAX_RECENT_LIMIT)
    }
}

/// A ledger line with its totals, as shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineView {
    pub id: LineId,
    pub name: String,
    /// Catalog name when known, otherwise the slug
    pub display_name: String,
    pub mode: TransitMode,
    pub color: String,
    pub is_favorite: bool,
    pub last_used: Option<DateTime<Utc>>,
    pub default_start_stop: Option<StopId>,
    pub default_end_stop: Option<StopId>,
    pub direction: Direction,
    pub trip_count: usize,
    pub distance_km: f64,
    pub co2_saved_kg: f64,
    pub last_trip: Option<DateTime<Utc>>,
}

impl LineView {
    pub fn new(summary: LineSummary, display_name: String) -> Self {
        let line = summary.line;
        Self {
            id: line.id,
            direction: line.direction_or_default(),
            name: line.name,
            display_name,
            mode: line.mode,
            color: line.color,
            is_favorite: line.is_favorite,
            last_used: line.last_used,
            default_start_stop: line.default_start_stop,
            default_end_stop: line.default_end_stop,
            trip_count: summary.trip_count,
            distance_km: summary.distance_km,
            co2_saved_kg: summary.co2_saved_kg,
            last_trip: summary.last_trip,
        }
    }
}

/// A trip with its stops labelled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripView {
    pub id: TripId,
    pub line_id: LineId,
    pub start_stop: StopId,
    pub start_stop_name: String,
    pub end_stop: StopId,
    pub end_stop_name: String,
    pub date: DateTime<Utc>,
    pub distance_km: f64,
    pub co2_saved_kg: f64,
}

impl TripView {
    /// Label the trip's stops from `stops`; unknown ids become `Stop <id>`.
    pub fn new(trip: Trip, stops: &[Stop]) -> Self {
        Self {
            id: trip.id,
            line_id: trip.line_id,
            start_stop_name: stop_label(stops, trip.start_stop),
            start_stop: trip.start_stop,
            end_stop_name: stop_label(stops, trip.end_stop),
            end_stop: trip.end_stop,
            date: trip.date,
            distance_km: trip.distance_km,
            co2_saved_kg: trip.co2_saved_kg,
        }
    }
}

/// Result of deleting a line.
#[derive(Debug, Serialize)]
pub struct DeleteLineResponse {
    pub id: LineId,
    pub trips_removed: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DEFAULT_COLOR;
    use chrono::TimeZone;

    fn trip(start: StopId, end: StopId) -> Trip {
        Trip {
            id: TripId::new(),
            line_id: LineId::new(),
            start_stop: start,
            end_stop: end,
            date: Utc.with_ymd_and_hms(2024, 11, 5, 7, 30, 0).unwrap(),
            distance_km: 7.2,
            co2_saved_kg: 7.2 * 0.132,
        }
    }

    #[test]
    fn direction_query() {
        assert_eq!(DirectionQuery::default().direction(), Ok(Direction::Outbound));
        let q = DirectionQuery { direction: Some(1) };
        assert_eq!(q.direction(), Ok(Direction::Return));
        let q = DirectionQuery { direction: Some(2) };
        assert_eq!(q.direction(), Err(InvalidDirection(2)));
    }

    #[test]
    fn recent_limit_defaults_and_caps() {
        assert_eq!(RecentQuery::default().limit(), DEFAULT_RECENT_LIMIT);
        assert_eq!(RecentQuery { limit: Some(3) }.limit(), 3);
        assert_eq!(RecentQuery { limit: Some(10_000) }.limit(), MAX_RECENT_LIMIT);
    }

    #[test]
    fn create_line_request() {
        let req: CreateLineRequest =
            serde_json::from_str(r#"{"name": " 4 ", "direction": 1, "default_start_stop": 471}"#)
                .unwrap();
        let new = req.into_new_line().unwrap();
        assert_eq!(new.name, "4");
        assert_eq!(new.direction, Some(Direction::Return));
        assert_eq!(new.default_start_stop, Some(471));
        assert!(!new.is_favorite);

        let blank: CreateLineRequest = serde_json::from_str(r#"{"name": "  "}"#).unwrap();
        assert!(blank.into_new_line().is_err());

        let bad_direction = serde_json::from_str::<CreateLineRequest>(r#"{"name": "4", "direction": 2}"#);
        assert!(bad_direction.is_err());
    }

    #[test]
    fn update_request_maps_fields() {
        let req: UpdateLineRequest =
            serde_json::from_str(r#"{"is_favorite": true, "mode": "TRAM"}"#).unwrap();
        let update = LineUpdate::from(req);
        assert_eq!(update.is_favorite, Some(true));
        assert_eq!(update.mode, Some(TransitMode::Tram));
        assert!(update.color.is_none());
        assert!(update.default_start_stop.is_none());
        assert!(update.direction.is_none());
    }

    #[test]
    fn update_request_null_clears() {
        let req: UpdateLineRequest = serde_json::from_str(
            r#"{"default_start_stop": null, "default_end_stop": 470, "direction": null}"#,
        )
        .unwrap();
        let update = LineUpdate::from(req);
        assert_eq!(update.default_start_stop, Some(None));
        assert_eq!(update.default_end_stop, Some(Some(470)));
        assert_eq!(update.direction, Some(None));

        let req: UpdateLineRequest = serde_json::from_str(r#"{"direction": 1}"#).unwrap();
        assert_eq!(req.direction, Some(Some(Direction::Return)));
    }

    #[test]
    fn line_view_flattens_summary() {
        let line = NewLine::new("METRO").into_line();
        let trips = [trip(1, 2), trip(2, 3)];
        let view = LineView::new(LineSummary::new(line.clone(), trips.iter()), "Metro 1".into());

        assert_eq!(view.id, line.id);
        assert_eq!(view.name, "METRO");
        assert_eq!(view.display_name, "Metro 1");
        assert_eq!(view.mode, TransitMode::Metro);
        assert_eq!(view.color, DEFAULT_COLOR);
        assert_eq!(view.direction, Direction::Outbound);
        assert_eq!(view.trip_count, 2);
        assert!((view.distance_km - 14.4).abs() < 1e-9);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["mode"], "METRO");
        assert_eq!(json["direction"], 0);
    }

    #[test]
    fn trip_view_labels_stops() {
        let stops = vec![Stop::new(2501, "Falchera", 45.12, 7.70)];
        let view = TripView::new(trip(2501, 9999), &stops);
        assert_eq!(view.start_stop_name, "Falchera");
        assert_eq!(view.end_stop_name, "Stop 9999");

        let unlabelled = TripView::new(trip(1, 2), &[]);
        assert_eq!(unlabelled.start_stop_name, "Stop 1");
    }
}
