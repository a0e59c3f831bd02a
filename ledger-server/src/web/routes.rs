//! HTTP route handlers.

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::cache::CacheError;
use crate::catalog::{CatalogError, CatalogLine, InvalidDirection, Stop};
use crate::ledger::{InvalidId, LedgerError, LedgerStats, LineId, TransitLine, TripId};
use crate::recorder::RecordError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/catalog/lines", get(catalog_lines))
        .route("/api/catalog/lines/:slug/stops", get(catalog_stops))
        .route("/api/catalog/cache", delete(clear_catalog_cache))
        .route("/api/lines", get(list_lines).post(create_line))
        .route(
            "/api/lines/:id",
            get(get_line).patch(update_line).delete(delete_line),
        )
        .route("/api/lines/:id/trips", get(line_trips).post(record_trip))
        .route("/api/trips/recent", get(recent_trips))
        .route("/api/trips/:id", delete(delete_trip))
        .route("/api/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Catalog lines, optionally filtered by `q`.
async fn catalog_lines(
    State(state): State<AppState>,
    Query(query): Query<CatalogLinesQuery>,
) -> Result<Json<Vec<CatalogLine>>, AppError> {
    let lines = state
        .gateway
        .search_lines(query.q.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(lines))
}

async fn catalog_stops(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<DirectionQuery>,
) -> Result<Json<StopsResponse>, AppError> {
    let direction = query.direction()?;
    let stops = state
        .gateway
        .fetch_stops_for_direction(&slug, direction)
        .await?;
    let display_name = state.gateway.display_name_for(&slug).await;
    Ok(Json(StopsResponse {
        slug,
        display_name,
        direction,
        stops,
    }))
}

async fn clear_catalog_cache(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.gateway.clear_cache()?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ledger lines with totals, ordered by slug.
async fn list_lines(State(state): State<AppState>) -> Json<Vec<LineView>> {
    let mut views = Vec::new();
    for summary in state.ledger.line_summaries().await {
        let display_name = state.gateway.display_name_for(&summary.line.name).await;
        views.push(LineView::new(summary, display_name));
    }
    Json(views)
}

async fn create_line(
    State(state): State<AppState>,
    Json(req): Json<CreateLineRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new = req.into_new_line().map_err(|message| AppError::BadRequest { message })?;
    let line = state.ledger.insert_line(new).await?;
    let view = line_view(&state, line.id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_line(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LineView>, AppError> {
    let id: LineId = id.parse()?;
    Ok(Json(line_view(&state, id).await?))
}

async fn update_line(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateLineRequest>,
) -> Result<Json<LineView>, AppError> {
    let id: LineId = id.parse()?;
    state.ledger.update_line(id, req.into()).await?;
    Ok(Json(line_view(&state, id).await?))
}

/// Delete a line and every trip recorded on it.
async fn delete_line(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteLineResponse>, AppError> {
    let id: LineId = id.parse()?;
    let trips_removed = state.ledger.delete_line(id).await?;
    Ok(Json(DeleteLineResponse { id, trips_removed }))
}

/// A line's trips, newest first.
async fn line_trips(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TripView>>, AppError> {
    let id: LineId = id.parse()?;
    let line = state.ledger.line(id).await?;
    let mut trips = state.ledger.trips_for_line(id).await?;
    trips.sort_by(|a, b| b.date.cmp(&a.date));

    let stops = stop_names(&state, &line).await;
    Ok(Json(
        trips.into_iter().map(|t| TripView::new(t, &stops)).collect(),
    ))
}

async fn record_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RecordTripRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id: LineId = id.parse()?;
    let at = req.date.unwrap_or_else(|| state.clock.now());
    let trip = state
        .recorder
        .record_with_defaults(id, req.start_stop, req.end_stop, at)
        .await?;

    let line = state.ledger.line(id).await?;
    let stops = stop_names(&state, &line).await;
    Ok((StatusCode::CREATED, Json(TripView::new(trip, &stops))))
}

/// Latest trips across every line.
async fn recent_trips(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<TripView>> {
    let trips = state.ledger.recent_trips(query.limit()).await;

    let mut stops_by_line: HashMap<LineId, Vec<Stop>> = HashMap::new();
    let mut views = Vec::with_capacity(trips.len());
    for trip in trips {
        if !stops_by_line.contains_key(&trip.line_id) {
            let stops = match state.ledger.line(trip.line_id).await {
                Ok(line) => stop_names(&state, &line).await,
                Err(_) => Vec::new(),
            };
            stops_by_line.insert(trip.line_id, stops);
        }
        let stops = stops_by_line
            .get(&trip.line_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        views.push(TripView::new(trip, stops));
    }
    Json(views)
}

async fn delete_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: TripId = id.parse()?;
    state.ledger.delete_trip(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stats(State(state): State<AppState>) -> Json<LedgerStats> {
    let today = state.clock.now().date_naive();
    Json(state.ledger.stats(today).await)
}

async fn line_view(state: &AppState, id: LineId) -> Result<LineView, AppError> {
    let summary = state.ledger.line_summary(id).await?;
    let display_name = state.gateway.display_name_for(&summary.line.name).await;
    Ok(LineView::new(summary, display_name))
}

/// Stops of the line in its saved direction, for labelling trips.
///
/// Trips are still listed when the catalog is unreachable; their stops are
/// then labelled by id.
async fn stop_names(state: &AppState, line: &TransitLine) -> Vec<Stop> {
    match state
        .gateway
        .fetch_stops_for_direction(&line.name, line.direction_or_default())
        .await
    {
        Ok(stops) => stops,
        Err(e) => {
            warn!(line = %line.name, error = %e, "stop names unavailable");
            Vec::new()
        }
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    /// The catalog could not be reached or answered badly
    BadGateway { message: String },
    Internal { message: String },
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::BadRequest(_) => AppError::BadRequest {
                message: e.to_string(),
            },
            _ => AppError::BadGateway {
                message: e.to_string(),
            },
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        let message = e.to_string();
        match e {
            LedgerError::LineNotFound(_) | LedgerError::TripNotFound(_) => {
                AppError::NotFound { message }
            }
            LedgerError::DuplicateLine(_)
            | LedgerError::DirectionChanged { .. }
            | LedgerError::InvalidMetric { .. } => AppError::BadRequest { message },
            LedgerError::Persist(_)
            | LedgerError::Encode(_)
            | LedgerError::Task(_)
            | LedgerError::Corrupt { .. } => AppError::Internal { message },
        }
    }
}

impl From<RecordError> for AppError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::Catalog(e) => e.into(),
            RecordError::Ledger(e) => e.into(),
            RecordError::UnknownStop { .. } | RecordError::MissingStop { .. } => {
                AppError::BadRequest {
                    message: e.to_string(),
                }
            }
        }
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl From<InvalidId> for AppError {
    fn from(e: InvalidId) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl From<InvalidDirection> for AppError {
    fn from(e: InvalidDirection) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::BadGateway { message } => (StatusCode::BAD_GATEWAY, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
