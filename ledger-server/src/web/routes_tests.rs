//! End-to-end tests of the HTTP API against a mock catalog.

use super::*;
use crate::cache::{CacheConfig, TtlCache};
use crate::catalog::MockCatalog;
use crate::clock::ManualClock;
use crate::gateway::CatalogGateway;
use crate::ledger::LedgerStore;
use crate::store::MemoryStore;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use std::sync::Arc;

struct TestServer {
    base: String,
    http: reqwest::Client,
    catalog: Arc<MockCatalog>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(LedgerStore::in_memory()).await
    }

    async fn start_with(ledger: LedgerStore) -> Self {
        let catalog = Arc::new(MockCatalog::from_dir("data/mock_catalog").unwrap());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 11, 5, 7, 30, 0).unwrap(),
        ));
        let gateway = CatalogGateway::new(
            catalog.clone(),
            TtlCache::new(Arc::new(MemoryStore::new()), clock.clone(), &CacheConfig::default()),
        );
        let app = create_router(AppState::new(gateway, ledger, clock));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            http: reqwest::Client::new(),
            catalog,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.http.get(self.url(path)).send().await.unwrap();
        read(resp).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self.http.post(self.url(path)).json(&body).send().await.unwrap();
        read(resp).await
    }

    async fn patch(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self.http.patch(self.url(path)).json(&body).send().await.unwrap();
        read(resp).await
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.http.delete(self.url(path)).send().await.unwrap();
        read(resp).await
    }

    async fn create_line(&self, body: Value) -> String {
        let (status, line) = self.post("/api/lines", body).await;
        assert_eq!(status, StatusCode::CREATED, "{line}");
        line["id"].as_str().unwrap().to_string()
    }
}

async fn read(resp: reqwest::Response) -> (StatusCode, Value) {
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
    let text = resp.text().await.unwrap();
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    (status, body)
}

#[tokio::test]
async fn health() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn catalog_lines_are_cached_and_searchable() {
    let server = TestServer::start().await;

    let (status, lines) = server.get("/api/catalog/lines").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lines.as_array().unwrap().len(), 4);

    let (_, hits) = server.get("/api/catalog/lines?q=metro").await;
    assert_eq!(hits, json!([{"name": "Metro 1", "slug": "METRO"}]));
    assert_eq!(server.catalog.line_fetches(), 1);

    let (status, _) = server.delete("/api/catalog/cache").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    server.get("/api/catalog/lines").await;
    assert_eq!(server.catalog.line_fetches(), 2);
}

#[tokio::test]
async fn catalog_stops_by_direction() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/api/catalog/lines/4/stops").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["direction"], 0);
    assert_eq!(body["stops"][0]["stop_id"], 2501);

    let (_, body) = server.get("/api/catalog/lines/4/stops?direction=1").await;
    assert_eq!(body["stops"][0]["stop_id"], 3402);
    assert_eq!(server.catalog.stop_fetches(), 1);

    let (status, body) = server.get("/api/catalog/lines/4/stops?direction=2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid direction 2"));
}

#[tokio::test]
async fn catalog_failure_is_bad_gateway() {
    let server = TestServer::start().await;
    server.catalog.set_failing(true);

    let (status, body) = server.get("/api/catalog/lines").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn line_lifecycle() {
    let server = TestServer::start().await;
    server.get("/api/catalog/lines").await;

    let id = server.create_line(json!({"name": "METRO"})).await;
    let (status, line) = server.get(&format!("/api/lines/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(line["display_name"], "Metro 1");
    assert_eq!(line["mode"], "METRO");
    assert_eq!(line["color"], "#007AFF");
    assert_eq!(line["trip_count"], 0);

    let (status, line) = server
        .patch(&format!("/api/lines/{id}"), json!({"is_favorite": true, "color": "#E2001A"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(line["is_favorite"], true);
    assert_eq!(line["color"], "#E2001A");

    server.create_line(json!({"name": "15"})).await;
    let (_, lines) = server.get("/api/lines").await;
    let names: Vec<&str> = lines
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["15", "METRO"]);
}

#[tokio::test]
async fn bad_ids_and_unknown_ids() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/api/lines/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not-a-uuid"));

    let missing = LineId::new();
    let (status, _) = server.get(&format!("/api/lines/{missing}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server.delete(&format!("/api/trips/{}", TripId::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.post("/api/lines", json!({"name": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn record_and_list_trips() {
    let server = TestServer::start().await;
    let id = server.create_line(json!({"name": "4"})).await;
    let trips_path = format!("/api/lines/{id}/trips");

    let (status, trip) = server
        .post(&trips_path, json!({"start_stop": 2501, "end_stop": 470}))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{trip}");
    assert_eq!(trip["start_stop_name"], "Falchera Capolinea");
    assert_eq!(trip["end_stop_name"], "Porta Nuova");
    assert_eq!(trip["date"], "2024-11-05T07:30:00Z");
    let km = trip["distance_km"].as_f64().unwrap();
    assert!(km > 7.0 && km < 7.5);
    assert!((trip["co2_saved_kg"].as_f64().unwrap() - km * 0.132).abs() < 1e-9);

    let (status, _) = server
        .post(
            &trips_path,
            json!({"start_stop": 470, "end_stop": 470, "date": "2024-11-06T18:00:00Z"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, trips) = server.get(&trips_path).await;
    let dates: Vec<&str> = trips
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-11-06T18:00:00Z", "2024-11-05T07:30:00Z"]);

    let (_, line) = server.get(&format!("/api/lines/{id}")).await;
    assert_eq!(line["trip_count"], 2);
    assert_eq!(line["last_used"], "2024-11-06T18:00:00Z");

    let (_, recent) = server.get("/api/trips/recent?limit=1").await;
    assert_eq!(recent.as_array().unwrap().len(), 1);
    assert_eq!(recent[0]["start_stop_name"], "Porta Nuova");
}

#[tokio::test]
async fn record_trip_errors() {
    let server = TestServer::start().await;
    let id = server.create_line(json!({"name": "4"})).await;
    let trips_path = format!("/api/lines/{id}/trips");

    // No stops given and no defaults saved.
    let (status, body) = server.post(&trips_path, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no start stop"));

    let (status, _) = server
        .post(&trips_path, json!({"start_stop": 2501, "end_stop": 9999}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post(
            &format!("/api/lines/{}/trips", LineId::new()),
            json!({"start_stop": 2501, "end_stop": 470}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.catalog.set_failing(true);
    let (status, _) = server
        .post(&trips_path, json!({"start_stop": 2501, "end_stop": 470}))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn default_stops_and_direction() {
    let server = TestServer::start().await;
    let id = server
        .create_line(json!({
            "name": "4",
            "direction": 1,
            "default_start_stop": 3402,
            "default_end_stop": 2502
        }))
        .await;

    let (status, trip) = server.post(&format!("/api/lines/{id}/trips"), json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{trip}");
    assert_eq!(trip["start_stop_name"], "Strada del Drosso");
    assert_eq!(trip["end_stop_name"], "Falchera Capolinea");
}

#[tokio::test]
async fn patch_null_clears_defaults() {
    let server = TestServer::start().await;
    let id = server
        .create_line(json!({
            "name": "4",
            "direction": 1,
            "default_start_stop": 3402,
            "default_end_stop": 2502
        }))
        .await;

    let (status, line) = server
        .patch(
            &format!("/api/lines/{id}"),
            json!({"default_start_stop": null, "direction": null}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{line}");
    assert!(line["default_start_stop"].is_null());
    assert_eq!(line["default_end_stop"], 2502);
    assert_eq!(line["direction"], 0);

    let (status, body) = server.post(&format!("/api/lines/{id}/trips"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn trips_listed_when_catalog_is_down() {
    let server = TestServer::start().await;
    let id = server.create_line(json!({"name": "4"})).await;
    server
        .post(
            &format!("/api/lines/{id}/trips"),
            json!({"start_stop": 2501, "end_stop": 470}),
        )
        .await;

    server.delete("/api/catalog/cache").await;
    server.catalog.set_failing(true);

    let (status, trips) = server.get(&format!("/api/lines/{id}/trips")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trips[0]["start_stop_name"], "Stop 2501");
    assert_eq!(trips[0]["end_stop_name"], "Stop 470");
}

#[tokio::test]
async fn delete_line_removes_its_trips() {
    let server = TestServer::start().await;
    let id = server.create_line(json!({"name": "4"})).await;
    let other = server.create_line(json!({"name": "4"})).await;
    let mut trip_ids = Vec::new();
    for _ in 0..3 {
        let (_, trip) = server
            .post(
                &format!("/api/lines/{id}/trips"),
                json!({"start_stop": 2501, "end_stop": 470}),
            )
            .await;
        trip_ids.push(trip["id"].as_str().unwrap().to_string());
    }
    server
        .post(
            &format!("/api/lines/{other}/trips"),
            json!({"start_stop": 2501, "end_stop": 2519}),
        )
        .await;

    let (status, body) = server.delete(&format!("/api/lines/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trips_removed"], 3);

    for trip_id in trip_ids {
        let (status, _) = server.delete(&format!("/api/trips/{trip_id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (status, _) = server.get(&format!("/api/lines/{id}/trips")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, recent) = server.get("/api/trips/recent").await;
    assert_eq!(recent.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn delete_single_trip() {
    let server = TestServer::start().await;
    let id = server.create_line(json!({"name": "4"})).await;
    let trips_path = format!("/api/lines/{id}/trips");
    let (_, first) = server
        .post(&trips_path, json!({"start_stop": 2501, "end_stop": 470}))
        .await;
    server
        .post(&trips_path, json!({"start_stop": 2519, "end_stop": 470}))
        .await;

    let (status, _) = server
        .delete(&format!("/api/trips/{}", first["id"].as_str().unwrap()))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, trips) = server.get(&trips_path).await;
    assert_eq!(trips.as_array().unwrap().len(), 1);
    assert_eq!(trips[0]["start_stop"], 2519);
}

#[tokio::test]
async fn stats_endpoint() {
    let server = TestServer::start().await;
    let id = server.create_line(json!({"name": "4"})).await;
    server
        .post(
            &format!("/api/lines/{id}/trips"),
            json!({"start_stop": 2501, "end_stop": 470}),
        )
        .await;

    let (status, stats) = server.get("/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_trips"], 1);
    assert_eq!(stats["week"].as_array().unwrap().len(), 7);
    assert_eq!(stats["week"][6]["date"], "2024-11-05");
    assert_eq!(stats["week"][6]["trips"], 1);
    assert_eq!(stats["most_used"][0]["trip_count"], 1);
    assert_eq!(stats["recent"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn persistence_failure_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let server = TestServer::start_with(LedgerStore::open(&path).unwrap()).await;
    let id = server.create_line(json!({"name": "4"})).await;

    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("occupied"), b"x").unwrap();

    let (status, _) = server.delete(&format!("/api/lines/{id}")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (status, _) = server.get(&format!("/api/lines/{id}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[test]
fn error_status_mapping() {
    let status = |e: AppError| e.into_response().status();

    assert_eq!(
        status(LedgerError::LineNotFound(LineId::new()).into()),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status(CatalogError::BadRequest("bad url".into()).into()),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status(
            CatalogError::ServerError {
                status: Some(500),
                message: "boom".into()
            }
            .into()
        ),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        status(
            RecordError::MissingStop {
                which: "end",
                line: LineId::new()
            }
            .into()
        ),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status(RecordError::Ledger(LedgerError::TripNotFound(TripId::new())).into()),
        StatusCode::NOT_FOUND
    );
    assert_eq!(status(InvalidDirection(7).into()), StatusCode::BAD_REQUEST);
}
