//! Mock catalog for running without network access.
//!
//! Serves lines and stops from memory or from a directory of JSON files,
//! and counts every fetch so callers can check what reached "the network".

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::client::CatalogSource;
use super::error::CatalogError;
use super::types::{CatalogLine, RouteStops};

/// Mock catalog that serves canned data.
///
/// Expects directories laid out as `lines.json` plus `stops/{slug}.json`.
#[derive(Debug, Default)]
pub struct MockCatalog {
    lines: Mutex<Vec<CatalogLine>>,
    stops: Mutex<HashMap<String, RouteStops>>,
    failing: AtomicBool,
    line_fetches: AtomicUsize,
    stop_fetches: AtomicUsize,
}

impl MockCatalog {
    /// Create an empty mock catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a mock catalog from a directory.
    pub fn from_dir(data_dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let data_dir = data_dir.as_ref();

        let lines_path = data_dir.join("lines.json");
        let json = std::fs::read_to_string(&lines_path).map_err(|e| {
            CatalogError::BadRequest(format!("failed to read {}: {e}", lines_path.display()))
        })?;
        let lines: Vec<CatalogLine> =
            serde_json::from_str(&json).map_err(|e| CatalogError::decode(e, &json))?;

        let mut stops = HashMap::new();
        let stops_dir = data_dir.join("stops");
        if stops_dir.is_dir() {
            let entries = std::fs::read_dir(&stops_dir).map_err(|e| {
                CatalogError::BadRequest(format!("failed to read {}: {e}", stops_dir.display()))
            })?;
            for entry in entries {
                let path = entry
                    .map_err(|e| CatalogError::BadRequest(format!("bad directory entry: {e}")))?
                    .path();
                if path.extension().and_then(|s| s.to_str()) != Some("json") {
                    continue;
                }
                let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let json = std::fs::read_to_string(&path).map_err(|e| {
                    CatalogError::BadRequest(format!("failed to read {}: {e}", path.display()))
                })?;
                let route: RouteStops =
                    serde_json::from_str(&json).map_err(|e| CatalogError::decode(e, &json))?;
                stops.insert(slug.to_string(), route);
            }
        }

        Ok(Self {
            lines: Mutex::new(lines),
            stops: Mutex::new(stops),
            ..Self::default()
        })
    }

    /// Add a line to the listing.
    pub fn with_line(self, name: &str, slug: &str) -> Self {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(CatalogLine::new(name, slug));
        self
    }

    /// Serve `route` for `slug`.
    pub fn with_stops(self, slug: &str, route: RouteStops) -> Self {
        self.stops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(slug.to_string(), route);
        self
    }

    /// Make every subsequent fetch fail with a server error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of line-list fetches served or failed so far.
    pub fn line_fetches(&self) -> usize {
        self.line_fetches.load(Ordering::SeqCst)
    }

    /// Number of stop fetches served or failed so far.
    pub fn stop_fetches(&self) -> usize {
        self.stop_fetches.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<(), CatalogError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CatalogError::ServerError {
                status: Some(503),
                message: "mock catalog unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for MockCatalog {
    async fn fetch_lines(&self) -> Result<Vec<CatalogLine>, CatalogError> {
        self.line_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn fetch_route_stops(&self, line_slug: &str) -> Result<RouteStops, CatalogError> {
        self.stop_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        self.stops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(line_slug)
            .cloned()
            .ok_or_else(|| CatalogError::ServerError {
                status: Some(404),
                message: format!("no mock stops for line {line_slug}"),
            })
    }
}
