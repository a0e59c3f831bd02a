//! Cache-first access to the catalog.
//!
//! Every lookup consults the [`TtlCache`] first and only reaches the catalog
//! on a miss or an expired entry. Successful fetches refresh the cache;
//! failed fetches propagate and never fall back to stale data.
//!
//! Stops are cached per line with both directions together, so reading one
//! direction after the other costs a single fetch.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{CacheError, LINES_KEY, TtlCache, stops_key};
use crate::catalog::{CatalogError, CatalogLine, CatalogSource, Direction, RouteStops, Stop};

/// Catalog access with caching.
///
/// Wraps a [`CatalogSource`] and remembers the last line list it saw, which
/// backs [`CatalogGateway::display_name_for`].
pub struct CatalogGateway {
    source: Arc<dyn CatalogSource>,
    cache: TtlCache,
    known_lines: RwLock<Option<Arc<Vec<CatalogLine>>>>,
}

impl CatalogGateway {
    /// Create a gateway over `source`, caching in `cache`.
    pub fn new(source: Arc<dyn CatalogSource>, cache: TtlCache) -> Self {
        Self {
            source,
            cache,
            known_lines: RwLock::new(None),
        }
    }

    /// Every line in the catalog.
    pub async fn fetch_lines(&self) -> Result<Vec<CatalogLine>, CatalogError> {
        if let Some(lines) = self.cache.get::<Vec<CatalogLine>>(LINES_KEY) {
            debug!(count = lines.len(), "catalog lines served from cache");
            self.remember_lines(&lines).await;
            return Ok(lines);
        }

        debug!("catalog lines not cached, fetching");
        let lines = self.source.fetch_lines().await?;

        if let Err(e) = self.cache.put(LINES_KEY, &lines) {
            warn!(error = %e, "failed to cache catalog lines");
        }
        self.remember_lines(&lines).await;

        Ok(lines)
    }

    /// Both directions of a line's stops.
    pub async fn fetch_route_stops(&self, line_slug: &str) -> Result<RouteStops, CatalogError> {
        let key = stops_key(line_slug);

        if let Some(route) = self.cache.get::<RouteStops>(&key) {
            debug!(line = line_slug, "stops served from cache");
            return Ok(route);
        }

        debug!(line = line_slug, "stops not cached, fetching");
        let route = self.source.fetch_route_stops(line_slug).await?;

        if let Err(e) = self.cache.put(&key, &route) {
            warn!(line = line_slug, error = %e, "failed to cache stops");
        }

        Ok(route)
    }

    /// The stops of one direction of a line.
    ///
    /// A miss fetches and caches both directions.
    pub async fn fetch_stops_for_direction(
        &self,
        line_slug: &str,
        direction: Direction,
    ) -> Result<Vec<Stop>, CatalogError> {
        let route = self.fetch_route_stops(line_slug).await?;
        Ok(route.into_direction(direction))
    }

    /// Lines whose name or slug contains `query`, ignoring case.
    pub async fn search_lines(&self, query: &str) -> Result<Vec<CatalogLine>, CatalogError> {
        let lines = self.fetch_lines().await?;
        Ok(lines.into_iter().filter(|l| l.matches(query)).collect())
    }

    /// Human-readable name for a line slug.
    ///
    /// Uses the line list from the last successful [`fetch_lines`]; until
    /// one has happened in this process, or when the slug is unknown, the
    /// slug itself is returned.
    ///
    /// [`fetch_lines`]: CatalogGateway::fetch_lines
    pub async fn display_name_for(&self, slug: &str) -> String {
        let guard = self.known_lines.read().await;
        guard
            .as_ref()
            .and_then(|lines| lines.iter().find(|l| l.slug == slug))
            .map(|l| l.name.clone())
            .unwrap_or_else(|| slug.to_string())
    }

    /// Drop every cached catalog entry.
    ///
    /// The in-memory line list used for display names is kept.
    pub fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear()
    }

    async fn remember_lines(&self, lines: &[CatalogLine]) {
        let mut guard = self.known_lines.write().await;
        *guard = Some(Arc::new(lines.to_vec()));
    }
}
