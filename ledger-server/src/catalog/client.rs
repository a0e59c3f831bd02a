//! Catalog HTTP client.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use super::error::CatalogError;
use super::types::{CatalogLine, RouteStops};

/// Default base URL for the catalog service.
pub const DEFAULT_BASE_URL: &str = "https://trins.it/api/gtt";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The two remote reads the gateway wraps.
///
/// This abstraction lets the gateway run against a mock catalog in tests.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch every line in the catalog.
    async fn fetch_lines(&self) -> Result<Vec<CatalogLine>, CatalogError>;

    /// Fetch both directional stop sequences of a line.
    async fn fetch_route_stops(&self, line_slug: &str) -> Result<RouteStops, CatalogError>;
}

/// Configuration for the catalog client.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl CatalogConfig {
    /// Create a config pointing at the production catalog.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for the transit catalog service.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CatalogClient {
    /// Create a new catalog client.
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| CatalogError::BadRequest(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::BadRequest(format!(
                "{} cannot be used as a base URL",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                CatalogError::BadRequest(format!("{} cannot be used as a base URL", self.base_url))
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// GET a JSON document, requiring a 200 response.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CatalogError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ServerError {
                status: Some(status.as_u16()),
                message: body.chars().take(500).collect(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| CatalogError::decode(e, &body))
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_lines(&self) -> Result<Vec<CatalogLine>, CatalogError> {
        let url = self.endpoint(&["linee"])?;
        self.get_json(url).await
    }

    async fn fetch_route_stops(&self, line_slug: &str) -> Result<RouteStops, CatalogError> {
        if line_slug.is_empty() {
            return Err(CatalogError::BadRequest("empty line slug".to_string()));
        }
        let url = self.endpoint(&["fermateLinea", line_slug])?;
        self.get_json(url).await
    }
}
