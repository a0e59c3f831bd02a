//! Server configuration from the environment.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::catalog::CatalogConfig;

pub const ENV_CATALOG_URL: &str = "LEDGER_CATALOG_URL";
pub const ENV_DATA_DIR: &str = "LEDGER_DATA_DIR";
pub const ENV_BIND: &str = "LEDGER_BIND";
pub const ENV_CACHE_TTL_HOURS: &str = "LEDGER_CACHE_TTL_HOURS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "LEDGER_HTTP_TIMEOUT_SECS";
/// Serve the catalog from JSON files in this directory instead of the network.
pub const ENV_MOCK_CATALOG_DIR: &str = "LEDGER_MOCK_CATALOG_DIR";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// A variable was set to something unusable.
#[derive(Debug, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub cache: CacheConfig,
    /// Holds the cache directory and the ledger file
    pub data_dir: PathBuf,
    pub bind: SocketAddr,
    pub mock_catalog_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Defaults: production catalog, `./data`, localhost:3000, 24h cache.
    pub fn new() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            cache: CacheConfig::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            mock_catalog_dir: None,
        }
    }

    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from `lookup`, falling back to defaults for unset or
    /// empty variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::new();

        if let Some(url) = get(ENV_CATALOG_URL) {
            config.catalog = config.catalog.with_base_url(url);
        }
        if let Some(secs) = get(ENV_HTTP_TIMEOUT_SECS) {
            config.catalog = config
                .catalog
                .with_timeout(parse_positive(ENV_HTTP_TIMEOUT_SECS, &secs)?);
        }
        if let Some(hours) = get(ENV_CACHE_TTL_HOURS) {
            let hours = parse_positive(ENV_CACHE_TTL_HOURS, &hours)?;
            config = config.with_cache_ttl(Duration::from_secs(hours.saturating_mul(3600)));
        }
        if let Some(dir) = get(ENV_DATA_DIR) {
            config = config.with_data_dir(dir);
        }
        let bind = get(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        config.bind = bind.trim().parse().map_err(|e: std::net::AddrParseError| ConfigError {
            var: ENV_BIND,
            value: bind.clone(),
            reason: e.to_string(),
        })?;
        config.mock_catalog_dir = get(ENV_MOCK_CATALOG_DIR).map(PathBuf::from);

        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_bind(mut self, addr: SocketAddr) -> Self {
        self.bind = addr;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl = ttl;
        self
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger.json")
    }

    pub fn mock_catalog_dir(&self) -> Option<&Path> {
        self.mock_catalog_dir.as_deref()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: &str| ConfigError {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    };
    match value.trim().parse::<u64>() {
        Ok(0) => Err(invalid("must be greater than zero")),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(&e.to_string())),
    }
}
