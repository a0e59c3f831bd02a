use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use ledger_server::cache::TtlCache;
use ledger_server::catalog::{CatalogClient, CatalogSource, MockCatalog};
use ledger_server::clock::SystemClock;
use ledger_server::config::AppConfig;
use ledger_server::gateway::CatalogGateway;
use ledger_server::ledger::LedgerStore;
use ledger_server::store::FileStore;
use ledger_server::web::{AppState, create_router};

const DEFAULT_LOG_FILTER: &str = "ledger_server=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = AppConfig::from_env()?;

    let source: Arc<dyn CatalogSource> = match config.mock_catalog_dir() {
        Some(dir) => {
            info!(dir = %dir.display(), "serving catalog from mock data");
            Arc::new(MockCatalog::from_dir(dir)?)
        }
        None => {
            info!(url = %config.catalog.base_url, "using remote catalog");
            Arc::new(CatalogClient::new(config.catalog.clone())?)
        }
    };

    let clock = Arc::new(SystemClock);
    let cache = TtlCache::new(
        Arc::new(FileStore::new(config.cache_dir())),
        clock.clone(),
        &config.cache,
    );
    let gateway = CatalogGateway::new(source, cache);
    let ledger = LedgerStore::open(config.ledger_path())?;

    let app = create_router(AppState::new(gateway, ledger, clock));

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, "trip ledger listening");
    info!("  GET    /api/catalog/lines?q=");
    info!("  GET    /api/catalog/lines/:slug/stops?direction=0|1");
    info!("  GET    /api/lines, POST /api/lines");
    info!("  POST   /api/lines/:id/trips");
    info!("  GET    /api/stats");

    axum::serve(listener, app).await?;
    Ok(())
}
