//! Application state for the web layer.

use std::sync::Arc;

use crate::clock::Clock;
use crate::gateway::CatalogGateway;
use crate::ledger::LedgerStore;
use crate::recorder::TripRecorder;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Cached catalog access
    pub gateway: Arc<CatalogGateway>,

    /// The trip ledger
    pub ledger: Arc<LedgerStore>,

    /// Records trips into `ledger` through `gateway`
    pub recorder: Arc<TripRecorder>,

    /// Source of "now" for trips recorded without a date and for statistics
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(gateway: CatalogGateway, ledger: LedgerStore, clock: Arc<dyn Clock>) -> Self {
        let gateway = Arc::new(gateway);
        let ledger = Arc::new(ledger);
        let recorder = Arc::new(TripRecorder::new(gateway.clone(), ledger.clone()));
        Self {
            gateway,
            ledger,
            recorder,
            clock,
        }
    }
}
