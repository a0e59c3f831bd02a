//! Transit catalog client.
//!
//! The catalog is the remote source of lines and their stops. It exposes
//! exactly two reads:
//! - `GET {base}/linee`: every line as `{name, slug}`
//! - `GET {base}/fermateLinea/{slug}`: a line's stops, split into the two
//!   travel directions `percorso0` and `percorso1`
//!
//! Nothing here caches; see [`crate::gateway`] for that.

mod client;
mod error;
mod mock;
mod types;

pub use client::{CatalogClient, CatalogConfig, CatalogSource, DEFAULT_BASE_URL};
pub use error::CatalogError;
pub use mock::MockCatalog;
pub use types::{
    CatalogLine, Direction, InvalidDirection, RouteStops, Stop, StopId, find_stop, stop_label,
};
