//! Catalog error types.

/// Maximum number of body characters kept in error messages.
const MAX_BODY_CHARS: usize = 500;

/// Errors that can occur when reading from the catalog.
///
/// None of these are retried by the gateway.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The request could not be built (malformed URL or slug)
    #[error("bad catalog request: {0}")]
    BadRequest(String),

    /// The catalog answered with a non-success status, or could not be reached
    #[error("catalog server error{}: {message}", .status.map(|s| format!(" {s}")).unwrap_or_default())]
    ServerError { status: Option<u16>, message: String },

    /// The response body did not have the expected shape
    #[error("catalog decode error: {message}")]
    DecodeError { message: String },
}

impl CatalogError {
    /// Build a decode error, keeping a bounded excerpt of the offending body.
    pub fn decode(err: impl std::fmt::Display, body: &str) -> Self {
        let excerpt: String = body.chars().take(MAX_BODY_CHARS).collect();
        CatalogError::DecodeError {
            message: format!("{err} (body: {excerpt})"),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            CatalogError::BadRequest(err.to_string())
        } else if err.is_decode() {
            CatalogError::DecodeError {
                message: err.to_string(),
            }
        } else {
            CatalogError::ServerError {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}
