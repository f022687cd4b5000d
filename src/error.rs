//! Error types for the resolution pipeline.
//!
//! Each boundary has its own enum: the catalog client surfaces a single
//! [`CatalogError`] for every way a live lookup can fail, the storage layer
//! reports [`StorageError`] (always absorbed by the cache store), and the
//! resolution service only ever rejects malformed input with [`ResolveError`].

use thiserror::Error;

/// Failures of the remote catalog proxy.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Request rejected before any I/O (blank query, zero limit, ...)
    #[error("Invalid catalog request: {0}")]
    InvalidRequest(String),

    /// Transport failure, including timeouts
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Catalog returned HTTP {status} for {endpoint}")]
    Status { status: u16, endpoint: String },

    /// Error payload returned with a success status
    #[error("Catalog API error ({kind}): {message}")]
    Api { kind: String, message: String },

    /// Body could not be decoded
    #[error("Invalid catalog response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Every upstream record was filtered out
    #[error("No playable results for '{0}'")]
    NoPlayableResults(String),
}

impl CatalogError {
    /// Maps an HTTP status to the matching variant.
    pub fn from_status(status: reqwest::StatusCode, endpoint: impl Into<String>) -> Self {
        Self::Status {
            status: status.as_u16(),
            endpoint: endpoint.into(),
        }
    }

    /// True for failures worth retrying later (timeouts, 429, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Http(e) => e.is_timeout() || e.is_connect(),
            CatalogError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Failures of a persistence backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage quota exceeded: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Rejections of the resolution service, raised before any I/O.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid genre list: {0}")]
    InvalidGenres(String),

    #[error("Invalid search query: {0}")]
    InvalidQuery(String),
}
