//! Registry error types.

use std::path::PathBuf;

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A caller-supplied parameter or body is missing or invalid.
    #[error("bad request: {detail}")]
    BadRequest { detail: String },

    /// No record exists at the requested key or scope.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A stored record could not be decoded.
    #[error("stored record at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Required server-side configuration is absent.
    #[error("server misconfigured: {detail}")]
    Misconfigured { detail: String },

    /// The publisher's public signing key could not be obtained.
    #[error("failed to retrieve public key {identity}: {detail}")]
    KeyUnavailable { identity: String, detail: String },

    /// Persisting a record failed.
    #[error("failed to write record at {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading from the store failed for a reason other than absence.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        RegistryError::BadRequest {
            detail: detail.into(),
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        RegistryError::NotFound { what: what.into() }
    }
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
