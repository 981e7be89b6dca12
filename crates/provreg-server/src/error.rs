//! Mapping of registry failures onto HTTP responses.

use axum::{
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use provreg_registry::RegistryError;
use tracing::{error, warn};

/// Error returned by every API handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Path parameters could not be extracted (e.g. invalid UTF-8).
    #[error("bad request: {0}")]
    Path(#[from] PathRejection),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Registry(e) => match e {
                RegistryError::BadRequest { .. } => StatusCode::BAD_REQUEST,
                RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
                RegistryError::Corrupt { .. }
                | RegistryError::Misconfigured { .. }
                | RegistryError::KeyUnavailable { .. }
                | RegistryError::StoreWrite { .. }
                | RegistryError::Storage { .. }
                | RegistryError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Path(_) => StatusCode::BAD_REQUEST,
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller. Storage failures are summarised so
    /// that server paths stay out of responses.
    fn public_message(&self) -> String {
        match self {
            ApiError::Registry(e) => match e {
                RegistryError::Corrupt { .. } => "stored provider metadata is corrupt".to_string(),
                RegistryError::StoreWrite { .. } => {
                    "failed to store provider metadata".to_string()
                }
                RegistryError::Storage { .. } | RegistryError::Json(_) => {
                    "storage backend error".to_string()
                }
                other => other.to_string(),
            },
            ApiError::Path(rejection) => format!("bad request: {}", rejection.body_text()),
            ApiError::Task(_) => "internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }

        let body = serde_json::json!({ "errors": [self.public_message()] });
        (status, Json(body)).into_response()
    }
}
