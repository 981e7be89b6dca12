//! HTTP API for the provreg provider registry.
//!
//! Exposes service discovery plus the three registry operations as an Axum
//! router:
//!
//! | Method | Path |
//! |---|---|
//! | GET | `/.well-known/terraform.json` |
//! | GET | `/v1/providers/{namespace}/{name}/versions` |
//! | GET | `/v1/providers/{namespace}/{name}/{version}/download/{os}/{arch}` |
//! | POST | `/v1/providers/{namespace}/{name}/{version}` |
//!
//! Errors are returned as `{"errors": [message]}`.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{router, VersionsResponse};

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

/// Service discovery document location.
pub const DISCOVERY_PATH: &str = "/.well-known/terraform.json";

/// Base path advertised for the providers protocol.
pub const PROVIDERS_V1_PATH: &str = "/v1/providers/";

/// Default limit on registration bodies (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Serve `app` on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish after shutdown is signalled.
pub async fn serve<F>(listener: TcpListener, app: axum::Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "provider registry listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
