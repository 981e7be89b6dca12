//! `provreg serve`: run the registry HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};
use provreg_registry::{RegistryConfig, RegistryService};
use provreg_server::ServerConfig;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Run the server until Ctrl+C or SIGTERM.
pub fn run(registry: RegistryConfig, server: ServerConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    runtime.block_on(serve(registry, server))
}

async fn serve(registry: RegistryConfig, server: ServerConfig) -> Result<()> {
    match (&registry.signing.identity, &registry.signing.key_file) {
        (None, _) => warn!("no signing identity configured; registrations will be rejected"),
        (Some(identity), Some(path)) => {
            info!(identity, key_file = %path.display(), "signing key read from file")
        }
        (Some(identity), None) => info!(
            identity,
            program = %registry.signing.export_command.program,
            "signing key exported on demand"
        ),
    }

    let service = Arc::new(RegistryService::from_config(&registry));
    let app = provreg_server::router(service, server.max_body_bytes);

    let listener = TcpListener::bind(server.listen)
        .await
        .with_context(|| format!("binding {}", server.listen))?;
    info!(root = %registry.storage_root.display(), "serving artifact store");

    provreg_server::serve(listener, app, shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl+C received, shutting down"),
        () = terminate => info!("SIGTERM received, shutting down"),
    }
}
