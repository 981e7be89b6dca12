//! HTTP request handlers for the provider registry protocol.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, DefaultBodyLimit, Path, State},
    routing::{get, post},
    Json, Router,
};
use provreg_registry::key::RESERVED_VERSION;
use provreg_registry::{ArtifactRecord, RegistryService, VersionEntry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::ApiError;
use crate::{DISCOVERY_PATH, PROVIDERS_V1_PATH};

/// Body of a version listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionsResponse {
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct ProviderPath {
    namespace: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct VersionPath {
    namespace: String,
    name: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct DownloadPath {
    namespace: String,
    name: String,
    version: String,
    os: String,
    arch: String,
}

/// Create the Axum router for the registry API.
///
/// Registration bodies larger than `max_body_bytes` are rejected with 413.
pub fn router(service: Arc<RegistryService>, max_body_bytes: usize) -> Router {
    Router::new()
        .route(DISCOVERY_PATH, get(discovery))
        .route("/health", get(health))
        .route(
            "/v1/providers/:namespace/:name/versions",
            get(list_versions).post(register_reserved),
        )
        .route(
            "/v1/providers/:namespace/:name/:version/download/:os/:arch",
            get(download),
        )
        .route("/v1/providers/:namespace/:name/:version", post(register))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(service)
}

async fn discovery() -> Json<Value> {
    Json(serde_json::json!({ "providers.v1": PROVIDERS_V1_PATH }))
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_versions(
    State(service): State<Arc<RegistryService>>,
    path: Result<Path<ProviderPath>, PathRejection>,
) -> Result<Json<VersionsResponse>, ApiError> {
    let Path(path) = path?;
    let versions =
        tokio::task::spawn_blocking(move || service.list_versions(&path.namespace, &path.name))
            .await??;
    Ok(Json(VersionsResponse { versions }))
}

async fn download(
    State(service): State<Arc<RegistryService>>,
    path: Result<Path<DownloadPath>, PathRejection>,
) -> Result<Json<ArtifactRecord>, ApiError> {
    let Path(path) = path?;
    let record = tokio::task::spawn_blocking(move || {
        service.resolve(
            &path.namespace,
            &path.name,
            &path.version,
            &path.os,
            &path.arch,
        )
    })
    .await??;
    Ok(Json(record))
}

async fn register(
    State(service): State<Arc<RegistryService>>,
    path: Result<Path<VersionPath>, PathRejection>,
    body: Bytes,
) -> Result<Json<&'static str>, ApiError> {
    let Path(path) = path?;
    let key = service
        .register(&path.namespace, &path.name, &path.version, &body)
        .await?;
    info!(%key, bytes = body.len(), "registration accepted");
    Ok(Json("ok"))
}

/// `POST .../versions`: the listing route shadows a version literally named
/// `versions`, which the registry rejects as reserved.
async fn register_reserved(
    State(service): State<Arc<RegistryService>>,
    path: Result<Path<ProviderPath>, PathRejection>,
    body: Bytes,
) -> Result<Json<&'static str>, ApiError> {
    let Path(path) = path?;
    service
        .register(&path.namespace, &path.name, RESERVED_VERSION, &body)
        .await?;
    Ok(Json("ok"))
}
