//! Registry operations: list versions, resolve a build, register a build.
//!
//! Registration is the only operation with more than one step. The server's
//! signing key is fetched first, then the publisher's metadata is decoded,
//! its signing-key section is replaced with the fetched key, and the result
//! is written in a single store call. A failure at any step leaves the store
//! untouched.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{RegistryConfig, SigningConfig};
use crate::error::{RegistryError, Result};
use crate::key::{validate_version, ArtifactKey, ProviderScope};
use crate::record::ArtifactRecord;
use crate::signing::KeyProvider;
use crate::store::{ArtifactStore, FsArtifactStore};
use crate::version::sort_versions;

/// A target platform a version is available for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

/// One entry of a version listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    pub platforms: Vec<Platform>,
}

/// Orchestrates the store and the key provider.
pub struct RegistryService {
    store: Arc<dyn ArtifactStore>,
    identity: Option<String>,
    keys: KeyProvider,
}

impl RegistryService {
    /// Create a service over `store` using the given signing configuration.
    pub fn new(store: Arc<dyn ArtifactStore>, signing: &SigningConfig) -> Self {
        RegistryService {
            store,
            identity: signing.identity.clone(),
            keys: KeyProvider::from_config(signing),
        }
    }

    /// Create a service backed by a filesystem store at the configured root.
    pub fn from_config(config: &RegistryConfig) -> Self {
        let store = Arc::new(FsArtifactStore::new(config.storage_root.clone()));
        Self::new(store, &config.signing)
    }

    /// List every distinct version of a provider.
    ///
    /// Each version appears once, with every platform it was built for.
    pub fn list_versions(&self, namespace: &str, name: &str) -> Result<Vec<VersionEntry>> {
        let scope = ProviderScope::new(namespace, name)?;
        let builds = self.store.list(&scope)?;

        let mut by_version: HashMap<String, Vec<Platform>> = HashMap::new();
        for build in builds {
            by_version.entry(build.version).or_default().push(Platform {
                os: build.os,
                arch: build.arch,
            });
        }

        let mut versions: Vec<String> = by_version.keys().cloned().collect();
        sort_versions(&mut versions);

        let entries = versions
            .into_iter()
            .map(|version| {
                let mut platforms = by_version.remove(&version).unwrap_or_default();
                platforms.sort();
                VersionEntry { version, platforms }
            })
            .collect::<Vec<_>>();

        debug!(%scope, versions = entries.len(), "listed versions");
        Ok(entries)
    }

    /// Fetch the stored record for one platform build, signing keys included.
    pub fn resolve(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
        os: &str,
        arch: &str,
    ) -> Result<ArtifactRecord> {
        let key = ArtifactKey::new(namespace, name, version, os, arch)?;
        let record = self.store.get(&key)?;
        debug!(%key, "resolved record");
        Ok(record)
    }

    /// Register a build from the publisher's JSON metadata.
    ///
    /// The storage key takes `os`/`arch` from the body and the version from
    /// the caller; a version inside the body, if any, is not consulted.
    /// Returns the key the record was written under.
    pub async fn register(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
        body: &[u8],
    ) -> Result<ArtifactKey> {
        let scope = ProviderScope::new(namespace, name)?;
        validate_version(version)?;

        let identity = self
            .identity
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RegistryError::Misconfigured {
                detail: "signing identity is not set".to_string(),
            })?;

        let signing_key = self.keys.public_key(identity).await?;

        let mut record = ArtifactRecord::from_slice(body).map_err(|e| {
            RegistryError::bad_request(format!("invalid provider metadata: {e}"))
        })?;
        let key = ArtifactKey::in_scope(scope, version, &record.os, &record.arch)?;

        record.set_signing_key(signing_key);
        self.store.put(&key, &record)?;

        info!(%key, identity, "registered provider build");
        Ok(key)
    }
}
