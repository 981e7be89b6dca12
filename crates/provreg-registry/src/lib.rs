//! Artifact registry core for the provreg provider registry.
//!
//! Maps `(namespace, name, version, os, arch)` to stored provider metadata,
//! derives version listings by scanning what is stored, and enriches newly
//! registered builds with the publisher's public signing key.
//!
//! # Architecture
//!
//! - **ArtifactStore**: hierarchical record storage (`store`)
//! - **KeyProvider**: signing-key lookup via command or file (`signing`)
//! - **RegistryService**: list, resolve and register (`service`)
//!
//! The server does not verify checksums or signatures; it stores and
//! redistributes them.

pub mod config;
pub mod error;
pub mod key;
pub mod record;
pub mod service;
pub mod signing;
pub mod store;
pub mod version;

// Re-exports for convenience.
pub use config::{ExportCommand, RegistryConfig, SigningConfig};
pub use error::{RegistryError, Result};
pub use key::{ArtifactKey, ProviderScope};
pub use record::{ArtifactRecord, PublicKeyInfo, SigningKeySet};
pub use service::{Platform, RegistryService, VersionEntry};
pub use signing::KeyProvider;
pub use store::{ArtifactStore, FsArtifactStore, StoredBuild};
