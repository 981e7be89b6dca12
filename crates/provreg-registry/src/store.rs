//! Artifact store trait and filesystem implementation.
//!
//! The `ArtifactStore` trait abstracts over where records live. The
//! `FsArtifactStore` keeps one JSON document per build in a directory tree,
//! and the tree itself is the only index: listing is a full scan of the
//! provider's scope.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::key::{validate_segment, validate_version, ArtifactKey, ProviderScope, RECORD_EXTENSION};
use crate::record::ArtifactRecord;

/// One stored build found while scanning a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoredBuild {
    pub version: String,
    pub os: String,
    pub arch: String,
}

/// Abstract artifact store.
///
/// Implementations give no isolation between concurrent writers to the same
/// key; the last write wins.
pub trait ArtifactStore: Send + Sync {
    /// Enumerate every build stored under `scope`, in storage order.
    ///
    /// Fails with `NotFound` when the scope holds no records.
    fn list(&self, scope: &ProviderScope) -> Result<Vec<StoredBuild>>;

    /// Fetch the record stored at exactly `key`.
    fn get(&self, key: &ArtifactKey) -> Result<ArtifactRecord>;

    /// Write or overwrite the record at `key`.
    fn put(&self, key: &ArtifactKey, record: &ArtifactRecord) -> Result<()>;
}

/// A filesystem artifact store.
///
/// Layout:
/// ```text
/// <root>/
///   <namespace>/
///     <name>/
///       <os>/
///         <arch>/
///           <version>.json
/// ```
pub struct FsArtifactStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl FsArtifactStore {
    /// Create a store rooted at the given directory.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsArtifactStore {
            root: root.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn temp_path(&self, final_path: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let file_name = final_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        final_path.with_file_name(format!(".{file_name}.{}.{n}.tmp", std::process::id()))
    }
}

/// Read the subdirectory names of `dir` that are usable key components.
fn child_dirs(dir: &Path) -> Result<Vec<String>> {
    let storage_err = |source| RegistryError::Storage {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(storage_err)? {
        let entry = entry.map_err(storage_err)?;
        if !entry.file_type().map_err(storage_err)?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if validate_segment("directory", name).is_ok() {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

/// Version tokens of the record files directly inside `dir`.
fn record_versions(dir: &Path) -> Result<Vec<String>> {
    let storage_err = |source| RegistryError::Storage {
        path: dir.to_path_buf(),
        source,
    };
    let mut versions = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(storage_err)? {
        let entry = entry.map_err(storage_err)?;
        if !entry.file_type().map_err(storage_err)?.is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
            continue;
        }
        // Skips in-flight temp files, which are dotfiles.
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if validate_version(stem).is_ok() {
                versions.push(stem.to_string());
            }
        }
    }
    Ok(versions)
}

impl ArtifactStore for FsArtifactStore {
    fn list(&self, scope: &ProviderScope) -> Result<Vec<StoredBuild>> {
        let scope_dir = scope.dir(&self.root);
        match std::fs::metadata(&scope_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(RegistryError::not_found(format!("provider {scope}"))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RegistryError::not_found(format!("provider {scope}")));
            }
            Err(source) => {
                return Err(RegistryError::Storage {
                    path: scope_dir,
                    source,
                })
            }
        }

        let mut builds = Vec::new();
        for os in child_dirs(&scope_dir)? {
            let os_dir = scope_dir.join(&os);
            for arch in child_dirs(&os_dir)? {
                for version in record_versions(&os_dir.join(&arch))? {
                    builds.push(StoredBuild {
                        version,
                        os: os.clone(),
                        arch: arch.clone(),
                    });
                }
            }
        }

        if builds.is_empty() {
            return Err(RegistryError::not_found(format!("provider {scope}")));
        }
        debug!(%scope, count = builds.len(), "scanned provider scope");
        Ok(builds)
    }

    fn get(&self, key: &ArtifactKey) -> Result<ArtifactRecord> {
        let path = key.record_path(&self.root);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RegistryError::not_found(format!("provider {key}")));
            }
            Err(source) => return Err(RegistryError::Storage { path, source }),
        };
        ArtifactRecord::from_slice(&bytes).map_err(|source| RegistryError::Corrupt { path, source })
    }

    fn put(&self, key: &ArtifactKey, record: &ArtifactRecord) -> Result<()> {
        let path = key.record_path(&self.root);
        let json = serde_json::to_vec_pretty(record)?;

        let write_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| RegistryError::StoreWrite { path, source }
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err(parent))?;
        }

        // Write then rename so readers never see a partial record.
        let temp_path = self.temp_path(&path);
        if let Err(e) = std::fs::write(&temp_path, &json) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(write_err(&path)(e));
        }
        if let Err(e) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(write_err(&path)(e));
        }

        debug!(%key, path = %path.display(), "stored record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{PublicKeyInfo, SigningKeySet};

    fn make_record(os: &str, arch: &str, filename: &str) -> ArtifactRecord {
        ArtifactRecord {
            protocols: Some(Some(vec!["5.0".to_string()])),
            os: os.to_string(),
            arch: arch.to_string(),
            filename: filename.to_string(),
            download_url: format!("https://x/{filename}"),
            shasum: "abc123".to_string(),
            shasums_url: None,
            shasums_signature_url: None,
            signing_keys: SigningKeySet::single(PublicKeyInfo::new("KEY1", "armor")),
            extra: serde_json::Map::new(),
        }
    }

    fn key(version: &str, os: &str, arch: &str) -> ArtifactKey {
        ArtifactKey::new("acme", "widget", version, os, arch).unwrap()
    }

    fn scope() -> ProviderScope {
        ProviderScope::new("acme", "widget").unwrap()
    }

    #[test]
    fn put_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        let record = make_record("linux", "amd64", "widget.zip");
        store.put(&key("1.0.0", "linux", "amd64"), &record).unwrap();

        let fetched = store.get(&key("1.0.0", "linux", "amd64")).unwrap();
        assert_eq!(fetched, record);
        assert!(dir
            .path()
            .join("acme/widget/linux/amd64/1.0.0.json")
            .is_file());
    }

    #[test]
    fn put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let k = key("1.0.0", "linux", "amd64");

        store.put(&k, &make_record("linux", "amd64", "first.zip")).unwrap();
        store.put(&k, &make_record("linux", "amd64", "second.zip")).unwrap();

        assert_eq!(store.get(&k).unwrap().filename, "second.zip");
        assert_eq!(store.list(&scope()).unwrap().len(), 1);
    }

    #[test]
    fn get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        let err = store.get(&key("9.9.9", "linux", "amd64")).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[test]
    fn get_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let k = key("1.0.0", "linux", "amd64");

        let path = k.record_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();

        let err = store.get(&k).unwrap_err();
        assert!(matches!(err, RegistryError::Corrupt { .. }));
    }

    #[test]
    fn unreadable_record_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let k = key("1.0.0", "linux", "amd64");

        // A directory where the record file should be: present but not readable.
        std::fs::create_dir_all(k.record_path(dir.path())).unwrap();

        let err = store.get(&k).unwrap_err();
        assert!(matches!(err, RegistryError::Storage { .. }), "got {err:?}");
    }

    #[test]
    fn list_across_platforms() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        store
            .put(&key("1.0.0", "linux", "amd64"), &make_record("linux", "amd64", "a.zip"))
            .unwrap();
        store
            .put(&key("1.0.0", "darwin", "arm64"), &make_record("darwin", "arm64", "b.zip"))
            .unwrap();
        store
            .put(&key("1.1.0", "linux", "amd64"), &make_record("linux", "amd64", "c.zip"))
            .unwrap();

        let mut builds = store.list(&scope()).unwrap();
        builds.sort();
        assert_eq!(
            builds,
            vec![
                StoredBuild {
                    version: "1.0.0".into(),
                    os: "darwin".into(),
                    arch: "arm64".into()
                },
                StoredBuild {
                    version: "1.0.0".into(),
                    os: "linux".into(),
                    arch: "amd64".into()
                },
                StoredBuild {
                    version: "1.1.0".into(),
                    os: "linux".into(),
                    arch: "amd64".into()
                },
            ]
        );
    }

    #[test]
    fn list_missing_scope_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        let err = store.list(&scope()).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[test]
    fn list_empty_scope_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("acme/widget/linux/amd64")).unwrap();
        let store = FsArtifactStore::new(dir.path());

        let err = store.list(&scope()).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[test]
    fn list_ignores_stray_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        store
            .put(&key("1.0.0", "linux", "amd64"), &make_record("linux", "amd64", "a.zip"))
            .unwrap();

        let arch_dir = dir.path().join("acme/widget/linux/amd64");
        std::fs::write(arch_dir.join(".1.1.0.json.123.0.tmp"), b"partial").unwrap();
        std::fs::write(arch_dir.join("README.txt"), b"notes").unwrap();
        std::fs::write(dir.path().join("acme/widget/stray.json"), b"{}").unwrap();

        let builds = store.list(&scope()).unwrap();
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].version, "1.0.0");
    }
}
