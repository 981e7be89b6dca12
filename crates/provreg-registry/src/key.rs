//! Structured addressing for stored artifacts.
//!
//! Every record lives at a five-part key `(namespace, name, os, arch,
//! version)`. Each part maps to exactly one directory level (or the file
//! stem, for the version), so no part may contain a path separator or be a
//! relative path component.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{RegistryError, Result};

/// File extension of stored records.
pub const RECORD_EXTENSION: &str = "json";

/// Validate a single key component.
///
/// `field` names the component in the error message.
pub fn validate_segment(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(RegistryError::bad_request(format!("{field} param is required")));
    }
    if value == "." || value == ".." {
        return Err(RegistryError::bad_request(format!(
            "{field} must not be a relative path component"
        )));
    }
    if value.starts_with('.') {
        return Err(RegistryError::bad_request(format!(
            "{field} must not start with '.'"
        )));
    }
    if let Some(c) = value
        .chars()
        .find(|c| matches!(c, '/' | '\\' | '\0') || c.is_control())
    {
        return Err(RegistryError::bad_request(format!(
            "{field} contains invalid character {c:?}"
        )));
    }
    Ok(())
}

/// Version token that names the listing route and so cannot address a build.
pub const RESERVED_VERSION: &str = "versions";

/// Validate a version token: a valid segment other than [`RESERVED_VERSION`].
pub fn validate_version(version: &str) -> Result<()> {
    validate_segment("version", version)?;
    if version == RESERVED_VERSION {
        return Err(RegistryError::bad_request(format!(
            "version {RESERVED_VERSION:?} is reserved"
        )));
    }
    Ok(())
}

/// The `(namespace, name)` prefix under which all builds of a provider live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderScope {
    namespace: String,
    name: String,
}

impl ProviderScope {
    /// Build a scope, validating both components.
    pub fn new(namespace: &str, name: &str) -> Result<Self> {
        validate_segment("namespace", namespace)?;
        validate_segment("name", name)?;
        Ok(ProviderScope {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding every record of this scope.
    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(&self.namespace).join(&self.name)
    }
}

impl fmt::Display for ProviderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Full identity of one platform-specific build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    scope: ProviderScope,
    version: String,
    os: String,
    arch: String,
}

impl ArtifactKey {
    /// Build a key, validating every component.
    pub fn new(namespace: &str, name: &str, version: &str, os: &str, arch: &str) -> Result<Self> {
        let scope = ProviderScope::new(namespace, name)?;
        Self::in_scope(scope, version, os, arch)
    }

    /// Build a key under an already-validated scope.
    pub fn in_scope(scope: ProviderScope, version: &str, os: &str, arch: &str) -> Result<Self> {
        validate_version(version)?;
        validate_segment("os", os)?;
        validate_segment("arch", arch)?;
        Ok(ArtifactKey {
            scope,
            version: version.to_string(),
            os: os.to_string(),
            arch: arch.to_string(),
        })
    }

    pub fn scope(&self) -> &ProviderScope {
        &self.scope
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Location of the record file under `root`.
    ///
    /// Layout: `<root>/<namespace>/<name>/<os>/<arch>/<version>.json`
    pub fn record_path(&self, root: &Path) -> PathBuf {
        self.scope
            .dir(root)
            .join(&self.os)
            .join(&self.arch)
            .join(format!("{}.{RECORD_EXTENSION}", self.version))
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({}/{})",
            self.scope, self.version, self.os, self.arch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_path_uses_directory_per_field() {
        let key = ArtifactKey::new("acme", "widget", "1.0.0", "linux", "amd64").unwrap();
        let path = key.record_path(Path::new("/srv/provider"));
        assert_eq!(
            path,
            PathBuf::from("/srv/provider/acme/widget/linux/amd64/1.0.0.json")
        );
    }

    #[test]
    fn underscores_are_allowed() {
        // Underscores used to collide with the old flat naming scheme.
        let key = ArtifactKey::new("acme", "widget", "1.0.0", "linux_gnu", "x86_64").unwrap();
        assert_eq!(key.os(), "linux_gnu");
        assert_eq!(key.arch(), "x86_64");
    }

    #[test]
    fn empty_component_is_bad_request() {
        let err = ArtifactKey::new("acme", "", "1.0.0", "linux", "amd64").unwrap_err();
        assert!(matches!(err, RegistryError::BadRequest { .. }));
        assert!(err.to_string().contains("name param is required"));
    }

    #[test]
    fn traversal_is_rejected() {
        for bad in ["..", ".", "a/b", "a\\b", ".hidden", "nul\0"] {
            let err = ProviderScope::new(bad, "widget").unwrap_err();
            assert!(
                matches!(err, RegistryError::BadRequest { .. }),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn listing_route_name_is_not_a_version() {
        let err = ArtifactKey::new("acme", "widget", "versions", "linux", "amd64").unwrap_err();
        assert!(matches!(err, RegistryError::BadRequest { .. }));
        assert!(err.to_string().contains("reserved"));

        assert!(validate_version("versions-1").is_ok());
        assert!(validate_version("").is_err());
    }

    #[test]
    fn display_formats() {
        let key = ArtifactKey::new("acme", "widget", "1.0.0", "linux", "amd64").unwrap();
        assert_eq!(key.to_string(), "acme/widget@1.0.0 (linux/amd64)");
        assert_eq!(key.scope().to_string(), "acme/widget");
    }
}
