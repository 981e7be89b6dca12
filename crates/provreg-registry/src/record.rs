//! Stored provider metadata.
//!
//! An [`ArtifactRecord`] is exactly what a client receives from the download
//! endpoint: where to fetch the archive, its checksum, and the signing keys
//! to verify the checksum file against.

use serde::{Deserialize, Deserializer, Serialize};

/// A publisher's public signing key as served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyInfo {
    /// Key identifier.
    pub key_id: String,
    /// ASCII-armored public key material.
    pub ascii_armor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_signature: Option<String>,
    /// Human-readable attribution of the key owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl PublicKeyInfo {
    /// A key with only an identifier and armored material.
    pub fn new(key_id: impl Into<String>, ascii_armor: impl Into<String>) -> Self {
        PublicKeyInfo {
            key_id: key_id.into(),
            ascii_armor: ascii_armor.into(),
            trust_signature: None,
            source: None,
            source_url: None,
        }
    }
}

/// Ordered set of keys a client may verify signatures with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKeySet {
    #[serde(default)]
    pub gpg_public_keys: Vec<PublicKeyInfo>,
}

impl SigningKeySet {
    /// A set holding exactly one key.
    pub fn single(key: PublicKeyInfo) -> Self {
        SigningKeySet {
            gpg_public_keys: vec![key],
        }
    }
}

/// Deserialize a field that distinguishes "absent" (outer `None`, via
/// `#[serde(default)]`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Metadata for one platform-specific build of a provider version.
///
/// Optional publisher fields are `Option<Option<_>>` so that a record reads
/// back exactly as submitted: omitted stays omitted, `null` stays `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Plugin protocol versions the build speaks.
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub protocols: Option<Option<Vec<String>>>,
    pub os: String,
    pub arch: String,
    /// Archive file name.
    pub filename: String,
    pub download_url: String,
    /// SHA-256 of the archive, hex encoded.
    pub shasum: String,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub shasums_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub shasums_signature_url: Option<Option<String>>,
    /// Server-derived; overwritten on every registration.
    #[serde(default)]
    pub signing_keys: SigningKeySet,
    /// Publisher fields this server does not interpret, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ArtifactRecord {
    /// Decode a record from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Replace (never merge) the signing-key set with a single key.
    pub fn set_signing_key(&mut self, key: PublicKeyInfo) {
        self.signing_keys = SigningKeySet::single(key);
    }
}
