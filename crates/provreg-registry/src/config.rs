//! Immutable registry configuration.
//!
//! Built once at process start and handed to [`RegistryService::new`];
//! request handling never consults the process environment.
//!
//! [`RegistryService::new`]: crate::service::RegistryService::new

use std::path::PathBuf;
use std::time::Duration;

/// Default upper bound on a key-export command.
pub const DEFAULT_KEY_EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Command used to export an armored public key. The identity is appended
/// as the final argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ExportCommand {
    fn default() -> Self {
        ExportCommand {
            program: "gpg".to_string(),
            args: vec!["--armor".to_string(), "--export".to_string()],
        }
    }
}

/// Where the publisher's signing key comes from.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// Key identity; doubles as the served key ID.
    pub identity: Option<String>,
    /// Pre-exported armored key. When set, the export command is not run.
    pub key_file: Option<PathBuf>,
    pub export_command: ExportCommand,
    pub export_timeout: Duration,
}

impl Default for SigningConfig {
    fn default() -> Self {
        SigningConfig {
            identity: None,
            key_file: None,
            export_command: ExportCommand::default(),
            export_timeout: DEFAULT_KEY_EXPORT_TIMEOUT,
        }
    }
}

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Root directory of the artifact store.
    pub storage_root: PathBuf,
    pub signing: SigningConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            storage_root: PathBuf::from("provider"),
            signing: SigningConfig::default(),
        }
    }
}
