//! `provreg.toml` parsing and startup configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, the TOML
//! file, environment variables, and command-line flags. Clap merges the
//! last two; [`Settings::resolve`] folds the result over the file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use provreg_registry::{ExportCommand, RegistryConfig, SigningConfig};
use provreg_server::ServerConfig;
use serde::{Deserialize, Serialize};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "provreg.toml";

/// The top-level configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub signing: SigningSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Socket address to bind, e.g. `0.0.0.0:8080`.
    #[serde(default)]
    pub listen: Option<String>,
    /// Upper bound on registration bodies.
    #[serde(default)]
    pub max_body_bytes: Option<usize>,
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    /// Root directory of the artifact store.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// `[signing]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigningSection {
    /// Key identity served as the key ID.
    #[serde(default)]
    pub identity: Option<String>,
    /// Pre-exported armored public key.
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    /// Export command; the identity is appended as the last argument.
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub root: Option<PathBuf>,
    pub identity: Option<String>,
    pub key_file: Option<PathBuf>,
}

impl Settings {
    /// Load settings from `path`, or from `provreg.toml` in `cwd` if it
    /// exists, or fall back to defaults.
    pub fn load(path: Option<&Path>, cwd: &Path) -> Result<Self> {
        let candidate = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = cwd.join(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Settings::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&candidate)
            .with_context(|| format!("reading {}", candidate.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", candidate.display()))
    }

    /// Parse settings from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Freeze the settings, with `overrides` taking precedence.
    pub fn resolve(self, overrides: Overrides) -> Result<(RegistryConfig, ServerConfig)> {
        let mut server = ServerConfig::default();
        if let Some(listen) = overrides.listen.or(self.server.listen) {
            server.listen = listen
                .parse::<SocketAddr>()
                .with_context(|| format!("invalid listen address: {listen}"))?;
        }
        if let Some(max) = self.server.max_body_bytes {
            server.max_body_bytes = max;
        }

        let mut registry = RegistryConfig::default();
        if let Some(root) = overrides.root.or(self.storage.root) {
            registry.storage_root = root;
        }

        let mut signing = SigningConfig {
            identity: overrides
                .identity
                .or(self.signing.identity)
                .filter(|id| !id.is_empty()),
            key_file: overrides.key_file.or(self.signing.key_file),
            ..SigningConfig::default()
        };
        if let Some(command) = self.signing.command {
            let Some((program, args)) = command.split_first() else {
                bail!("signing.command must not be empty");
            };
            signing.export_command = ExportCommand {
                program: program.clone(),
                args: args.to_vec(),
            };
        }
        if let Some(secs) = self.signing.timeout_secs {
            signing.export_timeout = Duration::from_secs(secs);
        }
        registry.signing = signing;

        Ok((registry, server))
    }

    /// Generate a starter configuration file.
    pub fn template() -> String {
        r#"[server]
listen = "0.0.0.0:8080"

[storage]
root = "provider"

[signing]
# identity = "KEY1"
# key_file = "public.asc"
command = ["gpg", "--armor", "--export"]
timeout_secs = 10
"#
        .to_string()
    }
}
