//! Publisher signing-key lookup.
//!
//! The key is either exported on demand by an external tool (`gpg` by
//! default) or read from a file exported ahead of time. Either way the
//! configured identity is served as the key ID; no independent key-ID
//! resolution is performed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::config::{ExportCommand, SigningConfig};
use crate::error::{RegistryError, Result};
use crate::record::PublicKeyInfo;

/// Source of the publisher's public key.
#[derive(Debug, Clone)]
pub enum KeyProvider {
    /// Run an export command for each lookup.
    Command {
        command: ExportCommand,
        timeout: Duration,
    },
    /// Read a pre-exported armored key.
    File { path: PathBuf },
}

impl KeyProvider {
    /// Pick the strategy from configuration: file when a key file is set,
    /// otherwise the export command.
    pub fn from_config(config: &SigningConfig) -> Self {
        match &config.key_file {
            Some(path) => KeyProvider::File { path: path.clone() },
            None => KeyProvider::Command {
                command: config.export_command.clone(),
                timeout: config.export_timeout,
            },
        }
    }

    /// Fetch the public key for `identity`.
    ///
    /// For the command strategy the child process is killed if the returned
    /// future is dropped or the timeout elapses.
    pub async fn public_key(&self, identity: &str) -> Result<PublicKeyInfo> {
        let armor = match self {
            KeyProvider::Command { command, timeout } => {
                export_with_command(command, *timeout, identity).await?
            }
            KeyProvider::File { path } => read_key_file(path, identity).await?,
        };
        Ok(PublicKeyInfo::new(identity, armor))
    }
}

fn unavailable(identity: &str, detail: impl Into<String>) -> RegistryError {
    RegistryError::KeyUnavailable {
        identity: identity.to_string(),
        detail: detail.into(),
    }
}

async fn export_with_command(
    command: &ExportCommand,
    timeout: Duration,
    identity: &str,
) -> Result<String> {
    debug!(program = %command.program, identity, "exporting public key");

    let child = Command::new(&command.program)
        .args(&command.args)
        .arg(identity)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| unavailable(identity, format!("failed to run {}: {e}", command.program)))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            unavailable(
                identity,
                format!("{} timed out after {}s", command.program, timeout.as_secs_f64()),
            )
        })?
        .map_err(|e| unavailable(identity, format!("{} failed: {e}", command.program)))?;

    if output.stdout.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(unavailable(identity, stderr.trim()));
    }

    String::from_utf8(output.stdout)
        .map_err(|_| unavailable(identity, "exported key is not valid UTF-8"))
}

async fn read_key_file(path: &Path, identity: &str) -> Result<String> {
    let armor = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| unavailable(identity, format!("cannot read {}: {e}", path.display())))?;
    if armor.trim().is_empty() {
        return Err(unavailable(
            identity,
            format!("key file {} is empty", path.display()),
        ));
    }
    Ok(armor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(program: &str, args: &[&str]) -> KeyProvider {
        KeyProvider::Command {
            command: ExportCommand {
                program: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            },
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn command_output_becomes_armor() {
        let provider = command("echo", &["-----BEGIN PGP PUBLIC KEY BLOCK-----"]);
        let key = provider.public_key("KEY1").await.unwrap();
        assert_eq!(key.key_id, "KEY1");
        assert_eq!(key.ascii_armor, "-----BEGIN PGP PUBLIC KEY BLOCK----- KEY1\n");
        assert!(key.trust_signature.is_none());
        assert!(key.source.is_none());
    }

    #[tokio::test]
    async fn empty_output_surfaces_stderr() {
        let provider = command("sh", &["-c", "echo \"gpg: WARNING: nothing exported: $1\" >&2", "sh"]);
        let err = provider.public_key("KEY1").await.unwrap_err();
        match err {
            RegistryError::KeyUnavailable { identity, detail } => {
                assert_eq!(identity, "KEY1");
                assert_eq!(detail, "gpg: WARNING: nothing exported: KEY1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let provider = command("provreg-no-such-program", &[]);
        let err = provider.public_key("KEY1").await.unwrap_err();
        assert!(matches!(err, RegistryError::KeyUnavailable { .. }));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let provider = KeyProvider::Command {
            command: ExportCommand {
                program: "sleep".to_string(),
                args: Vec::new(),
            },
            timeout: Duration::from_millis(100),
        };
        // The identity is passed as sleep's duration argument.
        let err = provider.public_key("5").await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    /// Whether `pid` is gone or only a zombie awaiting its reaper.
    #[cfg(target_os = "linux")]
    fn process_exited(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Err(_) => true,
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.trim_start().chars().next())
                .map_or(true, |state| state == 'Z' || state == 'X'),
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn dropped_lookup_kills_export_command() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("export.pid");
        let provider = KeyProvider::Command {
            command: ExportCommand {
                program: "sh".to_string(),
                args: vec![
                    "-c".to_string(),
                    format!("echo $$ > '{}'; exec sleep 30", pid_file.display()),
                ],
            },
            timeout: Duration::from_secs(60),
        };

        let mut lookup = Box::pin(provider.public_key("KEY1"));
        let pid = tokio::select! {
            result = &mut lookup => panic!("export finished early: {result:?}"),
            pid = async {
                loop {
                    if let Ok(s) = tokio::fs::read_to_string(&pid_file).await {
                        if let Ok(pid) = s.trim().parse::<u32>() {
                            break pid;
                        }
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            } => pid,
        };
        assert!(!process_exited(pid), "export command should still be running");

        drop(lookup);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !process_exited(pid) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "export command {pid} survived the dropped lookup"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn key_file_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public.asc");
        std::fs::write(&path, "armored key\n").unwrap();

        let provider = KeyProvider::File { path };
        let key = provider.public_key("KEY1").await.unwrap();
        assert_eq!(key, PublicKeyInfo::new("KEY1", "armored key\n"));
    }

    #[tokio::test]
    async fn missing_or_empty_key_file() {
        let dir = tempfile::tempdir().unwrap();

        let missing = KeyProvider::File {
            path: dir.path().join("absent.asc"),
        };
        assert!(matches!(
            missing.public_key("KEY1").await.unwrap_err(),
            RegistryError::KeyUnavailable { .. }
        ));

        let empty_path = dir.path().join("empty.asc");
        std::fs::write(&empty_path, "  \n").unwrap();
        let empty = KeyProvider::File { path: empty_path };
        assert!(matches!(
            empty.public_key("KEY1").await.unwrap_err(),
            RegistryError::KeyUnavailable { .. }
        ));
    }

    #[test]
    fn strategy_selection() {
        let mut config = SigningConfig::default();
        assert!(matches!(
            KeyProvider::from_config(&config),
            KeyProvider::Command { .. }
        ));

        config.key_file = Some(PathBuf::from("/etc/provreg/public.asc"));
        assert!(matches!(
            KeyProvider::from_config(&config),
            KeyProvider::File { .. }
        ));
    }
}
