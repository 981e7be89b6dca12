//! Local registry commands: versions, show, register.
//!
//! These run the same operations as the HTTP API directly against the
//! configured store, for publishers operating on the server host.

use std::path::Path;

use anyhow::{Context, Result};
use provreg_registry::{RegistryConfig, RegistryService, VersionEntry};

/// Run `provreg versions <namespace> <name>`.
pub fn versions(config: &RegistryConfig, namespace: &str, name: &str, json: bool) -> Result<()> {
    let service = RegistryService::from_config(config);
    let entries = service.list_versions(namespace, name)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "versions": entries }))?
        );
    } else {
        print!("{}", format_versions(&entries));
    }
    Ok(())
}

/// Run `provreg show <namespace> <name> <version> <os> <arch>`.
pub fn show(
    config: &RegistryConfig,
    namespace: &str,
    name: &str,
    version: &str,
    os: &str,
    arch: &str,
) -> Result<()> {
    let service = RegistryService::from_config(config);
    let record = service.resolve(namespace, name, version, os, arch)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Run `provreg register <namespace> <name> <version> <body.json>`.
pub fn register(
    config: &RegistryConfig,
    namespace: &str,
    name: &str,
    version: &str,
    body_path: &Path,
) -> Result<()> {
    let body =
        std::fs::read(body_path).with_context(|| format!("reading {}", body_path.display()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let service = RegistryService::from_config(config);
    let key = runtime.block_on(service.register(namespace, name, version, &body))?;

    println!("Registered {key}");
    Ok(())
}

/// One line per version: `<version>  <os>/<arch>, ...`.
fn format_versions(entries: &[VersionEntry]) -> String {
    let width = entries.iter().map(|e| e.version.len()).max().unwrap_or(0);
    let mut out = String::new();
    for entry in entries {
        let platforms = entry
            .platforms
            .iter()
            .map(|p| format!("{}/{}", p.os, p.arch))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("{:<width$}  {platforms}\n", entry.version));
    }
    out
}
