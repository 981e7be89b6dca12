//! `provreg init`: write a starter configuration file.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::config::{Settings, DEFAULT_CONFIG_FILE};

/// Create `provreg.toml` in `dir`.
pub fn run(dir: &Path) -> Result<()> {
    let path = dir.join(DEFAULT_CONFIG_FILE);
    if path.exists() {
        bail!("{} already exists", path.display());
    }

    fs::write(&path, Settings::template())
        .with_context(|| format!("writing {}", path.display()))?;

    println!("Created {}", path.display());
    println!("Set signing.identity (or PGP_ID) before accepting registrations.");
    Ok(())
}
