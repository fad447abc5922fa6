//! Init command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use modelrun_models::ModelrunConfig;
use std::path::Path;

/// Execute the init command.
///
/// Writes the default configuration to `path`, or to the global or local
/// default location.
pub fn execute(path: Option<&Path>, global: bool, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None if global => ModelrunConfig::default_global_path(),
        None => ModelrunConfig::default_local_path(),
    };

    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    ModelrunConfig::default()
        .save_to_file(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}
