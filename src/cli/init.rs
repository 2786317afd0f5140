//! Init command - write a starter drift.toml

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use crate::config::default_config_toml;

pub fn run(path: &Path) -> Result<()> {
    let repo_path = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;

    if !repo_path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", repo_path.display());
    }

    let config_path = repo_path.join("drift.toml");
    if config_path.exists() {
        anyhow::bail!(
            "{} already exists; remove it first to regenerate",
            config_path.display()
        );
    }

    std::fs::write(&config_path, default_config_toml())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );

    println!("\n{}", style("Next steps:").bold());
    println!("  1. Add [[boundaries]] rules for layers that must not import each other");
    println!("  2. Run {} to see the current score", style("drift check").cyan());
    println!("  3. Run {} while you edit", style("drift watch").cyan());
    Ok(())
}
