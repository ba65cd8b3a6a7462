//! Initialize the configuration directory: create ~/.runbook, default config,
//! and the data directory seeded with the bundled example catalog.
//!
//! Layout mirrors `crates/lib/config/`: `config/catalog/` → `<data dir>/`.

use anyhow::{Context, Result};
use include_dir::{include_dir, Dir};
use std::path::{Path, PathBuf};

use crate::config;

static BUNDLED_CATALOG: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/config/catalog");

/// Ensure the configuration has been initialized (config file and data
/// directory exist).
pub fn require_initialized(config_path: &Path, config: &config::Config) -> Result<()> {
    if !config_path.exists() {
        anyhow::bail!(
            "configuration not initialized; run `runbook init` first (config file not found: {})",
            config_path.display()
        );
    }
    let data_dir = config::resolve_data_dir(config, config_path);
    if !data_dir.exists() {
        anyhow::bail!(
            "configuration not initialized; run `runbook init` first (data directory not found: {})",
            data_dir.display()
        );
    }
    Ok(())
}

/// Create the config directory and default files if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes `config.json` with `{}` if missing.
/// - Creates the data directory and seeds it with the bundled example catalog
///   when no catalog file exists yet.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        let default_config = b"{}";
        std::fs::write(config_path, default_config)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    let (config, _) = config::load_config(Some(config_path.to_path_buf()))?;
    let data_dir = config::resolve_data_dir(&config, config_path);
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;
        log::info!("created data directory at {}", data_dir.display());
    }

    let catalog_path = data_dir.join("catalog.json");
    if !catalog_path.exists() {
        if let Err(e) = BUNDLED_CATALOG.extract(&data_dir) {
            anyhow::bail!(
                "extracting bundled catalog to {}: {}",
                data_dir.display(),
                e
            );
        }
        log::info!("seeded example catalog in {}", data_dir.display());
    } else {
        log::debug!(
            "catalog already exists at {}, skipping seed",
            catalog_path.display()
        );
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_config_and_seeded_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        init_config_dir(&config_path).unwrap();

        assert!(config_path.exists());
        let catalog = dir.path().join("data").join("catalog.json");
        assert!(catalog.exists());

        // Seed catalog parses as a valid store document.
        let s = std::fs::read_to_string(&catalog).unwrap();
        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert!(v.get("commands").and_then(|c| c.as_array()).is_some());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        init_config_dir(&config_path).unwrap();
        std::fs::write(&config_path, r#"{"gateway": {"port": 9999}}"#).unwrap();
        init_config_dir(&config_path).unwrap();
        // Existing config is left alone.
        let s = std::fs::read_to_string(&config_path).unwrap();
        assert!(s.contains("9999"));
    }

    #[test]
    fn require_initialized_reports_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let err = require_initialized(&config_path, &config::Config::default()).unwrap_err();
        assert!(err.to_string().contains("runbook init"));
    }
}
