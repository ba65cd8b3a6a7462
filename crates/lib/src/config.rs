//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.runbook/config.json`) and
//! environment. Authentication stays out of the execution core: the gateway
//! resolves an already-verified operator from this config and passes the id
//! down the pipeline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Store settings (data directory).
    #[serde(default)]
    pub store: StoreConfig,

    /// Known operators; executions are attributed to these ids.
    #[serde(default)]
    pub operators: Vec<Operator>,
}

/// Gateway bind, port, and auth settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// HTTP port (default 8650).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Auth settings. When absent, defaults to no auth for loopback bind.
    #[serde(default)]
    pub auth: GatewayAuthConfig,
}

/// Gateway auth: token or none (loopback-only when none).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayAuthConfig {
    /// "none" = no shared secret (only safe when bind is loopback).
    /// "token" = require a bearer token on every API request.
    #[serde(default)]
    pub mode: GatewayAuthMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayAuthMode {
    /// No auth; allow only when bind is loopback.
    #[default]
    None,

    /// Require `Authorization: Bearer <token>` matching an operator token
    /// (or RUNBOOK_GATEWAY_TOKEN).
    Token,
}

fn default_gateway_port() -> u16 {
    8650
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            auth: GatewayAuthConfig::default(),
        }
    }
}

/// Store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Data directory holding catalog.json, executions.json, activities.json.
    /// Relative paths resolve against the config file's parent. Default:
    /// `data` next to the config file.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// One known operator. Authentication happens upstream of the execution core;
/// the token here is the gateway's bearer credential for this identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Resolve the master gateway token: env RUNBOOK_GATEWAY_TOKEN. A bearer equal
/// to it authenticates as the local operator without editing config.
pub fn resolve_gateway_token() -> Option<String> {
    std::env::var("RUNBOOK_GATEWAY_TOKEN").ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// The operator used when no bearer identity applies (auth mode none, the CLI
/// `run` subcommand): the first configured operator, else a built-in local one.
pub fn local_operator(config: &Config) -> Operator {
    config.operators.first().cloned().unwrap_or(Operator {
        id: 0,
        name: "local".to_string(),
        token: None,
    })
}

/// Resolve the operator for a bearer token: a configured operator's token, or
/// the master token (mapped to the local operator).
pub fn operator_for_token(config: &Config, bearer: &str) -> Option<Operator> {
    if let Some(op) = config
        .operators
        .iter()
        .find(|o| o.token.as_deref() == Some(bearer))
    {
        return Some(op.clone());
    }
    if resolve_gateway_token().as_deref() == Some(bearer) {
        return Some(local_operator(config));
    }
    None
}

/// True when token auth is actually usable: at least one operator has a token,
/// or the master token is set.
pub fn has_any_token(config: &Config) -> bool {
    config.operators.iter().any(|o| o.token.is_some()) || resolve_gateway_token().is_some()
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RUNBOOK_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".runbook").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or RUNBOOK_CONFIG_PATH). Missing file =>
/// default config. Returns the config and the path that was used (for
/// resolving the data directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Resolve the data directory: `store.directory` if set (relative paths
/// resolved against the config file's parent), otherwise `data` next to the
/// config file.
pub fn resolve_data_dir(config: &Config, config_path: &Path) -> PathBuf {
    let config_parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match &config.store.directory {
        Some(d) if !d.as_os_str().is_empty() => {
            if d.is_absolute() {
                d.clone()
            } else {
                config_parent.join(d)
            }
        }
        _ => config_parent.join("data"),
    }
}
