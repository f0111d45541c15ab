//! Config loader — reads `~/.lingo/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.lingo/config.json` (or an explicit path)
//! 3. Environment variables `LINGO_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;
use crate::types::ProviderId;

/// Provider names checked for `LINGO_PROVIDERS__<NAME>__*` overrides.
const ENV_PROVIDERS: &[ProviderId] = &[
    ProviderId::OPENAI,
    ProviderId::ANTHROPIC,
    ProviderId::BEDROCK,
    ProviderId::GOOGLE,
    ProviderId::PERPLEXITY,
    ProviderId::OLLAMA,
];

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the given or default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    apply_env_overrides(load_config_from_path(&config_path))
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `LINGO_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `LINGO_DEFAULT_PROVIDER`, `LINGO_DEFAULT_MODEL`
/// - `LINGO_PROVIDERS__<NAME>__API_KEY` → `providers[name].api_key`
/// - `LINGO_PROVIDERS__<NAME>__API_BASE` → `providers[name].api_base`
/// - `LINGO_PROVIDERS__<NAME>__TIMEOUT_SECS` → `providers[name].timeout_secs`
///
/// A provider override for a provider missing from the file adds an entry.
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(val) = std::env::var("LINGO_DEFAULT_PROVIDER") {
        config.default_provider = Some(ProviderId::new(val));
    }
    if let Ok(val) = std::env::var("LINGO_DEFAULT_MODEL") {
        config.default_model = Some(val);
    }

    for provider in ENV_PROVIDERS {
        apply_provider_env(&mut config, provider);
    }

    config
}

/// Apply env var overrides for a single provider.
fn apply_provider_env(config: &mut Config, provider: &ProviderId) {
    let name = provider.as_str().to_uppercase();
    let key = std::env::var(format!("LINGO_PROVIDERS__{name}__API_KEY")).ok();
    let base = std::env::var(format!("LINGO_PROVIDERS__{name}__API_BASE")).ok();
    let timeout = std::env::var(format!("LINGO_PROVIDERS__{name}__TIMEOUT_SECS"))
        .ok()
        .and_then(|v| v.parse::<u64>().ok());

    if key.is_none() && base.is_none() && timeout.is_none() {
        return;
    }

    let entry = config.provider_mut(provider);
    if let Some(key) = key {
        entry.api_key = key;
    }
    if let Some(base) = base {
        entry.api_base = Some(base);
    }
    if let Some(secs) = timeout {
        entry.timeout_secs = Some(secs);
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
