//! Configuration schema.
//!
//! Hierarchy: `Config` → `ProviderConfig` (one per backend) → `RetryConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! Durations are stored as integer milliseconds or seconds.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::types::ProviderId;

/// Timeout applied to a generation call when the config leaves it unset.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Fixed deadline for health checks, independent of the generation timeout.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

// ─────────────────────────────────────────────
// Retry
// ─────────────────────────────────────────────

/// Retry/backoff settings for rate-limited calls.
///
/// Zero-valued fields mean "use the default"; call [`RetryConfig::resolved`]
/// before use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (default: 3).
    pub max_retries: u32,
    /// Backoff before the first retry (default: 1s).
    #[serde(rename = "initialBackoffMs", with = "millis")]
    pub initial_backoff: Duration,
    /// Upper bound on any computed backoff (default: 60s).
    #[serde(rename = "maxBackoffMs", with = "millis")]
    pub max_backoff: Duration,
    /// Growth factor applied after each retry (default: 2.0).
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
    pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);
    pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

    /// Copy of this config with every zero-valued field replaced by its default.
    pub fn resolved(&self) -> Self {
        Self {
            max_retries: if self.max_retries == 0 {
                Self::DEFAULT_MAX_RETRIES
            } else {
                self.max_retries
            },
            initial_backoff: if self.initial_backoff.is_zero() {
                Self::DEFAULT_INITIAL_BACKOFF
            } else {
                self.initial_backoff
            },
            max_backoff: if self.max_backoff.is_zero() {
                Self::DEFAULT_MAX_BACKOFF
            } else {
                self.max_backoff
            },
            backoff_multiplier: if self.backoff_multiplier == 0.0 {
                Self::DEFAULT_BACKOFF_MULTIPLIER
            } else {
                self.backoff_multiplier
            },
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: Self::DEFAULT_MAX_RETRIES,
            initial_backoff: Self::DEFAULT_INITIAL_BACKOFF,
            max_backoff: Self::DEFAULT_MAX_BACKOFF,
            backoff_multiplier: Self::DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single backend: identity, credentials, timeout, retries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Which adapter this config is for.
    pub provider: ProviderId,
    /// API key for authentication (empty for keyless backends like Ollama).
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides the provider default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Per-call timeout in seconds (default: 60).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Retry settings; `None` uses the defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
    /// Extra HTTP headers to send with each request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    /// A config for `provider` with everything else defaulted.
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            api_key: String::new(),
            api_base: None,
            timeout_secs: None,
            retry: None,
            extra_headers: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Set the per-call timeout. Stored in whole seconds, rounded up, so a
    /// sub-second timeout becomes 1s rather than the 60s default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let secs = timeout
            .as_secs()
            .saturating_add(u64::from(timeout.subsec_nanos() > 0));
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// The per-call timeout, defaulting to 60s when unset or zero.
    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_TIMEOUT,
        }
    }

    /// Retry settings with defaults applied.
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default().resolved()
    }
}

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.lingo/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Backend configurations. `null` entries are allowed and skipped.
    pub providers: Vec<Option<ProviderConfig>>,
    /// Provider used by the CLI when none is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<ProviderId>,
    /// Model used by the CLI when none is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl Config {
    /// The config for `provider`, if present.
    pub fn provider(&self, provider: &ProviderId) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .flatten()
            .find(|c| &c.provider == provider)
    }

    /// Mutable access to the config for `provider`, creating it if missing.
    pub fn provider_mut(&mut self, provider: &ProviderId) -> &mut ProviderConfig {
        let idx = self
            .providers
            .iter()
            .position(|c| c.as_ref().is_some_and(|c| &c.provider == provider));

        let idx = match idx {
            Some(i) => i,
            None => {
                self.providers
                    .push(Some(ProviderConfig::new(provider.clone())));
                self.providers.len() - 1
            }
        };

        self.providers[idx].get_or_insert_with(|| ProviderConfig::new(provider.clone()))
    }
}
