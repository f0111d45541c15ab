//! Gateway error taxonomy.
//!
//! Configuration and dispatch errors are raised by the gateway itself; backend
//! errors come from adapters; cancellation is its own variant so callers can
//! tell it apart from backend failures without looking at the text.

use std::time::Duration;

use crate::types::ProviderId;

/// Substrings (lowercase) that mark an error as rate-limit or overload related.
const RATE_LIMIT_INDICATORS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "429",
    "quota exceeded",
    "quota_exceeded",
    "overloaded",
    "capacity",
    "throttl",
];

/// Retry-after hint prefixes and whether the number that follows is milliseconds.
const RETRY_AFTER_PATTERNS: &[(&str, bool)] = &[
    ("retry after ", false),
    ("retry-after: ", false),
    ("retry_after=", false),
    ("retry_after_ms=", true),
];

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No factory is registered for the provider named in a config.
    #[error("unknown provider type: {0}")]
    UnknownProvider(ProviderId),

    /// An adapter constructor failed.
    #[error("failed to initialize {provider}: {source}")]
    Init {
        provider: ProviderId,
        #[source]
        source: Box<GatewayError>,
    },

    #[error("at least one provider must be configured")]
    NoProviders,

    /// Invalid or incomplete configuration (e.g. missing API key).
    #[error("{0}")]
    Config(String),

    /// A call named a provider the gateway holds no adapter for.
    #[error("provider {0} is not registered")]
    NotRegistered(ProviderId),

    /// The vendor answered with a non-success status.
    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: ProviderId,
        status: u16,
        message: String,
        /// Server-advised wait, parsed from a `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// The request never produced a response (connect, TLS, IO).
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The vendor answered but returned nothing usable.
    #[error("{0}")]
    EmptyResponse(String),

    /// Adapter-level context around a failed vendor call.
    #[error("{provider} generation failed: {source}")]
    Generation {
        provider: ProviderId,
        #[source]
        source: Box<GatewayError>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// One entry per adapter that failed to close.
    #[error("failed to close providers: {}", format_close_errors(.0))]
    Close(Vec<(ProviderId, GatewayError)>),

    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    /// Wrap an adapter error with the provider it came from.
    pub fn generation(provider: ProviderId, source: GatewayError) -> Self {
        GatewayError::Generation {
            provider,
            source: Box::new(source),
        }
    }

    /// Whether this error is a rate-limit/overload condition worth retrying.
    ///
    /// Typed variants decide first; anything else falls back to scanning the
    /// error text. The text scan can misfire when unrelated text (an echoed
    /// prompt, say) contains one of the indicators.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Cancelled
            | GatewayError::Timeout(_)
            | GatewayError::UnknownProvider(_)
            | GatewayError::Init { .. }
            | GatewayError::NoProviders
            | GatewayError::Config(_)
            | GatewayError::NotRegistered(_)
            | GatewayError::Close(_) => false,
            GatewayError::Api {
                status: 429 | 503 | 529,
                ..
            } => true,
            _ => is_rate_limit_error(&self.to_string()),
        }
    }

    /// Server-advised wait before retrying, if the error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        if let GatewayError::Api {
            retry_after: Some(d),
            ..
        } = self
        {
            return Some(*d);
        }
        extract_retry_after(&self.to_string())
    }

    /// Whether this is a caller cancellation or a deadline expiry.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled | GatewayError::Timeout(_))
    }
}

fn format_close_errors(errors: &[(ProviderId, GatewayError)]) -> String {
    errors
        .iter()
        .map(|(provider, e)| format!("provider {provider}: {e}"))
        .collect::<Vec<_>>()
        .join("; ")
}

// ─────────────────────────────────────────────
// Text heuristics
// ─────────────────────────────────────────────

/// Case-insensitive scan of an error message for rate-limit indicators.
pub fn is_rate_limit_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

/// Extract a retry-after hint from an error message.
///
/// Recognizes `retry after <n> seconds`, `retry-after: <n>`, `retry_after=<n>`
/// and `retry_after_ms=<n>`. The number may be fractional. Returns `None` when
/// no pattern matches or the value is zero.
pub fn extract_retry_after(message: &str) -> Option<Duration> {
    let lower = message.to_lowercase();

    for (pattern, is_millis) in RETRY_AFTER_PATTERNS {
        let Some(idx) = lower.find(pattern) else {
            continue;
        };

        let rest = &lower[idx + pattern.len()..];
        let end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());

        let Ok(value) = rest[..end].parse::<f64>() else {
            continue;
        };
        if !value.is_finite() || value <= 0.0 {
            continue;
        }

        let nanos = if *is_millis { value * 1e6 } else { value * 1e9 };
        return Some(Duration::from_nanos(nanos.round() as u64));
    }

    None
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
