//! Retry controller — re-attempts rate-limited calls with jittered exponential backoff.
//!
//! Per call to [`RetryController::execute`]:
//!
//! ```text
//! Attempting ─┬─ Ok ─────────────────────────────▶ Succeeded
//!             ├─ permanent error ────────────────▶ PermanentFailure
//!             ├─ transient, attempts left ─▶ Waiting ─▶ Attempting
//!             └─ transient, none left ───────────▶ RetriesExhausted
//! ```
//!
//! The operation runs at most `max_retries + 1` times. Cancellation is
//! checked before every attempt and interrupts both the attempt and the wait.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use lingo_core::config::RetryConfig;
use lingo_core::{GatewayError, Logger, Result};

/// Relative jitter applied to the nominal backoff (±25%).
const JITTER_FACTOR: f64 = 0.25;

/// Wraps fallible operations with bounded retry on transient failures.
///
/// Cheap to clone; one instance per adapter is typical.
#[derive(Clone, Debug)]
pub struct RetryController {
    config: RetryConfig,
    logger: Logger,
}

impl RetryController {
    /// Create a controller. Zero-valued config fields take their defaults.
    pub fn new(config: &RetryConfig, logger: Logger) -> Self {
        Self {
            config: config.resolved(),
            logger,
        }
    }

    /// The resolved configuration in effect.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation`, retrying while it fails with a transient error.
    ///
    /// Permanent errors are returned immediately and unchanged. After the last
    /// allowed retry the most recent error is returned unchanged. A fired
    /// `cancel` token yields [`GatewayError::Cancelled`].
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.config.initial_backoff;
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                outcome = operation() => outcome,
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err);
            }

            if attempt >= self.config.max_retries {
                self.logger.in_scope(|| {
                    error!(attempts = attempt + 1, error = %err, "Rate limit retries exhausted");
                });
                return Err(err);
            }

            let wait = self.wait_duration(backoff, &err);

            self.logger.in_scope(|| {
                debug!(
                    attempt = attempt + 1,
                    max_retries = self.config.max_retries,
                    wait_ms = wait.as_millis() as u64,
                    "Rate limited, waiting before retry"
                );
            });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }

            backoff = self.next_backoff(backoff);
            attempt += 1;
        }
    }

    /// The nominal backoff that follows `current`: multiplied, then capped.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        let grown = current.as_secs_f64() * self.config.backoff_multiplier;
        Duration::try_from_secs_f64(grown)
            .unwrap_or(self.config.max_backoff)
            .min(self.config.max_backoff)
    }

    /// How long to wait before retrying after `err`.
    ///
    /// A retry-after hint carried by the error wins outright; otherwise the
    /// nominal `backoff` is jittered by up to ±25%.
    pub fn wait_duration(&self, backoff: Duration, err: &GatewayError) -> Duration {
        if let Some(hint) = err.retry_after().filter(|d| !d.is_zero()) {
            return hint;
        }

        let u: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
        let jittered = backoff.as_secs_f64() * (1.0 + JITTER_FACTOR * u);
        Duration::try_from_secs_f64(jittered).unwrap_or(backoff)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
