//! Plumbing shared by the built-in HTTP adapters.
//!
//! [`HttpBackend`] holds what every adapter needs besides its wire format: the
//! pooled client, the resolved API base, the per-call timeout, the retry
//! controller and the injected logger. Adapters build a request, hand it to
//! [`HttpBackend::send_json`], and wrap the whole retried call in
//! [`HttpBackend::run_generation`].

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use lingo_core::config::{ProviderConfig, HEALTH_CHECK_TIMEOUT};
use lingo_core::utils::truncate_string;
use lingo_core::{GatewayError, GenerationResult, Logger, ModelDescriptor, ProviderId, Result};

use crate::retry::RetryController;
use crate::spec::ProviderSpec;

/// Characters of the prompt included in failure logs.
const PROMPT_PREVIEW_LEN: usize = 100;

/// Longest raw error body carried into an error message.
const MAX_ERROR_BODY_LEN: usize = 500;

pub(crate) struct HttpBackend {
    pub client: reqwest::Client,
    pub api_base: String,
    pub api_key: String,
    pub timeout: Duration,
    pub retry: RetryController,
    pub logger: Logger,
    pub spec: &'static ProviderSpec,
    extra_headers: HeaderMap,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("provider", &self.spec.display_name)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpBackend {
    /// Validate `config` against `spec` and build the shared client state.
    pub fn new(config: &ProviderConfig, spec: &'static ProviderSpec, logger: &Logger) -> Result<Self> {
        if spec.requires_api_key && !config.is_configured() {
            return Err(GatewayError::Config(format!(
                "{} API key is required",
                spec.display_name
            )));
        }

        let mut extra_headers = HeaderMap::new();
        if let Some(ref headers) = config.extra_headers {
            for (key, value) in headers {
                if let (Ok(name), Ok(val)) = (
                    HeaderName::from_bytes(key.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    extra_headers.insert(name, val);
                } else {
                    logger.in_scope(|| warn!(provider = %spec.id, header = %key, "Invalid header"));
                }
            }
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: spec.api_base(config.api_base.as_deref()),
            api_key: config.api_key.clone(),
            timeout: config.timeout(),
            retry: RetryController::new(&config.retry_config(), logger.clone()),
            logger: logger.clone(),
            spec,
            extra_headers,
        })
    }

    pub fn provider(&self) -> &ProviderId {
        &self.spec.id
    }

    /// Full URL for `path` under the API base.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    /// Reject descriptors addressed to a different provider.
    pub fn check_model(&self, model: &ModelDescriptor) -> Result<()> {
        if model.provider() != self.provider() {
            return Err(GatewayError::Config(format!(
                "{} adapter cannot serve {} model {}",
                self.spec.display_name,
                model.provider(),
                model.model_name()
            )));
        }
        Ok(())
    }

    /// Send a request and decode a successful JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.without_url().to_string()))
    }

    /// Send a request and discard a successful body.
    pub async fn send_ok(&self, request: RequestBuilder) -> Result<()> {
        self.send(request).await.map(|_| ())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .headers(self.extra_headers.clone())
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(api_error(self.provider().clone(), status, &body, retry_after))
    }

    /// Run one generation: retried, bounded by the configured timeout, and
    /// wrapped with the provider name on failure.
    ///
    /// Cancellation and timeout errors are returned as-is so callers can match
    /// on them directly.
    pub async fn run_generation<F, Fut>(
        &self,
        cancel: &CancellationToken,
        model: &ModelDescriptor,
        prompt: &str,
        operation: F,
    ) -> Result<GenerationResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<GenerationResult>>,
    {
        self.check_model(model)?;

        let call = self.retry.execute(cancel, operation);
        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(result) => {
                self.logger.in_scope(|| {
                    debug!(
                        provider = %self.provider(),
                        model = %result.model,
                        finish_reason = %result.finish_reason,
                        total_tokens = result.usage.total_tokens,
                        "Generation complete"
                    );
                });
                Ok(result)
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                self.logger.in_scope(|| {
                    error!(
                        provider = %self.provider(),
                        model = model.model_name(),
                        prompt_preview = %truncate_string(prompt, PROMPT_PREVIEW_LEN),
                        error = %e,
                        "Generation failed"
                    );
                });
                Err(GatewayError::generation(self.provider().clone(), e))
            }
        }
    }

    /// Run a health check under the fixed health-check deadline.
    pub async fn run_health<Fut>(&self, cancel: &CancellationToken, check: Fut) -> Result<()>
    where
        Fut: Future<Output = Result<()>>,
    {
        let guarded = async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(GatewayError::Cancelled),
                outcome = check => outcome,
            }
        };

        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => Err(GatewayError::Timeout(HEALTH_CHECK_TIMEOUT)),
        }
    }
}

// ─────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────

/// Build an [`GatewayError::Api`] from a non-success response.
///
/// Understands `{"error": {"message": ..., "type": ...}}` (OpenAI, Anthropic,
/// Google, Perplexity), `{"error": "..."}` (Ollama) and
/// `{"message": ..., "__type": ...}` (Bedrock); anything else is kept as raw
/// text.
pub(crate) fn api_error(
    provider: ProviderId,
    status: StatusCode,
    body: &str,
    retry_after: Option<Duration>,
) -> GatewayError {
    GatewayError::Api {
        provider,
        status: status.as_u16(),
        message: error_message(status, body),
        retry_after,
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    match error {
        Some(serde_json::Value::String(msg)) => msg.clone(),
        Some(obj) => {
            let msg = obj.get("message").and_then(|m| m.as_str());
            let kind = obj
                .get("type")
                .or_else(|| obj.get("status"))
                .and_then(|t| t.as_str());
            match (msg, kind) {
                (Some(msg), Some(kind)) => format!("{kind}: {msg}"),
                (Some(msg), None) => msg.to_string(),
                _ => truncate_string(body, MAX_ERROR_BODY_LEN),
            }
        }
        None if parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .is_some_and(|m| m.is_string()) =>
        {
            let obj = parsed.as_ref().and_then(|v| v.as_object());
            let msg = obj
                .and_then(|o| o.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or_default();
            // `__type` may be namespaced: `com.amazon.coral.validate#ValidationException`.
            let kind = obj
                .and_then(|o| o.get("__type"))
                .and_then(|t| t.as_str())
                .map(|t| t.rsplit('#').next().unwrap_or(t));
            match kind {
                Some(kind) => format!("{kind}: {msg}"),
                None => msg.to_string(),
            }
        }
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
        None => truncate_string(body.trim(), MAX_ERROR_BODY_LEN),
    }
}

/// Parse a `Retry-After` header given in (possibly fractional) seconds.
/// HTTP-date values are ignored.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs = value.trim().parse::<f64>().ok()?;
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}
