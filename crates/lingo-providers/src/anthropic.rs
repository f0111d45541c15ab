//! Anthropic Messages API adapter.
//!
//! Talks to `POST /v1/messages` directly. Extended thinking is enabled when the
//! descriptor carries a thinking budget; the thinking trace is returned in the
//! `thinking` metadata entry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use lingo_core::config::ProviderConfig;
use lingo_core::{
    GatewayError, GenerationResult, Logger, ModelDescriptor, ProviderId, ProviderOptions, Result,
    TokenUsage,
};

use crate::http::HttpBackend;
use crate::registry::{factory, ProviderFactory};
use crate::spec::find_by_id;
use crate::traits::LlmProvider;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// `max_tokens` is mandatory for Anthropic; used when the descriptor leaves it unset.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Small, cheap model used for health pings.
const HEALTH_MODEL: &str = "claude-3-5-haiku-20241022";

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [UserMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<Thinking>,
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Thinking {
    #[serde(rename = "type")]
    kind: &'static str,
    budget_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

// ─────────────────────────────────────────────
// AnthropicProvider
// ─────────────────────────────────────────────

#[derive(Debug)]
pub struct AnthropicProvider {
    backend: HttpBackend,
}

impl AnthropicProvider {
    pub fn new(config: &ProviderConfig, logger: &Logger) -> Result<Self> {
        let spec = find_by_id(&ProviderId::ANTHROPIC)
            .ok_or_else(|| GatewayError::UnknownProvider(ProviderId::ANTHROPIC))?;

        Ok(Self {
            backend: HttpBackend::new(config, spec, logger)?,
        })
    }

    fn build_request<'a>(&self, model: &'a ModelDescriptor, prompt: &'a str) -> MessagesRequest<'a> {
        let options = model.options();

        let thinking = match options.extensions {
            ProviderOptions::Anthropic {
                thinking_budget: Some(budget),
            } if budget > 0 => Some(Thinking {
                kind: "enabled",
                budget_tokens: budget,
            }),
            _ => None,
        };

        MessagesRequest {
            model: model.model_name(),
            max_tokens: options.max_tokens.filter(|n| *n > 0).unwrap_or(DEFAULT_MAX_TOKENS),
            system: model.system_prompt().filter(|s| !s.is_empty()),
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            thinking,
        }
    }

    async fn send(&self, request: &MessagesRequest<'_>) -> Result<MessagesResponse> {
        self.backend
            .send_json(
                self.backend
                    .client
                    .post(self.backend.url("v1/messages"))
                    .header("x-api-key", &self.backend.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(request),
            )
            .await
    }

    async fn complete(
        &self,
        model: &ModelDescriptor,
        request: &MessagesRequest<'_>,
    ) -> Result<GenerationResult> {
        let response = self.send(request).await?;
        normalize(model, response)
    }
}

fn normalize(model: &ModelDescriptor, response: MessagesResponse) -> Result<GenerationResult> {
    if response.content.is_empty() {
        return Err(GatewayError::EmptyResponse(
            "no response content returned from Anthropic".into(),
        ));
    }

    let mut text = String::new();
    let mut thinking = String::new();
    for block in response.content {
        match block {
            ContentBlock::Text { text: t } => text = t,
            ContentBlock::Thinking { thinking: t } => thinking = t,
            ContentBlock::Other => {}
        }
    }

    if text.is_empty() {
        return Err(GatewayError::EmptyResponse(
            "no text content found in Anthropic response".into(),
        ));
    }

    let mut result = GenerationResult::new(
        text,
        if response.model.is_empty() {
            model.model_name().to_string()
        } else {
            response.model
        },
    );
    result.finish_reason = response.stop_reason.unwrap_or_default();
    result.usage = TokenUsage::new(response.usage.input_tokens, response.usage.output_tokens);
    if !thinking.is_empty() {
        result.metadata.insert("thinking".to_string(), thinking);
    }

    Ok(result)
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn generate(
        &self,
        cancel: &CancellationToken,
        model: &ModelDescriptor,
        prompt: &str,
    ) -> Result<GenerationResult> {
        let request = self.build_request(model, prompt);

        self.backend.logger.in_scope(|| {
            debug!(
                model = model.model_name(),
                has_thinking = request.thinking.is_some(),
                "Making Anthropic API request"
            );
        });

        self.backend
            .run_generation(cancel, model, prompt, || self.complete(model, &request))
            .await
    }

    async fn health(&self, cancel: &CancellationToken) -> Result<()> {
        let ping = ModelDescriptor::new(ProviderId::ANTHROPIC, HEALTH_MODEL).with_max_tokens(5);
        let request = self.build_request(&ping, "Hello");

        self.backend
            .run_health(cancel, async { self.send(&request).await.map(|_| ()) })
            .await
    }

    fn display_name(&self) -> &str {
        self.backend.spec.display_name
    }
}

/// `(identifier, factory)` pair for the Anthropic adapter.
pub fn registration() -> (ProviderId, ProviderFactory) {
    (
        ProviderId::ANTHROPIC,
        factory(|config, logger| Ok(Arc::new(AnthropicProvider::new(config, logger)?))),
    )
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
