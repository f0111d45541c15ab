//! Ollama adapter — local models over `POST /api/chat` (non-streaming).
//!
//! No API key is needed. Only options with a positive value are sent, and the
//! `options` object is omitted entirely when none are.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use lingo_core::config::ProviderConfig;
use lingo_core::{
    GatewayError, GenerationResult, Logger, ModelDescriptor, ProviderId, ProviderOptions, Result,
    TokenUsage,
};

use crate::http::HttpBackend;
use crate::registry::{factory, ProviderFactory};
use crate::spec::find_by_id;
use crate::traits::LlmProvider;

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ModelOptions>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Default, PartialEq, Serialize)]
struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_ctx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    message: Option<ResponseMessage>,
    #[serde(default)]
    done_reason: String,
    #[serde(default)]
    total_duration: u64,
    #[serde(default)]
    load_duration: u64,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

fn positive_u32(v: Option<u32>) -> Option<u32> {
    v.filter(|n| *n > 0)
}

fn positive_f64(v: Option<f64>) -> Option<f64> {
    v.filter(|n| *n > 0.0)
}

// ─────────────────────────────────────────────
// OllamaProvider
// ─────────────────────────────────────────────

#[derive(Debug)]
pub struct OllamaProvider {
    backend: HttpBackend,
}

impl OllamaProvider {
    pub fn new(config: &ProviderConfig, logger: &Logger) -> Result<Self> {
        let spec = find_by_id(&ProviderId::OLLAMA)
            .ok_or_else(|| GatewayError::UnknownProvider(ProviderId::OLLAMA))?;

        Ok(Self {
            backend: HttpBackend::new(config, spec, logger)?,
        })
    }

    fn build_request<'a>(&self, model: &'a ModelDescriptor, prompt: &'a str) -> ChatRequest<'a> {
        let opts = model.options();

        let mut options = ModelOptions {
            num_predict: positive_u32(opts.max_tokens),
            temperature: positive_f64(opts.temperature),
            top_p: positive_f64(opts.top_p),
            top_k: positive_u32(opts.top_k),
            ..Default::default()
        };
        if let ProviderOptions::Ollama {
            num_ctx,
            repeat_penalty,
            seed,
        } = opts.extensions
        {
            options.num_ctx = positive_u32(num_ctx);
            options.repeat_penalty = positive_f64(repeat_penalty);
            options.seed = seed.filter(|s| *s > 0);
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = model.system_prompt().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        ChatRequest {
            model: model.model_name(),
            messages,
            stream: false,
            options: (options != ModelOptions::default()).then_some(options),
        }
    }

    async fn complete(
        &self,
        model: &ModelDescriptor,
        request: &ChatRequest<'_>,
    ) -> Result<GenerationResult> {
        let response: ChatResponse = self
            .backend
            .send_json(
                self.backend
                    .client
                    .post(self.backend.url("api/chat"))
                    .json(request),
            )
            .await?;

        let mut result = GenerationResult::new(
            response.message.map(|m| m.content).unwrap_or_default(),
            if response.model.is_empty() {
                model.model_name().to_string()
            } else {
                response.model
            },
        )
        .with_metadata("total_duration", response.total_duration.to_string())
        .with_metadata("load_duration", response.load_duration.to_string());
        result.finish_reason = response.done_reason;
        result.usage = TokenUsage::new(response.prompt_eval_count, response.eval_count);

        Ok(result)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(
        &self,
        cancel: &CancellationToken,
        model: &ModelDescriptor,
        prompt: &str,
    ) -> Result<GenerationResult> {
        let request = self.build_request(model, prompt);

        self.backend
            .run_generation(cancel, model, prompt, || self.complete(model, &request))
            .await
    }

    async fn health(&self, cancel: &CancellationToken) -> Result<()> {
        let check = self
            .backend
            .send_ok(self.backend.client.get(self.backend.url("api/tags")));

        self.backend.run_health(cancel, check).await
    }

    fn display_name(&self) -> &str {
        self.backend.spec.display_name
    }
}

/// `(identifier, factory)` pair for the Ollama adapter.
pub fn registration() -> (ProviderId, ProviderFactory) {
    (
        ProviderId::OLLAMA,
        factory(|config, logger| Ok(Arc::new(OllamaProvider::new(config, logger)?))),
    )
}
