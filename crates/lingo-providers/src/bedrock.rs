//! AWS Bedrock adapter over the Converse API.
//!
//! Sends `POST /model/{modelId}/converse`. The API key, when set, is sent as a
//! Bedrock bearer token; deployments that sign requests elsewhere can supply the
//! SigV4 headers through `extraHeaders` and leave the key empty.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use lingo_core::config::ProviderConfig;
use lingo_core::{
    BedrockFamily, GatewayError, GenerationResult, Logger, ModelDescriptor, ProviderId,
    ProviderOptions, Result, TokenUsage,
};

use crate::http::HttpBackend;
use crate::registry::{factory, ProviderFactory};
use crate::spec::find_by_id;
use crate::traits::LlmProvider;

/// Small, cheap model used for health pings.
const HEALTH_MODEL: &str = "amazon.titan-text-lite-v1";

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<TextBlock<'a>>,
    messages: [Message<'a>; 1],
    inference_config: InferenceConfig<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_model_request_fields: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct TextBlock<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: [TextBlock<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop_sequences: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseResponse {
    output: Option<Output>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
    metrics: Option<Metrics>,
}

#[derive(Debug, Deserialize)]
struct Output {
    message: Option<OutputMessage>,
}

#[derive(Debug, Deserialize)]
struct OutputMessage {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

/// Text blocks carry `text`; reasoning and tool blocks do not.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metrics {
    latency_ms: u64,
}

// ─────────────────────────────────────────────
// BedrockProvider
// ─────────────────────────────────────────────

#[derive(Debug)]
pub struct BedrockProvider {
    backend: HttpBackend,
}

impl BedrockProvider {
    pub fn new(config: &ProviderConfig, logger: &Logger) -> Result<Self> {
        let spec = find_by_id(&ProviderId::BEDROCK)
            .ok_or_else(|| GatewayError::UnknownProvider(ProviderId::BEDROCK))?;

        Ok(Self {
            backend: HttpBackend::new(config, spec, logger)?,
        })
    }

    /// `{api_base}/model/{model}/converse`, with the model id percent-encoded
    /// as one path segment so ARNs survive.
    fn converse_url(&self, model: &str) -> Result<Url> {
        let mut url = Url::parse(&self.backend.api_base).map_err(|e| {
            GatewayError::Config(format!("invalid Bedrock API base {}: {e}", self.backend.api_base))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                GatewayError::Config(format!("invalid Bedrock API base {}", self.backend.api_base))
            })?
            .pop_if_empty()
            .extend(["model", model, "converse"]);
        Ok(url)
    }

    fn build_request<'a>(&self, model: &'a ModelDescriptor, prompt: &'a str) -> ConverseRequest<'a> {
        let options = model.options();

        let (stop_sequences, extra_fields): (&[String], _) = match &options.extensions {
            ProviderOptions::Bedrock {
                stop_sequences,
                additional_model_request_fields,
            } => (stop_sequences.as_slice(), additional_model_request_fields.clone()),
            _ => (&[], None),
        };

        // Converse has no top-k knob; it travels as a model-specific field.
        let mut additional = extra_fields.unwrap_or_else(|| serde_json::json!({}));
        if let (Some(k), Some(fields)) = (options.top_k, additional.as_object_mut()) {
            fields.entry("top_k").or_insert_with(|| k.into());
        }
        let additional = match additional.as_object() {
            Some(fields) if fields.is_empty() => None,
            _ => Some(additional),
        };

        ConverseRequest {
            system: model
                .system_prompt()
                .filter(|s| !s.is_empty())
                .map(|text| vec![TextBlock { text }])
                .unwrap_or_default(),
            messages: [Message {
                role: "user",
                content: [TextBlock { text: prompt }],
            }],
            inference_config: InferenceConfig {
                max_tokens: options.max_tokens.filter(|n| *n > 0),
                temperature: options.temperature,
                top_p: options.top_p,
                stop_sequences,
            },
            additional_model_request_fields: additional,
        }
    }

    async fn send(&self, model: &str, request: &ConverseRequest<'_>) -> Result<ConverseResponse> {
        let mut builder = self
            .backend
            .client
            .post(self.converse_url(model)?)
            .json(request);
        if !self.backend.api_key.is_empty() {
            builder = builder.bearer_auth(&self.backend.api_key);
        }
        self.backend.send_json(builder).await
    }

    async fn complete(
        &self,
        model: &ModelDescriptor,
        request: &ConverseRequest<'_>,
    ) -> Result<GenerationResult> {
        let response = self.send(model.model_name(), request).await?;
        normalize(model, response)
    }
}

fn normalize(model: &ModelDescriptor, response: ConverseResponse) -> Result<GenerationResult> {
    let content = response
        .output
        .and_then(|o| o.message)
        .map(|m| m.content)
        .unwrap_or_default();
    if content.is_empty() {
        return Err(GatewayError::EmptyResponse(
            "no content in Bedrock response".into(),
        ));
    }

    let text: String = content.into_iter().filter_map(|b| b.text).collect();
    if text.is_empty() {
        return Err(GatewayError::EmptyResponse(
            "no text content found in Bedrock response".into(),
        ));
    }

    let mut result = GenerationResult::new(text, model.model_name());
    result.finish_reason = response.stop_reason.unwrap_or_default();
    result.usage = TokenUsage::new(response.usage.input_tokens, response.usage.output_tokens);
    result.metadata.insert(
        "family".to_string(),
        BedrockFamily::of(model.model_name()).as_str().to_string(),
    );
    if let Some(metrics) = response.metrics {
        result
            .metadata
            .insert("latency_ms".to_string(), metrics.latency_ms.to_string());
    }

    Ok(result)
}

#[async_trait]
impl LlmProvider for BedrockProvider {
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
                family = BedrockFamily::of(model.model_name()).as_str(),
                "Making Bedrock Converse request"
            );
        });

        self.backend
            .run_generation(cancel, model, prompt, || self.complete(model, &request))
            .await
    }

    async fn health(&self, cancel: &CancellationToken) -> Result<()> {
        let ping = ModelDescriptor::bedrock(HEALTH_MODEL).with_max_tokens(5);
        let request = self.build_request(&ping, "Hello");

        self.backend
            .run_health(cancel, async {
                self.send(HEALTH_MODEL, &request).await.map(|_| ())
            })
            .await
    }

    fn display_name(&self) -> &str {
        self.backend.spec.display_name
    }
}

/// `(identifier, factory)` pair for the Bedrock adapter.
pub fn registration() -> (ProviderId, ProviderFactory) {
    (
        ProviderId::BEDROCK,
        factory(|config, logger| Ok(Arc::new(BedrockProvider::new(config, logger)?))),
    )
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
