//! Google Gemini adapter (Generative Language API, `generateContent`).

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

/// Header carrying the API key. Keeps the key out of URLs, which end up in
/// transport errors and logs.
const API_KEY_HEADER: &str = "x-goog-api-key";

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate_count: Option<u32>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop_sequences: &'a [String],
}

impl GenerationConfig<'_> {
    fn is_empty(&self) -> bool {
        self.max_output_tokens.is_none()
            && self.temperature.is_none()
            && self.top_p.is_none()
            && self.top_k.is_none()
            && self.candidate_count.is_none()
            && self.stop_sequences.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

// ─────────────────────────────────────────────
// GoogleProvider
// ─────────────────────────────────────────────

#[derive(Debug)]
pub struct GoogleProvider {
    backend: HttpBackend,
}

impl GoogleProvider {
    pub fn new(config: &ProviderConfig, logger: &Logger) -> Result<Self> {
        let spec = find_by_id(&ProviderId::GOOGLE)
            .ok_or_else(|| GatewayError::UnknownProvider(ProviderId::GOOGLE))?;

        Ok(Self {
            backend: HttpBackend::new(config, spec, logger)?,
        })
    }

    fn generate_url(&self, model: &str) -> String {
        self.backend.url(&format!("models/{model}:generateContent"))
    }

    fn build_request<'a>(
        &self,
        model: &'a ModelDescriptor,
        prompt: &'a str,
    ) -> GenerateContentRequest<'a> {
        let options = model.options();

        let mut config = GenerationConfig {
            max_output_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            ..Default::default()
        };
        if let ProviderOptions::Google {
            candidate_count,
            stop_sequences,
        } = &options.extensions
        {
            config.candidate_count = *candidate_count;
            config.stop_sequences = stop_sequences;
        }

        GenerateContentRequest {
            contents: [Content {
                role: Some("user"),
                parts: [TextPart { text: prompt }],
            }],
            system_instruction: model
                .system_prompt()
                .filter(|s| !s.is_empty())
                .map(|text| Content {
                    role: None,
                    parts: [TextPart { text }],
                }),
            generation_config: (!config.is_empty()).then_some(config),
        }
    }

    async fn complete(
        &self,
        model: &ModelDescriptor,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerationResult> {
        let response: GenerateContentResponse = self
            .backend
            .send_json(
                self.backend
                    .client
                    .post(self.generate_url(model.model_name()))
                    .header(API_KEY_HEADER, &self.backend.api_key)
                    .json(request),
            )
            .await?;

        normalize(model, response)
    }
}

fn normalize(model: &ModelDescriptor, response: GenerateContentResponse) -> Result<GenerationResult> {
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        GatewayError::EmptyResponse("no candidates returned from Google AI".into())
    })?;

    let parts = candidate
        .content
        .map(|c| c.parts)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| GatewayError::EmptyResponse("no content in Google AI response".into()))?;

    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    if text.is_empty() {
        return Err(GatewayError::EmptyResponse(
            "no text content found in Google AI response".into(),
        ));
    }

    let usage = response.usage_metadata.unwrap_or_default();
    let mut result = GenerationResult::new(
        text,
        response
            .model_version
            .unwrap_or_else(|| model.model_name().to_string()),
    );
    result.finish_reason = candidate
        .finish_reason
        .filter(|r| r != "FINISH_REASON_UNSPECIFIED")
        .unwrap_or_else(|| "stop".to_string());
    result.usage = TokenUsage {
        prompt_tokens: usage.prompt_token_count,
        completion_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
    };

    Ok(result)
}

#[async_trait]
impl LlmProvider for GoogleProvider {
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
        let check = self.backend.send_ok(
            self.backend
                .client
                .get(self.backend.url("models"))
                .header(API_KEY_HEADER, &self.backend.api_key),
        );

        self.backend.run_health(cancel, check).await
    }

    fn display_name(&self) -> &str {
        self.backend.spec.display_name
    }
}

/// `(identifier, factory)` pair for the Gemini adapter.
pub fn registration() -> (ProviderId, ProviderFactory) {
    (
        ProviderId::GOOGLE,
        factory(|config, logger| Ok(Arc::new(GoogleProvider::new(config, logger)?))),
    )
}
