//! HTTP provider for OpenAI-compatible `/chat/completions` APIs.
//!
//! Serves two backends that share the wire format:
//! - **OpenAI** — reasoning options switch the system role to `developer` and
//!   send `max_completion_tokens` / `reasoning_effort` instead of sampling knobs.
//! - **Perplexity** — adds search filters and returns citations, related
//!   questions and images alongside the answer.

use std::collections::HashMap;
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

/// Model used for Perplexity health pings (it has no `/models` endpoint).
const PERPLEXITY_HEALTH_MODEL: &str = "sonar";

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Default, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_recency_filter: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_domain_filter: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_images: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_related_questions: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    // Perplexity extras.
    #[serde(default)]
    citations: Vec<String>,
    #[serde(default)]
    related_questions: Vec<String>,
    #[serde(default)]
    images: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
    completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionTokensDetails {
    #[serde(default)]
    reasoning_tokens: u32,
}

/// Reasoning mode is on when either reasoning knob is set.
fn reasoning_requested(extensions: &ProviderOptions) -> bool {
    matches!(
        extensions,
        ProviderOptions::OpenAi { max_completion_tokens, reasoning_effort }
            if max_completion_tokens.is_some() || reasoning_effort.is_some()
    )
}

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// An LLM provider that talks to an OpenAI-compatible HTTP API.
#[derive(Debug)]
pub struct HttpProvider {
    backend: HttpBackend,
}

impl HttpProvider {
    /// Create a provider for `config.provider` (`openai` or `perplexity`).
    pub fn new(config: &ProviderConfig, logger: &Logger) -> Result<Self> {
        let spec = find_by_id(&config.provider)
            .filter(|s| s.id == ProviderId::OPENAI || s.id == ProviderId::PERPLEXITY)
            .ok_or_else(|| {
                GatewayError::Config(format!(
                    "{} is not an OpenAI-compatible provider",
                    config.provider
                ))
            })?;

        Ok(Self {
            backend: HttpBackend::new(config, spec, logger)?,
        })
    }

    fn is_perplexity(&self) -> bool {
        self.backend.provider() == &ProviderId::PERPLEXITY
    }

    fn completions_url(&self) -> String {
        self.backend.url("chat/completions")
    }

    /// Build the request body for `model` and `prompt`.
    fn build_request<'a>(
        &self,
        model: &'a ModelDescriptor,
        prompt: &'a str,
    ) -> ChatCompletionRequest<'a> {
        let options = model.options();
        let mut request = ChatCompletionRequest {
            model: model.model_name(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            ..Default::default()
        };

        let mut system_role = "system";

        match &options.extensions {
            ProviderOptions::OpenAi {
                max_completion_tokens,
                reasoning_effort,
            } if !self.is_perplexity() && reasoning_requested(&options.extensions) => {
                // Reasoning models reject sampling knobs and the `system` role.
                system_role = "developer";
                request.max_tokens = None;
                request.temperature = None;
                request.top_p = None;
                request.max_completion_tokens = max_completion_tokens.or(options.max_tokens);
                request.reasoning_effort = reasoning_effort.as_deref();
            }
            ProviderOptions::Perplexity {
                search_recency_filter,
                search_domain_filter,
                return_images,
                return_related_questions,
            } if self.is_perplexity() => {
                request.search_recency_filter = search_recency_filter.as_deref();
                if !search_domain_filter.is_empty() {
                    request.search_domain_filter = Some(search_domain_filter.as_slice());
                }
                request.return_images = return_images.then_some(true);
                request.return_related_questions = return_related_questions.then_some(true);
            }
            _ => {}
        }

        if self.is_perplexity() {
            request.top_k = options.top_k;
        }

        if let Some(system) = model.system_prompt().filter(|s| !s.is_empty()) {
            request.messages.push(ChatMessage {
                role: system_role,
                content: system,
            });
        }
        request.messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        request
    }

    /// One attempt: send the request and normalize the response.
    async fn complete(
        &self,
        model: &ModelDescriptor,
        request: &ChatCompletionRequest<'_>,
    ) -> Result<GenerationResult> {
        let response: ChatCompletionResponse = self
            .backend
            .send_json(
                self.backend
                    .client
                    .post(self.completions_url())
                    .bearer_auth(&self.backend.api_key)
                    .json(request),
            )
            .await?;

        self.normalize(model, response)
    }

    fn normalize(
        &self,
        model: &ModelDescriptor,
        response: ChatCompletionResponse,
    ) -> Result<GenerationResult> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            GatewayError::EmptyResponse(format!(
                "no choices in {} response",
                self.backend.spec.display_name
            ))
        })?;

        let usage = response.usage.unwrap_or_default();
        let model_name = if response.model.is_empty() {
            model.model_name().to_string()
        } else {
            response.model
        };

        let mut metadata = HashMap::new();

        if reasoning_requested(&model.options().extensions) && !self.is_perplexity() {
            metadata.insert("is_reasoning_model".to_string(), "true".to_string());
        }
        if let Some(details) = usage.completion_tokens_details.as_ref() {
            if details.reasoning_tokens > 0 {
                metadata.insert(
                    "reasoning_tokens".to_string(),
                    details.reasoning_tokens.to_string(),
                );
            }
        }

        if self.is_perplexity() {
            if !response.id.is_empty() {
                metadata.insert("id".to_string(), response.id);
            }
            if !response.citations.is_empty() {
                metadata.insert("citations_count".to_string(), response.citations.len().to_string());
                metadata.insert("citations".to_string(), to_json(&response.citations));
            }
            if !response.related_questions.is_empty() {
                metadata.insert(
                    "related_questions".to_string(),
                    to_json(&response.related_questions),
                );
            }
            if !response.images.is_empty() {
                metadata.insert("images".to_string(), to_json(&response.images));
            }
        }

        let mut usage_out = TokenUsage::new(usage.prompt_tokens, usage.completion_tokens);
        if usage.total_tokens > 0 {
            usage_out.total_tokens = usage.total_tokens;
        }

        Ok(GenerationResult {
            text: choice.message.content.unwrap_or_default(),
            provider: None,
            model: model_name,
            finish_reason: choice.finish_reason.unwrap_or_default(),
            usage: usage_out,
            metadata,
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[async_trait]
impl LlmProvider for HttpProvider {
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
        let check = async {
            if self.is_perplexity() {
                let ping = ModelDescriptor::perplexity(PERPLEXITY_HEALTH_MODEL).with_max_tokens(5);
                let request = self.build_request(&ping, "ping");
                self.complete(&ping, &request).await.map(|_| ())
            } else {
                self.backend
                    .send_ok(
                        self.backend
                            .client
                            .get(self.backend.url("models"))
                            .bearer_auth(&self.backend.api_key),
                    )
                    .await
            }
        };

        self.backend.run_health(cancel, check).await
    }

    fn display_name(&self) -> &str {
        self.backend.spec.display_name
    }
}

// ─────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────

/// `(identifier, factory)` pairs for the OpenAI-compatible backends.
pub fn registrations() -> Vec<(ProviderId, ProviderFactory)> {
    [ProviderId::OPENAI, ProviderId::PERPLEXITY]
        .into_iter()
        .map(|id| {
            let factory = factory(|config, logger| Ok(Arc::new(HttpProvider::new(config, logger)?)));
            (id, factory)
        })
        .collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lingo_core::config::RetryConfig;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            backoff_multiplier: 2.0,
        }
    }

    fn make_provider(id: ProviderId, api_base: &str) -> HttpProvider {
        let config = ProviderConfig::new(id)
            .with_api_key("test-key-123")
            .with_api_base(api_base)
            .with_retry(fast_retry());
        HttpProvider::new(&config, &Logger::noop()).unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-test",
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "message": { "content": content },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 5,
                "total_tokens": 15
            }
        })
    }

    // ── Unit tests ──

    #[test]
    fn test_completions_url_trailing_slash() {
        let provider = make_provider(ProviderId::OPENAI, "https://api.openai.com/v1/");
        assert_eq!(
            provider.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_default_api_base() {
        let config = ProviderConfig::new(ProviderId::PERPLEXITY).with_api_key("pplx");
        let provider = HttpProvider::new(&config, &Logger::noop()).unwrap();
        assert_eq!(
            provider.completions_url(),
            "https://api.perplexity.ai/chat/completions"
        );
        assert_eq!(provider.display_name(), "Perplexity");
    }

    #[test]
    fn test_rejects_foreign_provider() {
        let config = ProviderConfig::new(ProviderId::ANTHROPIC).with_api_key("k");
        let err = HttpProvider::new(&config, &Logger::noop()).unwrap_err();
        assert!(err.to_string().contains("not an OpenAI-compatible provider"));
    }

    #[test]
    fn test_requires_api_key() {
        let config = ProviderConfig::new(ProviderId::OPENAI);
        let err = HttpProvider::new(&config, &Logger::noop()).unwrap_err();
        assert_eq!(err.to_string(), "OpenAI API key is required");
    }

    #[test]
    fn test_reasoning_request_shape() {
        let provider = make_provider(ProviderId::OPENAI, "http://unused");
        let model = lingo_core::models::o3_mini().with_system_prompt("Be terse.");
        let body = serde_json::to_value(provider.build_request(&model, "hi")).unwrap();

        assert_eq!(body["messages"][0]["role"], "developer");
        assert_eq!(body["max_completion_tokens"], 4096);
        assert_eq!(body["reasoning_effort"], "medium");
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_empty_openai_extension_keeps_chat_shape() {
        let provider = make_provider(ProviderId::OPENAI, "http://unused");
        let model = ModelDescriptor::openai("gpt-4o")
            .with_system_prompt("be brief")
            .with_extensions(ProviderOptions::OpenAi {
                max_completion_tokens: None,
                reasoning_effort: None,
            });
        let body = serde_json::to_value(provider.build_request(&model, "hi")).unwrap();

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["temperature"], 0.7);
        assert!(body.get("max_completion_tokens").is_none());
        assert!(body.get("reasoning_effort").is_none());
    }

    #[tokio::test]
    async fn test_empty_openai_extension_not_reasoning_model() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .mount(&mock_server)
            .await;

        let provider = make_provider(ProviderId::OPENAI, &mock_server.uri());
        let model = ModelDescriptor::openai("gpt-4o").with_extensions(ProviderOptions::OpenAi {
            max_completion_tokens: None,
            reasoning_effort: None,
        });
        let result = provider
            .generate(&CancellationToken::new(), &model, "hi")
            .await
            .unwrap();

        assert!(!result.metadata.contains_key("is_reasoning_model"));
    }

    #[test]
    fn test_openai_ignores_top_k() {
        let provider = make_provider(ProviderId::OPENAI, "http://unused");
        let model = ModelDescriptor::openai("gpt-4o").with_top_k(40);
        let body = serde_json::to_value(provider.build_request(&model, "hi")).unwrap();
        assert!(body.get("top_k").is_none());
        assert_eq!(body["messages"][0]["role"], "user");
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn test_generate_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key-123"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "max_tokens": 4096,
                "messages": [
                    { "role": "system", "content": "You are helpful." },
                    { "role": "user", "content": "Hello" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hi there!")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = make_provider(ProviderId::OPENAI, &mock_server.uri());
        let model = ModelDescriptor::openai("gpt-4o").with_system_prompt("You are helpful.");

        let result = provider
            .generate(&CancellationToken::new(), &model, "Hello")
            .await
            .unwrap();

        assert_eq!(result.text, "Hi there!");
        assert_eq!(result.model, "gpt-4o-2024-08-06");
        assert_eq!(result.finish_reason, "stop");
        assert_eq!(result.usage.total_tokens, 15);
        assert!(result.provider.is_none());
        assert!(result.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_generate_reasoning_metadata() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "o3-mini",
                "choices": [{ "message": { "content": "42" }, "finish_reason": "stop" }],
                "usage": {
                    "prompt_tokens": 12,
                    "completion_tokens": 300,
                    "total_tokens": 312,
                    "completion_tokens_details": { "reasoning_tokens": 256 }
                }
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(ProviderId::OPENAI, &mock_server.uri());
        let result = provider
            .generate(&CancellationToken::new(), &lingo_core::models::o3_mini(), "6*7?")
            .await
            .unwrap();

        assert_eq!(result.metadata["is_reasoning_model"], "true");
        assert_eq!(result.metadata["reasoning_tokens"], "256");
    }

    #[tokio::test]
    async fn test_perplexity_search_options_and_metadata() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "sonar",
                "search_recency_filter": "week",
                "search_domain_filter": ["rust-lang.org"],
                "return_related_questions": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pplx-123",
                "model": "sonar",
                "choices": [{ "message": { "content": "Rust 1.80 shipped." }, "finish_reason": "stop" }],
                "usage": { "prompt_tokens": 8, "completion_tokens": 6, "total_tokens": 14 },
                "citations": ["https://blog.rust-lang.org/a", "https://blog.rust-lang.org/b"],
                "related_questions": ["What is new in Rust 1.81?"]
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(ProviderId::PERPLEXITY, &mock_server.uri());
        let model = ModelDescriptor::perplexity("sonar").with_extensions(ProviderOptions::Perplexity {
            search_recency_filter: Some("week".into()),
            search_domain_filter: vec!["rust-lang.org".into()],
            return_images: false,
            return_related_questions: true,
        });

        let result = provider
            .generate(&CancellationToken::new(), &model, "What's new in Rust?")
            .await
            .unwrap();

        assert_eq!(result.metadata["id"], "pplx-123");
        assert_eq!(result.metadata["citations_count"], "2");
        let citations: Vec<String> = serde_json::from_str(&result.metadata["citations"]).unwrap();
        assert_eq!(citations.len(), 2);
        assert!(result.metadata.contains_key("related_questions"));
        assert!(!result.metadata.contains_key("images"));
    }

    #[tokio::test]
    async fn test_rate_limited_then_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit exceeded", "type": "rate_limit_error" }
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("second time lucky")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = make_provider(ProviderId::OPENAI, &mock_server.uri());
        let result = provider
            .generate(&CancellationToken::new(), &ModelDescriptor::openai("gpt-4o"), "Hello")
            .await
            .unwrap();

        assert_eq!(result.text, "second time lucky");
    }

    #[tokio::test]
    async fn test_auth_error_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = make_provider(ProviderId::OPENAI, &mock_server.uri());
        let err = provider
            .generate(&CancellationToken::new(), &ModelDescriptor::openai("gpt-4o"), "Hello")
            .await
            .unwrap_err();

        match err {
            GatewayError::Generation { provider, source } => {
                assert_eq!(provider, ProviderId::OPENAI);
                assert!(matches!(*source, GatewayError::Api { status: 401, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retries_exhausted_surfaces_last_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("too many requests"))
            .expect(3)
            .mount(&mock_server)
            .await;

        let provider = make_provider(ProviderId::OPENAI, &mock_server.uri());
        let err = provider
            .generate(&CancellationToken::new(), &ModelDescriptor::openai("gpt-4o"), "Hello")
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "openai generation failed: openai API error (status 429): too many requests"
        );
    }

    #[tokio::test]
    async fn test_network_error() {
        // Point to a port that's not listening
        let provider = make_provider(ProviderId::OPENAI, "http://127.0.0.1:1");
        let err = provider
            .generate(&CancellationToken::new(), &ModelDescriptor::openai("gpt-4o"), "Hello")
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("openai generation failed: request failed"));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = make_provider(ProviderId::OPENAI, &mock_server.uri());
        let err = provider
            .generate(&CancellationToken::new(), &ModelDescriptor::openai("gpt-4o"), "Hello")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no choices in OpenAI response"));
    }

    #[tokio::test]
    async fn test_timeout_not_wrapped() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("late"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let config = ProviderConfig::new(ProviderId::OPENAI)
            .with_api_key("k")
            .with_api_base(mock_server.uri())
            .with_timeout(Duration::from_secs(1));
        let provider = HttpProvider::new(&config, &Logger::noop()).unwrap();

        let err = provider
            .generate(&CancellationToken::new(), &ModelDescriptor::openai("gpt-4o"), "Hello")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_cancelled_token() {
        let provider = make_provider(ProviderId::OPENAI, "http://127.0.0.1:1");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = provider
            .generate(&cancel, &ModelDescriptor::openai("gpt-4o"), "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled));
    }

    #[tokio::test]
    async fn test_health_lists_models() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .and(header("Authorization", "Bearer test-key-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list", "data": []
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = make_provider(ProviderId::OPENAI, &mock_server.uri());
        provider.health(&CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_perplexity_health_pings() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({ "model": "sonar", "max_tokens": 5 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("pong")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = make_provider(ProviderId::PERPLEXITY, &mock_server.uri());
        provider.health(&CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_descriptor_for_other_provider() {
        let provider = make_provider(ProviderId::OPENAI, "http://127.0.0.1:1");
        let err = provider
            .generate(
                &CancellationToken::new(),
                &ModelDescriptor::perplexity("sonar"),
                "Hello",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
