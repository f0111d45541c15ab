//! Core value types — provider identity, model descriptors, and normalized results.
//!
//! A [`ModelDescriptor`] is what callers hand to the gateway: it names the
//! provider, the model string, and one shared [`GenerationOptions`] bundle.
//! Provider-specific knobs live in the [`ProviderOptions`] sum type instead of
//! one struct per model name.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

// ─────────────────────────────────────────────
// Provider identifier
// ─────────────────────────────────────────────

/// Opaque identifier naming one backend family (e.g. `"openai"`).
///
/// The well-known backends are exposed as constants; out-of-tree adapters can
/// use any identifier via [`ProviderId::new`]. Deserialization goes through
/// [`ProviderId::new`] too, so identifiers read from config are lowercased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ProviderId(Cow<'static, str>);

impl ProviderId {
    pub const OPENAI: ProviderId = ProviderId(Cow::Borrowed("openai"));
    pub const ANTHROPIC: ProviderId = ProviderId(Cow::Borrowed("anthropic"));
    pub const BEDROCK: ProviderId = ProviderId(Cow::Borrowed("bedrock"));
    pub const GOOGLE: ProviderId = ProviderId(Cow::Borrowed("google"));
    pub const PERPLEXITY: ProviderId = ProviderId(Cow::Borrowed("perplexity"));
    pub const OLLAMA: ProviderId = ProviderId(Cow::Borrowed("ollama"));

    /// Create an identifier from any string. Identifiers are lowercased.
    pub fn new(id: impl Into<String>) -> Self {
        ProviderId(Cow::Owned(id.into().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        ProviderId::new(s)
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        ProviderId::new(s)
    }
}

impl From<ProviderId> for String {
    fn from(id: ProviderId) -> Self {
        id.0.into_owned()
    }
}

// ─────────────────────────────────────────────
// Generation options
// ─────────────────────────────────────────────

/// Provider-specific generation knobs.
///
/// An adapter reads the variant matching its own provider and ignores the rest.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProviderOptions {
    #[default]
    None,
    /// OpenAI reasoning models (o-series, GPT-5).
    #[serde(rename_all = "camelCase")]
    OpenAi {
        max_completion_tokens: Option<u32>,
        /// `"low"`, `"medium"` or `"high"`.
        reasoning_effort: Option<String>,
    },
    /// Anthropic extended thinking. The budget must be >= 1024 and below `max_tokens`.
    #[serde(rename_all = "camelCase")]
    Anthropic { thinking_budget: Option<u32> },
    #[serde(rename_all = "camelCase")]
    Google {
        candidate_count: Option<u32>,
        stop_sequences: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Perplexity {
        /// `"hour"`, `"day"`, `"week"` or `"month"`.
        search_recency_filter: Option<String>,
        search_domain_filter: Vec<String>,
        return_images: bool,
        return_related_questions: bool,
    },
    /// AWS Bedrock Converse. `additional_model_request_fields` is passed
    /// through verbatim to the model (e.g. `{"top_k": 200}` for Claude).
    #[serde(rename_all = "camelCase")]
    Bedrock {
        stop_sequences: Vec<String>,
        additional_model_request_fields: Option<serde_json::Value>,
    },
    #[serde(rename_all = "camelCase")]
    Ollama {
        num_ctx: Option<u32>,
        repeat_penalty: Option<f64>,
        seed: Option<i64>,
    },
}

/// The generation parameters shared by every provider.
///
/// `None` means "let the vendor decide"; no ranges are validated here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub system_prompt: Option<String>,
    pub extensions: ProviderOptions,
}

/// Model family of a Bedrock model id.
///
/// Recognized anywhere in the id, so cross-region inference profiles
/// (`us.anthropic.…`) and ARNs classify the same as bare ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BedrockFamily {
    Claude,
    Titan,
    Llama,
    Mistral,
    Other,
}

impl BedrockFamily {
    pub fn of(model_id: &str) -> Self {
        if model_id.contains("anthropic.") {
            Self::Claude
        } else if model_id.contains("amazon.titan") {
            Self::Titan
        } else if model_id.contains("meta.llama") {
            Self::Llama
        } else if model_id.contains("mistral.") {
            Self::Mistral
        } else {
            Self::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Titan => "titan",
            Self::Llama => "llama",
            Self::Mistral => "mistral",
            Self::Other => "other",
        }
    }
}

// ─────────────────────────────────────────────
// Model descriptor
// ─────────────────────────────────────────────

/// A model plus the options to call it with.
///
/// Descriptors are plain values: every `with_*` method consumes the descriptor
/// and returns a new one, so a descriptor shared between concurrent calls can
/// never be mutated underneath them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    provider: ProviderId,
    model: String,
    #[serde(default)]
    options: GenerationOptions,
}

impl ModelDescriptor {
    /// A descriptor with no options set.
    pub fn new(provider: ProviderId, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            options: GenerationOptions::default(),
        }
    }

    pub fn openai(model: impl Into<String>) -> Self {
        Self::new(ProviderId::OPENAI, model)
            .with_max_tokens(4096)
            .with_temperature(0.7)
    }

    pub fn anthropic(model: impl Into<String>) -> Self {
        Self::new(ProviderId::ANTHROPIC, model)
            .with_max_tokens(4096)
            .with_temperature(1.0)
    }

    pub fn google(model: impl Into<String>) -> Self {
        Self::new(ProviderId::GOOGLE, model)
            .with_max_tokens(4096)
            .with_temperature(0.7)
    }

    pub fn perplexity(model: impl Into<String>) -> Self {
        Self::new(ProviderId::PERPLEXITY, model)
            .with_max_tokens(4096)
            .with_temperature(0.7)
    }

    pub fn ollama(model: impl Into<String>) -> Self {
        Self::new(ProviderId::OLLAMA, model)
            .with_max_tokens(4096)
            .with_temperature(0.8)
    }

    /// A Bedrock model id (e.g. `"anthropic.claude-3-5-haiku-20241022-v1:0"`),
    /// with the defaults of its model family.
    pub fn bedrock(model: impl Into<String>) -> Self {
        let model = model.into();
        let (max_tokens, temperature) = match BedrockFamily::of(&model) {
            BedrockFamily::Claude => (4096, 1.0),
            BedrockFamily::Llama => (2048, 0.6),
            BedrockFamily::Titan | BedrockFamily::Mistral | BedrockFamily::Other => (4096, 0.7),
        };
        Self::new(ProviderId::BEDROCK, model)
            .with_max_tokens(max_tokens)
            .with_temperature(temperature)
    }

    /// The API model identifier (e.g. `"gpt-4o"`).
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// The provider this model must be dispatched to.
    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    /// The system prompt, if one is set.
    pub fn system_prompt(&self) -> Option<&str> {
        self.options.system_prompt.as_deref()
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Pin a specific model version (e.g. `"claude-3-5-sonnet-latest"`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, n: u32) -> Self {
        self.options.max_tokens = Some(n);
        self
    }

    pub fn with_temperature(mut self, t: f64) -> Self {
        self.options.temperature = Some(t);
        self
    }

    pub fn with_top_p(mut self, p: f64) -> Self {
        self.options.top_p = Some(p);
        self
    }

    pub fn with_top_k(mut self, k: u32) -> Self {
        self.options.top_k = Some(k);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.options.system_prompt = Some(prompt.into());
        self
    }

    /// Replace the provider-specific extension block.
    pub fn with_extensions(mut self, extensions: ProviderOptions) -> Self {
        self.options.extensions = extensions;
        self
    }
}

// ─────────────────────────────────────────────
// Generation result
// ─────────────────────────────────────────────

/// Token usage reported by the vendor. Zero-filled when not reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Usage from prompt/completion counts, with the total derived.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Normalized output of one generation call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// The generated text.
    pub text: String,
    /// The provider that answered. Set by the gateway, not by adapters.
    pub provider: Option<ProviderId>,
    /// The model the vendor reports having used.
    pub model: String,
    /// Why generation stopped (vendor vocabulary, e.g. `"stop"`, `"end_turn"`).
    pub finish_reason: String,
    pub usage: TokenUsage,
    /// Provider-specific extras (citations, thinking traces, raw identifiers).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl GenerationResult {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
