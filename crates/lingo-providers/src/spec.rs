//! Static specs for the built-in backends.
//!
//! Each `ProviderSpec` describes how to reach one vendor: its identifier,
//! display name, conventional credential env var and default API base.

use lingo_core::ProviderId;

// ─────────────────────────────────────────────
// ProviderSpec — static metadata for one provider
// ─────────────────────────────────────────────

/// Static specification describing one LLM backend.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    /// Identifier used in configs and descriptors (e.g. `"openai"`).
    pub id: ProviderId,
    /// Human-readable name for logs. E.g. `"OpenAI"`.
    pub display_name: &'static str,
    /// Conventional environment variable holding the credential, if the
    /// vendor has one.
    pub env_key: Option<&'static str>,
    /// Default API base URL.
    pub default_api_base: &'static str,
    /// Whether construction fails without an API key.
    pub requires_api_key: bool,
}

impl ProviderSpec {
    /// Resolve the API base: configured value first, then the spec default.
    /// Trailing slashes are stripped so paths can be appended directly.
    pub fn api_base(&self, configured: Option<&str>) -> String {
        configured
            .filter(|b| !b.is_empty())
            .unwrap_or(self.default_api_base)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Every built-in backend.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        id: ProviderId::OPENAI,
        display_name: "OpenAI",
        env_key: Some("OPENAI_API_KEY"),
        default_api_base: "https://api.openai.com/v1",
        requires_api_key: true,
    },
    ProviderSpec {
        id: ProviderId::ANTHROPIC,
        display_name: "Anthropic",
        env_key: Some("ANTHROPIC_API_KEY"),
        default_api_base: "https://api.anthropic.com",
        requires_api_key: true,
    },
    ProviderSpec {
        id: ProviderId::GOOGLE,
        display_name: "Google",
        env_key: Some("GEMINI_API_KEY"),
        default_api_base: "https://generativelanguage.googleapis.com/v1beta",
        requires_api_key: true,
    },
    ProviderSpec {
        id: ProviderId::PERPLEXITY,
        display_name: "Perplexity",
        env_key: Some("PERPLEXITY_API_KEY"),
        default_api_base: "https://api.perplexity.ai",
        requires_api_key: true,
    },
    ProviderSpec {
        id: ProviderId::OLLAMA,
        display_name: "Ollama",
        env_key: None,
        default_api_base: "http://localhost:11434",
        requires_api_key: false,
    },
    ProviderSpec {
        id: ProviderId::BEDROCK,
        display_name: "AWS Bedrock",
        env_key: Some("AWS_BEARER_TOKEN_BEDROCK"),
        default_api_base: "https://bedrock-runtime.us-east-1.amazonaws.com",
        // Bearer token optional: pre-signed SigV4 headers can come from
        // `extraHeaders` instead.
        requires_api_key: false,
    },
];

/// Find a provider spec by identifier.
pub fn find_by_id(id: &ProviderId) -> Option<&'static ProviderSpec> {
    PROVIDERS.iter().find(|s| &s.id == id)
}
