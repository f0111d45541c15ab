//! Named constructors for commonly used models.
//!
//! Each function returns a [`ModelDescriptor`] with the provider defaults
//! applied. Any other model is one `ModelDescriptor::<provider>("name")` away.

use crate::types::{ModelDescriptor, ProviderOptions};

// ── OpenAI ──

pub fn gpt_4o() -> ModelDescriptor {
    ModelDescriptor::openai("gpt-4o")
}

pub fn gpt_4o_mini() -> ModelDescriptor {
    ModelDescriptor::openai("gpt-4o-mini")
}

pub fn gpt_4_1() -> ModelDescriptor {
    ModelDescriptor::openai("gpt-4.1")
}

/// Reasoning model: sampling parameters are not sent, the system prompt is
/// delivered with the `developer` role.
pub fn o3_mini() -> ModelDescriptor {
    ModelDescriptor::new(crate::ProviderId::OPENAI, "o3-mini").with_extensions(
        ProviderOptions::OpenAi {
            max_completion_tokens: Some(4096),
            reasoning_effort: Some("medium".into()),
        },
    )
}

// ── Anthropic ──

pub fn claude_sonnet_4_5() -> ModelDescriptor {
    ModelDescriptor::anthropic("claude-sonnet-4-5")
}

pub fn claude_haiku_4_5() -> ModelDescriptor {
    ModelDescriptor::anthropic("claude-haiku-4-5")
}

pub fn claude_opus_4_5() -> ModelDescriptor {
    ModelDescriptor::anthropic("claude-opus-4-5")
}

// ── Google ──

pub fn gemini_2_5_flash() -> ModelDescriptor {
    ModelDescriptor::google("gemini-2.5-flash")
}

pub fn gemini_2_5_pro() -> ModelDescriptor {
    ModelDescriptor::google("gemini-2.5-pro")
}

// ── Perplexity ──

pub fn sonar() -> ModelDescriptor {
    ModelDescriptor::perplexity("sonar")
}

pub fn sonar_pro() -> ModelDescriptor {
    ModelDescriptor::perplexity("sonar-pro")
}

pub fn sonar_reasoning() -> ModelDescriptor {
    ModelDescriptor::perplexity("sonar-reasoning")
}

// ── Ollama ──

pub fn llama3_2() -> ModelDescriptor {
    ModelDescriptor::ollama("llama3.2")
}

pub fn mistral() -> ModelDescriptor {
    ModelDescriptor::ollama("mistral")
}

// ── Bedrock ──

pub fn bedrock_claude_3_5_sonnet() -> ModelDescriptor {
    ModelDescriptor::bedrock("anthropic.claude-3-5-sonnet-20241022-v2:0")
}

pub fn bedrock_claude_3_5_haiku() -> ModelDescriptor {
    ModelDescriptor::bedrock("anthropic.claude-3-5-haiku-20241022-v1:0")
}

pub fn titan_text_express() -> ModelDescriptor {
    ModelDescriptor::bedrock("amazon.titan-text-express-v1")
}

pub fn bedrock_llama3_1_70b() -> ModelDescriptor {
    ModelDescriptor::bedrock("meta.llama3-1-70b-instruct-v1:0")
}

pub fn bedrock_mistral_large() -> ModelDescriptor {
    ModelDescriptor::bedrock("mistral.mistral-large-2402-v1:0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderId;

    #[test]
    fn test_catalog_providers() {
        assert_eq!(gpt_4o().provider(), &ProviderId::OPENAI);
        assert_eq!(claude_haiku_4_5().provider(), &ProviderId::ANTHROPIC);
        assert_eq!(gemini_2_5_pro().provider(), &ProviderId::GOOGLE);
        assert_eq!(sonar_pro().provider(), &ProviderId::PERPLEXITY);
        assert_eq!(llama3_2().model_name(), "llama3.2");
        assert_eq!(titan_text_express().provider(), &ProviderId::BEDROCK);
        assert_eq!(bedrock_llama3_1_70b().options().max_tokens, Some(2048));
    }

    #[test]
    fn test_reasoning_model_has_no_sampling_defaults() {
        let m = o3_mini();
        assert_eq!(m.options().temperature, None);
        assert!(matches!(
            m.options().extensions,
            ProviderOptions::OpenAi { .. }
        ));
    }
}
