//! Shared CLI helpers — conventional key lookup, model defaults, result printing.

use colored::Colorize;
use tracing::debug;

use lingo_core::config::Config;
use lingo_core::{models, GenerationResult, ModelDescriptor, ProviderId};
use lingo_providers::PROVIDERS;

/// Fill missing API keys from each vendor's conventional env var
/// (e.g. `OPENAI_API_KEY`), creating the provider entry when needed.
///
/// Keys already present in the config (from the file or a `LINGO_` override)
/// are left alone. Providers without a conventional variable (Ollama) are
/// skipped.
pub fn apply_conventional_keys(config: &mut Config) {
    apply_keys_from(config, |var| std::env::var(var).ok());
}

fn apply_keys_from(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    for (spec, var) in PROVIDERS.iter().filter_map(|s| s.env_key.map(|k| (s, k))) {
        if config.provider(&spec.id).is_some_and(|c| c.is_configured()) {
            continue;
        }
        if let Some(key) = lookup(var).filter(|k| !k.is_empty()) {
            debug!("Using {} for {}", var, spec.id);
            config.provider_mut(&spec.id).api_key = key;
        }
    }
}

/// The model used when neither `--model` nor `defaultModel` names one.
pub fn default_model(provider: &ProviderId) -> Option<ModelDescriptor> {
    let model = match provider.as_str() {
        "openai" => models::gpt_4o_mini(),
        "anthropic" => models::claude_sonnet_4_5(),
        "google" => models::gemini_2_5_flash(),
        "perplexity" => models::sonar(),
        "ollama" => models::llama3_2(),
        "bedrock" => models::bedrock_claude_3_5_haiku(),
        _ => return None,
    };
    Some(model)
}

/// A descriptor for `model` carrying the provider's usual defaults.
pub fn descriptor_for(provider: &ProviderId, model: &str) -> ModelDescriptor {
    if *provider == ProviderId::BEDROCK {
        return ModelDescriptor::bedrock(model);
    }
    match default_model(provider) {
        Some(base) => base.with_model(model),
        None => ModelDescriptor::new(provider.clone(), model),
    }
}

/// Print a generation result to stdout.
pub fn print_result(result: &GenerationResult) {
    println!();
    if result.text.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{}", result.text);
    }
    println!();

    let provider = result
        .provider
        .as_ref()
        .map(ProviderId::to_string)
        .unwrap_or_default();
    eprintln!(
        "{}",
        format!(
            "{provider} · {} · {} tokens ({} in, {} out) · {}",
            result.model,
            result.usage.total_tokens,
            result.usage.prompt_tokens,
            result.usage.completion_tokens,
            result.finish_reason,
        )
        .dimmed()
    );
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
