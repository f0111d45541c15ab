//! `lingo generate` — one prompt, one completion.

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;

use lingo_core::config::Config;
use lingo_core::{ModelDescriptor, ProviderId};
use lingo_providers::Gateway;

use crate::helpers;

/// Arguments of the `generate` command.
pub struct GenerateArgs {
    pub prompt: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub json: bool,
}

/// Run the generate command.
pub async fn run(
    gateway: &Gateway,
    config: &Config,
    args: GenerateArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let model = resolve_model(config, &args)?;

    let result = gateway
        .generate(cancel, &model, &args.prompt)
        .await
        .with_context(|| format!("generation with {} failed", model.provider()))?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&result).context("failed to serialize result")?;
        println!("{json}");
    } else {
        helpers::print_result(&result);
    }

    Ok(())
}

/// Work out the descriptor from flags first, then config defaults.
fn resolve_model(config: &Config, args: &GenerateArgs) -> Result<ModelDescriptor> {
    let provider = match (&args.provider, &config.default_provider) {
        (Some(p), _) => ProviderId::new(p.as_str()),
        (None, Some(p)) => p.clone(),
        (None, None) => bail!("no provider given: pass --provider or set defaultProvider"),
    };

    let mut model = match args.model.as_deref().or(config.default_model.as_deref()) {
        Some(name) => helpers::descriptor_for(&provider, name),
        None => match helpers::default_model(&provider) {
            Some(model) => model,
            None => bail!("no default model for {provider}: pass --model"),
        },
    };

    if let Some(system) = &args.system {
        model = model.with_system_prompt(system.as_str());
    }
    if let Some(n) = args.max_tokens {
        model = model.with_max_tokens(n);
    }
    if let Some(t) = args.temperature {
        model = model.with_temperature(t);
    }

    Ok(model)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
