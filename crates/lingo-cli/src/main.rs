//! Lingo CLI — entry point.
//!
//! # Commands
//!
//! - `lingo generate [--provider P] [--model M] PROMPT` — one completion
//! - `lingo health [PROVIDER]` — check one or every configured backend
//! - `lingo providers` — list built-in backends and their configuration status

mod generate_cmd;
mod health_cmd;
mod helpers;
mod providers_cmd;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use lingo_core::config::{load_config, Config};
use lingo_core::utils::expand_home;
use lingo_core::Logger;
use lingo_providers::{Gateway, ProviderRegistry};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Lingo — one interface for many LLM backends
#[derive(Parser)]
#[command(name = "lingo", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.lingo/config.json)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a completion for a single prompt
    Generate {
        /// The prompt text
        prompt: String,

        /// Provider to dispatch to (default: `defaultProvider` from config)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model name (default: `defaultModel`, then the provider's default)
        #[arg(short, long)]
        model: Option<String>,

        /// System prompt
        #[arg(short, long)]
        system: Option<String>,

        /// Maximum number of tokens to generate
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Sampling temperature
        #[arg(short, long)]
        temperature: Option<f64>,

        /// Print the full result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Check that configured providers are reachable
    Health {
        /// Provider to check (default: all configured)
        provider: Option<String>,
    },

    /// List built-in providers and whether they are configured
    Providers,
}

// ─────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.logs);

    let config_path = cli.config.as_deref().map(expand_home);
    let mut config = load_config(config_path.as_deref());
    helpers::apply_conventional_keys(&mut config);

    match cli.command {
        Commands::Generate {
            prompt,
            provider,
            model,
            system,
            max_tokens,
            temperature,
            json,
        } => {
            let args = generate_cmd::GenerateArgs {
                prompt,
                provider,
                model,
                system,
                max_tokens,
                temperature,
                json,
            };
            let gateway = build_gateway(&config)?;
            let outcome = generate_cmd::run(&gateway, &config, args, &cancel_on_ctrl_c()).await;
            shutdown(&gateway);
            outcome?;
        }
        Commands::Health { provider } => {
            let gateway = build_gateway(&config)?;
            let outcome =
                health_cmd::run(&gateway, provider.as_deref(), &cancel_on_ctrl_c()).await;
            shutdown(&gateway);
            outcome?;
        }
        Commands::Providers => {
            let registry = ProviderRegistry::with_builtins();
            providers_cmd::run(&registry, &config, config_path.as_deref());
        }
    }

    Ok(())
}

/// Build a `Gateway` from every provider entry in the configuration.
fn build_gateway(config: &Config) -> Result<Gateway> {
    let registry = ProviderRegistry::with_builtins();

    Gateway::builder(&registry)
        .with_logger(Logger::current())
        .build(config.providers.iter().cloned())
        .context("failed to build gateway from config")
}

/// A token that fires on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl-C received, cancelling");
            trigger.cancel();
        }
    });

    cancel
}

/// Release adapter resources; failures are only worth a warning at exit.
fn shutdown(gateway: &Gateway) {
    if let Err(e) = gateway.close() {
        warn!("Gateway shutdown: {}", e);
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("lingo_cli=debug,lingo_core=debug,lingo_providers=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
