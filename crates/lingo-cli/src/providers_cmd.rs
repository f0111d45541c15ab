//! `lingo providers` — show built-in backends and configuration status.

use std::path::Path;

use colored::Colorize;

use lingo_core::config::{get_config_path, Config};
use lingo_providers::{ProviderRegistry, PROVIDERS};

/// Run the providers command.
pub fn run(registry: &ProviderRegistry, config: &Config, config_path: Option<&Path>) {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    println!();
    println!("{}", "Lingo Providers".cyan().bold());
    println!();
    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );
    if let Some(default) = &config.default_provider {
        println!(
            "  {:<18} {} {}",
            "Default:".bold(),
            default,
            config.default_model.as_deref().unwrap_or("").dimmed()
        );
    }

    println!();
    println!("  {}", "Built-in:".bold());
    for spec in PROVIDERS {
        let status = if !registry.contains(&spec.id) {
            format!("{}", "· no built-in adapter".dimmed())
        } else {
            match config.provider(&spec.id) {
                Some(c) if c.is_configured() => format!("{} (key set)", "✓".green()),
                Some(_) if !spec.requires_api_key => format!("{} (no key needed)", "✓".green()),
                Some(_) => format!("{}", "✗ missing API key".red()),
                None => match spec.env_key {
                    Some(var) => format!(
                        "{}",
                        format!("· not configured (set {var})").dimmed()
                    ),
                    None => format!("{}", "· not configured".dimmed()),
                },
            }
        };
        println!(
            "    {:<12} {:<14} {}",
            spec.id.as_str(),
            spec.display_name,
            status
        );
    }

    let custom: Vec<_> = registry
        .provider_ids()
        .into_iter()
        .filter(|id| !PROVIDERS.iter().any(|s| &s.id == id))
        .collect();
    if !custom.is_empty() {
        println!();
        println!("  {}", "Custom:".bold());
        for id in custom {
            println!("    {}", id.as_str());
        }
    }

    println!();
}
