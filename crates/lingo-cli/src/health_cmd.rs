//! `lingo health` — check configured backends.

use anyhow::{bail, Result};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use lingo_core::ProviderId;
use lingo_providers::Gateway;

/// Run the health command against one provider, or every registered one.
pub async fn run(
    gateway: &Gateway,
    provider: Option<&str>,
    cancel: &CancellationToken,
) -> Result<()> {
    let targets = match provider {
        Some(p) => vec![ProviderId::new(p)],
        None => gateway.list_registered_providers(),
    };

    println!();
    let mut failed = 0usize;
    for id in &targets {
        match gateway.health(cancel, id).await {
            Ok(()) => println!("  {:<14} {}", id.as_str(), "✓ healthy".green()),
            Err(e) if e.is_cancelled() && cancel.is_cancelled() => {
                println!("  {:<14} {}", id.as_str(), "· cancelled".dimmed());
                bail!("health check cancelled");
            }
            Err(e) => {
                failed += 1;
                println!("  {:<14} {} {}", id.as_str(), "✗".red(), e);
            }
        }
    }
    println!();

    if failed > 0 {
        bail!("{failed} of {} providers unhealthy", targets.len());
    }
    Ok(())
}
