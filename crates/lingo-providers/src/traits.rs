//! LLM Provider trait — the contract every backend adapter satisfies.
//!
//! The gateway only ever talks to backends through this trait; vendor request
//! and response shapes stay inside each adapter.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use lingo_core::{GenerationResult, ModelDescriptor, Result};

/// Trait that all LLM backend adapters must implement.
///
/// One instance lives per configured provider for the lifetime of a gateway
/// and is shared across concurrent calls.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform one generation.
    ///
    /// # Arguments
    /// * `cancel` — Caller's cancellation token; a fired token must abort the call.
    /// * `model`  — Model name and generation options.
    /// * `prompt` — The user prompt.
    ///
    /// # Returns
    /// A normalized [`GenerationResult`]. The `provider` field is left for the
    /// gateway to fill in.
    async fn generate(
        &self,
        cancel: &CancellationToken,
        model: &ModelDescriptor,
        prompt: &str,
    ) -> Result<GenerationResult>;

    /// Cheap liveness check, bounded by a short fixed deadline.
    async fn health(&self, cancel: &CancellationToken) -> Result<()>;

    /// Release held resources. Called once when the gateway closes.
    fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
