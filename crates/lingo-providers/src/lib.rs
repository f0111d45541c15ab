//! Provider layer for Lingo.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`] — trait that every backend adapter implements
//! - [`retry::RetryController`] — bounded, jittered, cancellable retry of rate-limited calls
//! - [`registry::ProviderRegistry`] — provider identifier → adapter factory
//! - [`gateway::Gateway`] — owns live adapters and routes each call to the right one
//! - [`http_provider::HttpProvider`] — OpenAI-compatible client (OpenAI, Perplexity)
//! - [`anthropic`], [`bedrock`], [`google`], [`ollama`] — vendor-specific adapters

pub mod anthropic;
pub mod bedrock;
pub mod gateway;
pub mod google;
pub mod http_provider;
pub mod ollama;
pub mod registry;
pub mod retry;
pub mod spec;
pub mod traits;

mod http;

// Re-export main types for convenience
pub use gateway::{Gateway, GatewayBuilder};
pub use http_provider::HttpProvider;
pub use registry::{register_builtin_providers, ProviderFactory, ProviderRegistry};
pub use retry::RetryController;
pub use spec::{find_by_id, ProviderSpec, PROVIDERS};
pub use traits::LlmProvider;
