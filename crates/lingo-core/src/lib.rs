//! Core types for Lingo — the shared vocabulary of the gateway.
//!
//! - [`types`] — provider identifiers, model descriptors, generation results
//! - [`models`] — named constructors for commonly used models
//! - [`error`] — the gateway error taxonomy and transient-failure classification
//! - [`config`] — retry/provider configuration, file loading, env overrides
//! - [`logging`] — the injectable logger handle threaded to every adapter

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod types;
pub mod utils;

pub use error::{GatewayError, Result};
pub use logging::Logger;
pub use types::{
    BedrockFamily, GenerationOptions, GenerationResult, ModelDescriptor, ProviderId, ProviderOptions, TokenUsage,
};
