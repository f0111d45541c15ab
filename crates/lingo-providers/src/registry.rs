//! Provider registry — maps a provider identifier to the factory that builds it.
//!
//! The registry is an explicit object rather than process-wide state: an
//! application builds one at startup (usually [`ProviderRegistry::with_builtins`]),
//! optionally registers out-of-tree adapters, and passes it to the gateway.
//! Gateways only read from it while they are being constructed.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use lingo_core::config::ProviderConfig;
use lingo_core::{Logger, ProviderId, Result};

use crate::traits::LlmProvider;

/// Builds one adapter instance from its config and the gateway's logger.
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderConfig, &Logger) -> Result<Arc<dyn LlmProvider>> + Send + Sync>;

/// Wrap a closure as a [`ProviderFactory`].
///
/// Lets closures be written without annotating argument types.
pub fn factory<F>(f: F) -> ProviderFactory
where
    F: Fn(&ProviderConfig, &Logger) -> Result<Arc<dyn LlmProvider>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Thread-safe table of provider factories.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: RwLock<HashMap<ProviderId, ProviderFactory>>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with every built-in adapter.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        register_builtin_providers(&registry);
        registry
    }

    /// Register `factory` under `id`. Re-registering an identifier replaces
    /// the previous factory.
    pub fn register(&self, id: ProviderId, factory: ProviderFactory) {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, factory);
    }

    /// The factory registered under `id`, if any.
    pub fn lookup(&self, id: &ProviderId) -> Option<ProviderFactory> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &ProviderId) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// All registered identifiers, sorted.
    pub fn provider_ids(&self) -> Vec<ProviderId> {
        let mut ids: Vec<ProviderId> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_ids())
            .finish()
    }
}

/// Register every built-in adapter with `registry`.
pub fn register_builtin_providers(registry: &ProviderRegistry) {
    let builtins = crate::http_provider::registrations().into_iter().chain([
        crate::anthropic::registration(),
        crate::bedrock::registration(),
        crate::google::registration(),
        crate::ollama::registration(),
    ]);

    for (id, factory) in builtins {
        registry.register(id, factory);
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::PROVIDERS;
    use async_trait::async_trait;
    use lingo_core::{GatewayError, GenerationResult, ModelDescriptor};
    use tokio_util::sync::CancellationToken;

    struct Named(&'static str);

    #[async_trait]
    impl LlmProvider for Named {
        async fn generate(
            &self,
            _cancel: &CancellationToken,
            model: &ModelDescriptor,
            _prompt: &str,
        ) -> Result<GenerationResult> {
            Ok(GenerationResult::new(self.0, model.model_name()))
        }

        async fn health(&self, _cancel: &CancellationToken) -> Result<()> {
            Ok(())
        }

        fn display_name(&self) -> &str {
            self.0
        }
    }

    fn named(name: &'static str) -> ProviderFactory {
        factory(move |_, _| Ok(Arc::new(Named(name))))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ProviderRegistry::new();
        let id = ProviderId::new("stub");
        assert!(registry.lookup(&id).is_none());

        registry.register(id.clone(), named("first"));
        assert!(registry.contains(&id));

        let provider = registry.lookup(&id).unwrap()(
            &ProviderConfig::new(id.clone()),
            &Logger::noop(),
        )
        .unwrap();
        assert_eq!(provider.display_name(), "first");
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = ProviderRegistry::new();
        let id = ProviderId::new("stub");
        registry.register(id.clone(), named("first"));
        registry.register(id.clone(), named("second"));

        let provider = registry.lookup(&id).unwrap()(
            &ProviderConfig::new(id.clone()),
            &Logger::noop(),
        )
        .unwrap();
        assert_eq!(provider.display_name(), "second");
        assert_eq!(registry.provider_ids().len(), 1);
    }

    #[test]
    fn test_builtins_cover_every_spec() {
        let registry = ProviderRegistry::with_builtins();

        for spec in PROVIDERS {
            assert!(registry.contains(&spec.id), "{}", spec.id);
        }

        let ids: Vec<String> = registry
            .provider_ids()
            .iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(
            ids,
            vec!["anthropic", "bedrock", "google", "ollama", "openai", "perplexity"]
        );
    }

    #[test]
    fn test_builtin_factory_validates_config() {
        let registry = ProviderRegistry::with_builtins();
        let factory = registry.lookup(&ProviderId::ANTHROPIC).unwrap();

        let err = match factory(&ProviderConfig::new(ProviderId::ANTHROPIC), &Logger::noop()) {
            Ok(_) => panic!("expected missing key to fail"),
            Err(e) => e,
        };
        assert!(matches!(err, GatewayError::Config(_)));

        let ok = factory(
            &ProviderConfig::new(ProviderId::ANTHROPIC).with_api_key("sk-ant"),
            &Logger::noop(),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(ProviderRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry.register(ProviderId::new(format!("p{i}")), named("x"));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(registry.provider_ids().len(), 8);
    }
}
