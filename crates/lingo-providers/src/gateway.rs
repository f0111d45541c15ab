//! Gateway — owns one adapter per configured provider and routes calls to it.
//!
//! Construction is all-or-nothing: every config must name a registered
//! provider and every adapter must build, or no gateway is returned. After
//! that the adapter map is only read until [`Gateway::close`] drains it.
//!
//! The map lock is held just long enough to clone an adapter handle out; it is
//! never held across a network call.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lingo_core::config::ProviderConfig;
use lingo_core::{GatewayError, GenerationResult, Logger, ModelDescriptor, ProviderId, Result};

use crate::registry::ProviderRegistry;
use crate::traits::LlmProvider;

// ─────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────

/// Options applied before any adapter is constructed.
pub struct GatewayBuilder<'r> {
    registry: &'r ProviderRegistry,
    logger: Logger,
}

impl<'r> GatewayBuilder<'r> {
    /// Attach a logger. It is handed to every adapter constructor and used for
    /// the gateway's own events. Defaults to [`Logger::noop`].
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Build a gateway from `configs`. `None` entries are skipped. A later
    /// config for the same provider replaces the earlier adapter, which is
    /// closed on the spot.
    ///
    /// Fails with [`GatewayError::UnknownProvider`] if a config names a
    /// provider with no registered factory, [`GatewayError::Init`] if a
    /// factory fails, and [`GatewayError::NoProviders`] if nothing was built.
    pub fn build<I>(self, configs: I) -> Result<Gateway>
    where
        I: IntoIterator,
        I::Item: Into<Option<ProviderConfig>>,
    {
        let mut providers: HashMap<ProviderId, Arc<dyn LlmProvider>> = HashMap::new();

        for config in configs
            .into_iter()
            .filter_map(Into::<Option<ProviderConfig>>::into)
        {
            let id = config.provider.clone();
            let factory = self
                .registry
                .lookup(&id)
                .ok_or_else(|| GatewayError::UnknownProvider(id.clone()))?;

            let provider = factory(&config, &self.logger).map_err(|e| GatewayError::Init {
                provider: id.clone(),
                source: Box::new(e),
            })?;

            self.logger.in_scope(|| {
                info!(provider = %id, name = provider.display_name(), "Provider registered");
            });
            if let Some(replaced) = providers.insert(id.clone(), provider) {
                if let Err(e) = replaced.close() {
                    self.logger.in_scope(|| {
                        warn!(provider = %id, error = %e, "Failed to close replaced provider");
                    });
                }
            }
        }

        if providers.is_empty() {
            return Err(GatewayError::NoProviders);
        }

        Ok(Gateway {
            providers: RwLock::new(providers),
            logger: self.logger,
        })
    }
}

// ─────────────────────────────────────────────
// Gateway
// ─────────────────────────────────────────────

/// One call surface over every configured backend.
///
/// Safe to share across tasks (`Arc<Gateway>`); calls are independent.
pub struct Gateway {
    providers: RwLock<HashMap<ProviderId, Arc<dyn LlmProvider>>>,
    logger: Logger,
}

impl Gateway {
    /// Start building a gateway whose adapters come from `registry`.
    pub fn builder(registry: &ProviderRegistry) -> GatewayBuilder<'_> {
        GatewayBuilder {
            registry,
            logger: Logger::noop(),
        }
    }

    /// Build a gateway with default options.
    pub fn new<I>(registry: &ProviderRegistry, configs: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Option<ProviderConfig>>,
    {
        Self::builder(registry).build(configs)
    }

    fn lookup(&self, id: &ProviderId) -> Result<Arc<dyn LlmProvider>> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotRegistered(id.clone()))
    }

    /// Generate text with the provider named by `model`.
    ///
    /// The returned result's `provider` is always `model.provider()`.
    /// Returns [`GatewayError::Cancelled`] as soon as `cancel` fires.
    pub async fn generate(
        &self,
        cancel: &CancellationToken,
        model: &ModelDescriptor,
        prompt: &str,
    ) -> Result<GenerationResult> {
        let provider = self.lookup(model.provider())?;

        self.logger.in_scope(|| {
            debug!(
                provider = %model.provider(),
                model = model.model_name(),
                prompt_len = prompt.len(),
                "Dispatching generation"
            );
        });

        let call = self.logger.instrument(provider.generate(cancel, model, prompt));
        let mut result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            outcome = call => outcome?,
        };

        result.provider = Some(model.provider().clone());
        Ok(result)
    }

    /// Check that `provider` is reachable. Adapters bound this with a fixed
    /// short deadline.
    pub async fn health(&self, cancel: &CancellationToken, provider: &ProviderId) -> Result<()> {
        let adapter = self.lookup(provider)?;

        let call = self.logger.instrument(adapter.health(cancel));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GatewayError::Cancelled),
            outcome = call => outcome,
        }
    }

    pub fn is_registered(&self, provider: &ProviderId) -> bool {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(provider)
    }

    /// Identifiers of every live adapter, sorted.
    pub fn list_registered_providers(&self) -> Vec<ProviderId> {
        let mut ids: Vec<ProviderId> = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Close every adapter and empty the gateway.
    ///
    /// Every adapter is closed even if some fail; the failures are returned
    /// together as [`GatewayError::Close`].
    pub fn close(&self) -> Result<()> {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let mut errors: Vec<(ProviderId, GatewayError)> = providers
            .drain()
            .filter_map(|(id, provider)| provider.close().err().map(|e| (id, e)))
            .collect();
        drop(providers);

        if errors.is_empty() {
            return Ok(());
        }

        errors.sort_by(|a, b| a.0.cmp(&b.0));
        Err(GatewayError::Close(errors))
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("providers", &self.list_registered_providers())
            .finish()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::factory;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    struct CountingLayer(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for CountingLayer {
        fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting_logger() -> (Logger, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(CountingLayer(count.clone()));
        (Logger::from_dispatch(tracing::Dispatch::new(subscriber)), count)
    }

    /// Test adapter with scripted behavior.
    struct Fake {
        name: &'static str,
        hang: bool,
        close_error: Option<&'static str>,
    }

    #[async_trait]
    impl LlmProvider for Fake {
        async fn generate(
            &self,
            _cancel: &CancellationToken,
            model: &ModelDescriptor,
            prompt: &str,
        ) -> Result<GenerationResult> {
            if self.hang {
                // Ignores the token on purpose.
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            tracing::info!("fake generating");
            let mut result = GenerationResult::new(format!("echo: {prompt}"), model.model_name());
            result.provider = Some(ProviderId::new("wrong"));
            Ok(result)
        }

        async fn health(&self, _cancel: &CancellationToken) -> Result<()> {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(())
        }

        fn close(&self) -> Result<()> {
            match self.close_error {
                Some(msg) => Err(GatewayError::Other(msg.into())),
                None => Ok(()),
            }
        }

        fn display_name(&self) -> &str {
            self.name
        }
    }

    fn registry_with(entries: &[(&'static str, bool, Option<&'static str>)]) -> ProviderRegistry {
        let registry = ProviderRegistry::new();
        for &(name, hang, close_error) in entries {
            registry.register(
                ProviderId::new(name),
                factory(move |_, _| {
                    Ok(Arc::new(Fake {
                        name,
                        hang,
                        close_error,
                    }))
                }),
            );
        }
        registry
    }

    fn config(name: &str) -> ProviderConfig {
        ProviderConfig::new(ProviderId::new(name))
    }

    #[test]
    fn test_no_configs_fails() {
        let registry = registry_with(&[("a", false, None)]);

        let err = Gateway::new(&registry, Vec::<ProviderConfig>::new()).unwrap_err();
        assert!(matches!(err, GatewayError::NoProviders));
        assert_eq!(err.to_string(), "at least one provider must be configured");

        let err = Gateway::new(&registry, vec![None::<ProviderConfig>, None]).unwrap_err();
        assert!(matches!(err, GatewayError::NoProviders));
    }

    #[test]
    fn test_null_entries_skipped() {
        let registry = registry_with(&[("a", false, None)]);
        let gateway = Gateway::new(&registry, vec![None, Some(config("a")), None]).unwrap();
        assert_eq!(gateway.list_registered_providers(), vec![ProviderId::new("a")]);
    }

    #[test]
    fn test_factory_failure_wrapped() {
        let registry = ProviderRegistry::new();
        registry.register(
            ProviderId::new("broken"),
            factory(|_, _| Err(GatewayError::Config("Broken API key is required".into()))),
        );

        let err = Gateway::new(&registry, [config("broken")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to initialize broken: Broken API key is required"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_registration_logged_to_injected_logger() {
        let registry = registry_with(&[("a", false, None), ("b", false, None)]);
        let (logger, count) = counting_logger();

        Gateway::builder(&registry)
            .with_logger(logger)
            .build([config("a"), config("b")])
            .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_adapter_events_reach_gateway_logger() {
        let registry = registry_with(&[("a", false, None)]);
        let (logger, count) = counting_logger();
        let gateway = Gateway::builder(&registry)
            .with_logger(logger)
            .build([config("a")])
            .unwrap();
        let after_build = count.load(Ordering::SeqCst);

        gateway
            .generate(
                &CancellationToken::new(),
                &ModelDescriptor::new(ProviderId::new("a"), "m"),
                "hi",
            )
            .await
            .unwrap();

        // The dispatch debug event plus the adapter's own event.
        assert_eq!(count.load(Ordering::SeqCst) - after_build, 2);
    }

    #[tokio::test]
    async fn test_generate_stamps_provider() {
        let registry = registry_with(&[("a", false, None)]);
        let gateway = Gateway::new(&registry, [config("a")]).unwrap();

        let result = gateway
            .generate(
                &CancellationToken::new(),
                &ModelDescriptor::new(ProviderId::new("a"), "model-x"),
                "hello",
            )
            .await
            .unwrap();

        assert_eq!(result.provider, Some(ProviderId::new("a")));
        assert_eq!(result.text, "echo: hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_beats_unresponsive_adapter() {
        let registry = registry_with(&[("slow", true, None)]);
        let gateway = Gateway::new(&registry, [config("slow")]).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = tokio::time::Instant::now();
        let err = gateway
            .generate(
                &cancel,
                &ModelDescriptor::new(ProviderId::new("slow"), "m"),
                "hi",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(1));

        let err = gateway
            .health(&cancel, &ProviderId::new("slow"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled));
    }

    #[tokio::test]
    async fn test_health_dispatch() {
        let registry = registry_with(&[("a", false, None)]);
        let gateway = Gateway::new(&registry, [config("a")]).unwrap();
        let cancel = CancellationToken::new();

        gateway.health(&cancel, &ProviderId::new("a")).await.unwrap();

        let err = gateway
            .health(&cancel, &ProviderId::new("b"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "provider b is not registered");
    }

    #[test]
    fn test_introspection() {
        let registry = registry_with(&[("zeta", false, None), ("alpha", false, None)]);
        let gateway = Gateway::new(&registry, [config("zeta"), config("alpha")]).unwrap();

        assert!(gateway.is_registered(&ProviderId::new("alpha")));
        assert!(!gateway.is_registered(&ProviderId::new("beta")));
        assert_eq!(
            gateway.list_registered_providers(),
            vec![ProviderId::new("alpha"), ProviderId::new("zeta")]
        );
    }

    #[test]
    fn test_close_aggregates_failures() {
        let registry = registry_with(&[
            ("ok", false, None),
            ("bad1", false, Some("socket stuck")),
            ("bad2", false, Some("flush failed")),
        ]);
        let gateway =
            Gateway::new(&registry, [config("ok"), config("bad1"), config("bad2")]).unwrap();

        let err = gateway.close().unwrap_err();
        match &err {
            GatewayError::Close(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "failed to close providers: provider bad1: socket stuck; provider bad2: flush failed"
        );

        // Closed gateways hold no adapters.
        assert!(gateway.list_registered_providers().is_empty());
        assert!(gateway.close().is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_generates() {
        let registry = registry_with(&[("a", false, None)]);
        let gateway = Arc::new(Gateway::new(&registry, [config("a")]).unwrap());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let gateway = gateway.clone();
                tokio::spawn(async move {
                    gateway
                        .generate(
                            &CancellationToken::new(),
                            &ModelDescriptor::new(ProviderId::new("a"), "m"),
                            &format!("req {i}"),
                        )
                        .await
                })
            })
            .collect();

        for (i, h) in handles.into_iter().enumerate() {
            let result = h.await.unwrap().unwrap();
            assert_eq!(result.text, format!("echo: req {i}"));
        }
    }
}
