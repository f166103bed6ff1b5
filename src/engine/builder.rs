//! Engine builder with a pluggable store
//!
//! This module provides the main [`Engine`] type that wires the catalog,
//! storage gateway, caches, resolver and option lookups together.

use super::options::OptionsService;
use super::resolver::DimensionResolver;
use super::rows::RowFetcher;
use crate::cache::CacheConfig;
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::metrics::Recorder;
use crate::storage::{FactStore, StorageGateway, TextLookup};
use crate::types::{DimensionQuery, DimensionResult};
use std::sync::Arc;
use tracing::info;

/// Builder for configuring the engine with a custom store
pub struct EngineBuilder {
    store: Option<Arc<dyn FactStore>>,
    text: Option<Arc<dyn TextLookup>>,
    catalog: Option<Catalog>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Create a new engine builder
    pub fn new() -> Self {
        Self {
            store: None,
            text: None,
            catalog: None,
            config: EngineConfig::default(),
        }
    }

    /// Set a store serving both fact tables and markdown
    pub fn with_store<S>(mut self, store: Arc<S>) -> Self
    where
        S: FactStore + TextLookup + 'static,
    {
        self.store = Some(store.clone() as Arc<dyn FactStore>);
        self.text = Some(store as Arc<dyn TextLookup>);
        self
    }

    /// Set the fact table store only
    pub fn with_fact_store(mut self, store: Arc<dyn FactStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the markdown lookup, overriding the store's
    pub fn with_text_lookup(mut self, text: Arc<dyn TextLookup>) -> Self {
        self.text = Some(text);
        self
    }

    /// Set the topic catalog (defaults to [`Catalog::builtin`])
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Set engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<Engine> {
        self.config
            .validate()
            .map_err(|e| Error::Configuration(e.to_string()))?;

        let store = self
            .store
            .ok_or_else(|| Error::Configuration("No fact store configured".to_string()))?;
        let text = self
            .text
            .ok_or_else(|| Error::Configuration("No text lookup configured".to_string()))?;

        let metrics = Recorder::from(&self.config.monitoring);
        let catalog = Arc::new(self.catalog.unwrap_or_else(Catalog::builtin));
        let gateway = Arc::new(
            StorageGateway::with_text_lookup(store, text, &self.config.storage).with_metrics(metrics),
        );
        let cache = CacheConfig::from(&self.config.cache).with_metrics(metrics);
        let rows = Arc::new(RowFetcher::new(gateway.clone(), cache.clone()));

        info!(
            topics = catalog.topics().len(),
            cache_enabled = self.config.cache.enabled,
            pool = self.config.storage.max_concurrent_queries,
            metrics = metrics.is_enabled(),
            "Engine ready"
        );

        Ok(Engine {
            resolver: DimensionResolver::new(catalog.clone(), rows.clone(), &self.config),
            options: OptionsService::new(catalog.clone(), rows.clone(), cache),
            catalog,
            gateway,
            rows,
            config: self.config,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregation engine instance
pub struct Engine {
    catalog: Arc<Catalog>,
    gateway: Arc<StorageGateway>,
    rows: Arc<RowFetcher>,
    resolver: DimensionResolver,
    options: OptionsService,
    config: EngineConfig,
}

impl Engine {
    /// Start building an engine
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Resolve one dimension query
    pub async fn resolve(&self, query: &DimensionQuery) -> Result<DimensionResult> {
        self.resolver.resolve(query).await
    }

    /// Per-kind resolution
    pub fn dimensions(&self) -> &DimensionResolver {
        &self.resolver
    }

    /// Option lookups
    pub fn options(&self) -> &OptionsService {
        &self.options
    }

    /// Topic catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Storage gateway
    pub fn gateway(&self) -> &StorageGateway {
        &self.gateway
    }

    /// Get engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drop every cached row set, result and markdown blurb
    pub fn clear_caches(&self) {
        self.rows.cache().clear();
        self.resolver.cache().clear();
        self.options.markdown_cache().clear();
    }

    /// Refuse new storage queries
    pub fn shutdown(&self) {
        self.gateway.close();
        info!("Engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryFactStore;

    #[test]
    fn test_missing_store() {
        let result = EngineBuilder::new().build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.ranking.top_n = 0;
        let result = Engine::builder()
            .with_store(Arc::new(InMemoryFactStore::new()))
            .with_config(config)
            .build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_defaults_to_builtin_catalog() {
        let engine = Engine::builder()
            .with_store(Arc::new(InMemoryFactStore::new()))
            .build()
            .unwrap();
        assert_eq!(engine.catalog().topics().len(), Catalog::builtin().topics().len());
        assert_eq!(
            engine.gateway().available_slots(),
            engine.config().storage.max_concurrent_queries
        );
    }

    #[test]
    fn test_metrics_switch_reaches_gateway() {
        let mut config = EngineConfig::default();
        config.monitoring.metrics_enabled = false;
        let engine = Engine::builder()
            .with_store(Arc::new(InMemoryFactStore::new()))
            .with_config(config)
            .build()
            .unwrap();
        assert!(!engine.gateway().metrics().is_enabled());
    }

    #[tokio::test]
    async fn test_clear_caches_includes_markdown() {
        let store = Arc::new(InMemoryFactStore::new());
        store.set_markdown("nuclear", "old");
        let engine = Engine::builder().with_store(store.clone()).build().unwrap();

        assert_eq!(engine.options().md_infos("nuclear").await.unwrap(), "old");
        store.set_markdown("nuclear", "new");
        assert_eq!(engine.options().md_infos("nuclear").await.unwrap(), "old");

        engine.clear_caches();
        assert_eq!(engine.options().md_infos("nuclear").await.unwrap(), "new");
    }
}
