//! Cache coalescing and storage failure handling
//!
//! A counting store wraps the in-memory store so tests can assert how many
//! storage calls a workload really issued, and can inject delays and
//! failures per query shape.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dataportal_engine::config::{CacheSettings, StorageSettings};
use dataportal_engine::error::StorageError;
use dataportal_engine::storage::{
    FactStore, InMemoryFactStore, Row, Selection, TabularQuery, TextLookup,
};
use dataportal_engine::types::AxisMode;
use dataportal_engine::{DimensionQuery, Engine, EngineConfig, Error};
use futures::future::join_all;

const PRIMARY_ENERGY: &str = "WORLD_ENERGY_HISTORY_primary_energy_prod";

// ============================================================================
// Counting store
// ============================================================================

/// Which queries the store should fail
#[derive(Clone, Copy, PartialEq)]
enum Failure {
    None,
    Distinct,
    Sum,
}

struct CountingStore {
    inner: InMemoryFactStore,
    calls: AtomicUsize,
    delay: Duration,
    failure: Failure,
}

impl CountingStore {
    fn new(delay: Duration, failure: Failure) -> Self {
        let inner = InMemoryFactStore::new();
        let row = |year: i64, family: &str, energy: f64| {
            Row::new()
                .with("group_name", "World")
                .with("group_type", "zone")
                .with("year", year)
                .with("type", "Consumption")
                .with("energy_family", family)
                .with("energy", energy)
        };
        inner.insert_rows(
            PRIMARY_ENERGY,
            vec![row(2015, "Oil", 10.0), row(2016, "Oil", 12.0), row(2016, "Gas", 5.0)],
        );
        Self {
            inner,
            calls: AtomicUsize::new(0),
            delay,
            failure,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FactStore for CountingStore {
    async fn query(&self, query: &TabularQuery) -> Result<Vec<Row>, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let failing = match (&query.selection, self.failure) {
            (Selection::Distinct(_), Failure::Distinct) => true,
            (Selection::Sum { .. }, Failure::Sum) => true,
            _ => false,
        };
        if failing {
            return Err(StorageError::QueryFailed {
                table: query.table.clone(),
                message: "connection reset".to_string(),
            });
        }
        self.inner.execute(query)
    }
}

#[async_trait]
impl TextLookup for CountingStore {
    async fn markdown(&self, slug: &str) -> Result<Option<String>, StorageError> {
        self.inner.markdown(slug).await
    }
}

fn create_engine(store: Arc<CountingStore>, config: EngineConfig) -> Arc<Engine> {
    Arc::new(
        Engine::builder()
            .with_store(store)
            .with_config(config)
            .build()
            .unwrap(),
    )
}

fn query() -> DimensionQuery {
    DimensionQuery::new("primaryEnergies", "byEnergyFamily")
        .with_groups(["World"])
        .with_years(2015, 2017)
        .with_unit("TWh")
        .with_categories(["Oil", "Gas"])
        .with_filter("type", "Consumption")
}

// ============================================================================
// Coalescing
// ============================================================================

#[tokio::test]
async fn test_concurrent_identical_queries_hit_storage_once() {
    let store = Arc::new(CountingStore::new(Duration::from_millis(30), Failure::None));
    let engine = create_engine(store.clone(), EngineConfig::default());

    // full range axis: the data query is the only storage call
    let query = query().with_axis_mode(AxisMode::FullRange);
    let results = join_all((0..8).map(|_| {
        let engine = engine.clone();
        let query = query.clone();
        tokio::spawn(async move { engine.resolve(&query).await })
    }))
    .await;

    let first = results[0].as_ref().unwrap().as_ref().unwrap().clone();
    for result in &results {
        assert_eq!(result.as_ref().unwrap().as_ref().unwrap(), &first);
    }
    assert_eq!(store.calls(), 1);

    // later identical request is a plain hit
    engine.resolve(&query).await.unwrap();
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn test_different_fingerprints_are_separate() {
    let store = Arc::new(CountingStore::new(Duration::ZERO, Failure::None));
    let engine = create_engine(store.clone(), EngineConfig::default());

    let twh = query().with_axis_mode(AxisMode::FullRange);
    let mtoe = twh.clone().with_unit("Mtoe");
    engine.resolve(&twh).await.unwrap();
    engine.resolve(&mtoe).await.unwrap();
    assert_eq!(store.calls(), 2);

    engine.clear_caches();
    engine.resolve(&twh).await.unwrap();
    assert_eq!(store.calls(), 3);
}

#[tokio::test]
async fn test_disabled_cache_always_queries() {
    let store = Arc::new(CountingStore::new(Duration::ZERO, Failure::None));
    let config = EngineConfig {
        cache: CacheSettings {
            enabled: false,
            ..CacheSettings::default()
        },
        ..EngineConfig::default()
    };
    let engine = create_engine(store.clone(), config);

    let query = query().with_axis_mode(AxisMode::FullRange);
    for _ in 0..3 {
        engine.resolve(&query).await.unwrap();
    }
    assert_eq!(store.calls(), 3);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_timeout_is_data_unavailable() {
    let store = Arc::new(CountingStore::new(Duration::from_millis(300), Failure::None));
    let config = EngineConfig {
        storage: StorageSettings {
            query_timeout_ms: 20,
            max_concurrent_queries: 4,
        },
        ..EngineConfig::default()
    };
    let engine = create_engine(store, config);

    let err = engine.resolve(&query()).await.unwrap_err();
    assert!(
        matches!(err, Error::DataUnavailable(StorageError::Timeout { .. })),
        "{}",
        err
    );
    assert_eq!(engine.gateway().available_slots(), 4);
}

#[tokio::test]
async fn test_failed_axis_query_fails_request() {
    let store = Arc::new(CountingStore::new(Duration::ZERO, Failure::Distinct));
    let engine = create_engine(store, EngineConfig::default());

    let err = engine.resolve(&query()).await.unwrap_err();
    assert!(matches!(err, Error::DataUnavailable(StorageError::QueryFailed { .. })));
}

#[tokio::test]
async fn test_failed_data_query_fails_request() {
    let store = Arc::new(CountingStore::new(Duration::ZERO, Failure::Sum));
    let engine = create_engine(store, EngineConfig::default());

    let err = engine
        .resolve(&query().with_axis_mode(AxisMode::FullRange))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DataUnavailable(_)));
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let store = Arc::new(CountingStore::new(Duration::ZERO, Failure::Distinct));
    let engine = create_engine(store.clone(), EngineConfig::default());

    assert!(engine.resolve(&query()).await.is_err());
    let after_first = store.calls();
    assert!(engine.resolve(&query()).await.is_err());
    assert!(store.calls() > after_first);
}

#[tokio::test]
async fn test_closed_engine_refuses_queries() {
    let store = Arc::new(CountingStore::new(Duration::ZERO, Failure::None));
    let engine = create_engine(store, EngineConfig::default());
    engine.shutdown();

    let err = engine.resolve(&query()).await.unwrap_err();
    assert!(matches!(err, Error::DataUnavailable(StorageError::PoolClosed)));
}
