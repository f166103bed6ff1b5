//! Bounded storage gateway
//!
//! Wraps a [`FactStore`] (and its [`TextLookup`]) with:
//! - a semaphore sized like the storage pool, so at most
//!   `max_concurrent_queries` queries are in flight
//! - a per-query timeout covering pool wait and execution, surfaced as
//!   [`StorageError::Timeout`]
//! - metrics and debug logging per query
//!
//! The pool slot is released as soon as the rows are returned; callers
//! assemble results without holding one.

use super::query::{Row, TabularQuery};
use super::{FactStore, TextLookup};
use crate::config::StorageSettings;
use crate::error::StorageError;
use crate::metrics::Recorder;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Gateway statistics
#[derive(Debug, Default)]
pub struct GatewayStats {
    /// Queries that returned rows
    pub succeeded: AtomicU64,
    /// Queries the backend failed
    pub failed: AtomicU64,
    /// Queries that hit the timeout
    pub timed_out: AtomicU64,
}

/// Storage access with a bounded pool and a timeout
pub struct StorageGateway {
    store: Arc<dyn FactStore>,
    text: Arc<dyn TextLookup>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
    stats: GatewayStats,
    metrics: Recorder,
}

impl StorageGateway {
    /// Create a gateway over `store`, which also serves text lookups
    pub fn new<S>(store: Arc<S>, settings: &StorageSettings) -> Self
    where
        S: FactStore + TextLookup + 'static,
    {
        Self::with_text_lookup(store.clone(), store, settings)
    }

    /// Create a gateway with a separate text lookup
    pub fn with_text_lookup(
        store: Arc<dyn FactStore>,
        text: Arc<dyn TextLookup>,
        settings: &StorageSettings,
    ) -> Self {
        Self {
            store,
            text,
            semaphore: Arc::new(Semaphore::new(settings.max_concurrent_queries.max(1))),
            timeout: settings.query_timeout(),
            stats: GatewayStats::default(),
            metrics: Recorder::default(),
        }
    }

    /// Record queries through `metrics`
    pub fn with_metrics(mut self, metrics: Recorder) -> Self {
        self.metrics = metrics;
        self
    }

    /// Metrics sink in use
    pub fn metrics(&self) -> Recorder {
        self.metrics
    }

    /// Run a tabular query
    pub async fn query(&self, query: &TabularQuery) -> Result<Vec<Row>, StorageError> {
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, async {
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| StorageError::PoolClosed)?;
            self.store.query(query).await
        })
        .await;

        let elapsed = start.elapsed();
        match outcome {
            Ok(Ok(rows)) => {
                self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                self.metrics.storage_query(&query.table, elapsed.as_secs_f64(), "success");
                debug!(table = %query.table, rows = rows.len(), ?elapsed, "Storage query done");
                Ok(rows)
            },
            Ok(Err(e)) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                self.metrics.storage_query(&query.table, elapsed.as_secs_f64(), "error");
                warn!(table = %query.table, error = %e, "Storage query failed");
                Err(e)
            },
            Err(_) => {
                self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
                self.metrics.storage_query(&query.table, elapsed.as_secs_f64(), "timeout");
                warn!(table = %query.table, after = ?self.timeout, "Storage query timed out");
                Err(StorageError::Timeout {
                    table: query.table.clone(),
                    after: self.timeout,
                })
            },
        }
    }

    /// Markdown body for a topic slug
    pub async fn markdown(&self, slug: &str) -> Result<Option<String>, StorageError> {
        tokio::time::timeout(self.timeout, async {
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| StorageError::PoolClosed)?;
            self.text.markdown(slug).await
        })
        .await
        .map_err(|_| StorageError::Timeout {
            table: "markdown".to_string(),
            after: self.timeout,
        })?
    }

    /// Refuse new queries; in-flight ones complete
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Free pool slots
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get gateway statistics
    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }
}
