//! Cached row fetching
//!
//! Every tabular query the engine issues goes through [`RowFetcher`]: the
//! rows are cached under the query's fingerprint, and concurrent identical
//! queries share one storage call.

use crate::cache::{CacheConfig, Fingerprint, QueryCache};
use crate::error::Result;
use crate::storage::{Row, StorageGateway, TabularQuery};
use std::sync::Arc;

/// Read-through row cache in front of the gateway
pub struct RowFetcher {
    gateway: Arc<StorageGateway>,
    cache: QueryCache<Arc<Vec<Row>>>,
}

impl RowFetcher {
    /// Create a fetcher over `gateway`
    pub fn new(gateway: Arc<StorageGateway>, config: CacheConfig) -> Self {
        Self {
            gateway,
            cache: QueryCache::new("rows", config),
        }
    }

    /// Rows of `query`
    pub async fn fetch(&self, query: &TabularQuery) -> Result<Arc<Vec<Row>>> {
        self.cache
            .get_or_compute(Fingerprint::of(query), || async {
                Ok(Arc::new(self.gateway.query(query).await?))
            })
            .await
    }

    /// Gateway used for storage calls
    pub fn gateway(&self) -> &Arc<StorageGateway> {
        &self.gateway
    }

    /// Underlying cache
    pub fn cache(&self) -> &QueryCache<Arc<Vec<Row>>> {
        &self.cache
    }
}
