//! Storage layer
//!
//! The engine never talks SQL. It describes what it needs as a
//! [`TabularQuery`] and hands it to a [`FactStore`]; markdown blurbs come
//! from a [`TextLookup`]. Every call goes through the [`StorageGateway`],
//! which bounds concurrency and applies the query timeout.
//!
//! ```text
//! Resolver ──► StorageGateway ──(permit + timeout)──► FactStore
//!                                                  └► TextLookup
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dataportal_engine::config::StorageSettings;
//! use dataportal_engine::storage::{InMemoryFactStore, Row, StorageGateway, TabularQuery};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(InMemoryFactStore::new());
//! store.insert_rows("energy", vec![Row::new().with("year", 2015).with("energy", 1.0)]);
//!
//! let gateway = StorageGateway::new(store, &StorageSettings::default());
//! let rows = gateway.query(&TabularQuery::distinct("energy", ["year"])).await.unwrap();
//! assert_eq!(rows.len(), 1);
//! # }
//! ```

use crate::error::StorageError;
use async_trait::async_trait;

/// Bounded, timed access to the stores
pub mod gateway;
/// In-memory store for tests and benches
pub mod memory;
/// Query model shared with backends
pub mod query;

pub use gateway::{GatewayStats, StorageGateway};
pub use memory::InMemoryFactStore;
pub use query::{Direction, FilterValue, OrderBy, Predicate, Row, Selection, TabularQuery, Value};

/// Tabular query backend
///
/// Implementations must be safe to call concurrently; the gateway limits how
/// many calls are in flight.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Execute `query` and return its rows
    async fn query(&self, query: &TabularQuery) -> Result<Vec<Row>, StorageError>;
}

/// Markdown lookup keyed by topic slug
#[async_trait]
pub trait TextLookup: Send + Sync {
    /// Body registered for `slug`, if any
    async fn markdown(&self, slug: &str) -> Result<Option<String>, StorageError>;
}
