//! Dataportal Engine - dimensional aggregation for energy and climate charts
//!
//! This library turns chart requests into aligned, colored series:
//! - A topic catalog mapping dimension kinds to fact tables and layouts
//! - Unit conversion applied inside the aggregation
//! - Year or label axes computed from the same filtered rows as the data
//! - Quick-select rankings of the top and bottom groups
//! - A read-through query cache that coalesces concurrent misses
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dataportal_engine::storage::{InMemoryFactStore, Row};
//! use dataportal_engine::{DimensionQuery, Engine};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> dataportal_engine::Result<()> {
//! let store = Arc::new(InMemoryFactStore::new());
//! store.insert_rows(
//!     "WORLD_ENERGY_HISTORY_primary_energy_prod",
//!     vec![Row::new()
//!         .with("group_name", "World")
//!         .with("group_type", "zone")
//!         .with("year", 2015)
//!         .with("type", "Consumption")
//!         .with("energy_family", "Oil")
//!         .with("energy", 10.0)],
//! );
//!
//! let engine = Engine::builder().with_store(store).build()?;
//! let query = DimensionQuery::new("primaryEnergies", "byEnergyFamily")
//!     .with_groups(["World"])
//!     .with_years(2015, 2015)
//!     .with_unit("Mtoe")
//!     .with_categories(["Oil"])
//!     .with_filter("type", "Consumption");
//!
//! let result = engine.resolve(&query).await?;
//! assert_eq!(result.categories, vec!["2015"]);
//! assert_eq!(result.series[0].data, vec![Some(10.0)]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod catalog;
pub mod color;
pub mod engine;
pub mod error;
pub mod storage;
pub mod types;
pub mod units;

/// Prometheus metrics
pub mod metrics;

/// Configuration management with TOML support
pub mod config;

/// Tracing subscriber setup
pub mod telemetry;

// Re-export main types
pub use catalog::Catalog;
pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder};
pub use error::{Error, Result};
pub use types::{DimensionKind, DimensionQuery, DimensionResult, MultiSelect, NameColor, Series};
