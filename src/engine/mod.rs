//! Dimension engine
//!
//! ```text
//!                    ┌──────────────────────────────────────────┐
//! DimensionQuery ──► │ DimensionResolver                        │
//!                    │   FilterSnapshot (validate once)         │
//!                    │   data / axis / ranking (concurrent)     │ ──► DimensionResult
//!                    │   assembler + ranking                    │
//!                    └───────────────┬──────────────────────────┘
//!                                    │ RowFetcher (row cache)
//!                                    ▼
//!                             StorageGateway ──► FactStore
//! ```
//!
//! [`OptionsService`] serves the topic option lists over the same row cache.

/// Series alignment per layout
pub mod assembler;
/// Engine construction
pub mod builder;
/// Request validation and predicates
pub mod filters;
/// Option lookups
pub mod options;
/// Quick-select ranking
pub mod ranking;
/// Query resolution
pub mod resolver;
/// Cached row access
pub mod rows;

pub use builder::{Engine, EngineBuilder};
pub use filters::FilterSnapshot;
pub use options::OptionsService;
pub use ranking::Ranking;
pub use resolver::DimensionResolver;
pub use rows::RowFetcher;
