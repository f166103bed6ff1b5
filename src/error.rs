//! Error types for the aggregation engine

use std::time::Duration;
use thiserror::Error;

/// Main error type for the engine
///
/// Every failure that aborts a request ends up here. Color lookup misses are
/// not errors: they are recovered locally with a fallback color.
#[derive(Error, Debug)]
pub enum Error {
    /// The caller supplied a filter combination the dimension cannot serve
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Unit conversion failed
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Storage failed, timed out or returned malformed rows
    #[error("Data unavailable: {0}")]
    DataUnavailable(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Shorthand for an `InvalidQuery` error
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidQuery(message.into())
    }

    /// Short, stable label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidQuery(_) => "invalid_query",
            Error::Conversion(_) => "conversion",
            Error::DataUnavailable(_) => "data_unavailable",
            Error::Configuration(_) => "configuration",
            Error::Serialization(_) => "serialization",
        }
    }
}

/// Unit conversion errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// Unit name is not part of any known family
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// Unit exists but belongs to another family than the one requested
    #[error("Unit {unit} does not belong to the {family} family")]
    FamilyMismatch {
        /// Offending unit (wire name)
        unit: String,
        /// Family the conversion was requested in
        family: String,
    },
}

/// Storage errors
///
/// Produced by the fact store or by the gateway that bounds it.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// The backend rejected or failed the query
    #[error("Query failed on {table}: {message}")]
    QueryFailed {
        /// Table the query targeted
        table: String,
        /// Backend message
        message: String,
    },

    /// The query exceeded its time budget
    #[error("Query on {table} timed out after {after:?}")]
    Timeout {
        /// Table the query targeted
        table: String,
        /// Configured budget
        after: Duration,
    },

    /// A row did not have the expected shape
    #[error("Malformed row in {table}: {message}")]
    MalformedRow {
        /// Table the row came from
        table: String,
        /// What was wrong with it
        message: String,
    },

    /// The table is not known to the store
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// The connection pool was shut down
    #[error("Connection pool closed")]
    PoolClosed,
}

impl StorageError {
    /// Build a malformed-row error
    pub fn malformed(table: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::MalformedRow {
            table: table.into(),
            message: message.into(),
        }
    }
}

/// Validation errors
///
/// Field-level failures raised while checking a `DimensionQuery` or a config.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Value is out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Field name being validated
        field: String,
        /// The invalid value
        value: String,
        /// Minimum allowed value
        min: String,
        /// Maximum allowed value
        max: String,
    },

    /// Required field is missing
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Year range is inverted
    #[error("Invalid year range: start {start} > end {end}")]
    InvertedRange {
        /// First year
        start: i32,
        /// Last year
        end: i32,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    Failed(String),
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::InvalidQuery(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_invalid_query() {
        let err: Error = ValidationError::MissingField("gdpUnit".to_string()).into();
        assert!(matches!(err, Error::InvalidQuery(_)));
        assert!(err.to_string().contains("gdpUnit"));
        assert_eq!(err.kind(), "invalid_query");
    }

    #[test]
    fn test_storage_error_is_data_unavailable() {
        let err: Error = StorageError::Timeout {
            table: "facts".to_string(),
            after: Duration::from_millis(5),
        }
        .into();
        assert!(matches!(err, Error::DataUnavailable(_)));
        assert!(err.to_string().contains("timed out"));
    }
}
