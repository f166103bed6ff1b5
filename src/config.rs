//! Configuration management for the aggregation engine
//!
//! TOML file support, `DATAPORTAL_*` environment variable overrides and
//! defaults for every field.
//!
//! ```toml
//! [cache]
//! ttl_secs = 900
//!
//! [storage]
//! query_timeout_ms = 30000
//! max_concurrent_queries = 16
//!
//! [ranking]
//! top_n = 10
//! group_type = "country"
//!
//! [axis]
//! mode = "observed"
//! ```

use crate::error::{Error, Result, ValidationError};
use crate::types::{AxisMode, GroupType};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Query cache
    #[serde(default)]
    pub cache: CacheSettings,

    /// Storage access
    #[serde(default)]
    pub storage: StorageSettings,

    /// Quick-select ranking
    #[serde(default)]
    pub ranking: RankingSettings,

    /// Category axis construction
    #[serde(default)]
    pub axis: AxisSettings,

    /// Logging and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Query cache configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Enable caching
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time to live of a cached result, in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached entries
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Per-query timeout in milliseconds
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Size of the storage pool (concurrent queries in flight)
    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: usize,
}

/// Ranking configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RankingSettings {
    /// Entries in each quick-select list
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Group type the candidates are drawn from
    #[serde(default = "default_group_type")]
    pub group_type: GroupType,
}

/// Axis configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AxisSettings {
    /// Default axis mode for time layouts
    #[serde(default)]
    pub mode: AxisMode,
}

/// Monitoring configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Log level or `EnvFilter` directive (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_ttl_secs() -> u64 {
    15 * 60
}
fn default_max_entries() -> usize {
    10_000
}
fn default_query_timeout_ms() -> u64 {
    30_000
}
fn default_max_concurrent_queries() -> usize {
    16
}
fn default_top_n() -> usize {
    10
}
fn default_group_type() -> GroupType {
    GroupType::Country
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            query_timeout_ms: default_query_timeout_ms(),
            max_concurrent_queries: default_max_concurrent_queries(),
        }
    }
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            group_type: default_group_type(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            log_level: default_log_level(),
        }
    }
}

impl CacheSettings {
    /// TTL as a `Duration`
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl StorageSettings {
    /// Query timeout as a `Duration`
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl EngineConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    ///
    /// Unparseable values are ignored and the previous value is kept.
    pub fn apply_env_overrides(&mut self) {
        // Cache
        if let Some(enabled) = env_parse("DATAPORTAL_CACHE_ENABLED") {
            self.cache.enabled = enabled;
        }
        if let Some(ttl) = env_parse("DATAPORTAL_CACHE_TTL_SECS") {
            self.cache.ttl_secs = ttl;
        }
        if let Some(entries) = env_parse("DATAPORTAL_CACHE_MAX_ENTRIES") {
            self.cache.max_entries = entries;
        }

        // Storage
        if let Some(timeout) = env_parse("DATAPORTAL_QUERY_TIMEOUT_MS") {
            self.storage.query_timeout_ms = timeout;
        }
        if let Some(pool) = env_parse("DATAPORTAL_MAX_CONCURRENT_QUERIES") {
            self.storage.max_concurrent_queries = pool;
        }

        // Ranking
        if let Some(top_n) = env_parse("DATAPORTAL_RANKING_TOP_N") {
            self.ranking.top_n = top_n;
        }
        if let Ok(scope) = std::env::var("DATAPORTAL_RANKING_GROUP_TYPE") {
            match scope.as_str() {
                "country" => self.ranking.group_type = GroupType::Country,
                "group" => self.ranking.group_type = GroupType::Group,
                "zone" => self.ranking.group_type = GroupType::Zone,
                _ => {},
            }
        }

        // Axis
        if let Ok(mode) = std::env::var("DATAPORTAL_AXIS_MODE") {
            match mode.as_str() {
                "observed" => self.axis.mode = AxisMode::Observed,
                "full_range" => self.axis.mode = AxisMode::FullRange,
                _ => {},
            }
        }

        // Monitoring
        if let Some(enabled) = env_parse("DATAPORTAL_METRICS_ENABLED") {
            self.monitoring.metrics_enabled = enabled;
        }
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.monitoring.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(ValidationError::Failed(
                "cache.ttl_secs must be > 0 when the cache is enabled".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(ValidationError::Failed(
                "cache.max_entries must be > 0".to_string(),
            ));
        }
        if self.storage.query_timeout_ms == 0 {
            return Err(ValidationError::Failed(
                "storage.query_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.storage.max_concurrent_queries == 0 || self.storage.max_concurrent_queries > 1024 {
            return Err(ValidationError::OutOfRange {
                field: "storage.max_concurrent_queries".to_string(),
                value: self.storage.max_concurrent_queries.to_string(),
                min: "1".to_string(),
                max: "1024".to_string(),
            });
        }
        if self.ranking.top_n == 0 || self.ranking.top_n > 1000 {
            return Err(ValidationError::OutOfRange {
                field: "ranking.top_n".to_string(),
                value: self.ranking.top_n.to_string(),
                min: "1".to_string(),
                max: "1000".to_string(),
            });
        }
        if self.monitoring.log_level.trim().is_empty() {
            return Err(ValidationError::MissingField("monitoring.log_level".to_string()));
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents).map_err(|e| {
            Error::Configuration(format!("Failed to write config file {}: {}", path.display(), e))
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.cache.ttl(), Duration::from_secs(900));
        assert_eq!(config.ranking.top_n, 10);
        assert_eq!(config.ranking.group_type, GroupType::Country);
        assert_eq!(config.axis.mode, AxisMode::Observed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [ranking]
            top_n = 5
            group_type = "zone"

            [axis]
            mode = "full_range"
            "#,
        )
        .unwrap();
        assert_eq!(config.ranking.top_n, 5);
        assert_eq!(config.ranking.group_type, GroupType::Zone);
        assert_eq!(config.axis.mode, AxisMode::FullRange);
        assert_eq!(config.storage.max_concurrent_queries, 16);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_invalid_top_n() {
        let mut config = EngineConfig::default();
        config.ranking.top_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("DATAPORTAL_RANKING_TOP_N", "7");
        let config = EngineConfig::from_env();
        assert_eq!(config.ranking.top_n, 7);
        std::env::remove_var("DATAPORTAL_RANKING_TOP_N");
    }
}
