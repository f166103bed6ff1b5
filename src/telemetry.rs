//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt layer filtered by `RUST_LOG` when set,
//! otherwise by `MonitoringConfig::log_level`.

use crate::config::MonitoringConfig;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// Returns `false` when a subscriber was already installed (by an earlier
/// call or by the embedding application); the existing one is kept.
pub fn init_tracing(config: &MonitoringConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            "Dataportal engine v{} logging at '{}'",
            env!("CARGO_PKG_VERSION"),
            config.log_level
        );
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = MonitoringConfig::default();
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
