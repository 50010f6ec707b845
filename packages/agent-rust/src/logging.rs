//! Subscriber installation for binaries and embedding applications.
//!
//! The library only emits `tracing` events; it never installs a subscriber
//! on its own.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs a global `tracing` subscriber according to `config`.
///
/// Returns `Ok(false)` when logging is disabled or a subscriber was already
/// installed by the host application.
///
/// # Errors
///
/// Returns an error when `config.filter` is not a valid filter directive.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<bool> {
    if !config.enabled {
        return Ok(false);
    }
    let filter = EnvFilter::try_new(&config.filter)?;
    let installed = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    };
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_logging_installs_nothing() {
        let config = LoggingConfig {
            enabled: false,
            ..LoggingConfig::default()
        };
        assert!(!init_logging(&config).unwrap());
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let config = LoggingConfig {
            filter: "info,[=".to_string(),
            ..LoggingConfig::default()
        };
        assert!(init_logging(&config).is_err());
    }
}
