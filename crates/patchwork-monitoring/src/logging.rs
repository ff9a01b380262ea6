//! Structured logging module using tracing.
//!
//! Installs a global subscriber with an env filter and either a pretty or a
//! JSON formatting layer.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::LoggingConfig;

/// Initialize structured logging
///
/// `RUST_LOG` takes precedence over the configured filter. Fails if a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .with_context(|| format!("Invalid log filter: {:?}", config.log_filter))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.enable_json_logging {
        // JSON logs for log aggregation
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        registry
            .with(json_layer)
            .try_init()
            .context("Failed to set global default subscriber")?;
    } else {
        // Pretty logs for development
        let fmt_layer = fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to set global default subscriber")?;
    }

    info!(
        service_name = %config.service_name,
        log_format = if config.enable_json_logging { "json" } else { "pretty" },
        "Logging initialized"
    );

    Ok(())
}

/// Trait to add log context to results
pub trait LogExt<T, E> {
    /// Log error with additional context before returning
    fn log_err(self, message: &str) -> Result<T, E>;

    /// Log success with additional context before returning
    fn log_ok(self, message: &str) -> Result<T, E>;
}

impl<T, E: std::fmt::Display> LogExt<T, E> for Result<T, E> {
    fn log_err(self, message: &str) -> Result<T, E> {
        if let Err(ref e) = self {
            tracing::error!("{}: {}", message, e);
        }
        self
    }

    fn log_ok(self, message: &str) -> Result<T, E> {
        if self.is_ok() {
            tracing::info!("{}", message);
        }
        self
    }
}

/// Install a test-writer subscriber; later calls are no-ops
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_target(false)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_ext_passes_results_through() {
        init_test_logging();

        let ok: Result<u8, String> = Ok(1);
        assert_eq!(ok.log_ok("saved").log_err("save failed"), Ok(1));

        let err: Result<u8, String> = Err("disk full".to_string());
        assert_eq!(
            err.log_ok("saved").log_err("save failed"),
            Err("disk full".to_string())
        );
    }

    #[test]
    fn test_second_init_fails() {
        init_test_logging();
        init_test_logging();

        assert!(init_logging(&LoggingConfig::default()).is_err());
    }
}
