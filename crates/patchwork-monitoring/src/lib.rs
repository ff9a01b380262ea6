//! Logging setup for Patchwork hosts.

use patchwork_core::PatchworkConfig;

pub mod logging;

pub use logging::{init_logging, init_test_logging, LogExt};

/// Configuration for initializing logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info,patchwork_edits=debug")
    pub log_filter: String,
    /// Emit JSON lines instead of pretty output
    pub enable_json_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            service_name: "patchwork".to_string(),
            log_filter: "info".to_string(),
            enable_json_logging: false,
        }
    }
}

impl From<&PatchworkConfig> for LoggingConfig {
    fn from(config: &PatchworkConfig) -> Self {
        Self {
            log_filter: config.log_filter.clone(),
            enable_json_logging: config.json_logs,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.service_name, "patchwork");
        assert_eq!(config.log_filter, "info");
        assert!(!config.enable_json_logging);
    }

    #[test]
    fn test_from_patchwork_config() {
        let patchwork = PatchworkConfig {
            log_filter: "debug".to_string(),
            json_logs: true,
            ..PatchworkConfig::default()
        };

        let config = LoggingConfig::from(&patchwork);
        assert_eq!(config.log_filter, "debug");
        assert!(config.enable_json_logging);
    }
}
