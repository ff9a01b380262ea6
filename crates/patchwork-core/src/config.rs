//! Configuration for the Patchwork stores
//!
//! This module contains the configuration type and its loading from the
//! environment.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Component, Path};
use tracing::{info, warn};

use crate::CoreError;

/// Patchwork configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchworkConfig {
    /// Hidden, workspace-scoped directory holding persisted state
    #[serde(default = "default_state_dir_name")]
    pub state_dir_name: String,

    /// File name of the persisted overrides inside the state directory
    #[serde(default = "default_overrides_file_name")]
    pub overrides_file_name: String,

    /// Buffered graph events per subscriber before it starts lagging
    #[serde(default = "default_graph_event_capacity")]
    pub graph_event_capacity: usize,

    /// Log filter (e.g., "info,patchwork_edits=debug")
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON logs instead of pretty ones
    #[serde(default)]
    pub json_logs: bool,
}

fn default_state_dir_name() -> String {
    ".patchwork".to_string()
}

fn default_overrides_file_name() -> String {
    "overrides.json".to_string()
}

fn default_graph_event_capacity() -> usize {
    256
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl PatchworkConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self, CoreError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn load_from<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Start with defaults
        let mut config = Self::default();

        if let Some(state_dir) = lookup("PATCHWORK_STATE_DIR") {
            config.state_dir_name = state_dir;
        }

        if let Some(file_name) = lookup("PATCHWORK_OVERRIDES_FILE") {
            config.overrides_file_name = file_name;
        }

        if let Some(capacity) = lookup("PATCHWORK_GRAPH_EVENT_CAPACITY") {
            if let Ok(capacity) = capacity.parse::<usize>() {
                config.graph_event_capacity = capacity;
            } else {
                warn!("Invalid PATCHWORK_GRAPH_EVENT_CAPACITY value: {}", capacity);
            }
        }

        if let Some(filter) = lookup("PATCHWORK_LOG") {
            config.log_filter = filter;
        }

        if let Some(json_logs) = lookup("PATCHWORK_JSON_LOGS") {
            config.json_logs = json_logs.to_lowercase() == "true" || json_logs == "1";
        }

        config.validate()?;

        info!("Loaded patchwork configuration");
        Ok(config)
    }

    /// Check field constraints
    pub fn validate(&self) -> Result<(), CoreError> {
        if !is_single_component(&self.state_dir_name) {
            return Err(CoreError::ConfigurationError(format!(
                "state directory name must be a single path component: {:?}",
                self.state_dir_name
            )));
        }

        if !is_single_component(&self.overrides_file_name) {
            return Err(CoreError::ConfigurationError(format!(
                "overrides file name must be a single path component: {:?}",
                self.overrides_file_name
            )));
        }

        if self.graph_event_capacity == 0 {
            return Err(CoreError::ConfigurationError(
                "graph event capacity must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Path of the persisted overrides file for a workspace
    pub fn overrides_path(&self, workspace_root: &Path) -> std::path::PathBuf {
        workspace_root
            .join(&self.state_dir_name)
            .join(&self.overrides_file_name)
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl Default for PatchworkConfig {
    fn default() -> Self {
        Self {
            state_dir_name: default_state_dir_name(),
            overrides_file_name: default_overrides_file_name(),
            graph_event_capacity: default_graph_event_capacity(),
            log_filter: default_log_filter(),
            json_logs: false,
        }
    }
}
