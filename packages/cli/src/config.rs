use binder_editor::{ResolutionConfig, UndoStack};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "binder.config.json";

/// Binder configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the resolver service
    #[serde(default = "default_resolver_url")]
    pub resolver_url: String,

    /// Per-call resolver timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Concurrent resolver calls
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Undo history kept while applying edits
    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,
}

fn default_resolver_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_in_flight() -> usize {
    binder_editor::DEFAULT_MAX_IN_FLIGHT
}

fn default_undo_levels() -> usize {
    100
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        Self::load_from(&PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME))
    }

    /// Load an explicit `--config` path, falling back to the one in `cwd`
    pub fn resolve(explicit: Option<&Path>, cwd: &str) -> anyhow::Result<Self> {
        match explicit {
            Some(path) if !path.exists() => {
                anyhow::bail!("Config file not found: {}", path.display())
            }
            Some(path) => Self::load_from(path),
            None => Self::load(cwd),
        }
    }

    fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    pub fn resolution_config(&self) -> ResolutionConfig {
        ResolutionConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            max_in_flight: self.max_in_flight.max(1),
        }
    }

    pub fn undo_stack(&self) -> UndoStack {
        UndoStack::with_max_levels(self.undo_levels)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolver_url: default_resolver_url(),
            timeout_ms: default_timeout_ms(),
            max_in_flight: default_max_in_flight(),
            undo_levels: default_undo_levels(),
        }
    }
}
