//! Configuration loading and management
//!
//! Handles parsing of the `config.toml` file in the platform config
//! directory (or the path given with `--config`).

use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::{self, TODOS_KEY};

/// File name of the config inside the platform config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where tasks are persisted
    #[serde(default)]
    pub store: StoreConfig,

    /// How tasks are rendered
    #[serde(default)]
    pub display: DisplayConfig,

    /// Interactive prompts
    #[serde(default)]
    pub prompts: PromptConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Slot document path; defaults to the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Slot key holding the task list
    #[serde(default = "default_key")]
    pub key: String,
}

fn default_key() -> String {
    TODOS_KEY.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            key: default_key(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeZoneChoice {
    #[default]
    Local,
    Utc,
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// chrono strftime pattern for due dates
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Shown when a due date is not a valid timestamp
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Time zone due dates are rendered in
    #[serde(default)]
    pub timezone: TimeZoneChoice,
}

fn default_date_format() -> String {
    "%d/%m/%Y %H:%M".to_string()
}

fn default_placeholder() -> String {
    "No date set".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            placeholder: default_placeholder(),
            timezone: TimeZoneChoice::default(),
        }
    }
}

/// Prompt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Ask before deleting; `false` auto-affirms
    #[serde(default = "default_true")]
    pub confirm_delete: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            confirm_delete: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicitly requested file, or discover the default one.
    ///
    /// An explicit path must exist and parse. The discovered file falls back
    /// to defaults when missing or invalid.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        Ok(default_config_path()
            .map(|path| Self::load_or_default(&path))
            .unwrap_or_default())
    }

    /// Load configuration from a file, or return defaults
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Slot document path: `override_path`, then `store.path`, then the default
    pub fn storage_path(&self, override_path: Option<&Path>) -> Result<PathBuf> {
        match override_path.or(self.store.path.as_deref()) {
            Some(path) => Ok(path.to_path_buf()),
            None => storage::default_storage_path(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.store.key.trim().is_empty() {
            return Err(Error::InvalidConfig("store.key cannot be empty".to_string()));
        }
        self.display.validate()
    }
}

impl DisplayConfig {
    fn validate(&self) -> Result<()> {
        if self.date_format.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "display.date_format cannot be empty".to_string(),
            ));
        }
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::InvalidConfig(format!(
                "display.date_format: invalid pattern '{}'",
                self.date_format
            )));
        }
        Ok(())
    }
}

/// Default location of the config file
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "taskmaster").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
