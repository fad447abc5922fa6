//! Configuration file support.
//!
//! Configuration is layered: global file, then local file, then environment
//! variables. Later layers override earlier ones key by key.

use modelrun_abstraction::GenerationParameters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::factory::{Backend, RunnerConfig};
use crate::hub::HubSettings;
use crate::task::Task;

/// Environment variable overriding `hub.base_url`.
pub const ENV_HUB_URL: &str = "MODELRUN_HUB_URL";
/// Environment variable overriding `hub.api_token`.
pub const ENV_HUB_TOKEN: &str = "MODELRUN_HUB_TOKEN";
/// Fallback token variable shared with other Hugging Face tooling.
pub const ENV_HF_TOKEN: &str = "HF_TOKEN";
/// Environment variable overriding `log_level`.
pub const ENV_LOG_LEVEL: &str = "MODELRUN_LOG_LEVEL";

/// Memoization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Whether runners are wrapped in the caching decorator.
    pub enabled: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// modelrun configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelrunConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Inference service connection.
    pub hub: HubSettings,

    /// Memoization settings.
    pub cache: CacheSettings,

    /// Fixed inference budget for every runner.
    pub generation: GenerationParameters,

    /// Model id per task.
    pub models: BTreeMap<Task, String>,
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read or write a configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse a configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl ModelrunConfig {
    /// Load configuration from a single TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        Self::from_table(read_table(path)?)
    }

    /// Load and merge the given files in order, skipping missing ones.
    pub fn load_layers(paths: &[PathBuf]) -> ConfigResult<Self> {
        let mut merged = toml::Table::new();
        for path in paths {
            match read_table(path) {
                Ok(table) => {
                    debug!(path = %path.display(), "Loaded configuration layer");
                    merge_tables(&mut merged, table);
                }
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Self::from_table(merged)
    }

    /// Discover and load configuration files, then apply the environment.
    ///
    /// Loads from:
    /// 1. Global config (~/.modelrun/config.toml)
    /// 2. Local config (./.modelrunrc)
    ///
    /// Local config overrides global config.
    pub fn discover_and_load() -> ConfigResult<Self> {
        let layers = [Self::default_global_path(), Self::default_local_path()];
        let mut config = Self::load_layers(&layers)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::ReadError(format!("Failed to create directory: {}", e)))?;
        }

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("Failed to write file: {}", e)))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".modelrun")
            .join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".modelrunrc")
    }

    /// Override values from environment variables looked up through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_HUB_URL) {
            self.hub.base_url = url;
        }
        if let Some(token) = lookup(ENV_HUB_TOKEN).or_else(|| lookup(ENV_HF_TOKEN)) {
            self.hub.api_token = Some(token);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = Some(level);
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.hub.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue("hub.base_url must not be empty".to_string()));
        }
        if self.hub.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "hub.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.generation.max_new_tokens == 0 {
            return Err(ConfigError::InvalidValue(
                "generation.max_new_tokens must be greater than 0".to_string(),
            ));
        }
        if self.generation.num_inference_steps == 0 {
            return Err(ConfigError::InvalidValue(
                "generation.num_inference_steps must be greater than 0".to_string(),
            ));
        }
        if let Some((task, _)) = self.models.iter().find(|(_, id)| id.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(format!(
                "models.{} must not be empty",
                task.slug()
            )));
        }
        Ok(())
    }

    /// The configured model for `task`.
    pub fn model_for(&self, task: Task) -> Option<&str> {
        self.models.get(&task).map(String::as_str)
    }

    /// Runner configuration for `task`, if a model is available for it.
    ///
    /// The mock backend never needs a configured model.
    pub fn runner_config(&self, task: Task, backend: Backend) -> Option<RunnerConfig> {
        let model_id = match (self.model_for(task), backend) {
            (Some(id), _) => id.to_string(),
            (None, Backend::Mock) => format!("mock-{}", task.slug()),
            (None, Backend::Hub) => return None,
        };
        Some(
            RunnerConfig::new(task, model_id)
                .with_backend(backend)
                .with_hub(self.hub.clone())
                .with_parameters(self.generation.clone()),
        )
    }

    fn from_table(table: toml::Table) -> ConfigResult<Self> {
        toml::Value::Table(table)
            .try_into()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

fn read_table(path: &Path) -> ConfigResult<toml::Table> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

    content
        .parse::<toml::Table>()
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
