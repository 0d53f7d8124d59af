//! Configuration management for toolbuddy
//!
//! TOML-based configuration with defaults and validation.
//! Location: ~/.toolbuddy/config.toml

use crate::agent::AgentConfig;
use crate::errors::{AgentError, Result};
use crate::model::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_REQUEST_TIMEOUT};
use crate::tools::{DEFAULT_MAX_PARALLEL, DEFAULT_TOOL_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration for toolbuddy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub agent: AgentConfig,
    pub tools: ToolsConfig,
}

/// Model endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub ollama_url: String,
    pub name: String,
    pub request_timeout_secs: u64,
}

/// Tool execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub max_parallel_tools: usize,
    pub tool_timeout_secs: u64,

    /// Environment variable holding the Tavily search API key
    pub search_api_key_env: String,

    /// Environment variable holding the Serper key, tried after Tavily
    pub serper_api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            name: DEFAULT_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_parallel_tools: DEFAULT_MAX_PARALLEL,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT.as_secs(),
            search_api_key_env: "TAVILY_API_KEY".to_string(),
            serper_api_key_env: "SERPER_API_KEY".to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, or from the standard location when `None`
    ///
    /// A missing file at the standard location is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load_default(),
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AgentError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| AgentError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from the standard location, writing defaults there if absent
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            return Self::load_from_file(&path);
        }

        let config = Config::default();
        config.save(&path)?;
        Ok(config)
    }

    /// Standard configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            AgentError::ConfigError("Could not determine home directory".to_string())
        })?;
        Ok(home.join(".toolbuddy").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.model.ollama_url.trim().is_empty() {
            return Err(AgentError::ConfigError(
                "model.ollama_url must not be empty".to_string(),
            ));
        }

        if self.model.name.trim().is_empty() {
            return Err(AgentError::ConfigError(
                "model.name must not be empty".to_string(),
            ));
        }

        if self.model.request_timeout_secs == 0 {
            return Err(AgentError::ConfigError(
                "model.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.tools.max_parallel_tools == 0 {
            return Err(AgentError::ConfigError(
                "tools.max_parallel_tools must be greater than 0".to_string(),
            ));
        }

        if self.tools.tool_timeout_secs == 0 {
            return Err(AgentError::ConfigError(
                "tools.tool_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| AgentError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AgentError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| AgentError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.model.request_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.tool_timeout_secs)
    }
}
