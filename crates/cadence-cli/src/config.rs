//! Configuration file support

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use cadence_agent::RuntimeConfig;
use serde::{Deserialize, Serialize};

/// Configuration for cadence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model used by the specialist responders
    pub responder_model: Option<String>,
    /// Model used for request classification
    pub classifier_model: Option<String>,
    /// Model used for conversation summarization
    pub summarizer_model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Whole-turn deadline in seconds
    pub turn_timeout_secs: Option<u64>,
    /// Base URL of an OpenAI-compatible endpoint
    pub base_url: Option<String>,
    /// API keys (alternative to environment variables)
    #[serde(default)]
    pub api_keys: ApiKeys,
}

/// API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub openai: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cadence")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CADENCE_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        Config::default().save()?;
        Ok(path)
    }

    /// Get the API key, checking config then environment
    pub fn api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_keys.openai {
            return Some(key.clone());
        }
        std::env::var("OPENAI_API_KEY").ok()
    }

    /// Resolve the runtime configuration, with an optional model override
    pub fn runtime_config(&self, model_override: Option<String>) -> RuntimeConfig {
        let defaults = RuntimeConfig::default();
        RuntimeConfig {
            responder_model: model_override
                .or_else(|| self.responder_model.clone())
                .unwrap_or(defaults.responder_model),
            classifier_model: self
                .classifier_model
                .clone()
                .unwrap_or(defaults.classifier_model),
            summarizer_model: self
                .summarizer_model
                .clone()
                .unwrap_or(defaults.summarizer_model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            turn_timeout: self
                .turn_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.turn_timeout),
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# cadence configuration file
# Place at ~/.config/cadence/config.toml (Linux/Mac) or %APPDATA%\cadence\config.toml (Windows)

# Models (all optional)
# responder_model = "gpt-4o"
# classifier_model = "gpt-4o"
# summarizer_model = "gpt-4o-mini"

# Sampling temperature
# temperature = 0.2

# Whole-turn deadline in seconds
# turn_timeout_secs = 120

# Point at any OpenAI-compatible endpoint
# base_url = "https://api.openai.com/v1"

# API keys (optional - the OPENAI_API_KEY environment variable is preferred)
[api_keys]
# openai = "sk-..."
"#
}
