//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.traffic-agent.toml` files.

use crate::agent::AgentConfig;
use crate::cli::OutputFormat;
use crate::hubs::{bangalore_hubs, validate_hubs};
use crate::models::Hub;
use crate::routes::RoutesClientConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = ".traffic-agent.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Hub overrides. Empty means the built-in Bangalore list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hubs: Vec<Hub>,

    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Routes API settings.
    #[serde(default)]
    pub routes: RoutesConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output file path. Stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Output format for the final heatmap.
    #[serde(default)]
    pub format: OutputFormat,
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,

    /// Maximum chat round-trips before giving up.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Tool results kept in the chat history.
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_model_timeout(),
            max_iterations: default_max_iterations(),
            max_context_messages: default_max_context_messages(),
        }
    }
}

fn default_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_model_timeout() -> u64 {
    300
}

fn default_max_iterations() -> usize {
    12
}

fn default_max_context_messages() -> usize {
    10
}

/// Routes API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// API key. Prefer the GOOGLE_MAPS_API_KEY environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the Routes API.
    #[serde(default = "default_routes_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_routes_timeout")]
    pub timeout_seconds: u64,

    /// Origins × destinations per request.
    #[serde(default = "default_max_elements")]
    pub max_elements_per_request: usize,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_routes_url(),
            timeout_seconds: default_routes_timeout(),
            max_elements_per_request: default_max_elements(),
        }
    }
}

fn default_routes_url() -> String {
    "https://routes.googleapis.com".to_string()
}

fn default_routes_timeout() -> u64 {
    60
}

fn default_max_elements() -> usize {
    625
}

impl From<&RoutesConfig> for RoutesClientConfig {
    fn from(config: &RoutesConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            timeout_seconds: config.timeout_seconds,
            max_elements_per_request: config.max_elements_per_request,
        }
    }
}

impl From<&ModelConfig> for AgentConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            ollama_url: config.ollama_url.clone(),
            model_name: config.name.clone(),
            temperature: config.temperature,
            max_iterations: config.max_iterations,
            timeout_seconds: config.timeout_seconds,
            max_context_messages: config.max_context_messages,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.traffic-agent.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// The hubs to query: overrides if present, else the built-in list.
    pub fn effective_hubs(&self) -> Result<Vec<Hub>> {
        let hubs = if self.hubs.is_empty() {
            bangalore_hubs()
        } else {
            self.hubs.clone()
        };

        validate_hubs(&hubs).context("Invalid [[hubs]] configuration")?;
        Ok(hubs)
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if let Some(max_iterations) = args.max_iterations {
            self.model.max_iterations = max_iterations;
        }

        if let Some(ref key) = args.api_key {
            self.routes.api_key = Some(key.clone());
        }
        if let Some(ref url) = args.routes_url {
            self.routes.base_url = url.clone();
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
