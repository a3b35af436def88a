//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::departure::{default_departure_time, parse_departure_time};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// traffic-agent - Bangalore traffic heatmaps from live route delays
///
/// Queries the Routes API for a set of traffic hubs, averages the delays,
/// layers incidents on top and returns a gzip+base64 JSON heatmap.
///
/// Examples:
///   traffic-agent --time 2025-07-27T17:00:00Z
///   traffic-agent --mode direct --format json
///   traffic-agent --mode matrix
///   traffic-agent --decode H4sIAKgZhWgC/4XOwQrD...
///   traffic-agent --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// What to run
    #[arg(long, default_value = "agent", value_name = "MODE")]
    pub mode: Mode,

    /// Departure time (ISO 8601, e.g. 2025-07-27T17:00:00Z)
    ///
    /// Defaults to 09:00 UTC three days from now.
    #[arg(short, long, value_name = "TIME")]
    pub time: Option<String>,

    /// Decode a gzip+base64 payload and pretty-print its JSON
    #[arg(long, value_name = "PAYLOAD", conflicts_with = "decode_file")]
    pub decode: Option<String>,

    /// Decode a gzip+base64 payload read from a file
    #[arg(long, value_name = "FILE")]
    pub decode_file: Option<PathBuf>,

    /// Output format (encoded, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the result to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Ollama model to use for the agent
    #[arg(short, long, env = "TRAFFIC_AGENT_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Google Routes API key
    #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Routes API base URL
    #[arg(long, value_name = "URL")]
    pub routes_url: Option<String>,

    /// LLM request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum agent round-trips
    #[arg(long, value_name = "COUNT")]
    pub max_iterations: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .traffic-agent.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .traffic-agent.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// What the binary does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// LLM orchestrates the traffic tools (default)
    #[default]
    Agent,
    /// Build the heatmap directly, no LLM
    Direct,
    /// Print hub delay averages as JSON
    Matrix,
    /// Print the incident list as JSON
    Incidents,
}

/// Output format for the heatmap.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// gzip + base64 payload (default)
    #[default]
    Encoded,
    /// Pretty-printed JSON
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref url) = self.routes_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Routes URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.max_iterations == Some(0) {
            return Err("Max iterations must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref time) = self.time {
            if parse_departure_time(time).is_none() {
                return Err(format!(
                    "Invalid --time {:?}. Use ISO 8601 (YYYY-MM-DDTHH:MM:SSZ)",
                    time
                ));
            }
        }

        if let Some(ref path) = self.decode_file {
            if !path.is_file() {
                return Err(format!("Decode file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// The requested departure time, or the default relative to `now`.
    pub fn departure_time(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.time {
            Some(ref time) => parse_departure_time(time),
            None => Some(default_departure_time(now)),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
