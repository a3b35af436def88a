//! Agent loop for tool-based heatmap generation.
//!
//! The model is given the three traffic tools and asked to build a
//! heatmap for a departure time. The loop runs until the model answers
//! without calling a tool, or the iteration cap is hit.

use crate::agent::tools::{get_tool_definitions, ToolCall, ToolExecutor};
use crate::codec;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_iterations: usize,
    pub timeout_seconds: u64,
    /// Max tool results to keep in context (sliding window)
    pub max_context_messages: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.1:8b".to_string(),
            temperature: 0.1,
            max_iterations: 12,
            timeout_seconds: 300,
            max_context_messages: 10,
        }
    }
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: None,
            tool_name: None,
        }
    }
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// What the agent produced.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// Base64 gzip JSON heatmap, if one was produced.
    pub heatmap: Option<String>,
    /// The model's last text reply.
    pub final_message: String,
    pub iterations: usize,
}

/// The heatmap agent.
pub struct TrafficAgent {
    config: AgentConfig,
    http_client: reqwest::Client,
    tool_executor: ToolExecutor,
    messages: Vec<ChatMessage>,
}

impl TrafficAgent {
    pub fn new(config: AgentConfig, tool_executor: ToolExecutor) -> Result<Self> {
        info!("Initializing agent with model {}", config.model_name);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
            tool_executor,
            messages: Vec::new(),
        })
    }

    pub fn tool_executor(&self) -> &ToolExecutor {
        &self.tool_executor
    }

    /// Run the tool-calling loop for one departure time.
    pub async fn run(&mut self, departure_time: DateTime<Utc>) -> Result<AgentOutcome> {
        let time_str = departure_time.to_rfc3339_opts(SecondsFormat::Secs, true);
        info!("Starting heatmap generation for {}", time_str);

        self.messages.clear();
        self.messages
            .push(ChatMessage::new("system", AGENT_SYSTEM_PROMPT));
        self.messages.push(ChatMessage::new(
            "user",
            format!(
                "Create the Bangalore traffic heatmap for departure time {}.",
                time_str
            ),
        ));

        let mut final_message = String::new();
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            iterations += 1;
            debug!("Agent iteration {}", iterations);

            let response = self.chat_with_tools().await?;

            let tool_calls = response.tool_calls.unwrap_or_default();
            if tool_calls.is_empty() {
                final_message = response.content;
                info!("Agent finished after {} iteration(s)", iterations);
                break;
            }

            for tool_call in &tool_calls {
                let result = self.tool_executor.execute(tool_call).await;
                if !result.success {
                    warn!(
                        "Tool {} failed: {}",
                        tool_call.function.name,
                        result.error.as_deref().unwrap_or_default()
                    );
                }

                self.messages.push(ChatMessage {
                    role: "tool".to_string(),
                    content: result.content(),
                    tool_calls: None,
                    tool_name: Some(tool_call.function.name.clone()),
                });

                // Sliding window: prune old tool messages to save context
                self.prune_old_messages();

                info!("Tool {} executed", tool_call.function.name);
            }

            if iterations == self.config.max_iterations {
                warn!(
                    "Reached max iterations ({}) without a final answer",
                    self.config.max_iterations
                );
            }
        }

        let heatmap = self
            .tool_executor
            .packed_heatmap()
            .map(str::to_string)
            .or_else(|| packed_payload_in(&final_message));

        if heatmap.is_none() {
            warn!("Agent did not produce a packed heatmap");
        }

        Ok(AgentOutcome {
            heatmap,
            final_message,
            iterations,
        })
    }

    /// Prune old tool messages to keep context small (sliding window).
    fn prune_old_messages(&mut self) {
        // Keep: system prompt + initial user + last N messages
        let keep_start = 2;
        let max_keep = self.config.max_context_messages + keep_start;

        if self.messages.len() > max_keep {
            let remove_count = self.messages.len() - max_keep;
            self.messages.drain(keep_start..keep_start + remove_count);
            debug!("Pruned {} old messages to save context", remove_count);
        }
    }

    /// Send a chat request with tools to Ollama.
    async fn chat_with_tools(&mut self) -> Result<ChatMessage> {
        let url = format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'));

        let tools_json = get_tool_definitions()
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
            .context("Failed to serialize tool definitions")?;

        let request = OllamaChatRequest {
            model: &self.config.model_name,
            messages: &self.messages,
            tools: tools_json,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending chat request with {} messages", self.messages.len());

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!(
                        "Request timed out after {}s. Try a different model.",
                        self.config.timeout_seconds
                    )
                } else if e.is_connect() {
                    anyhow::anyhow!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.config.ollama_url
                    )
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, body));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        self.messages.push(chat_response.message.clone());

        Ok(chat_response.message)
    }
}

/// Accept a final reply that is itself a packed payload.
fn packed_payload_in(message: &str) -> Option<String> {
    let candidate = message.trim().trim_matches('`').trim();
    if candidate.is_empty() {
        return None;
    }

    codec::decode_gzip_base64(candidate)
        .ok()
        .filter(|json| serde_json::from_str::<Value>(json).is_ok())
        .map(|_| candidate.to_string())
}

/// System prompt for tool-calling mode
const AGENT_SYSTEM_PROMPT: &str = r#"You are a traffic agent that predicts traffic in Bangalore for a given time. Build a traffic heatmap by combining several data sources.

## Available Tools

- `get_Maps_delays(time_str)` - Average delay percentage per hub, as base64 gzip JSON
- `get_incident_data()` - Current incidents with severity and type
- `gzip_json(json_str)` - Compress the final JSON array

## Your Process

1. Call get_Maps_delays with the requested time in ISO 8601 format.
2. Turn every hub into a heatmap point weighted by its delay.
3. Call get_incident_data and add a point for each incident. Weigh it by severity and type.
4. Combine all points into one JSON array of the form
   [{"location":{"lat":<latitude>,"lng":<longitude>},"weight":<traffic weight>}]
5. Call gzip_json with that array and reply with the returned string only.
"#;
