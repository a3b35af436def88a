//! Tool definitions for the traffic agent.
//!
//! This module defines the tools the LLM can call to fetch delay data,
//! read incidents and pack the final heatmap.

use crate::codec;
use crate::departure::parse_departure_time;
use crate::models::{Hub, HubAverage, Incident};
use crate::routes::{fetch_hub_averages, RoutesClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const GET_MAPS_DELAYS: &str = "get_Maps_delays";
pub const GET_INCIDENT_DATA: &str = "get_incident_data";
pub const GZIP_JSON: &str = "gzip_json";

/// Shown to the model verbatim (with the `Error: ` prefix).
pub const INVALID_TIME_MESSAGE: &str =
    "Invalid time format. Please use ISO 8601 format (YYYY-MM-DDTHH:MM:SSZ).";

/// Tool definition for Ollama's tool-calling API.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool call made by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message),
        }
    }

    /// Text fed back to the model.
    pub fn content(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!("Error: {}", self.error.as_deref().unwrap_or_default())
        }
    }
}

/// The tools executor that handles tool calls.
pub struct ToolExecutor {
    routes: RoutesClient,
    hubs: Vec<Hub>,
    incidents: Vec<Incident>,
    /// Hub averages from the most recent successful delay fetch.
    last_hub_averages: Option<Vec<HubAverage>>,
    /// Output of the most recent `gzip_json` call.
    last_packed: Option<String>,
}

impl ToolExecutor {
    pub fn new(routes: RoutesClient, hubs: Vec<Hub>, incidents: Vec<Incident>) -> Self {
        Self {
            routes,
            hubs,
            incidents,
            last_hub_averages: None,
            last_packed: None,
        }
    }

    /// The packed heatmap, if the model produced one.
    pub fn packed_heatmap(&self) -> Option<&str> {
        self.last_packed.as_deref()
    }

    pub fn last_hub_averages(&self) -> Option<&[HubAverage]> {
        self.last_hub_averages.as_deref()
    }

    /// Execute a tool call and return the result.
    pub async fn execute(&mut self, tool_call: &ToolCall) -> ToolResult {
        let name = &tool_call.function.name;
        let args = &tool_call.function.arguments;

        debug!("Executing tool: {} with args: {:?}", name, args);

        match name.as_str() {
            GET_MAPS_DELAYS => self.get_maps_delays(args).await,
            GET_INCIDENT_DATA => self.get_incident_data(),
            GZIP_JSON => self.gzip_json(args),
            _ => ToolResult::error(format!("Unknown tool: {}", name)),
        }
    }

    /// Fetch hub delays for a departure time, packed as gzip+base64 JSON.
    async fn get_maps_delays(&mut self, args: &Value) -> ToolResult {
        let Some(time_str) = args.get("time_str").and_then(|v| v.as_str()) else {
            return ToolResult::error("Missing required parameter: time_str".to_string());
        };

        let Some(departure_time) = parse_departure_time(time_str) else {
            warn!("Model supplied unparsable time: {:?}", time_str);
            return ToolResult::error(INVALID_TIME_MESSAGE.to_string());
        };

        let averages = match fetch_hub_averages(&self.routes, &self.hubs, departure_time).await {
            Ok(a) => a,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        info!("Computed delays for {} hubs", averages.len());

        let result = match codec::encode_json(&averages) {
            Ok(packed) => ToolResult::success(packed),
            Err(e) => ToolResult::error(format!("Failed to pack delays: {}", e)),
        };
        self.last_hub_averages = Some(averages);
        result
    }

    /// Return the incident list as JSON.
    fn get_incident_data(&self) -> ToolResult {
        match serde_json::to_string(&self.incidents) {
            Ok(json) => ToolResult::success(json),
            Err(e) => ToolResult::error(format!("Failed to serialize incidents: {}", e)),
        }
    }

    /// Pack a JSON string with gzip and base64.
    fn gzip_json(&mut self, args: &Value) -> ToolResult {
        // Some models send the array itself rather than its string form.
        let json_str = match args.get("json_str") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => {
                return ToolResult::error("Missing required parameter: json_str".to_string())
            }
            Some(other) => other.to_string(),
        };

        match codec::gzip_json(&json_str) {
            Ok(packed) => {
                self.last_packed = Some(packed.clone());
                ToolResult::success(packed)
            }
            Err(e) => ToolResult::error(format!("Failed to compress: {}", e)),
        }
    }
}

/// Get the tool definitions for the Ollama API.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: GET_MAPS_DELAYS.to_string(),
                description: "Calls the Google Maps API to give expected delays for a specific time. Returns a base64 gzip JSON list of hubs with their average delay percentage.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "time_str": {
                            "type": "string",
                            "description": "The date and time to get the matrix for, formatted as an ISO 8601 string (e.g., \"2025-07-27T17:00:00Z\")."
                        }
                    },
                    "required": ["time_str"]
                }),
            },
        },
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: GET_INCIDENT_DATA.to_string(),
                description: "Retrieves a list of current incidents in Bangalore.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
        },
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: GZIP_JSON.to_string(),
                description: "Compresses a JSON string with Gzip and encodes it as a Base64 string.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "json_str": {
                            "type": "string",
                            "description": "A stringified JSON."
                        }
                    },
                    "required": ["json_str"]
                }),
            },
        },
    ]
}
