//! LLM agent modules for heatmap generation.
//!
//! This module provides the tool-calling agent and the traffic tools it
//! can call.

pub mod agent_loop;
pub mod tools;

pub use agent_loop::{AgentConfig, TrafficAgent};
pub use tools::ToolExecutor;
