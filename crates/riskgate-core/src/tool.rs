//! Tool abstraction - how the gateway is exposed to agents
//!
//! A tool has a static configuration (name, description, JSON schema of its
//! arguments) and an async `execute` entry point.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{GateError, GateResult};

/// Static tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    pub name: String,
    pub description: String,

    /// JSON schema of the tool arguments
    pub parameters: serde_json::Value,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Tool definition as advertised to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Arguments passed to a tool invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolInput {
    pub arguments: serde_json::Value,
}

impl ToolInput {
    pub fn new(arguments: serde_json::Value) -> Self {
        Self { arguments }
    }

    /// Deserialize a required argument
    pub fn get_arg<T: DeserializeOwned>(&self, key: &str) -> GateResult<T> {
        let value = self
            .arguments
            .get(key)
            .ok_or_else(|| GateError::tool(format!("Missing argument: {}", key)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| GateError::tool(format!("Invalid argument '{}': {}", key, e)))
    }

    /// Deserialize an optional argument; absent and `null` both yield `None`
    pub fn get_opt_arg<T: DeserializeOwned>(&self, key: &str) -> GateResult<Option<T>> {
        match self.arguments.get(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(_) => self.get_arg(key).map(Some),
        }
    }
}

/// Result of a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub data: serde_json::Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub execution_time_ms: u64,
}

impl ToolResult {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
            execution_time_ms: 0,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: serde_json::Value::Null,
            error: Some(message.into()),
            execution_time_ms: 0,
        }
    }

    /// Failed result that still carries structured data for the caller
    pub fn error_with_data(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: false,
            data,
            error: Some(message.into()),
            execution_time_ms: 0,
        }
    }

    pub fn with_execution_time(mut self, elapsed_ms: u64) -> Self {
        self.execution_time_ms = elapsed_ms;
        self
    }
}

/// A callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    async fn execute(&self, input: ToolInput) -> GateResult<ToolResult>;

    fn config(&self) -> &ToolConfig;

    fn definition(&self) -> ToolDefinition {
        let config = self.config();
        ToolDefinition {
            name: config.name.clone(),
            description: config.description.clone(),
            parameters: config.parameters.clone(),
        }
    }
}

/// Dispatches tool calls by name
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute_tool(&self, name: &str, input: ToolInput) -> GateResult<ToolResult>;

    fn list_tools(&self) -> Vec<ToolDefinition>;

    fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>>;
}
