//! Tool implementations
//!
//! The gateway is exposed to agents through four tools:
//! - `send_management_api_request` - run an API operation through the gateway
//! - `get_management_api_spec` - browse the API catalog
//! - `live_dangerously` - switch between safe and unsafe mode
//! - `get_management_api_safety_rules` - explain the active safety rules

pub mod api_request;
pub mod api_spec;
pub mod live_mode;
pub mod safety_rules;

use std::sync::Arc;

use riskgate_core::Tool;
use riskgate_safety::{Gateway, RequestExecutor};

use crate::registry::ToolCategory;

pub use api_request::SendApiRequestTool;
pub use api_spec::GetApiSpecTool;
pub use live_mode::LiveDangerouslyTool;
pub use safety_rules::SafetyRulesTool;

/// Collection of all gateway tools
pub struct GatewayTools;

impl GatewayTools {
    /// Get all gateway tools
    pub fn all(gateway: Arc<Gateway>, executor: Arc<dyn RequestExecutor>) -> Vec<Box<dyn Tool>> {
        Self::categorized(gateway, executor)
            .into_iter()
            .map(|(_, tool)| tool)
            .collect()
    }

    pub(crate) fn categorized(
        gateway: Arc<Gateway>,
        executor: Arc<dyn RequestExecutor>,
    ) -> Vec<(ToolCategory, Box<dyn Tool>)> {
        let api: Box<dyn Tool> = Box::new(SendApiRequestTool::new(gateway.clone(), executor));
        let spec: Box<dyn Tool> = Box::new(GetApiSpecTool::new(gateway.clone()));
        let mode: Box<dyn Tool> = Box::new(LiveDangerouslyTool::new(gateway.clone()));
        let rules: Box<dyn Tool> = Box::new(SafetyRulesTool::new(gateway));
        vec![
            (ToolCategory::Api, api),
            (ToolCategory::Catalog, spec),
            (ToolCategory::Safety, mode),
            (ToolCategory::Safety, rules),
        ]
    }
}

/// Common utilities for tool implementations
pub mod common {
    use riskgate_core::ToolConfig;
    use std::collections::HashMap;

    /// Create a standard JSON schema for a tool with required and optional parameters
    pub fn create_schema(properties: serde_json::Value, required: Vec<&str>) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    /// Create a basic tool config
    pub fn tool_config(name: &str, description: &str, parameters: serde_json::Value) -> ToolConfig {
        tool_config_with_timeout(name, description, parameters, 30)
    }

    /// Create a tool config with custom timeout
    pub fn tool_config_with_timeout(
        name: &str,
        description: &str,
        parameters: serde_json::Value,
        timeout_secs: u64,
    ) -> ToolConfig {
        ToolConfig {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
            timeout_secs,
            extra: HashMap::new(),
        }
    }
}
