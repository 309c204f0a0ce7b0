//! Mode switch tool
//!
//! Enables or disables unsafe mode. The mode stays as set until the next call.

use std::sync::Arc;

use async_trait::async_trait;
use riskgate_core::{GateResult, Mode, Tool, ToolConfig, ToolInput, ToolResult};
use riskgate_safety::Gateway;
use serde_json::json;

use super::common::{create_schema, tool_config};

pub const TOOL_NAME: &str = "live_dangerously";

pub struct LiveDangerouslyTool {
    config: ToolConfig,
    gateway: Arc<Gateway>,
}

impl LiveDangerouslyTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        let parameters = create_schema(
            json!({
                "enable_unsafe_mode": {
                    "type": "boolean",
                    "description": "true to allow write operations, false to return to safe mode"
                }
            }),
            vec!["enable_unsafe_mode"],
        );

        Self {
            config: tool_config(
                TOOL_NAME,
                "Switch between safe mode (read-only) and unsafe mode (writes allowed). \
                 Destructive operations still require confirmation in unsafe mode.",
                parameters,
            ),
            gateway,
        }
    }
}

#[async_trait]
impl Tool for LiveDangerouslyTool {
    async fn execute(&self, input: ToolInput) -> GateResult<ToolResult> {
        let enable: bool = input.get_arg("enable_unsafe_mode")?;
        let target = if enable { Mode::Unsafe } else { Mode::Safe };
        let transition = self.gateway.set_mode(target);

        let message = match (transition.changed(), transition.current) {
            (false, mode) => format!("Already in {} mode", mode),
            (true, Mode::Unsafe) => {
                "Unsafe mode enabled: write operations are allowed, destructive ones need confirmation"
                    .to_string()
            }
            (true, Mode::Safe) => "Safe mode enabled: only read operations are allowed".to_string(),
        };

        Ok(ToolResult::success(json!({
            "previous": transition.previous,
            "current": transition.current,
            "changed": transition.changed(),
            "message": message,
        })))
    }

    fn config(&self) -> &ToolConfig {
        &self.config
    }
}
