//! Management API catalog tool
//!
//! Read-only view of the API catalog with the risk tier of every operation.
//! Always allowed, whatever the mode.

use std::sync::Arc;

use async_trait::async_trait;
use riskgate_core::{GateError, GateResult, HttpMethod, Tool, ToolConfig, ToolInput, ToolResult};
use riskgate_safety::{Gateway, SpecQuery};
use serde_json::json;
use tracing::debug;

use super::common::{create_schema, tool_config};

pub const TOOL_NAME: &str = "get_management_api_spec";

pub struct GetApiSpecTool {
    config: ToolConfig,
    gateway: Arc<Gateway>,
}

impl GetApiSpecTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        let parameters = create_schema(
            json!({
                "path": {
                    "type": "string",
                    "description": "Operation path; with method, returns full detail"
                },
                "method": {
                    "type": "string",
                    "description": "HTTP method of the operation",
                    "enum": ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"]
                },
                "domain": {
                    "type": "string",
                    "description": "List the operations of one domain, e.g. Auth or Storage"
                },
                "all_paths": {
                    "type": "boolean",
                    "description": "List every operation in the catalog",
                    "default": false
                }
            }),
            vec![],
        );

        Self {
            config: tool_config(
                TOOL_NAME,
                "Browse the management API catalog. Without arguments lists domains; \
                 use domain, path + method, or all_paths to drill down. Every operation \
                 is annotated with its risk tier.",
                parameters,
            ),
            gateway,
        }
    }

    fn query_from_input(input: &ToolInput) -> GateResult<SpecQuery> {
        let method = input
            .get_opt_arg::<String>("method")?
            .map(|m| m.parse::<HttpMethod>())
            .transpose()?;
        Ok(SpecQuery {
            path: input.get_opt_arg("path")?,
            method,
            domain: input.get_opt_arg("domain")?,
            all_paths: input.get_opt_arg("all_paths")?.unwrap_or(false),
        })
    }
}

#[async_trait]
impl Tool for GetApiSpecTool {
    async fn execute(&self, input: ToolInput) -> GateResult<ToolResult> {
        let query = match Self::query_from_input(&input) {
            Ok(query) => query,
            Err(e @ GateError::InvalidRequest(_)) => return Ok(ToolResult::error(e.to_string())),
            Err(e) => return Err(e),
        };
        debug!(?query, "Querying API catalog");

        match self.gateway.query_spec(&query) {
            Ok(view) => Ok(ToolResult::success(serde_json::to_value(view)?)),
            Err(e @ GateError::NotFound(_)) => Ok(ToolResult::error(e.to_string())),
            Err(e) => Err(e),
        }
    }

    fn config(&self) -> &ToolConfig {
        &self.config
    }
}
