//! Management API request tool
//!
//! Runs one management API operation through the gateway. Low-risk reads
//! run in any mode. Writes need unsafe mode, and destructive operations
//! additionally need a confirmation round-trip:
//!
//! 1. call without `confirmation_id`: the tool returns a confirmation id
//! 2. call again with the same arguments plus that id: the operation runs

use std::sync::Arc;

use async_trait::async_trait;
use riskgate_core::{GateError, GateResult, HttpMethod, Tool, ToolConfig, ToolInput, ToolResult};
use riskgate_safety::{Decision, Gateway, GatewayOutcome, OperationRequest, RequestExecutor};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::common::{create_schema, tool_config_with_timeout};

pub const TOOL_NAME: &str = "send_management_api_request";

/// Tool that sends requests through the gateway
pub struct SendApiRequestTool {
    config: ToolConfig,
    gateway: Arc<Gateway>,
    executor: Arc<dyn RequestExecutor>,
}

impl SendApiRequestTool {
    pub fn new(gateway: Arc<Gateway>, executor: Arc<dyn RequestExecutor>) -> Self {
        let parameters = create_schema(
            json!({
                "method": {
                    "type": "string",
                    "description": "HTTP method",
                    "enum": ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"]
                },
                "path": {
                    "type": "string",
                    "description": "Path template from the API catalog, e.g. /v1/projects/{ref}/functions"
                },
                "path_params": {
                    "type": "object",
                    "description": "Values for every {placeholder} in the path",
                    "additionalProperties": { "type": "string" }
                },
                "request_params": {
                    "type": "object",
                    "description": "Query string parameters"
                },
                "request_body": {
                    "type": "object",
                    "description": "JSON request body"
                },
                "confirmation_id": {
                    "type": "string",
                    "description": "Confirmation id returned by a previous call for the same operation"
                }
            }),
            vec!["method", "path"],
        );

        Self {
            config: tool_config_with_timeout(
                TOOL_NAME,
                "Send a request to the management API. Read operations always run. \
                 Write operations require unsafe mode (see live_dangerously). \
                 Destructive operations return a confirmation id first; repeat the \
                 identical call with that confirmation_id to execute it.",
                parameters,
                120,
            ),
            gateway,
            executor,
        }
    }

    fn request_from_input(input: &ToolInput) -> GateResult<OperationRequest> {
        let method: String = input.get_arg("method")?;
        let method: HttpMethod = method.parse()?;
        let path: String = input.get_arg("path")?;

        let mut request = OperationRequest::new(method, path)
            .with_path_params(input.get_opt_arg::<Map<String, Value>>("path_params")?.unwrap_or_default())
            .with_query_params(
                input
                    .get_opt_arg::<Map<String, Value>>("request_params")?
                    .unwrap_or_default(),
            )
            .with_body(input.get_opt_arg::<Value>("request_body")?.unwrap_or(Value::Null));

        if let Some(id) = input.get_opt_arg::<String>("confirmation_id")? {
            request = request.with_confirmation(id);
        }
        Ok(request)
    }
}

/// Tool result for a request the gateway did not let through
pub fn withheld_result(decision: &Decision) -> ToolResult {
    match decision {
        Decision::Denied { reason, risk_tier } => ToolResult::error_with_data(
            format!("Request denied: {}", reason.message()),
            json!({
                "status": "denied",
                "reason": reason.to_string(),
                "risk_tier": risk_tier,
                "message": reason.message(),
                "remediation": reason.remediation(),
            }),
        ),
        Decision::AwaitingConfirmation {
            confirmation_id,
            risk_tier,
            summary,
            expires_at,
        } => ToolResult::error_with_data(
            "Confirmation required",
            json!({
                "status": "awaiting_confirmation",
                "confirmation_id": confirmation_id,
                "risk_tier": risk_tier,
                "summary": summary,
                "expires_at": expires_at,
                "remediation": format!(
                    "review the operation, then resubmit the identical request with confirmation_id {}",
                    confirmation_id
                ),
            }),
        ),
        Decision::Allowed { .. } => ToolResult::success(json!({"status": "allowed"})),
    }
}

#[async_trait]
impl Tool for SendApiRequestTool {
    async fn execute(&self, input: ToolInput) -> GateResult<ToolResult> {
        let request = match Self::request_from_input(&input) {
            Ok(request) => request,
            Err(e @ GateError::InvalidRequest(_)) => return Ok(ToolResult::error(e.to_string())),
            Err(e) => return Err(e),
        };

        debug!(method = %request.method, path = %request.path, "Sending management API request");

        let outcome = match self.gateway.execute(&request, self.executor.as_ref()).await {
            Ok(outcome) => outcome,
            Err(e @ (GateError::InvalidRequest(_) | GateError::Executor(_))) => {
                return Ok(ToolResult::error(e.to_string()));
            }
            Err(e) => return Err(e),
        };

        Ok(match outcome {
            GatewayOutcome::Executed {
                risk_tier,
                response,
            } => {
                let data = json!({
                    "status": response.status,
                    "risk_tier": risk_tier,
                    "body": response.body,
                });
                if response.is_success() {
                    ToolResult::success(data)
                } else {
                    ToolResult::error_with_data(
                        format!("API returned status {}", response.status),
                        data,
                    )
                }
            }
            GatewayOutcome::Withheld { decision } => withheld_result(&decision),
        })
    }

    fn config(&self) -> &ToolConfig {
        &self.config
    }
}
