//! Gateway Tools Integration Tests
//!
//! Drives the four gateway tools through the builtin executor with a
//! recording request executor in place of the management API.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use riskgate_core::{GateResult, Mode, ToolExecutor, ToolInput};
use riskgate_safety::{
    ApiCall, ApiResponse, Gateway, GatewaySettings, RequestExecutor, RiskRules, SpecIndex,
};
use riskgate_tools::{BuiltinToolExecutor, ToolCategory, ToolRegistry};
use serde_json::json;

#[derive(Default)]
struct RecordingExecutor {
    calls: Mutex<Vec<ApiCall>>,
    status: u16,
}

impl RecordingExecutor {
    fn with_status(status: u16) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            status,
        }
    }
}

#[async_trait]
impl RequestExecutor for RecordingExecutor {
    async fn execute(&self, call: &ApiCall) -> GateResult<ApiResponse> {
        self.calls.lock().push(call.clone());
        Ok(ApiResponse {
            status: self.status,
            body: json!({"path": call.path}),
        })
    }
}

fn setup(status: u16) -> (Arc<Gateway>, Arc<RecordingExecutor>, BuiltinToolExecutor) {
    let index = SpecIndex::bundled(RiskRules::management_api()).unwrap();
    let gateway = Arc::new(Gateway::new(Arc::new(index), GatewaySettings::default()));
    let recorder = Arc::new(RecordingExecutor::with_status(status));
    let registry = ToolRegistry::with_gateway_tools(gateway.clone(), recorder.clone());
    (gateway, recorder, registry.into_executor())
}

fn delete_function_args() -> serde_json::Value {
    json!({
        "method": "DELETE",
        "path": "/v1/projects/{ref}/functions/{function_slug}",
        "path_params": {"ref": "abcd", "function_slug": "hello"}
    })
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn test_gateway_tools_registered() {
    let index = SpecIndex::bundled(RiskRules::management_api()).unwrap();
    let gateway = Arc::new(Gateway::new(Arc::new(index), GatewaySettings::default()));
    let registry = ToolRegistry::with_gateway_tools(gateway, Arc::new(RecordingExecutor::default()));

    assert_eq!(
        registry.list_names(),
        vec![
            "get_management_api_safety_rules",
            "get_management_api_spec",
            "live_dangerously",
            "send_management_api_request",
        ]
    );
    assert_eq!(registry.list_by_category(&ToolCategory::Safety).len(), 2);
    for definition in registry.list_definitions() {
        assert_eq!(definition.parameters["type"], "object");
    }
}

// ============================================================================
// send_management_api_request
// ============================================================================

#[tokio::test]
async fn test_read_request_executes_in_safe_mode() {
    let (_, recorder, executor) = setup(200);
    let input = ToolInput::new(json!({
        "method": "get",
        "path": "/v1/projects/{ref}/functions",
        "path_params": {"ref": "abcd"},
        "request_params": {"limit": 5}
    }));

    let result = executor
        .execute_tool("send_management_api_request", input)
        .await
        .unwrap();
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.data["status"], 200);
    assert_eq!(result.data["risk_tier"], "low");

    let calls = recorder.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "/v1/projects/abcd/functions");
    assert_eq!(calls[0].query["limit"], 5);
}

#[tokio::test]
async fn test_write_denied_in_safe_mode() {
    let (_, recorder, executor) = setup(200);
    let input = ToolInput::new(json!({
        "method": "POST",
        "path": "/v1/projects/{ref}/functions",
        "path_params": {"ref": "abcd"},
        "request_body": {"slug": "hello"}
    }));

    let result = executor
        .execute_tool("send_management_api_request", input)
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.data["status"], "denied");
    assert_eq!(result.data["reason"], "requires-unsafe-mode");
    assert!(result.data["remediation"]
        .as_str()
        .unwrap()
        .contains("live_dangerously"));
    assert!(recorder.calls.lock().is_empty());
}

#[tokio::test]
async fn test_confirmation_round_trip() {
    let (_, recorder, executor) = setup(200);

    let result = executor
        .execute_tool(
            "live_dangerously",
            ToolInput::new(json!({"enable_unsafe_mode": true})),
        )
        .await
        .unwrap();
    assert_eq!(result.data["current"], "unsafe");
    assert_eq!(result.data["changed"], true);

    let result = executor
        .execute_tool(
            "send_management_api_request",
            ToolInput::new(delete_function_args()),
        )
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.data["status"], "awaiting_confirmation");
    assert_eq!(result.data["risk_tier"], "extreme");
    let id = result.data["confirmation_id"].as_str().unwrap().to_string();
    assert!(recorder.calls.lock().is_empty());

    let mut args = delete_function_args();
    args["confirmation_id"] = json!(id);
    let result = executor
        .execute_tool("send_management_api_request", ToolInput::new(args.clone()))
        .await
        .unwrap();
    assert!(result.success, "{:?}", result.error);
    assert_eq!(recorder.calls.lock().len(), 1);

    let result = executor
        .execute_tool("send_management_api_request", ToolInput::new(args))
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.data["reason"], "confirmation: already-consumed");
    assert_eq!(recorder.calls.lock().len(), 1);
}

#[tokio::test]
async fn test_blocked_request() {
    let (gateway, _, executor) = setup(200);
    gateway.set_mode(Mode::Unsafe);

    let result = executor
        .execute_tool(
            "send_management_api_request",
            ToolInput::new(json!({
                "method": "DELETE",
                "path": "/v1/projects/{ref}",
                "path_params": {"ref": "abcd"}
            })),
        )
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.data["reason"], "blocked");
    assert_eq!(result.data["risk_tier"], "blocked");
}

#[tokio::test]
async fn test_renamed_placeholders_still_blocked() {
    let (gateway, recorder, executor) = setup(200);
    gateway.set_mode(Mode::Unsafe);

    let result = executor
        .execute_tool(
            "send_management_api_request",
            ToolInput::new(json!({
                "method": "DELETE",
                "path": "/v1/{a}/{b}",
                "path_params": {"a": "projects", "b": "abcd"}
            })),
        )
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.data["reason"], "blocked");
    assert_eq!(result.data["risk_tier"], "blocked");
    assert!(gateway.ledger().is_empty());
    assert!(recorder.calls.lock().is_empty());
}

#[tokio::test]
async fn test_placeholder_action_needs_confirmation() {
    let (gateway, recorder, executor) = setup(200);
    gateway.set_mode(Mode::Unsafe);

    let args = json!({
        "method": "POST",
        "path": "/v1/projects/{ref}/{action}",
        "path_params": {"ref": "abcd", "action": "pause"}
    });
    let result = executor
        .execute_tool("send_management_api_request", ToolInput::new(args.clone()))
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.data["status"], "awaiting_confirmation");
    assert_eq!(result.data["risk_tier"], "extreme");
    assert!(recorder.calls.lock().is_empty());

    let mut confirmed = args;
    confirmed["confirmation_id"] = result.data["confirmation_id"].clone();
    let result = executor
        .execute_tool("send_management_api_request", ToolInput::new(confirmed))
        .await
        .unwrap();
    assert!(result.success, "{:?}", result.error);

    let calls = recorder.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "/v1/projects/abcd/pause");
}

#[tokio::test]
async fn test_missing_path_param_reported() {
    let (_, _, executor) = setup(200);
    let result = executor
        .execute_tool(
            "send_management_api_request",
            ToolInput::new(json!({"method": "GET", "path": "/v1/projects/{ref}"})),
        )
        .await
        .unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap().contains("ref"));
}

#[tokio::test]
async fn test_bad_method_reported() {
    let (_, _, executor) = setup(200);
    let result = executor
        .execute_tool(
            "send_management_api_request",
            ToolInput::new(json!({"method": "TRACE", "path": "/v1/projects"})),
        )
        .await
        .unwrap();
    assert!(!result.success);
}

#[tokio::test]
async fn test_missing_argument_is_error() {
    let (_, _, executor) = setup(200);
    let result = executor
        .execute_tool(
            "send_management_api_request",
            ToolInput::new(json!({"path": "/v1/projects"})),
        )
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_api_error_status() {
    let (_, _, executor) = setup(404);
    let result = executor
        .execute_tool(
            "send_management_api_request",
            ToolInput::new(json!({"method": "GET", "path": "/v1/projects"})),
        )
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.data["status"], 404);
}

// ============================================================================
// get_management_api_spec
// ============================================================================

#[tokio::test]
async fn test_spec_domains() {
    let (_, _, executor) = setup(200);
    let result = executor
        .execute_tool("get_management_api_spec", ToolInput::new(json!({})))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.data["view"], "domains");
    assert!(result.data["domains"].as_array().unwrap().len() >= 5);
}

#[tokio::test]
async fn test_spec_operation_detail() {
    let (_, _, executor) = setup(200);
    let result = executor
        .execute_tool(
            "get_management_api_spec",
            ToolInput::new(json!({
                "path": "/v1/projects/{ref}/functions/{function_slug}",
                "method": "DELETE"
            })),
        )
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.data["view"], "operation");
    assert_eq!(result.data["operation"]["risk_tier"], "extreme");
}

#[tokio::test]
async fn test_spec_unknown_domain() {
    let (_, _, executor) = setup(200);
    let result = executor
        .execute_tool(
            "get_management_api_spec",
            ToolInput::new(json!({"domain": "Billing"})),
        )
        .await
        .unwrap();
    assert!(!result.success);
}

// ============================================================================
// live_dangerously / get_management_api_safety_rules
// ============================================================================

#[tokio::test]
async fn test_live_dangerously_idempotent() {
    let (gateway, _, executor) = setup(200);
    let input = ToolInput::new(json!({"enable_unsafe_mode": false}));

    let result = executor.execute_tool("live_dangerously", input).await.unwrap();
    assert_eq!(result.data["changed"], false);
    assert_eq!(gateway.mode(), Mode::Safe);
}

#[tokio::test]
async fn test_safety_rules_summary() {
    let (gateway, _, executor) = setup(200);
    let result = executor
        .execute_tool("get_management_api_safety_rules", ToolInput::default())
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.data["mode"], "safe");
    assert_eq!(result.data["confirmation_ttl_seconds"], 300);
    assert_eq!(result.data["tiers"].as_array().unwrap().len(), 5);
    assert_eq!(
        result.data["catalog"]["operations"],
        gateway.index().len()
    );
    assert!(result.data["summary"]
        .as_str()
        .unwrap()
        .contains("extreme: requires unsafe mode and a confirmation id"));
}
