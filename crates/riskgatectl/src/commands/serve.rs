//! Serve command - runs the gateway as an HTTP service
//!
//! The gateway tools are exposed over a small JSON API so that agents (or
//! an MCP bridge) can drive them remotely. Mode and pending confirmations
//! live in this process and reset on restart.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use riskgate_core::{GateError, GatewayConfig, Mode, ToolExecutor, ToolInput};
use riskgate_safety::{Gateway, OperationRequest, RequestExecutor, SpecQuery};
use riskgate_tools::{HttpExecutor, ToolRegistry};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::output::mode_label;
use crate::setup;

/// Command-line values that win over the config file
#[derive(Debug, Default)]
pub struct ServeOverrides {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub mode: Option<Mode>,
    pub access_token: Option<String>,
}

impl ServeOverrides {
    fn apply(self, config: &mut GatewayConfig) {
        if let Some(port) = self.port {
            config.spec.server.port = port;
        }
        if let Some(host) = self.host {
            config.spec.server.host = host;
        }
        if let Some(mode) = self.mode {
            config.spec.mode = mode;
        }
        if let Some(token) = self.access_token {
            config.spec.api.access_token = Some(token);
        }
    }
}

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<Gateway>,
    tools: Arc<dyn ToolExecutor>,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>, executor: Arc<dyn RequestExecutor>) -> Self {
        let registry = ToolRegistry::with_gateway_tools(gateway.clone(), executor);
        Self {
            gateway,
            tools: Arc::new(registry.into_executor()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tools/:name", post(call_tool))
        .route("/mode", get(get_mode).put(set_mode))
        .route("/spec", get(query_spec))
        .route("/evaluate", post(evaluate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn execute(config_path: Option<&str>, overrides: ServeOverrides) -> Result<()> {
    let mut config = setup::load_config(config_path)?;
    overrides.apply(&mut config);
    config.validate()?;

    let gateway = setup::build_gateway(&config).await?;
    let http = HttpExecutor::from_config(&config)?;
    if config.access_token().is_none() {
        warn!("No access token configured; management API calls will be unauthenticated");
    }

    let sweep_interval = config.spec.confirmation.sweep_interval_seconds;
    let sweeper = (sweep_interval > 0).then(|| {
        gateway
            .ledger()
            .clone()
            .spawn_sweeper(Duration::from_secs(sweep_interval))
    });

    let bind_addr = format!("{}:{}", config.spec.server.host, config.spec.server.port);
    let index = gateway.index();

    println!("Starting riskgate gateway");
    println!("  Bind address: {}", bind_addr);
    println!("  Management API: {}", http.base_url());
    println!("  Mode: {}", mode_label(gateway.mode()));
    println!(
        "  Catalog: {} {} ({} operations, {} rules)",
        index.title(),
        index.version(),
        index.len(),
        index.rules().len()
    );
    println!(
        "  Confirmation TTL: {}s",
        config.spec.confirmation.ttl_seconds
    );

    let state = AppState::new(gateway.clone(), Arc::new(http));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    println!("  Health check: http://{}/health", bind_addr);
    println!("  Tools: http://{}/tools/{{name}}", bind_addr);
    println!("Press Ctrl+C to stop");
    info!(addr = %bind_addr, "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    println!("Server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => println!("\nShutdown signal received, stopping server..."),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// JSON error body with a status derived from the gateway error
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        let status = match &err {
            GateError::NotFound(_) => StatusCode::NOT_FOUND,
            GateError::InvalidRequest(_) | GateError::Tool(_) => StatusCode::BAD_REQUEST,
            GateError::Executor(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "mode": state.gateway.mode(),
        "operations": state.gateway.index().len(),
        "pending_confirmations": state.gateway.ledger().len(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn list_tools(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.tools.list_tools())
}

async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(arguments): Json<Value>,
) -> Result<Response, ApiError> {
    if state.tools.get_tool(&name).is_none() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Unknown tool: {}", name),
        ));
    }

    let result = state
        .tools
        .execute_tool(&name, ToolInput::new(arguments))
        .await?;
    Ok(Json(result).into_response())
}

async fn get_mode(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "mode": state.gateway.mode() }))
}

#[derive(Debug, Deserialize)]
struct ModeChange {
    mode: Mode,
}

async fn set_mode(
    State(state): State<AppState>,
    Json(change): Json<ModeChange>,
) -> impl IntoResponse {
    let transition = state.gateway.set_mode(change.mode);
    Json(json!({
        "previous": transition.previous,
        "current": transition.current,
        "changed": transition.changed(),
    }))
}

async fn query_spec(
    State(state): State<AppState>,
    Query(query): Query<SpecQuery>,
) -> Result<Response, ApiError> {
    let view = state.gateway.query_spec(&query)?;
    Ok(Json(view).into_response())
}

/// Decide without executing; pending tokens issued here are redeemed
/// through `send_management_api_request`
async fn evaluate(
    State(state): State<AppState>,
    Json(request): Json<OperationRequest>,
) -> Result<Response, ApiError> {
    if request.confirmation_id.is_some() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "confirmation ids are redeemed by send_management_api_request, not /evaluate",
        ));
    }

    let decision = state.gateway.evaluate(&request)?;
    Ok(Json(decision).into_response())
}
