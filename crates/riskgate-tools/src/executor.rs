//! HTTP request executor
//!
//! Performs calls the gateway has allowed against the management API with
//! bearer authentication. Transport failures are returned as
//! [`GateError::Executor`]; HTTP error statuses are ordinary responses.

use std::time::Duration;

use async_trait::async_trait;
use riskgate_core::{GateError, GateResult, GatewayConfig, HttpMethod};
use riskgate_safety::{ApiCall, ApiResponse, RequestExecutor};
use serde_json::{Map, Value};
use tracing::debug;

/// reqwest-backed [`RequestExecutor`]
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpExecutor {
    pub fn new(
        base_url: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> GateResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("riskgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GateError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> GateResult<Self> {
        Self::new(
            config.spec.api.base_url.clone(),
            config.access_token().map(str::to_string),
            Duration::from_secs(config.spec.api.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
    }
}

/// Flatten query parameters; arrays become repeated keys, null is dropped
fn query_pairs(query: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in query {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), scalar_to_string(item)));
                }
            }
            other => pairs.push((key.clone(), scalar_to_string(other))),
        }
    }
    pairs
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, call: &ApiCall) -> GateResult<ApiResponse> {
        let url = self.url(&call.path);
        debug!(method = %call.method, url = %url, "Sending HTTP request");

        let mut request = self.client.request(reqwest_method(call.method), &url);
        let pairs = query_pairs(&call.query);
        if !pairs.is_empty() {
            request = request.query(&pairs);
        }
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        if !call.body.is_null() {
            request = request.json(&call.body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GateError::executor(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GateError::executor(format!("Failed to read response body: {}", e)))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        debug!(status, "Received HTTP response");
        Ok(ApiResponse { status, body })
    }
}
