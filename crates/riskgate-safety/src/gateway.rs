//! Gateway - Decide whether a management API request may run
//!
//! Every request goes through the same sequence:
//! 1. resolve the path template
//! 2. classify the operation
//! 3. check the execution mode
//! 4. check or issue a confirmation token
//!
//! Denials are returned as data with a remediation hint. Errors are reserved
//! for requests that cannot be evaluated at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use riskgate_core::{GateResult, GatewayConfig, HttpMethod, Mode, OperationRef, RiskTier};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::classifier::{Classification, RiskClassifier};
use crate::ledger::{ConfirmationError, ConfirmationLedger, OperationInstance};
use crate::mode::{ModeController, ModeTransition};
use crate::spec_index::{SpecIndex, SpecQuery, SpecView};
use crate::template::resolve_template;

/// A request to run one management API operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub method: HttpMethod,

    /// Path template, or a concrete path without placeholders
    pub path: String,

    #[serde(default)]
    pub path_params: Map<String, Value>,

    #[serde(default)]
    pub query_params: Map<String, Value>,

    #[serde(default)]
    pub body: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_id: Option<String>,
}

impl OperationRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            path_params: Map::new(),
            query_params: Map::new(),
            body: Value::Null,
            confirmation_id: None,
        }
    }

    pub fn with_path_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.path_params.insert(name.to_string(), value.into());
        self
    }

    pub fn with_path_params(mut self, params: Map<String, Value>) -> Self {
        self.path_params = params;
        self
    }

    pub fn with_query_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.query_params.insert(name.to_string(), value.into());
        self
    }

    pub fn with_query_params(mut self, params: Map<String, Value>) -> Self {
        self.query_params = params;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_confirmation(mut self, id: impl Into<String>) -> Self {
        self.confirmation_id = Some(id.into());
        self
    }

    fn confirmation(&self) -> Option<&str> {
        self.confirmation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "kebab-case")]
pub enum DenialReason {
    /// The operation is never executed through the gateway
    Blocked,
    /// The operation needs unsafe mode
    RequiresUnsafeMode,
    /// The supplied confirmation id could not be redeemed
    Confirmation(ConfirmationError),
}

impl DenialReason {
    pub fn message(&self) -> String {
        match self {
            Self::Blocked => "operation is blocked and cannot be executed".to_string(),
            Self::RequiresUnsafeMode => "operation requires unsafe mode".to_string(),
            Self::Confirmation(e) => e.to_string(),
        }
    }

    /// What the caller can do about it, if anything
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::Blocked => None,
            Self::RequiresUnsafeMode => {
                Some("enable unsafe mode with live_dangerously and retry")
            }
            Self::Confirmation(ConfirmationError::Mismatch) => Some(
                "resubmit the exact operation and parameters the confirmation id was issued for",
            ),
            Self::Confirmation(_) => {
                Some("resubmit without a confirmation id to obtain a new one")
            }
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocked => write!(f, "blocked"),
            Self::RequiresUnsafeMode => write!(f, "requires-unsafe-mode"),
            Self::Confirmation(e) => write!(f, "confirmation: {}", e.kind()),
        }
    }
}

/// Outcome of evaluating a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allowed {
        risk_tier: RiskTier,
        resolved_path: String,
        /// A confirmation token was redeemed for this request
        confirmed: bool,
    },
    Denied {
        reason: DenialReason,
        risk_tier: RiskTier,
    },
    AwaitingConfirmation {
        confirmation_id: String,
        risk_tier: RiskTier,
        summary: String,
        expires_at: DateTime<Utc>,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    pub fn risk_tier(&self) -> RiskTier {
        match self {
            Self::Allowed { risk_tier, .. }
            | Self::Denied { risk_tier, .. }
            | Self::AwaitingConfirmation { risk_tier, .. } => *risk_tier,
        }
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            Self::Denied { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn confirmation_id(&self) -> Option<&str> {
        match self {
            Self::AwaitingConfirmation {
                confirmation_id, ..
            } => Some(confirmation_id),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Allowed { .. } => "allowed",
            Self::Denied { .. } => "denied",
            Self::AwaitingConfirmation { .. } => "awaiting_confirmation",
        }
    }
}

/// A call the gateway hands to the executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCall {
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub query: Map<String, Value>,
    #[serde(default)]
    pub body: Value,
}

/// Response returned by the executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    #[serde(default)]
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs allowed calls against the remote API
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, call: &ApiCall) -> GateResult<ApiResponse>;
}

/// Result of [`Gateway::execute`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GatewayOutcome {
    Executed {
        risk_tier: RiskTier,
        response: ApiResponse,
    },
    Withheld {
        decision: Decision,
    },
}

/// Construction-time settings
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub initial_mode: Mode,
    pub confirmation_ttl: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            initial_mode: Mode::Safe,
            confirmation_ttl: Duration::from_secs(300),
        }
    }
}

impl GatewaySettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            initial_mode: config.spec.mode,
            confirmation_ttl: Duration::from_secs(config.spec.confirmation.ttl_seconds),
        }
    }
}

/// Risk-gated access to the management API
#[derive(Debug)]
pub struct Gateway {
    classifier: RiskClassifier,
    mode: ModeController,
    ledger: Arc<ConfirmationLedger>,
}

impl Gateway {
    pub fn new(index: Arc<SpecIndex>, settings: GatewaySettings) -> Self {
        info!(
            mode = %settings.initial_mode,
            ttl_secs = settings.confirmation_ttl.as_secs(),
            operations = index.len(),
            "Gateway initialized"
        );
        Self {
            classifier: RiskClassifier::new(index),
            mode: ModeController::new(settings.initial_mode),
            ledger: Arc::new(ConfirmationLedger::new(settings.confirmation_ttl)),
        }
    }

    pub fn from_config(index: Arc<SpecIndex>, config: &GatewayConfig) -> Self {
        Self::new(index, GatewaySettings::from_config(config))
    }

    pub fn index(&self) -> &Arc<SpecIndex> {
        self.classifier.index()
    }

    pub fn ledger(&self) -> &Arc<ConfirmationLedger> {
        &self.ledger
    }

    pub fn mode(&self) -> Mode {
        self.mode.current()
    }

    pub fn set_mode(&self, mode: Mode) -> ModeTransition {
        self.mode.set_mode(mode)
    }

    pub fn classify(&self, method: HttpMethod, path: &str) -> Classification {
        self.classifier.classify(method, path)
    }

    /// Catalog queries are always allowed
    pub fn query_spec(&self, query: &SpecQuery) -> GateResult<SpecView> {
        self.index().query(query)
    }

    /// Decide whether `request` may run
    ///
    /// The concrete path that would be executed is classified, not the
    /// caller's template.
    pub fn evaluate(&self, request: &OperationRequest) -> GateResult<Decision> {
        let resolved_path = resolve_template(&request.path, &request.path_params)?;
        let classification = self.classifier.classify(request.method, &resolved_path);
        let tier = classification.tier;

        let decision = if !tier.is_executable() {
            Decision::Denied {
                reason: DenialReason::Blocked,
                risk_tier: tier,
            }
        } else if !tier.requires_unsafe_mode() {
            Decision::Allowed {
                risk_tier: tier,
                resolved_path: resolved_path.clone(),
                confirmed: false,
            }
        } else if !self.mode.is_unsafe() {
            Decision::Denied {
                reason: DenialReason::RequiresUnsafeMode,
                risk_tier: tier,
            }
        } else if !classification.requires_confirmation {
            Decision::Allowed {
                risk_tier: tier,
                resolved_path: resolved_path.clone(),
                confirmed: false,
            }
        } else {
            self.confirm(request, &classification, &resolved_path)
        };

        match &decision {
            Decision::Denied { reason, .. } => warn!(
                method = %request.method,
                path = %resolved_path,
                tier = %tier,
                reason = %reason,
                "Request denied"
            ),
            other => info!(
                method = %request.method,
                path = %resolved_path,
                tier = %tier,
                outcome = other.label(),
                "Request evaluated"
            ),
        }
        Ok(decision)
    }

    /// Issue a token when none was supplied, otherwise redeem it
    fn confirm(
        &self,
        request: &OperationRequest,
        classification: &Classification,
        resolved_path: &str,
    ) -> Decision {
        let tier = classification.tier;
        let instance = OperationInstance::new(
            request.method,
            resolved_path,
            Value::Object(request.query_params.clone()),
            request.body.clone(),
        );

        match request.confirmation() {
            None => {
                let operation =
                    OperationRef::new(request.method, classification.template(resolved_path));
                let token = self.ledger.issue(operation, &instance);
                let summary = match classification
                    .operation
                    .as_ref()
                    .and_then(|op| op.summary.as_deref())
                {
                    Some(described) => format!("{} ({}, {} risk)", token.summary, described, tier),
                    None => format!("{} ({} risk)", token.summary, tier),
                };
                Decision::AwaitingConfirmation {
                    confirmation_id: token.id,
                    risk_tier: tier,
                    summary,
                    expires_at: token.expires_at,
                }
            }
            Some(id) => match self.ledger.redeem(id, &instance) {
                Ok(_) => Decision::Allowed {
                    risk_tier: tier,
                    resolved_path: resolved_path.to_string(),
                    confirmed: true,
                },
                Err(e) => Decision::Denied {
                    reason: DenialReason::Confirmation(e),
                    risk_tier: tier,
                },
            },
        }
    }

    /// Evaluate `request` and run it through `executor` when allowed
    ///
    /// Executor failures are returned unchanged; nothing is retried.
    pub async fn execute<E>(
        &self,
        request: &OperationRequest,
        executor: &E,
    ) -> GateResult<GatewayOutcome>
    where
        E: RequestExecutor + ?Sized,
    {
        let (risk_tier, resolved_path) = match self.evaluate(request)? {
            Decision::Allowed {
                risk_tier,
                resolved_path,
                ..
            } => (risk_tier, resolved_path),
            decision => return Ok(GatewayOutcome::Withheld { decision }),
        };

        let call = ApiCall {
            method: request.method,
            path: resolved_path,
            query: request.query_params.clone(),
            body: request.body.clone(),
        };
        let response = executor.execute(&call).await?;
        info!(
            method = %call.method,
            path = %call.path,
            status = response.status,
            "Executed management API call"
        );

        Ok(GatewayOutcome::Executed {
            risk_tier,
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RiskRules;
    use serde_json::json;

    fn gateway(mode: Mode) -> Gateway {
        let index = SpecIndex::bundled(RiskRules::management_api()).unwrap();
        Gateway::new(
            Arc::new(index),
            GatewaySettings {
                initial_mode: mode,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_missing_path_param_is_error() {
        let gw = gateway(Mode::Unsafe);
        let request = OperationRequest::new(HttpMethod::Get, "/v1/projects/{ref}/functions");
        assert!(gw.evaluate(&request).is_err());
    }

    #[test]
    fn test_medium_allowed_in_unsafe_mode() {
        let gw = gateway(Mode::Unsafe);
        let request = OperationRequest::new(HttpMethod::Post, "/v1/projects/{ref}/functions")
            .with_path_param("ref", "abcd")
            .with_body(json!({"slug": "hello"}));
        let decision = gw.evaluate(&request).unwrap();
        assert_eq!(
            decision,
            Decision::Allowed {
                risk_tier: RiskTier::Medium,
                resolved_path: "/v1/projects/abcd/functions".to_string(),
                confirmed: false,
            }
        );
    }

    #[test]
    fn test_high_flagged_needs_confirmation() {
        let gw = gateway(Mode::Unsafe);
        let request = OperationRequest::new(HttpMethod::Post, "/v1/projects/{ref}/database/query")
            .with_path_param("ref", "abcd")
            .with_body(json!({"query": "select 1"}));
        let decision = gw.evaluate(&request).unwrap();
        assert_eq!(decision.risk_tier(), RiskTier::High);
        assert!(decision.confirmation_id().is_some());
    }

    #[test]
    fn test_blank_confirmation_id_is_ignored() {
        let gw = gateway(Mode::Unsafe);
        let request = OperationRequest::new(HttpMethod::Post, "/v1/projects/{ref}/pause")
            .with_path_param("ref", "abcd")
            .with_confirmation("  ");
        let decision = gw.evaluate(&request).unwrap();
        assert!(matches!(decision, Decision::AwaitingConfirmation { .. }));
    }

    #[test]
    fn test_decision_serialization() {
        let decision = Decision::Denied {
            reason: DenialReason::Confirmation(ConfirmationError::Expired),
            risk_tier: RiskTier::Extreme,
        };
        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(value["decision"], "denied");
        assert_eq!(value["risk_tier"], "extreme");
        assert_eq!(value["reason"]["code"], "confirmation");
        assert_eq!(value["reason"]["detail"]["kind"], "expired");

        let value = serde_json::to_value(DenialReason::RequiresUnsafeMode).unwrap();
        assert_eq!(value, json!({"code": "requires-unsafe-mode"}));
    }

    #[test]
    fn test_remediation_text() {
        assert!(DenialReason::Blocked.remediation().is_none());
        assert!(DenialReason::RequiresUnsafeMode
            .remediation()
            .unwrap()
            .contains("unsafe mode"));
        assert_eq!(DenialReason::RequiresUnsafeMode.to_string(), "requires-unsafe-mode");
    }
}
