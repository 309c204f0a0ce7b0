//! Safety rules tool
//!
//! Explains how the gateway treats each risk tier, lists the active risk
//! rules and counts catalog operations per tier.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use riskgate_core::{GateResult, RiskTier, Tool, ToolConfig, ToolInput, ToolResult};
use riskgate_safety::Gateway;
use serde_json::{json, Value};

use super::common::{create_schema, tool_config};

pub const TOOL_NAME: &str = "get_management_api_safety_rules";

const TIERS: [RiskTier; 5] = [
    RiskTier::Low,
    RiskTier::Medium,
    RiskTier::High,
    RiskTier::Extreme,
    RiskTier::Blocked,
];

/// How the gateway treats a tier
pub fn tier_policy(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::Low => "always allowed",
        RiskTier::Medium | RiskTier::High => "requires unsafe mode",
        RiskTier::Extreme => "requires unsafe mode and a confirmation id",
        RiskTier::Blocked => "never executed",
    }
}

/// Structured description of the gateway's current safety posture
pub fn safety_summary(gateway: &Gateway) -> Value {
    let index = gateway.index();

    let mut counts: BTreeMap<String, usize> = TIERS.iter().map(|t| (t.to_string(), 0)).collect();
    for entry in index.entries() {
        *counts.entry(entry.risk_tier.to_string()).or_default() += 1;
    }

    let tiers: Vec<Value> = TIERS
        .iter()
        .map(|tier| {
            json!({
                "tier": tier,
                "description": tier.description(),
                "policy": tier_policy(*tier),
            })
        })
        .collect();

    let mut lines = vec![format!("Current mode: {}", gateway.mode())];
    for tier in TIERS {
        lines.push(format!("{}: {}", tier, tier_policy(tier)));
    }
    lines.push(
        "Operations flagged for confirmation also need a confirmation id below the extreme tier"
            .to_string(),
    );

    json!({
        "mode": gateway.mode(),
        "confirmation_ttl_seconds": gateway.ledger().ttl().num_seconds(),
        "tiers": tiers,
        "rules": index.rules().rules(),
        "catalog": {
            "title": index.title(),
            "version": index.version(),
            "operations": index.len(),
            "by_tier": counts,
        },
        "summary": lines.join("\n"),
    })
}

pub struct SafetyRulesTool {
    config: ToolConfig,
    gateway: Arc<Gateway>,
}

impl SafetyRulesTool {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            config: tool_config(
                TOOL_NAME,
                "Describe the safety rules: what each risk tier requires, the current \
                 mode and the operations with explicit risk rules.",
                create_schema(json!({}), vec![]),
            ),
            gateway,
        }
    }
}

#[async_trait]
impl Tool for SafetyRulesTool {
    async fn execute(&self, _input: ToolInput) -> GateResult<ToolResult> {
        Ok(ToolResult::success(safety_summary(&self.gateway)))
    }

    fn config(&self) -> &ToolConfig {
        &self.config
    }
}
