//! Risk Classification - Assign a risk tier to any (method, path) pair
//!
//! Classification never fails:
//! - catalog operations carry the tier computed when the catalog was indexed
//! - unknown operations fall back to the risk rules
//! - anything else is low when read-only and high otherwise

use std::sync::Arc;

use riskgate_core::{HttpMethod, Operation, RiskTier};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::spec_index::SpecIndex;

/// Where a classification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// The operation is in the catalog
    Catalog,
    /// Not in the catalog, but a risk rule matched
    Rule,
    /// Neither; derived from the method alone
    Default,
}

/// Result of classifying an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub tier: RiskTier,

    /// Whether a confirmation round-trip is needed before execution
    pub requires_confirmation: bool,

    pub source: ClassificationSource,

    /// Matched catalog operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
}

impl Classification {
    /// Catalog template of the operation, or the given path when unknown
    pub fn template<'a>(&'a self, path: &'a str) -> &'a str {
        self.operation.as_ref().map(|op| op.path.as_str()).unwrap_or(path)
    }
}

/// Classifies operations against a spec index
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    index: Arc<SpecIndex>,
}

impl RiskClassifier {
    pub fn new(index: Arc<SpecIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<SpecIndex> {
        &self.index
    }

    /// Classify an operation given by template or concrete path
    pub fn classify(&self, method: HttpMethod, path: &str) -> Classification {
        let classification = if let Some(entry) = self.index.find(path, method) {
            Classification {
                tier: entry.risk_tier,
                requires_confirmation: entry.requires_confirmation,
                source: ClassificationSource::Catalog,
                operation: Some(entry.operation.clone()),
            }
        } else if let Some(rule) = self.index.rules().find(method, path) {
            Classification {
                tier: rule.tier,
                requires_confirmation: rule.needs_confirmation(),
                source: ClassificationSource::Rule,
                operation: None,
            }
        } else {
            // Unknown operations must not look safer than known ones
            let tier = if method.is_read_only() {
                RiskTier::Low
            } else {
                RiskTier::High
            };
            Classification {
                tier,
                requires_confirmation: tier.requires_confirmation(),
                source: ClassificationSource::Default,
                operation: None,
            }
        };

        debug!(
            %method,
            path,
            tier = %classification.tier,
            source = ?classification.source,
            "Classified operation"
        );
        classification
    }
}
