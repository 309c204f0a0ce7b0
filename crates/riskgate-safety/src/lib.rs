//! Safety Layer - Risk-gated access to the management API
//!
//! This crate provides:
//! - An index over the management API catalog (OpenAPI document)
//! - Risk classification of every (method, path) pair
//! - The process-wide safe/unsafe execution mode
//! - A ledger of single-use confirmation tokens for destructive operations
//! - The gateway that combines all of the above into one decision
//!
//! Design Philosophy:
//! - Safety-first: unknown write-shaped operations are treated as high risk
//! - Explicit: mode changes and confirmations are never inferred from a request
//! - Transparent: every denial says why and what to do next

mod classifier;
mod gateway;
mod ledger;
mod mode;
mod rules;
mod spec_index;
mod template;

pub use classifier::{Classification, ClassificationSource, RiskClassifier};
pub use gateway::{
    ApiCall, ApiResponse, Decision, DenialReason, Gateway, GatewayOutcome, GatewaySettings,
    OperationRequest, RequestExecutor,
};
pub use ledger::{ConfirmationError, ConfirmationLedger, ConfirmationToken, OperationInstance};
pub use mode::{ModeController, ModeTransition};
pub use rules::{RiskRule, RiskRules, RulesMetadata, RulesSpec};
pub use spec_index::{
    CatalogEntry, DomainSummary, OperationDetail, OperationSummary, SpecIndex, SpecQuery,
    SpecView, TierSource,
};
pub use template::{normalize_path, resolve_template, template_matches};
