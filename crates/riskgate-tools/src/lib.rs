//! riskgate Tools - Agent-facing surface of the risk-gated gateway
//!
//! This crate wraps a [`riskgate_safety::Gateway`] in tools an agent can call
//! and provides the reqwest-backed executor that performs allowed requests.
//!
//! # Feature Flags
//!
//! - `http` (default) - [`HttpExecutor`] for the management API
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use riskgate_safety::{Gateway, GatewaySettings, RiskRules, SpecIndex};
//! use riskgate_tools::{HttpExecutor, ToolRegistry};
//!
//! let index = Arc::new(SpecIndex::bundled(RiskRules::management_api())?);
//! let gateway = Arc::new(Gateway::new(index, GatewaySettings::default()));
//! let http = Arc::new(HttpExecutor::from_config(&config)?);
//!
//! let executor = ToolRegistry::with_gateway_tools(gateway, http).into_executor();
//! ```

#[cfg(feature = "http")]
pub mod executor;
pub mod registry;
pub mod tools;

#[cfg(feature = "http")]
pub use executor::HttpExecutor;
pub use registry::{BuiltinToolExecutor, ToolCategory, ToolRegistry};
pub use tools::{
    GatewayTools, GetApiSpecTool, LiveDangerouslyTool, SafetyRulesTool, SendApiRequestTool,
};
