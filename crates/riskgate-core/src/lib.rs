// riskgate Core - Foundation types and traits for the risk-gated API gateway
//
// This crate holds the vocabulary shared by every other crate: operations,
// risk tiers, the execution mode, the error type, gateway configuration and
// the tool abstraction used to expose the gateway to agents.

pub mod config;
pub mod error;
pub mod operation;
pub mod tool;

pub use config::{
    ApiConfig, CatalogConfig, ConfigMetadata, ConfirmationConfig, GatewayConfig, GatewaySpec,
    ServerConfig,
};
pub use error::{GateError, GateResult};
pub use operation::{HttpMethod, Mode, Operation, OperationRef, RiskTier};
pub use tool::{Tool, ToolConfig, ToolDefinition, ToolExecutor, ToolInput, ToolResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// API version used by riskgate resource documents
pub const API_VERSION: &str = "riskgate.dev/v1";
