//! Error types shared across riskgate crates

use thiserror::Error;

/// Errors raised by the gateway and its collaborators.
///
/// Per-request denials are not errors: they come back as data from the
/// gateway. This type covers the failures that abort an operation.
#[derive(Error, Debug)]
pub enum GateError {
    /// The API catalog could not be parsed or indexed
    #[error("Failed to load API catalog: {0}")]
    SpecLoad(String),

    /// Unknown operation or domain in a catalog query
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request cannot be evaluated as given
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration could not be read, parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// The external request executor failed
    #[error("Executor error: {0}")]
    Executor(String),

    /// A tool failed to execute
    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GateError {
    pub fn spec_load(msg: impl Into<String>) -> Self {
        Self::SpecLoad(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn executor(msg: impl Into<String>) -> Self {
        Self::Executor(msg.into())
    }

    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    /// Whether the error happened before a catalog was available
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SpecLoad(_) | Self::Config(_))
    }
}

/// Result alias used throughout riskgate
pub type GateResult<T> = Result<T, GateError>;
