//! Operation vocabulary - methods, risk tiers and the execution mode
//!
//! An operation is one addressable (method, path template) capability of the
//! remote management API. Every operation carries a risk tier:
//! - low: read-only, always permitted
//! - medium: reversible writes
//! - high: writes with lasting impact
//! - extreme: destructive, needs an explicit confirmation
//! - blocked: never executed through the gateway

use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// HTTP method of an API operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    /// All methods an OpenAPI path item may declare
    pub const ALL: [HttpMethod; 6] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Head,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }

    /// Methods that never change remote state
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            other => Err(GateError::invalid_request(format!(
                "Unsupported HTTP method: {}",
                other
            ))),
        }
    }
}

/// Risk tier of an operation
///
/// Ordered by severity. `Blocked` sorts last but is not part of the
/// execution ladder: no mode or confirmation makes it eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// Read-only operations
    Low,
    /// Reversible writes
    Medium,
    /// Writes with lasting impact
    High,
    /// Destructive operations
    Extreme,
    /// Never executed through the gateway
    Blocked,
}

impl RiskTier {
    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "read-only operation",
            Self::Medium => "write operation",
            Self::High => "high-impact write operation",
            Self::Extreme => "destructive operation",
            Self::Blocked => "operation blocked for safety",
        }
    }

    /// Whether any combination of mode and confirmation can run it
    pub fn is_executable(&self) -> bool {
        !matches!(self, Self::Blocked)
    }

    /// Whether the gateway must be in unsafe mode to run it
    pub fn requires_unsafe_mode(&self) -> bool {
        matches!(self, Self::Medium | Self::High | Self::Extreme)
    }

    /// Whether the tier on its own demands a confirmation round-trip
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Self::Extreme)
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Extreme => write!(f, "extreme"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

impl std::str::FromStr for RiskTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "extreme" => Ok(Self::Extreme),
            "blocked" => Ok(Self::Blocked),
            _ => Err(format!("Unknown risk tier: {}", s)),
        }
    }
}

/// Execution mode of the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Only low-risk operations run
    #[default]
    Safe,
    /// Write operations run; destructive ones still need confirmation
    Unsafe,
}

impl Mode {
    pub fn is_unsafe(&self) -> bool {
        matches!(self, Self::Unsafe)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Unsafe => write!(f, "unsafe"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "safe" => Ok(Self::Safe),
            "unsafe" => Ok(Self::Unsafe),
            _ => Err(format!("Unknown mode: {}", s)),
        }
    }
}

/// Reference to an operation template: method plus path template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationRef {
    pub method: HttpMethod,
    pub path: String,
}

impl OperationRef {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl std::fmt::Display for OperationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// One addressable capability of the remote API, as loaded from its catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub method: HttpMethod,

    /// Path template, e.g. `/v1/projects/{ref}/functions/{slug}`
    pub path: String,

    /// Logical grouping (first OpenAPI tag)
    pub domain: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Operation {
    pub fn operation_ref(&self) -> OperationRef {
        OperationRef::new(self.method, self.path.clone())
    }

    /// Placeholder names in the path template, in order
    pub fn path_placeholders(&self) -> Vec<&str> {
        self.path
            .split('/')
            .filter_map(|segment| {
                segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_case_insensitive() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!(" Delete ".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_method_read_only() {
        assert!(HttpMethod::Get.is_read_only());
        assert!(HttpMethod::Head.is_read_only());
        assert!(!HttpMethod::Post.is_read_only());
        assert!(!HttpMethod::Delete.is_read_only());
    }

    #[test]
    fn test_risk_tier_ordering() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
        assert!(RiskTier::High < RiskTier::Extreme);
        assert!(!RiskTier::Blocked.is_executable());
        assert!(RiskTier::Extreme.is_executable());
    }

    #[test]
    fn test_risk_tier_gates() {
        assert!(!RiskTier::Low.requires_unsafe_mode());
        assert!(RiskTier::Medium.requires_unsafe_mode());
        assert!(!RiskTier::High.requires_confirmation());
        assert!(RiskTier::Extreme.requires_confirmation());
    }

    #[test]
    fn test_risk_tier_serde() {
        let tier: RiskTier = serde_json::from_str("\"extreme\"").unwrap();
        assert_eq!(tier, RiskTier::Extreme);
        assert_eq!(serde_json::to_string(&RiskTier::Blocked).unwrap(), "\"blocked\"");
        assert_eq!("HIGH".parse::<RiskTier>().unwrap(), RiskTier::High);
    }

    #[test]
    fn test_mode_default_is_safe() {
        assert_eq!(Mode::default(), Mode::Safe);
        assert!(!Mode::Safe.is_unsafe());
        assert_eq!("unsafe".parse::<Mode>().unwrap(), Mode::Unsafe);
    }

    #[test]
    fn test_path_placeholders() {
        let op = Operation {
            method: HttpMethod::Delete,
            path: "/v1/projects/{ref}/functions/{function_slug}".to_string(),
            domain: "Edge Functions".to_string(),
            operation_id: None,
            summary: None,
            description: None,
        };
        assert_eq!(op.path_placeholders(), vec!["ref", "function_slug"]);
        assert_eq!(
            op.operation_ref().to_string(),
            "DELETE /v1/projects/{ref}/functions/{function_slug}"
        );
    }
}
