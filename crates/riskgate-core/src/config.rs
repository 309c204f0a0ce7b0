// riskgate Core - Gateway configuration resource
//
// The gateway is configured with a Kubernetes-style YAML resource:
// - where the management API lives and how to authenticate against it
// - where the API catalog (OpenAPI document) and risk rules come from
// - how long confirmation tokens stay redeemable
// - the initial execution mode and the listen address of `serve`

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{GateError, GateResult};
use crate::operation::Mode;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env pattern"));

/// GatewayConfig - top-level configuration resource
///
/// Example:
/// ```yaml
/// apiVersion: riskgate.dev/v1
/// kind: GatewayConfig
/// metadata:
///   name: production
/// spec:
///   api:
///     baseUrl: https://api.supabase.com
///     accessToken: ${SUPABASE_ACCESS_TOKEN}
///     timeoutSecs: 30
///   catalog:
///     url: https://api.supabase.com/api/v1-json
///     rulesPath: ./risk-rules.yaml
///   confirmation:
///     ttlSeconds: 300
///   mode: safe
///   server:
///     host: 127.0.0.1
///     port: 8080
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default)]
    pub metadata: ConfigMetadata,

    #[serde(default)]
    pub spec: GatewaySpec,
}

fn default_api_version() -> String {
    crate::API_VERSION.to_string()
}

fn default_kind() -> String {
    "GatewayConfig".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub name: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            labels: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySpec {
    /// Remote management API
    #[serde(default)]
    pub api: ApiConfig,

    /// Source of the API catalog and risk rules
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Confirmation token settings
    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    /// Mode at process start
    #[serde(default)]
    pub mode: Mode,

    /// `riskgatectl serve` listen address
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token (supports ${ENV_VAR} expansion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.supabase.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Where the OpenAPI document comes from; the bundled copy is used when
/// neither `path` nor `url` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// RiskRules document overriding the built-in rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationConfig {
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Interval of the expired-token sweep (0 disables it)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_ttl_seconds() -> u64 {
    300 // 5 minutes
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ConfigMetadata::default(),
            spec: GatewaySpec::default(),
        }
    }
}

impl GatewayConfig {
    /// Parse a configuration document
    pub fn from_yaml_str(content: &str) -> GateResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(content);
        serde_path_to_error::deserialize(deserializer).map_err(|e| {
            GateError::config(format!("Failed to parse config at '{}': {}", e.path(), e.inner()))
        })
    }

    /// Load, expand and validate a configuration file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> GateResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GateError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_yaml_str(&content)?;
        config.expand_env_vars();
        config.validate()?;

        tracing::info!(name = %config.metadata.name, path = %path.display(), "Loaded gateway config");
        Ok(config)
    }

    /// Replace `${VAR}` references with environment values
    ///
    /// Unset variables expand to an empty string.
    pub fn expand_env_vars(&mut self) {
        self.spec.api.base_url = expand_env(&self.spec.api.base_url);
        if let Some(token) = self.spec.api.access_token.as_mut() {
            *token = expand_env(token);
        }
        for value in [
            self.spec.catalog.path.as_mut(),
            self.spec.catalog.url.as_mut(),
            self.spec.catalog.rules_path.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            *value = expand_env(value);
        }
    }

    pub fn validate(&self) -> GateResult<()> {
        if self.kind != "GatewayConfig" {
            return Err(GateError::config(format!(
                "Expected kind 'GatewayConfig', got '{}'",
                self.kind
            )));
        }
        if self.spec.api.base_url.trim().is_empty() {
            return Err(GateError::config("spec.api.baseUrl must not be empty"));
        }
        if self.spec.confirmation.ttl_seconds == 0 {
            return Err(GateError::config(
                "spec.confirmation.ttlSeconds must be greater than zero",
            ));
        }
        if self.spec.catalog.path.is_some() && self.spec.catalog.url.is_some() {
            return Err(GateError::config(
                "spec.catalog: set either path or url, not both",
            ));
        }
        Ok(())
    }

    /// Access token with empty values treated as absent
    pub fn access_token(&self) -> Option<&str> {
        self.spec
            .api
            .access_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

fn expand_env(value: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(value, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
