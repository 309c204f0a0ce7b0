//! Builds the gateway pieces from a configuration file
//!
//! Every command goes through here so that `spec`, `classify` and `serve`
//! see the same catalog and rules for a given config.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use riskgate_core::GatewayConfig;
use riskgate_safety::{Gateway, RiskRules, SpecIndex};
use tracing::info;

/// Load the config file, or defaults when none is given
pub fn load_config(path: Option<&str>) -> Result<GatewayConfig> {
    match path {
        Some(path) => GatewayConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config {}", path)),
        None => {
            let mut config = GatewayConfig::default();
            config.expand_env_vars();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Built-in rules, overridden by `spec.catalog.rulesPath` when set
pub fn load_rules(config: &GatewayConfig) -> Result<RiskRules> {
    let rules = RiskRules::management_api();
    match config.spec.catalog.rules_path.as_deref() {
        Some(path) => {
            let overrides = RiskRules::from_yaml_file(path)
                .with_context(|| format!("Failed to load risk rules {}", path))?;
            info!(path, rules = overrides.len(), "Loaded risk rule overrides");
            Ok(rules.merged_with(overrides))
        }
        None => Ok(rules),
    }
}

/// Index the catalog named by `spec.catalog` (file, URL or bundled copy)
pub async fn load_index(config: &GatewayConfig) -> Result<SpecIndex> {
    let rules = load_rules(config)?;
    let catalog = &config.spec.catalog;

    let index = if let Some(path) = catalog.path.as_deref() {
        SpecIndex::from_file(path, rules)
            .with_context(|| format!("Failed to load catalog {}", path))?
    } else if let Some(url) = catalog.url.as_deref() {
        let content = fetch_catalog(url).await?;
        SpecIndex::from_str(&content, rules)
            .with_context(|| format!("Failed to index catalog from {}", url))?
    } else {
        SpecIndex::bundled(rules)?
    };

    Ok(index)
}

async fn fetch_catalog(url: &str) -> Result<String> {
    info!(url, "Fetching API catalog");
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("Failed to fetch catalog from {}", url))?
        .error_for_status()
        .with_context(|| format!("Catalog request to {} failed", url))?;

    response
        .text()
        .await
        .with_context(|| format!("Failed to read catalog from {}", url))
}

/// Gateway over the configured catalog with the configured mode and TTL
pub async fn build_gateway(config: &GatewayConfig) -> Result<Arc<Gateway>> {
    let index = Arc::new(load_index(config).await?);
    Ok(Arc::new(Gateway::from_config(index, config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskgate_core::{HttpMethod, RiskTier};
    use std::io::Write;

    #[test]
    fn test_defaults_without_config() {
        let config = load_config(None).unwrap();
        assert_eq!(config.spec.confirmation.ttl_seconds, 300);
    }

    #[tokio::test]
    async fn test_rules_path_overrides_builtin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
apiVersion: riskgate.dev/v1
kind: RiskRules
metadata:
  name: strict
spec:
  rules:
    - method: GET
      path: /v1/projects/{{ref}}/secrets
      tier: high
"#
        )
        .unwrap();

        let mut config = GatewayConfig::default();
        config.spec.catalog.rules_path = Some(file.path().display().to_string());

        let gateway = build_gateway(&config).await.unwrap();
        let classification = gateway.classify(HttpMethod::Get, "/v1/projects/abcd/secrets");
        assert_eq!(classification.tier, RiskTier::High);
    }

    #[tokio::test]
    async fn test_missing_catalog_file() {
        let mut config = GatewayConfig::default();
        config.spec.catalog.path = Some("/nonexistent/catalog.json".to_string());
        assert!(load_index(&config).await.is_err());
    }
}
