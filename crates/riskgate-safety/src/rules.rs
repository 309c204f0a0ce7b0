//! Risk Rules - Declarative risk tiers for management API operations
//!
//! Rules pin a tier on an operation template regardless of what the catalog
//! says. They are applied when the catalog is indexed and also consulted for
//! operations the catalog does not know about.

use std::collections::HashMap;
use std::path::Path;

use riskgate_core::{GateError, GateResult, HttpMethod, RiskTier};
use serde::{Deserialize, Serialize};

use crate::template::{literal_segments, same_template, template_matches};

/// A single rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRule {
    pub method: HttpMethod,

    /// Path template the rule applies to
    pub path: String,

    pub tier: RiskTier,

    /// Demand a confirmation round-trip even below the extreme tier
    #[serde(default)]
    pub requires_confirmation: bool,

    /// Why the operation carries this tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RiskRule {
    pub fn new(method: HttpMethod, path: &str, tier: RiskTier) -> Self {
        Self {
            method,
            path: path.to_string(),
            tier,
            requires_confirmation: false,
            reason: None,
        }
    }

    pub fn with_confirmation(mut self) -> Self {
        self.requires_confirmation = true;
        self
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    pub fn matches(&self, method: HttpMethod, path: &str) -> bool {
        self.method == method && template_matches(&self.path, path)
    }

    /// Effective confirmation requirement; extreme always needs one
    pub fn needs_confirmation(&self) -> bool {
        self.requires_confirmation || self.tier.requires_confirmation()
    }
}

/// Complete rules document
///
/// ```yaml
/// apiVersion: riskgate.dev/v1
/// kind: RiskRules
/// metadata:
///   name: production-overrides
/// spec:
///   rules:
///     - method: POST
///       path: /v1/projects/{ref}/database/query
///       tier: blocked
///       reason: raw SQL is not allowed through the gateway
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRules {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: RulesMetadata,
    pub spec: RulesSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesMetadata {
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesSpec {
    #[serde(default)]
    pub rules: Vec<RiskRule>,
}

impl RiskRules {
    /// Rule set with no rules
    pub fn empty() -> Self {
        Self::named("empty", Vec::new())
    }

    fn named(name: &str, rules: Vec<RiskRule>) -> Self {
        Self {
            api_version: riskgate_core::API_VERSION.to_string(),
            kind: "RiskRules".to_string(),
            metadata: RulesMetadata {
                name: name.to_string(),
                labels: HashMap::new(),
            },
            spec: RulesSpec { rules },
        }
    }

    /// Built-in rules for the management API
    pub fn management_api() -> Self {
        use HttpMethod::*;
        use RiskTier::*;

        let rules = vec![
            // Blocked: irreversible loss of a whole project
            RiskRule::new(Delete, "/v1/projects/{ref}", Blocked)
                .with_reason("deleting a project destroys all of its data"),
            // Extreme: destructive but scoped
            RiskRule::new(Delete, "/v1/projects/{ref}/functions/{function_slug}", Extreme)
                .with_reason("removes a deployed edge function"),
            RiskRule::new(Delete, "/v1/branches/{branch_id}", Extreme)
                .with_reason("deletes a database branch and its data"),
            RiskRule::new(Delete, "/v1/projects/{ref}/branches", Extreme)
                .with_reason("disables branching and removes every preview branch"),
            RiskRule::new(Post, "/v1/branches/{branch_id}/reset", Extreme)
                .with_reason("resets a branch to its initial state"),
            RiskRule::new(Delete, "/v1/projects/{ref}/secrets", Extreme)
                .with_reason("deletes project secrets"),
            RiskRule::new(Post, "/v1/projects/{ref}/pause", Extreme)
                .with_reason("takes the project offline"),
            RiskRule::new(Post, "/v1/projects/{ref}/restore", Extreme)
                .with_reason("restores a paused project"),
            RiskRule::new(Post, "/v1/projects/{ref}/database/backups/restore-pitr", Extreme)
                .with_reason("overwrites the database with a point-in-time backup"),
            RiskRule::new(Delete, "/v1/projects/{ref}/custom-hostname", Extreme)
                .with_reason("removes the custom domain"),
            RiskRule::new(
                Delete,
                "/v1/projects/{ref}/config/auth/sso/providers/{provider_id}",
                Extreme,
            )
            .with_reason("removes an SSO provider and locks out its users"),
            // High: lasting impact, confirm before running
            RiskRule::new(Post, "/v1/projects/{ref}/network-restrictions/apply", High)
                .with_confirmation()
                .with_reason("can cut off database access"),
            RiskRule::new(Post, "/v1/projects/{ref}/database/query", High)
                .with_confirmation()
                .with_reason("runs arbitrary SQL"),
            // High: lasting impact
            RiskRule::new(Patch, "/v1/projects/{ref}/config/auth", High)
                .with_reason("changes how users sign in"),
            RiskRule::new(Post, "/v1/projects/{ref}/secrets", High)
                .with_reason("overwrites project secrets"),
            RiskRule::new(Delete, "/v1/projects/{ref}/network-bans", High)
                .with_reason("lifts network bans"),
            // Reads of sensitive material
            RiskRule::new(Get, "/v1/projects/{ref}/api-keys", Medium)
                .with_reason("reveals project API keys"),
        ];

        Self::named("management-api", rules)
    }

    pub fn from_yaml_str(content: &str) -> GateResult<Self> {
        let rules: Self = serde_yaml::from_str(content)
            .map_err(|e| GateError::config(format!("Failed to parse risk rules: {}", e)))?;
        if rules.kind != "RiskRules" {
            return Err(GateError::config(format!(
                "Expected kind 'RiskRules', got '{}'",
                rules.kind
            )));
        }
        Ok(rules)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> GateResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GateError::config(format!("Failed to read risk rules {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Layer `overrides` on top of these rules
    ///
    /// An override shadows any rule for the same template.
    pub fn merged_with(mut self, overrides: RiskRules) -> Self {
        let mut rules = overrides.spec.rules;
        rules.append(&mut self.spec.rules);
        self.spec.rules = rules;
        self.metadata.name = format!("{}+{}", self.metadata.name, overrides.metadata.name);
        self
    }

    /// Most specific rule for an operation
    ///
    /// Among equally specific templates the highest tier wins. A rule for the
    /// same template as an earlier one is shadowed by it, which is how
    /// overrides replace built-in rules.
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<&RiskRule> {
        let matching: Vec<&RiskRule> = self
            .spec
            .rules
            .iter()
            .filter(|r| r.matches(method, path))
            .collect();

        let mut best: Option<&RiskRule> = None;
        for (i, rule) in matching.iter().copied().enumerate() {
            if matching[..i]
                .iter()
                .any(|earlier| same_template(&earlier.path, &rule.path))
            {
                continue;
            }
            match best {
                Some(current)
                    if (literal_segments(&current.path), current.tier)
                        >= (literal_segments(&rule.path), rule.tier) => {}
                _ => best = Some(rule),
            }
        }
        best
    }

    pub fn rules(&self) -> &[RiskRule] {
        &self.spec.rules
    }

    pub fn len(&self) -> usize {
        self.spec.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spec.rules.is_empty()
    }
}

impl Default for RiskRules {
    fn default() -> Self {
        Self::management_api()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules() {
        let rules = RiskRules::management_api();

        let rule = rules.find(HttpMethod::Delete, "/v1/projects/abcd").unwrap();
        assert_eq!(rule.tier, RiskTier::Blocked);

        let rule = rules
            .find(HttpMethod::Delete, "/v1/projects/abcd/functions/hello")
            .unwrap();
        assert_eq!(rule.tier, RiskTier::Extreme);
        assert!(rule.needs_confirmation());

        assert!(rules.find(HttpMethod::Get, "/v1/projects/abcd/functions").is_none());
    }

    #[test]
    fn test_high_with_confirmation() {
        let rules = RiskRules::management_api();
        let rule = rules
            .find(HttpMethod::Post, "/v1/projects/abcd/database/query")
            .unwrap();
        assert_eq!(rule.tier, RiskTier::High);
        assert!(rule.needs_confirmation());

        let rule = rules
            .find(HttpMethod::Patch, "/v1/projects/abcd/config/auth")
            .unwrap();
        assert!(!rule.needs_confirmation());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
apiVersion: riskgate.dev/v1
kind: RiskRules
metadata:
  name: overrides
spec:
  rules:
    - method: POST
      path: /v1/projects/{ref}/database/query
      tier: blocked
      reason: no raw SQL
    - method: GET
      path: /v1/projects/{ref}/secrets
      tier: medium
      requires_confirmation: true
"#;
        let rules = RiskRules::from_yaml_str(yaml).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.rules()[0].tier, RiskTier::Blocked);
        assert!(rules.rules()[1].needs_confirmation());
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(
            &path,
            "apiVersion: riskgate.dev/v1\nkind: RiskRules\nmetadata:\n  name: local\nspec:\n  rules:\n    - method: GET\n      path: /v1/projects/{ref}/secrets\n      tier: blocked\n",
        )
        .unwrap();

        let rules = RiskRules::from_yaml_file(&path).unwrap();
        assert_eq!(rules.metadata.name, "local");
        assert_eq!(
            rules.find(HttpMethod::Get, "/v1/projects/abcd/secrets").map(|r| r.tier),
            Some(RiskTier::Blocked)
        );

        let err = RiskRules::from_yaml_file(dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("missing.yaml"));
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let yaml = "apiVersion: riskgate.dev/v1\nkind: Context\nmetadata:\n  name: x\nspec: {}\n";
        assert!(RiskRules::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let overrides = RiskRules::named(
            "overrides",
            vec![RiskRule::new(
                HttpMethod::Post,
                "/v1/projects/{ref}/database/query",
                RiskTier::Blocked,
            )],
        );
        let rules = RiskRules::management_api().merged_with(overrides);

        let rule = rules
            .find(HttpMethod::Post, "/v1/projects/abcd/database/query")
            .unwrap();
        assert_eq!(rule.tier, RiskTier::Blocked);
        assert_eq!(rules.metadata.name, "management-api+overrides");
    }

    #[test]
    fn test_most_specific_rule_wins() {
        let rules = RiskRules::named(
            "specificity",
            vec![
                RiskRule::new(HttpMethod::Post, "/v1/projects/{ref}/{action}", RiskTier::High),
                RiskRule::new(HttpMethod::Post, "/v1/projects/{ref}/pause", RiskTier::Extreme),
            ],
        );
        let rule = rules.find(HttpMethod::Post, "/v1/projects/abcd/pause").unwrap();
        assert_eq!(rule.tier, RiskTier::Extreme);
    }

    #[test]
    fn test_equally_specific_rules_take_highest_tier() {
        let rules = RiskRules::named(
            "ambiguous",
            vec![
                RiskRule::new(HttpMethod::Delete, "/v1/{kind}/abcd", RiskTier::Medium),
                RiskRule::new(HttpMethod::Delete, "/v1/projects/{ref}", RiskTier::Blocked),
            ],
        );
        let rule = rules.find(HttpMethod::Delete, "/v1/projects/abcd").unwrap();
        assert_eq!(rule.tier, RiskTier::Blocked);

        let reversed = RiskRules::named(
            "ambiguous",
            rules.rules().iter().rev().cloned().collect(),
        );
        let rule = reversed.find(HttpMethod::Delete, "/v1/projects/abcd").unwrap();
        assert_eq!(rule.tier, RiskTier::Blocked);
    }

    #[test]
    fn test_override_shadows_same_template() {
        let overrides = RiskRules::named(
            "overrides",
            vec![RiskRule::new(
                HttpMethod::Post,
                "/v1/projects/{project_ref}/database/query",
                RiskTier::Medium,
            )],
        );
        let rules = RiskRules::named(
            "base",
            vec![
                RiskRule::new(HttpMethod::Post, "/v1/projects/{ref}/database/query", RiskTier::High),
                RiskRule::new(HttpMethod::Post, "/v1/{kind}/{ref}/database/query", RiskTier::Low),
            ],
        )
        .merged_with(overrides);

        let rule = rules
            .find(HttpMethod::Post, "/v1/projects/abcd/database/query")
            .unwrap();
        assert_eq!(rule.tier, RiskTier::Medium);
    }
}
