//! Spec Index - Queryable view over the management API catalog
//!
//! The index is built once from an OpenAPI 3 document and is read-only
//! afterwards. Each operation gets its risk tier at build time:
//! 1. a matching risk rule
//! 2. the `x-risk-tier` / `x-requires-confirmation` vendor extensions
//! 3. the method heuristic (GET/HEAD low, POST/PUT/PATCH medium, DELETE high)

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use riskgate_core::{GateError, GateResult, HttpMethod, Operation, RiskTier};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::rules::RiskRules;
use crate::template::{literal_segments, normalize_path, template_matches};

/// Bundled copy of the management API catalog
const BUNDLED_CATALOG: &str = include_str!("../catalog/management-api.json");

/// Maximum nesting of `$ref` resolution in operation details
const MAX_REF_DEPTH: usize = 8;

/// Domain for operations without tags
const DEFAULT_DOMAIN: &str = "Other";

/// Where an operation's tier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierSource {
    /// A risk rule pinned the tier
    Rule,
    /// `x-risk-tier` on the operation
    Annotation,
    /// Derived from the HTTP method
    Method,
}

/// One indexed operation
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub operation: Operation,
    pub risk_tier: RiskTier,
    pub requires_confirmation: bool,
    pub tier_source: TierSource,
    pub parameters: Vec<Value>,
    pub request_schema: Option<Value>,
    pub responses: Value,
}

impl CatalogEntry {
    pub fn summary(&self) -> OperationSummary {
        OperationSummary {
            method: self.operation.method,
            path: self.operation.path.clone(),
            domain: self.operation.domain.clone(),
            operation_id: self.operation.operation_id.clone(),
            summary: self.operation.summary.clone(),
            risk_tier: self.risk_tier,
            requires_confirmation: self.requires_confirmation,
        }
    }
}

/// Compact description of an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSummary {
    pub method: HttpMethod,
    pub path: String,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub risk_tier: RiskTier,
    pub requires_confirmation: bool,
}

/// Full description of an operation with schemas resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDetail {
    #[serde(flatten)]
    pub summary: OperationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tier_source: TierSource,
    pub parameters: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_schema: Option<Value>,
    pub responses: Value,
}

/// One domain in the catalog summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub operation_count: usize,
}

/// Catalog query; see [`SpecIndex::query`] for precedence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecQuery {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub method: Option<HttpMethod>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub all_paths: bool,
}

impl SpecQuery {
    pub fn operation(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            method: Some(method),
            ..Default::default()
        }
    }

    pub fn domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            ..Default::default()
        }
    }

    pub fn all_paths() -> Self {
        Self {
            all_paths: true,
            ..Default::default()
        }
    }
}

/// Projection returned by a catalog query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum SpecView {
    /// All domains with operation counts
    Domains {
        domains: Vec<DomainSummary>,
        total_operations: usize,
    },
    /// A single operation in full detail
    Operation { operation: Box<OperationDetail> },
    /// A list of operations (domain, path or full catalog)
    Operations {
        #[serde(skip_serializing_if = "Option::is_none")]
        domain: Option<String>,
        count: usize,
        operations: Vec<OperationSummary>,
    },
}

struct DomainInfo {
    description: Option<String>,
    count: usize,
}

/// In-memory index over the API catalog
pub struct SpecIndex {
    title: String,
    version: String,
    entries: Vec<CatalogEntry>,
    by_template: HashMap<(HttpMethod, String), usize>,
    domains: BTreeMap<String, DomainInfo>,
    /// `{"components": ...}` of the source document, for `$ref` resolution
    definitions: Value,
    rules: RiskRules,
}

impl SpecIndex {
    /// Build the index from a parsed OpenAPI document
    pub fn load(document: &Value, rules: RiskRules) -> GateResult<Self> {
        let root = document
            .as_object()
            .ok_or_else(|| GateError::spec_load("document is not an object"))?;

        let paths = root
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| GateError::spec_load("document has no `paths` object"))?;

        let info = root.get("info");
        let title = info
            .and_then(|i| i.get("title"))
            .and_then(Value::as_str)
            .unwrap_or("untitled")
            .to_string();
        let version = info
            .and_then(|i| i.get("version"))
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let mut domains: BTreeMap<String, DomainInfo> = BTreeMap::new();
        if let Some(tags) = root.get("tags").and_then(Value::as_array) {
            for tag in tags {
                if let Some(name) = tag.get("name").and_then(Value::as_str) {
                    domains.insert(
                        name.to_string(),
                        DomainInfo {
                            description: tag
                                .get("description")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                            count: 0,
                        },
                    );
                }
            }
        }

        let mut entries = Vec::new();
        for (path, item) in paths {
            if !path.starts_with('/') {
                return Err(GateError::spec_load(format!(
                    "path '{}' does not start with '/'",
                    path
                )));
            }
            let item = item.as_object().ok_or_else(|| {
                GateError::spec_load(format!("path item '{}' is not an object", path))
            })?;

            let shared_parameters = item
                .get("parameters")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            for method in HttpMethod::ALL {
                let key = method.as_str().to_lowercase();
                let Some(raw) = item.get(&key) else {
                    continue;
                };
                let entry = build_entry(path, method, raw, &shared_parameters, &rules)?;
                domains
                    .entry(entry.operation.domain.clone())
                    .or_insert(DomainInfo {
                        description: None,
                        count: 0,
                    })
                    .count += 1;
                entries.push(entry);
            }
        }

        entries.sort_by(|a, b| {
            (a.operation.path.as_str(), a.operation.method)
                .cmp(&(b.operation.path.as_str(), b.operation.method))
        });

        let by_template = entries
            .iter()
            .enumerate()
            .map(|(i, e)| ((e.operation.method, normalize_path(&e.operation.path)), i))
            .collect();

        // Declared tags without operations are not domains
        domains.retain(|_, info| info.count > 0);

        let definitions = serde_json::json!({
            "components": root.get("components").cloned().unwrap_or(Value::Null)
        });

        info!(
            title = %title,
            operations = entries.len(),
            domains = domains.len(),
            rules = rules.len(),
            "Indexed API catalog"
        );

        Ok(Self {
            title,
            version,
            entries,
            by_template,
            domains,
            definitions,
            rules,
        })
    }

    /// Parse a JSON or YAML document and build the index
    pub fn from_str(content: &str, rules: RiskRules) -> GateResult<Self> {
        let document: Value = if content.trim_start().starts_with('{') {
            serde_json::from_str(content)
                .map_err(|e| GateError::spec_load(format!("invalid JSON: {}", e)))?
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| GateError::spec_load(format!("invalid YAML: {}", e)))?
        };
        Self::load(&document, rules)
    }

    pub fn from_file(path: impl AsRef<Path>, rules: RiskRules) -> GateResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GateError::spec_load(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content, rules)
    }

    /// Index over the bundled catalog with the given rules
    pub fn bundled(rules: RiskRules) -> GateResult<Self> {
        Self::from_str(BUNDLED_CATALOG, rules)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.entries.iter().map(|e| &e.operation)
    }

    pub fn rules(&self) -> &RiskRules {
        &self.rules
    }

    pub fn domains(&self) -> Vec<DomainSummary> {
        self.domains
            .iter()
            .map(|(name, info)| DomainSummary {
                name: name.clone(),
                description: info.description.clone(),
                operation_count: info.count,
            })
            .collect()
    }

    /// Find the operation addressed by (path, method)
    ///
    /// `path` may be a template or a concrete path. Exact template hits win,
    /// then the matching template with the most literal segments. Equally
    /// specific templates resolve to the highest tier.
    pub fn find(&self, path: &str, method: HttpMethod) -> Option<&CatalogEntry> {
        let normalized = normalize_path(path);
        if let Some(&i) = self.by_template.get(&(method, normalized.clone())) {
            return Some(&self.entries[i]);
        }

        let mut best: Option<&CatalogEntry> = None;
        for entry in self
            .entries
            .iter()
            .filter(|e| e.operation.method == method)
            .filter(|e| template_matches(&e.operation.path, &normalized))
        {
            match best {
                Some(current)
                    if (literal_segments(&current.operation.path), current.risk_tier)
                        >= (literal_segments(&entry.operation.path), entry.risk_tier) => {}
                _ => best = Some(entry),
            }
        }
        best
    }

    pub fn lookup(&self, path: &str, method: HttpMethod) -> GateResult<&CatalogEntry> {
        self.find(path, method)
            .ok_or_else(|| GateError::not_found(format!("{} {}", method, path)))
    }

    /// Answer a catalog query
    ///
    /// Precedence: path+method, all_paths, path alone, domain, then the
    /// domain summary when nothing is set.
    pub fn query(&self, query: &SpecQuery) -> GateResult<SpecView> {
        debug!(?query, "Querying API catalog");

        if let (Some(path), Some(method)) = (query.path.as_deref(), query.method) {
            let entry = self.lookup(path, method)?;
            return Ok(SpecView::Operation {
                operation: Box::new(self.detail(entry)),
            });
        }

        if query.all_paths {
            let operations: Vec<OperationSummary> =
                self.entries.iter().map(CatalogEntry::summary).collect();
            return Ok(SpecView::Operations {
                domain: None,
                count: operations.len(),
                operations,
            });
        }

        if let Some(path) = query.path.as_deref() {
            let operations: Vec<OperationSummary> = self
                .entries
                .iter()
                .filter(|e| template_matches(&e.operation.path, path))
                .map(CatalogEntry::summary)
                .collect();
            if operations.is_empty() {
                return Err(GateError::not_found(format!("no operations at {}", path)));
            }
            return Ok(SpecView::Operations {
                domain: None,
                count: operations.len(),
                operations,
            });
        }

        if let Some(domain) = query.domain.as_deref() {
            let name = self
                .domains
                .keys()
                .find(|name| name.eq_ignore_ascii_case(domain.trim()))
                .ok_or_else(|| GateError::not_found(format!("domain '{}'", domain)))?;
            let operations: Vec<OperationSummary> = self
                .entries
                .iter()
                .filter(|e| &e.operation.domain == name)
                .map(CatalogEntry::summary)
                .collect();
            return Ok(SpecView::Operations {
                domain: Some(name.clone()),
                count: operations.len(),
                operations,
            });
        }

        Ok(SpecView::Domains {
            domains: self.domains(),
            total_operations: self.entries.len(),
        })
    }

    fn detail(&self, entry: &CatalogEntry) -> OperationDetail {
        let resolve = |value: &Value| self.resolve_refs(value, &mut Vec::new());
        OperationDetail {
            summary: entry.summary(),
            description: entry.operation.description.clone(),
            tier_source: entry.tier_source,
            parameters: entry.parameters.iter().map(resolve).collect(),
            request_schema: entry.request_schema.as_ref().map(resolve),
            responses: resolve(&entry.responses),
        }
    }

    /// Inline local `$ref`s; cycles and overly deep chains stay as references
    fn resolve_refs(&self, value: &Value, stack: &mut Vec<String>) -> Value {
        match value {
            Value::Object(map) => {
                if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                    if stack.len() >= MAX_REF_DEPTH || stack.iter().any(|r| r == reference) {
                        return value.clone();
                    }
                    let Some(target) = reference
                        .strip_prefix('#')
                        .and_then(|pointer| self.definitions.pointer(pointer))
                    else {
                        return value.clone();
                    };
                    stack.push(reference.to_string());
                    let resolved = self.resolve_refs(target, stack);
                    stack.pop();
                    return resolved;
                }
                Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), self.resolve_refs(v, stack)))
                        .collect(),
                )
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.resolve_refs(v, stack)).collect())
            }
            other => other.clone(),
        }
    }
}

impl std::fmt::Debug for SpecIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecIndex")
            .field("title", &self.title)
            .field("version", &self.version)
            .field("operations", &self.entries.len())
            .field("domains", &self.domains.len())
            .finish()
    }
}

fn build_entry(
    path: &str,
    method: HttpMethod,
    raw: &Value,
    shared_parameters: &[Value],
    rules: &RiskRules,
) -> GateResult<CatalogEntry> {
    let op = raw.as_object().ok_or_else(|| {
        GateError::spec_load(format!("operation {} {} is not an object", method, path))
    })?;

    let text = |key: &str| op.get(key).and_then(Value::as_str).map(str::to_string);

    let domain = op
        .get("tags")
        .and_then(Value::as_array)
        .and_then(|tags| tags.first())
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_DOMAIN)
        .to_string();

    let annotated_tier = match op.get("x-risk-tier") {
        None => None,
        Some(Value::String(tier)) => Some(tier.parse::<RiskTier>().map_err(|e| {
            GateError::spec_load(format!("{} {}: {}", method, path, e))
        })?),
        Some(other) => {
            return Err(GateError::spec_load(format!(
                "{} {}: x-risk-tier must be a string, got {}",
                method, path, other
            )))
        }
    };
    let annotated_confirmation = op
        .get("x-requires-confirmation")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let (risk_tier, flagged, tier_source) = if let Some(rule) = rules.find(method, path) {
        (rule.tier, rule.requires_confirmation, TierSource::Rule)
    } else if let Some(tier) = annotated_tier {
        (tier, annotated_confirmation, TierSource::Annotation)
    } else {
        (method_tier(method), annotated_confirmation, TierSource::Method)
    };

    let mut parameters = shared_parameters.to_vec();
    if let Some(own) = op.get("parameters").and_then(Value::as_array) {
        parameters.extend(own.iter().cloned());
    }

    let request_schema = op
        .get("requestBody")
        .and_then(|body| body.get("content"))
        .and_then(|content| content.get("application/json"))
        .and_then(|media| media.get("schema"))
        .cloned();

    debug!(%method, path, tier = %risk_tier, source = ?tier_source, "Indexed operation");

    Ok(CatalogEntry {
        operation: Operation {
            method,
            path: path.to_string(),
            domain,
            operation_id: text("operationId"),
            summary: text("summary"),
            description: text("description"),
        },
        risk_tier,
        requires_confirmation: flagged || risk_tier.requires_confirmation(),
        tier_source,
        parameters,
        request_schema,
        responses: op.get("responses").cloned().unwrap_or(Value::Null),
    })
}

/// Tier for catalog operations that carry no rule or annotation
fn method_tier(method: HttpMethod) -> RiskTier {
    match method {
        HttpMethod::Get | HttpMethod::Head => RiskTier::Low,
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => RiskTier::Medium,
        HttpMethod::Delete => RiskTier::High,
    }
}
