//! Path templates - matching concrete paths against `{placeholder}` templates

use std::sync::LazyLock;

use regex::Regex;
use riskgate_core::{GateError, GateResult};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}/]+)\}").expect("valid placeholder pattern"));

/// Normalize a request path: leading slash, no trailing slash, no empty segments
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

fn is_placeholder(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}')
}

/// Whether `path` is addressed by `template`
///
/// A template placeholder matches any segment. A placeholder in `path` only
/// matches another placeholder, never a literal, so a template with renamed
/// placeholders still matches but `{x}` cannot stand in for `projects`.
pub fn template_matches(template: &str, path: &str) -> bool {
    let template = normalize_path(template);
    let path = normalize_path(path);

    let template_segments: Vec<&str> = template.split('/').collect();
    let path_segments: Vec<&str> = path.split('/').collect();
    if template_segments.len() != path_segments.len() {
        return false;
    }

    template_segments
        .iter()
        .zip(path_segments.iter())
        .all(|(t, p)| t == p || is_placeholder(t))
}

/// Whether two templates address the same paths, placeholder names aside
pub fn same_template(a: &str, b: &str) -> bool {
    template_matches(a, b) && template_matches(b, a)
}

/// Number of literal (non-placeholder) segments; more means more specific
pub fn literal_segments(template: &str) -> usize {
    template
        .split('/')
        .filter(|segment| !segment.is_empty() && !is_placeholder(segment))
        .count()
}

/// Substitute path parameters into a template
///
/// Every placeholder must have a value. Values are percent-encoded so they
/// stay within a single segment.
pub fn resolve_template(
    template: &str,
    params: &serde_json::Map<String, serde_json::Value>,
) -> GateResult<String> {
    let missing: Vec<String> = PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .filter(|name| match params.get(name) {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::String(s)) => s.is_empty(),
            Some(_) => false,
        })
        .collect();

    if !missing.is_empty() {
        return Err(GateError::invalid_request(format!(
            "Missing path parameter(s) {} for {}",
            missing.join(", "),
            template
        )));
    }

    let resolved = PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
        let value = match params.get(&caps[1]) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        urlencoding::encode(&value).into_owned()
    });

    Ok(normalize_path(&resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/v1/projects/"), "/v1/projects");
        assert_eq!(normalize_path("v1//projects"), "/v1/projects");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_template_matches_concrete_path() {
        let template = "/v1/projects/{ref}/functions/{function_slug}";
        assert!(template_matches(template, "/v1/projects/abcd/functions/hello"));
        assert!(template_matches(template, "/v1/projects/{ref}/functions/{slug}"));
        assert!(!template_matches(template, "/v1/projects/abcd/functions"));
        assert!(!template_matches(template, "/v1/projects/abcd/branches/hello"));
    }

    #[test]
    fn test_request_placeholder_does_not_match_literal() {
        assert!(!template_matches("/v1/projects/{ref}", "/v1/{a}/{b}"));
        assert!(!template_matches("/v1/projects/{ref}/pause", "/v1/projects/{ref}/{action}"));
        assert!(template_matches("/v1/projects/{ref}", "/v1/projects/{project_ref}"));
    }

    #[test]
    fn test_same_template() {
        assert!(same_template("/v1/projects/{ref}/", "/v1/projects/{project_ref}"));
        assert!(!same_template("/v1/projects/{ref}", "/v1/{kind}/{ref}"));
        assert!(!same_template("/v1/{kind}/abcd", "/v1/projects/{ref}"));
    }

    #[test]
    fn test_literal_segments() {
        assert_eq!(literal_segments("/v1/projects/{ref}"), 2);
        assert_eq!(literal_segments("/v1/projects/{ref}/pause"), 3);
    }

    #[test]
    fn test_resolve_template() {
        let resolved = resolve_template(
            "/v1/projects/{ref}/functions/{function_slug}",
            &params(json!({"ref": "abcd", "function_slug": "hello world"})),
        )
        .unwrap();
        assert_eq!(resolved, "/v1/projects/abcd/functions/hello%20world");
    }

    #[test]
    fn test_resolve_template_non_string_value() {
        let resolved =
            resolve_template("/v1/items/{id}", &params(json!({"id": 42}))).unwrap();
        assert_eq!(resolved, "/v1/items/42");
    }

    #[test]
    fn test_resolve_template_missing_param() {
        let err = resolve_template(
            "/v1/projects/{ref}/functions/{function_slug}",
            &params(json!({"ref": "abcd"})),
        )
        .unwrap_err();
        assert!(err.to_string().contains("function_slug"));
    }

    #[test]
    fn test_resolve_template_empty_param_is_missing() {
        assert!(resolve_template("/v1/projects/{ref}", &params(json!({"ref": ""}))).is_err());
    }
}
