//! riskgatectl CLI Tests
//!
//! Runs the binary against the bundled catalog and temporary config files.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn riskgatectl() -> Command {
    let mut cmd = Command::cargo_bin("riskgatectl").unwrap();
    cmd.env_remove("RISKGATE_CONFIG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .env("CLICOLOR", "0");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn test_version() {
    riskgatectl()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("riskgatectl"))
        .stdout(predicate::str::contains("riskgate.dev/v1"))
        .stdout(predicate::str::contains("Bundled catalog"));
}

#[test]
fn test_classify_catalog_operation() {
    let report = json_stdout(riskgatectl().args([
        "classify",
        "DELETE",
        "/v1/projects/abcd/functions/hello",
        "-o",
        "json",
    ]));

    assert_eq!(report["risk_tier"], "extreme");
    assert_eq!(report["requires_confirmation"], true);
    assert_eq!(report["source"], "catalog");
    assert_eq!(report["template"], "/v1/projects/{ref}/functions/{function_slug}");
}

#[test]
fn test_classify_unknown_write_is_high() {
    let report = json_stdout(riskgatectl().args(["classify", "post", "/v1/unknown", "-o", "json"]));
    assert_eq!(report["risk_tier"], "high");
    assert_eq!(report["source"], "default");
}

#[test]
fn test_classify_text_output() {
    riskgatectl()
        .args(["classify", "DELETE", "/v1/projects/abcd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("blocked"))
        .stdout(predicate::str::contains("never executed"));
}

#[test]
fn test_classify_rejects_unknown_method() {
    riskgatectl()
        .args(["classify", "TRACE", "/v1/projects"])
        .assert()
        .failure();
}

#[test]
fn test_spec_domains() {
    let view = json_stdout(riskgatectl().args(["spec", "-o", "json"]));
    assert_eq!(view["view"], "domains");
    assert!(view["total_operations"].as_u64().unwrap() > 0);
}

#[test]
fn test_spec_domain_case_insensitive() {
    let view = json_stdout(riskgatectl().args(["spec", "--domain", "auth", "-o", "json"]));
    assert_eq!(view["view"], "operations");
    assert_eq!(view["domain"], "Auth");
}

#[test]
fn test_spec_operation_text() {
    riskgatectl()
        .args([
            "spec",
            "/v1/projects/{ref}/functions/{function_slug}",
            "-m",
            "DELETE",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("extreme"))
        .stdout(predicate::str::contains("Confirmation:  required"));
}

#[test]
fn test_spec_unknown_domain_fails() {
    riskgatectl()
        .args(["spec", "--domain", "Billing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Billing"));
}

#[test]
fn test_spec_method_without_path_fails() {
    riskgatectl()
        .args(["spec", "-m", "GET"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs a path"));
}

#[test]
fn test_rules_yaml() {
    riskgatectl()
        .args(["rules", "-o", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mode: safe"))
        .stdout(predicate::str::contains("/v1/projects/{ref}"));
}

#[test]
fn test_unknown_output_format() {
    riskgatectl()
        .args(["rules", "-o", "table"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown output format"));
}

#[test]
fn test_mode_from_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("gateway.yaml");
    fs::write(
        &config,
        "apiVersion: riskgate.dev/v1\nkind: GatewayConfig\nspec:\n  mode: unsafe\n",
    )
    .unwrap();

    riskgatectl()
        .args(["mode", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Initial mode: unsafe"));

    riskgatectl()
        .arg("mode")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initial mode: safe"));
}

#[test]
fn test_rules_path_from_config() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("rules.yaml");
    fs::write(
        &rules,
        r#"apiVersion: riskgate.dev/v1
kind: RiskRules
metadata:
  name: lockdown
spec:
  rules:
    - method: GET
      path: /v1/projects/{ref}/secrets
      tier: blocked
      reason: secrets stay out of agent context
"#,
    )
    .unwrap();

    let config = dir.path().join("gateway.yaml");
    fs::write(
        &config,
        format!(
            "apiVersion: riskgate.dev/v1\nkind: GatewayConfig\nspec:\n  catalog:\n    rulesPath: {}\n",
            rules.display()
        ),
    )
    .unwrap();

    let report = json_stdout(
        riskgatectl()
            .env("RISKGATE_CONFIG", &config)
            .args(["classify", "GET", "/v1/projects/abcd/secrets", "-o", "json"]),
    );
    assert_eq!(report["risk_tier"], "blocked");
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("gateway.yaml");
    fs::write(
        &config,
        "apiVersion: riskgate.dev/v1\nkind: GatewayConfig\nspec:\n  confirmation:\n    ttlSeconds: 0\n",
    )
    .unwrap();

    riskgatectl()
        .args(["rules", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ttlSeconds"));
}

#[test]
fn test_completion_bash() {
    riskgatectl()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("riskgatectl"));
}
