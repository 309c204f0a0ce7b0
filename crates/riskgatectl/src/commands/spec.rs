use anyhow::{bail, Result};
use colored::Colorize;
use riskgate_core::{HttpMethod, RiskTier};
use riskgate_safety::{OperationDetail, OperationSummary, SpecQuery, SpecView, TierSource};
use serde_json::Value;

use crate::output::{confirmation_label, emit, print_header, tier_label};
use crate::setup;

/// Query the API catalog (spec [path] [-m method] [-d domain] [--all-paths])
pub async fn execute(
    config: Option<&str>,
    path: Option<String>,
    method: Option<HttpMethod>,
    domain: Option<String>,
    all_paths: bool,
    output: &str,
) -> Result<()> {
    if method.is_some() && path.is_none() {
        bail!("--method needs a path");
    }

    let config = setup::load_config(config)?;
    let index = setup::load_index(&config).await?;

    let query = SpecQuery {
        path,
        method,
        domain,
        all_paths,
    };
    let view = index.query(&query)?;

    emit(&view, output, print_view)
}

fn print_view(view: &SpecView) {
    match view {
        SpecView::Domains {
            domains,
            total_operations,
        } => {
            print_header(&format!("{:<28} {:>10}  {}", "DOMAIN", "OPERATIONS", "DESCRIPTION"));
            for domain in domains {
                println!(
                    "{:<28} {:>10}  {}",
                    domain.name,
                    domain.operation_count,
                    domain.description.as_deref().unwrap_or("-")
                );
            }
            println!("\n{} operations in {} domains", total_operations, domains.len());
        }
        SpecView::Operations {
            domain,
            count,
            operations,
        } => {
            if let Some(domain) = domain {
                println!("Domain: {}\n", domain.bold());
            }
            print_header(&format!("{:<7} {:<64} {}", "METHOD", "PATH", "TIER"));
            for operation in operations {
                print_operation_row(operation);
            }
            println!("\n{} operations", count);
        }
        SpecView::Operation { operation } => print_detail(operation),
    }
}

fn print_operation_row(operation: &OperationSummary) {
    // Extreme always confirms; only flag the tiers where it is an exception
    let marker = if operation.requires_confirmation && operation.risk_tier != RiskTier::Extreme {
        " (confirm)"
    } else {
        ""
    };
    println!(
        "{:<7} {:<64} {}{}",
        operation.method.as_str(),
        operation.path,
        tier_label(operation.risk_tier),
        marker
    );
}

fn print_detail(detail: &OperationDetail) {
    let summary = &detail.summary;
    println!("{} {}", summary.method.as_str().bold(), summary.path.bold());
    if let Some(text) = &summary.summary {
        println!("  {}", text);
    }
    println!();
    println!("  Domain:        {}", summary.domain);
    if let Some(id) = &summary.operation_id {
        println!("  Operation ID:  {}", id);
    }
    println!(
        "  Risk tier:     {} (from {})",
        tier_label(summary.risk_tier),
        source_label(detail.tier_source)
    );
    println!("  Confirmation:  {}", confirmation_label(summary.requires_confirmation));

    if let Some(description) = &detail.description {
        println!("\n{}", description.trim());
    }

    if !detail.parameters.is_empty() {
        println!("\n{}", "Parameters:".bold());
        for parameter in &detail.parameters {
            println!("  {}", describe_parameter(parameter));
        }
    }

    if let Some(schema) = &detail.request_schema {
        println!("\n{}", "Request body:".bold());
        match serde_json::to_string_pretty(schema) {
            Ok(text) => {
                for line in text.lines() {
                    println!("  {}", line);
                }
            }
            Err(_) => println!("  {}", schema),
        }
    }
}

fn source_label(source: TierSource) -> &'static str {
    match source {
        TierSource::Rule => "risk rule",
        TierSource::Annotation => "x-risk-tier",
        TierSource::Method => "http method",
    }
}

/// `name (in, type, required)` for an OpenAPI parameter object
fn describe_parameter(parameter: &Value) -> String {
    let name = parameter["name"].as_str().unwrap_or("?");
    let mut facets = Vec::new();
    if let Some(location) = parameter["in"].as_str() {
        facets.push(location.to_string());
    }
    if let Some(kind) = parameter["schema"]["type"].as_str() {
        facets.push(kind.to_string());
    }
    if parameter["required"].as_bool().unwrap_or(false) {
        facets.push("required".to_string());
    }

    if facets.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, facets.join(", "))
    }
}
