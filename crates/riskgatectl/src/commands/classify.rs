use anyhow::Result;
use colored::Colorize;
use riskgate_core::{HttpMethod, RiskTier};
use riskgate_safety::{ClassificationSource, RiskClassifier};
use riskgate_tools::tools::safety_rules::tier_policy;
use serde::Serialize;
use std::sync::Arc;

use crate::output::{confirmation_label, emit, tier_label};
use crate::setup;

#[derive(Debug, Serialize)]
struct ClassifyReport {
    method: HttpMethod,
    path: String,
    template: String,
    risk_tier: RiskTier,
    requires_confirmation: bool,
    source: ClassificationSource,
    policy: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

/// Classify one operation (classify <METHOD> <PATH>)
pub async fn execute(
    config: Option<&str>,
    method: HttpMethod,
    path: &str,
    output: &str,
) -> Result<()> {
    let config = setup::load_config(config)?;
    let classifier = RiskClassifier::new(Arc::new(setup::load_index(&config).await?));

    let classification = classifier.classify(method, path);
    let report = ClassifyReport {
        method,
        path: path.to_string(),
        template: classification.template(path).to_string(),
        risk_tier: classification.tier,
        requires_confirmation: classification.requires_confirmation,
        source: classification.source,
        policy: tier_policy(classification.tier),
        summary: classification
            .operation
            .as_ref()
            .and_then(|op| op.summary.clone()),
    };

    emit(&report, output, print_report)
}

fn print_report(report: &ClassifyReport) {
    println!(
        "{} {} -> {}",
        report.method.as_str().bold(),
        report.path,
        tier_label(report.risk_tier)
    );
    if report.template != report.path {
        println!("  Template:      {}", report.template);
    }
    if let Some(summary) = &report.summary {
        println!("  Summary:       {}", summary);
    }
    let source = match report.source {
        ClassificationSource::Catalog => "catalog",
        ClassificationSource::Rule => "risk rule (not in catalog)",
        ClassificationSource::Default => "default for method (not in catalog)",
    };
    println!("  Source:        {}", source);
    println!("  Confirmation:  {}", confirmation_label(report.requires_confirmation));
    println!("  Policy:        {}", report.policy);
}
