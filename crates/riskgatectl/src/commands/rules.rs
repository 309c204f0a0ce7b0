use anyhow::Result;
use colored::Colorize;
use riskgate_core::RiskTier;
use riskgate_safety::Gateway;
use riskgate_tools::tools::safety_rules::{safety_summary, tier_policy};

use crate::output::{emit, mode_label, paint_tier, print_header};
use crate::setup;

/// Show the tier policies, active risk rules and catalog counts
pub async fn execute(config: Option<&str>, output: &str) -> Result<()> {
    let config = setup::load_config(config)?;
    let gateway = setup::build_gateway(&config).await?;

    let summary = safety_summary(&gateway);
    emit(&summary, output, |_| print_rules(&gateway))
}

fn print_rules(gateway: &Gateway) {
    let index = gateway.index();

    println!("Mode: {}", mode_label(gateway.mode()));
    println!(
        "Confirmation TTL: {}s\n",
        gateway.ledger().ttl().num_seconds()
    );

    print_header(&format!("{:<9} {:>10}  {}", "TIER", "OPERATIONS", "POLICY"));
    for tier in [
        RiskTier::Low,
        RiskTier::Medium,
        RiskTier::High,
        RiskTier::Extreme,
        RiskTier::Blocked,
    ] {
        let count = index.entries().iter().filter(|e| e.risk_tier == tier).count();
        // Pad before coloring; ANSI codes would throw off the width
        let label = format!("{:<9}", tier.to_string());
        println!(
            "{} {:>10}  {}",
            paint_tier(tier, &label),
            count,
            tier_policy(tier)
        );
    }

    let rules = index.rules().rules();
    println!();
    print_header(&format!("{:<7} {:<60} {:<8} {}", "METHOD", "PATH", "TIER", "REASON"));
    for rule in rules {
        let label = format!("{:<8}", rule.tier.to_string());
        let confirm = if rule.requires_confirmation && rule.tier != RiskTier::Extreme {
            " [confirm]"
        } else {
            ""
        };
        println!(
            "{:<7} {:<60} {} {}{}",
            rule.method.as_str(),
            rule.path,
            paint_tier(rule.tier, &label),
            rule.reason.as_deref().unwrap_or("-"),
            confirm.yellow()
        );
    }
    println!("\n{} rules, {} catalog operations", rules.len(), index.len());
}
