//! Output formatting for riskgatectl
//!
//! Commands render structured data as JSON or YAML, or as colored text for
//! a terminal.

use anyhow::{bail, Result};
use colored::{ColoredString, Colorize};
use riskgate_core::{Mode, RiskTier};
use serde::Serialize;

/// Output format selected with `-o`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Text,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "text" | "wide" => Ok(Self::Text),
            other => bail!("Unknown output format '{}' (expected json, yaml or text)", other),
        }
    }
}

/// Print `value` as JSON or YAML, or hand it to `text` for terminal output
pub fn emit<T, F>(value: &T, format: &str, text: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T),
{
    match OutputFormat::parse(format)? {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Text => text(value),
    }
    Ok(())
}

pub fn tier_label(tier: RiskTier) -> ColoredString {
    paint_tier(tier, &tier.to_string())
}

/// Color `label` the way `tier` is shown
pub fn paint_tier(tier: RiskTier, label: &str) -> ColoredString {
    match tier {
        RiskTier::Low => label.green(),
        RiskTier::Medium => label.yellow(),
        RiskTier::High => label.bright_red(),
        RiskTier::Extreme => label.red().bold(),
        RiskTier::Blocked => label.white().on_red().bold(),
    }
}

pub fn mode_label(mode: Mode) -> ColoredString {
    match mode {
        Mode::Safe => mode.to_string().green().bold(),
        Mode::Unsafe => mode.to_string().yellow().bold(),
    }
}

pub fn confirmation_label(required: bool) -> ColoredString {
    if required {
        "required".yellow()
    } else {
        "not required".dimmed()
    }
}

/// Table header with an underline of matching width
pub fn print_header(header: &str) {
    println!("{}", header.bold());
    println!("{}", "=".repeat(header.len()));
}
