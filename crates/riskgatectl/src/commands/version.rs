use anyhow::Result;
use riskgate_safety::{RiskRules, SpecIndex};

/// Print CLI, resource API and bundled catalog versions
pub fn execute() -> Result<()> {
    let bundled = SpecIndex::bundled(RiskRules::management_api())?;

    println!("riskgatectl {}", riskgate_core::VERSION);
    println!("API version: {}", riskgate_core::API_VERSION);
    println!(
        "Bundled catalog: {} {} ({} operations)",
        bundled.title(),
        bundled.version(),
        bundled.len()
    );
    Ok(())
}
