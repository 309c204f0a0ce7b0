use anyhow::Result;
use riskgate_core::Mode;
use serde::Serialize;

use crate::output::{emit, mode_label};
use crate::setup;

#[derive(Debug, Serialize)]
struct ModeReport {
    mode: Mode,
    config: String,
    allows: &'static str,
}

fn allows(mode: Mode) -> &'static str {
    match mode {
        Mode::Safe => "low-risk operations only",
        Mode::Unsafe => "medium and high-risk operations; extreme ones after confirmation",
    }
}

/// Show the mode a gateway built from this config starts in
///
/// The mode of a running gateway is process state; query `GET /mode` on
/// `riskgatectl serve` for that.
pub fn execute(config_path: Option<&str>, output: &str) -> Result<()> {
    let config = setup::load_config(config_path)?;
    let report = ModeReport {
        mode: config.spec.mode,
        config: config_path.unwrap_or("(defaults)").to_string(),
        allows: allows(config.spec.mode),
    };

    emit(&report, output, |report| {
        println!("Initial mode: {}", mode_label(report.mode));
        println!("  Allows:  {}", report.allows);
        println!("  Config:  {}", report.config);
    })
}
