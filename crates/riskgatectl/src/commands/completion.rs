//! Shell completion generation for riskgatectl
//!
//! - riskgatectl completion bash > /etc/bash_completion.d/riskgatectl
//! - riskgatectl completion zsh  > ~/.zsh/completion/_riskgatectl
//! - riskgatectl completion fish > ~/.config/fish/completions/riskgatectl.fish

use anyhow::Result;
use clap::{CommandFactory, ValueEnum};
use clap_complete::{generate, Shell as ClapShell};
use std::io;

use crate::cli::Cli;

/// Supported shells for completion
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl From<Shell> for ClapShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => ClapShell::Bash,
            Shell::Zsh => ClapShell::Zsh,
            Shell::Fish => ClapShell::Fish,
            Shell::Powershell => ClapShell::PowerShell,
        }
    }
}

fn install_hint(shell: Shell) -> &'static str {
    match shell {
        Shell::Bash => "riskgatectl completion bash > /etc/bash_completion.d/riskgatectl",
        Shell::Zsh => "riskgatectl completion zsh > \"${fpath[1]}/_riskgatectl\"",
        Shell::Fish => {
            "riskgatectl completion fish > ~/.config/fish/completions/riskgatectl.fish"
        }
        Shell::Powershell => "riskgatectl completion powershell >> $PROFILE",
    }
}

/// Write the completion script to stdout; the install hint goes to stderr
pub fn execute(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(ClapShell::from(shell), &mut cmd, name, &mut io::stdout());

    eprintln!();
    eprintln!("# Install with:");
    eprintln!("#    {}", install_hint(shell));
    Ok(())
}
