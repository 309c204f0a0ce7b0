use clap::{Parser, Subcommand};
use riskgate_core::{HttpMethod, Mode};

use crate::commands;

/// riskgate CLI - risk-gated access to a management API
#[derive(Parser, Debug)]
#[command(name = "riskgatectl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Gateway configuration file (GatewayConfig YAML)
    ///
    /// Without a config file the bundled catalog, built-in risk rules and
    /// default settings are used.
    #[arg(long, short = 'c', global = true, env = "RISKGATE_CONFIG")]
    pub config: Option<String>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the gateway over HTTP
    Serve {
        /// Port to listen on (overrides spec.server.port)
        #[arg(short, long, env = "RISKGATE_PORT")]
        port: Option<u16>,

        /// Host to bind (overrides spec.server.host)
        #[arg(long, env = "RISKGATE_HOST")]
        host: Option<String>,

        /// Initial mode (overrides spec.mode)
        #[arg(long, env = "RISKGATE_MODE")]
        mode: Option<Mode>,

        /// Management API access token (overrides spec.api.accessToken)
        #[arg(long, env = "RISKGATE_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,
    },

    /// Query the API catalog (domains, a domain, a path or one operation)
    Spec {
        /// Path template or concrete path
        path: Option<String>,

        /// HTTP method; with a path selects a single operation
        #[arg(short, long)]
        method: Option<HttpMethod>,

        /// List the operations of one domain
        #[arg(short, long)]
        domain: Option<String>,

        /// List every operation in the catalog
        #[arg(long)]
        all_paths: bool,

        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Show the risk tier of an operation
    Classify {
        /// HTTP method
        method: HttpMethod,

        /// Path template or concrete path
        path: String,

        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Show the tier policies and active risk rules
    Rules {
        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Show the configured initial mode
    Mode {
        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Show version information
    Version,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: commands::completion::Shell,
    },
}

impl Cli {
    pub async fn execute(self) -> anyhow::Result<()> {
        let config = self.config.as_deref();

        match self.command {
            Commands::Serve {
                port,
                host,
                mode,
                access_token,
            } => {
                let overrides = commands::serve::ServeOverrides {
                    port,
                    host,
                    mode,
                    access_token,
                };
                commands::serve::execute(config, overrides).await
            }
            Commands::Spec {
                path,
                method,
                domain,
                all_paths,
                output,
            } => {
                commands::spec::execute(config, path, method, domain, all_paths, &output).await
            }
            Commands::Classify {
                method,
                path,
                output,
            } => commands::classify::execute(config, method, &path, &output).await,
            Commands::Rules { output } => commands::rules::execute(config, &output).await,
            Commands::Mode { output } => commands::mode::execute(config, &output),
            Commands::Version => commands::version::execute(),
            Commands::Completion { shell } => commands::completion::execute(shell),
        }
    }
}
