//! CLI argument parsing with subcommand architecture.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "model-gateway", version, about = "Model request gateway")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway (default when no subcommand is given)
    Run(RunArgs),
    /// Load and validate a config file, then exit
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to config file
    #[arg(short, long, default_value = "config.yaml", env = "MODEL_GATEWAY_CONFIG")]
    pub config: String,

    /// Listen host
    #[arg(long, env = "MODEL_GATEWAY_HOST")]
    pub host: Option<String>,

    /// Listen port
    #[arg(long, env = "MODEL_GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Log level
    #[arg(long, default_value = "info", env = "MODEL_GATEWAY_LOG_LEVEL")]
    pub log_level: String,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            config: "config.yaml".to_string(),
            host: None,
            port: None,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to config file
    #[arg(short, long, default_value = "config.yaml", env = "MODEL_GATEWAY_CONFIG")]
    pub config: String,
}
