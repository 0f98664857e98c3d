//! Command-line interface.

pub mod commands;
pub mod output;
pub mod transcript;

use clap::{Parser, Subcommand};
use console::style;

use commands::config::ConfigArgs;
use commands::run::RunArgs;

/// Top-level command line
#[derive(Parser)]
#[command(name = "chatbot-harness")]
#[command(about = "Test a chatbot by letting a language model play the customer", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Run one simulated conversation against the configured deployment
    Run(RunArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Report a failed command and exit non-zero.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", style("Error:").red().bold());
    }
    std::process::exit(1)
}
