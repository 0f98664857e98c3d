//! Chatbot harness CLI entry point.

use clap::Parser;

use chatbot_harness::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => chatbot_harness::cli::commands::run::execute(args, cli.json).await,
        Commands::Config(args) => chatbot_harness::cli::commands::config::execute(&args, cli.json),
    };

    if let Err(err) = result {
        chatbot_harness::cli::handle_error(&err, cli.json);
    }
}
