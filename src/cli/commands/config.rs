//! Implementation of the `chatbot-harness config` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::ConfigLoader;

/// Arguments for `chatbot-harness config`
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Configuration file (defaults to ./harness.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Effective configuration with secrets masked.
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    /// Merged configuration
    #[serde(flatten)]
    pub config: Config,
}

impl ConfigOutput {
    /// Wrap `config`, replacing the API key with a placeholder.
    pub fn redacted(mut config: Config) -> Self {
        if config.completion.api_key.is_some() {
            config.completion.api_key = Some("[REDACTED]".to_string());
        }
        Self { config }
    }
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }
}

/// Print the effective configuration.
pub fn execute(args: &ConfigArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load(args.config.as_deref())?;
    output(&ConfigOutput::redacted(config), json_mode);
    Ok(())
}
