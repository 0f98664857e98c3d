//! Implementation of the `chatbot-harness run` command.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use serde::Serialize;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapters::messenger::{MessengerSettings, WebMessengerSession};
use crate::cli::output::{output, CommandOutput};
use crate::cli::transcript::TranscriptPrinter;
use crate::domain::models::{Config, RunReport};
use crate::domain::ports::MessagingSession;
use crate::infrastructure::{ConfigLoader, LoggerImpl, OpenAiClientConfig, OpenAiCompletionClient};
use crate::services::{
    ConversationOrchestrator, RetryNotice, RetryPolicy, RetryingCompletionClient,
    TerminationPolicy,
};

/// Exit status after a forced interrupt (128 + SIGINT)
const FORCED_EXIT_CODE: i32 = 130;

/// Arguments for `chatbot-harness run`
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Configuration file (defaults to ./harness.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Read the scenario prompt from a file
    #[arg(short, long)]
    pub scenario_file: Option<PathBuf>,

    /// Override the maximum number of turns
    #[arg(short, long)]
    pub max_turns: Option<usize>,
}

/// Final report as printed by `run`
#[derive(Debug, Serialize)]
pub struct RunOutput {
    /// Outcome of the conversation
    #[serde(flatten)]
    pub report: RunReport,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        [
            style("-".repeat(60)).dim().to_string(),
            format!("{} {}", style("Conversation ended:").bold(), self.report.reason),
            format!("Turns: {}", self.report.turns),
        ]
        .join("\n")
    }
}

/// How the interrupt watcher stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Signal handling could not be installed
    Unavailable,
    /// First interrupt delivered; no second one could be awaited
    Graceful,
    /// Interrupted again while the run was winding down
    Forced,
}

/// Request a graceful stop on the first interrupt, report a forced one on the second.
async fn watch_interrupts<F, Fut>(mut interrupted: F, shutdown: watch::Sender<bool>) -> Interrupt
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(err) = interrupted().await {
        warn!(error = %err, "interrupt handling unavailable");
        return Interrupt::Unavailable;
    }
    warn!("interrupt received, stopping after the current turn; press Ctrl-C again to abort");
    let _ = shutdown.send(true);

    match interrupted().await {
        Ok(()) => Interrupt::Forced,
        Err(_) => Interrupt::Graceful,
    }
}

/// Apply command-line overrides on top of the loaded configuration.
async fn apply_overrides(config: &mut Config, args: &RunArgs) -> Result<()> {
    if let Some(path) = &args.scenario_file {
        config.conversation.scenario_prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    }
    if let Some(max_turns) = args.max_turns {
        config.conversation.max_turns = max_turns;
    }
    ConfigLoader::validate(config)?;
    Ok(())
}

/// Run one conversation against the configured deployment and print the report.
pub async fn execute(args: RunArgs, json_mode: bool) -> Result<()> {
    let mut config = ConfigLoader::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args).await?;
    let _logger = LoggerImpl::init(&config.logging)?;

    let client = OpenAiCompletionClient::with_config(OpenAiClientConfig::from_config(
        &config.completion,
    )?)?;
    info!(model = client.model(), "completion client ready");

    let completion = RetryingCompletionClient::new(
        Arc::new(client),
        RetryPolicy::from_config(&config.retry),
        config.completion.temperature,
    )
    .with_observer(Arc::new(move |notice: &RetryNotice| {
        if !json_mode {
            eprintln!(
                "{}",
                style(format!(
                    "{}: Retrying ({} of {})",
                    notice.reason, notice.attempt, notice.max_attempts
                ))
                .yellow()
            );
        }
    }));

    let session: Arc<dyn MessagingSession> =
        Arc::new(WebMessengerSession::new(MessengerSettings::from_config(&config.session)?));
    let printer = (!json_mode).then(|| TranscriptPrinter::spawn(session.subscribe()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, shutdown_tx).await == Interrupt::Forced {
            eprintln!("{}", style("Interrupted").red().bold());
            std::process::exit(FORCED_EXIT_CODE);
        }
    });

    let result = ConversationOrchestrator::new(
        completion,
        session,
        TerminationPolicy::from_config(&config.conversation),
        &config.conversation,
    )
    .with_shutdown(shutdown_rx)
    .run()
    .await;

    interrupt.abort();
    if let Some(printer) = printer {
        printer.finish().await;
    }

    output(&RunOutput { report: result? }, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn loaded_config() -> Config {
        let mut config = Config::default();
        config.session.deployment_id = Some("deployment-1".to_string());
        config.session.region = Some("mypurecloud.com".to_string());
        config.completion.api_key = Some("sk-test".to_string());
        config
    }

    #[tokio::test]
    async fn test_overrides_replace_prompt_and_turns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Act as a customer returning a faulty phone").unwrap();

        let mut config = loaded_config();
        let args = RunArgs {
            scenario_file: Some(file.path().to_path_buf()),
            max_turns: Some(3),
            ..Default::default()
        };
        apply_overrides(&mut config, &args).await.unwrap();

        assert_eq!(
            config.conversation.scenario_prompt,
            "Act as a customer returning a faulty phone"
        );
        assert_eq!(config.conversation.max_turns, 3);
    }

    #[tokio::test]
    async fn test_overrides_are_validated() {
        let mut config = loaded_config();
        let args = RunArgs {
            max_turns: Some(0),
            ..Default::default()
        };
        assert!(apply_overrides(&mut config, &args).await.is_err());
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_exit() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let outcome = watch_interrupts(|| async { Ok::<(), io::Error>(()) }, shutdown_tx).await;

        assert_eq!(outcome, Interrupt::Forced);
        assert!(*shutdown_rx.borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_interrupt_only_requests_shutdown() {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let mut delivered = 0;
        let interrupts = move || {
            delivered += 1;
            let first = delivered == 1;
            async move {
                if !first {
                    std::future::pending::<()>().await;
                }
                Ok::<(), io::Error>(())
            }
        };

        let watcher = tokio::spawn(watch_interrupts(interrupts, shutdown_tx));
        shutdown_rx.changed().await.unwrap();
        assert!(*shutdown_rx.borrow());

        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        assert!(!watcher.is_finished());
        watcher.abort();
    }

    #[tokio::test]
    async fn test_unavailable_signal_handler_leaves_run_alone() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let outcome = watch_interrupts(
            || async { Err(io::Error::new(io::ErrorKind::Unsupported, "no signals")) },
            shutdown_tx,
        )
        .await;

        assert_eq!(outcome, Interrupt::Unavailable);
        assert!(!*shutdown_rx.borrow());
    }

    #[tokio::test]
    async fn test_missing_scenario_file_is_reported() {
        let mut config = loaded_config();
        let args = RunArgs {
            scenario_file: Some(PathBuf::from("/nonexistent/scenario.txt")),
            ..Default::default()
        };
        let err = apply_overrides(&mut config, &args).await.unwrap_err();
        assert!(err.to_string().contains("scenario file"));
    }
}
