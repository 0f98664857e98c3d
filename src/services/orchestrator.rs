//! Conversation orchestrator: owns the transcript and drives the turn loop.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::response_collector::ResponseCollector;
use super::retrying_completion::{RetryPolicy, RetryingCompletionClient};
use super::termination::TerminationPolicy;
use crate::domain::errors::HarnessResult;
use crate::domain::models::{Config, ConversationConfig, ConversationOutcome, Message, RunReport, Transcript};
use crate::domain::ports::{CompletionClient, MessagingSession};

/// Lifecycle of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Transcript seeded, session about to be opened
    Initializing,
    /// Generating, sending and collecting turn after turn
    Looping,
    /// Terminal
    Finished {
        /// Reason reported to the caller
        reason: String,
    },
}

/// Drives exactly one simulated conversation end-to-end.
///
/// Only one asynchronous operation is ever outstanding: a completion request
/// (including its retry delays) or a reply-collection window. The
/// termination policy is re-evaluated after each transcript mutation, and
/// once it reports `Ended` nothing further is generated or sent.
pub struct ConversationOrchestrator {
    completion: RetryingCompletionClient,
    session: Arc<dyn MessagingSession>,
    policy: TerminationPolicy,
    scenario_prompt: String,
    reply_timeout: Duration,
    run_deadline: Option<Duration>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ConversationOrchestrator {
    /// Orchestrator over ready-made collaborators; `config` supplies the
    /// scenario prompt, the reply window and the run deadline.
    pub fn new(
        completion: RetryingCompletionClient,
        session: Arc<dyn MessagingSession>,
        policy: TerminationPolicy,
        conversation: &ConversationConfig,
    ) -> Self {
        Self {
            completion,
            session,
            policy,
            scenario_prompt: conversation.scenario_prompt.clone(),
            reply_timeout: conversation.reply_timeout(),
            run_deadline: conversation.max_run_duration(),
            shutdown: None,
        }
    }

    /// Wire up the retrying client and termination policy described by `config`.
    pub fn from_config(
        config: &Config,
        client: Arc<dyn CompletionClient>,
        session: Arc<dyn MessagingSession>,
    ) -> Self {
        let completion = RetryingCompletionClient::new(
            client,
            RetryPolicy::from_config(&config.retry),
            config.completion.temperature,
        );
        Self::new(
            completion,
            session,
            TerminationPolicy::from_config(&config.conversation),
            &config.conversation,
        )
    }

    /// Stop between turns once `shutdown` flips to `true`.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Run the conversation to its end.
    ///
    /// The session is closed on every exit path. A `CompletionError` is not
    /// retried here and aborts the run.
    #[instrument(skip(self), name = "conversation")]
    pub async fn run(self) -> HarnessResult<RunReport> {
        let started = Instant::now();
        let mut transcript = Transcript::new(self.scenario_prompt.clone());
        let mut collector = ResponseCollector::new(self.session.as_ref());

        let result = self.drive(&mut transcript, &mut collector, started).await;

        if let Err(err) = self.session.close().await {
            warn!(error = %err, "failed to close messaging session");
        }

        let reason = result?;
        info!(
            %reason,
            turns = transcript.simulated_turns(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "conversation finished"
        );

        Ok(RunReport {
            reason,
            turns: transcript.simulated_turns(),
            transcript,
        })
    }

    async fn drive(
        &self,
        transcript: &mut Transcript,
        collector: &mut ResponseCollector,
        started: Instant,
    ) -> HarnessResult<String> {
        let mut state = RunState::Initializing;

        loop {
            state = match state {
                RunState::Initializing => {
                    self.session.open().await?;
                    debug!("messaging session opened");
                    RunState::Looping
                }
                RunState::Looping => {
                    if let Some(reason) = self.interruption(started) {
                        RunState::Finished { reason }
                    } else {
                        match self.play_turn(transcript, collector).await? {
                            ConversationOutcome::Ongoing => RunState::Looping,
                            ConversationOutcome::Ended { reason } => RunState::Finished { reason },
                        }
                    }
                }
                RunState::Finished { reason } => return Ok(reason),
            };
        }
    }

    /// One generate-and-exchange cycle.
    async fn play_turn(
        &self,
        transcript: &mut Transcript,
        collector: &mut ResponseCollector,
    ) -> HarnessResult<ConversationOutcome> {
        let turn = transcript.simulated_turns() + 1;

        let message = self.completion.generate_next(transcript).await?;
        let text = message.content.clone();
        info!(turn, role = %message.role, content = %text, "simulated user message");
        transcript.push(message);

        let outcome = self.policy.evaluate(transcript);
        if outcome.has_ended() {
            return Ok(outcome);
        }

        let discarded = collector.discard_pending();
        if discarded > 0 {
            debug!(turn, discarded, "dropped late replies from a previous turn");
        }

        if text.is_empty() {
            debug!(turn, "completion produced no content, nothing to send");
        } else {
            self.session.send(&text).await?;
        }

        let replies = collector.collect(self.reply_timeout).await;
        let reply = replies.join("\n");
        info!(turn, replies = replies.len(), content = %reply, "chatbot reply");
        transcript.push(Message::user(reply));

        Ok(self.policy.evaluate(transcript))
    }

    /// Run-level deadline or cancellation, checked between turns only.
    fn interruption(&self, started: Instant) -> Option<String> {
        if self.shutdown.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some("Run cancelled before the conversation ended".to_string());
        }
        self.run_deadline
            .filter(|deadline| started.elapsed() >= *deadline)
            .map(|deadline| format!("Run deadline of {}s exceeded", deadline.as_secs()))
    }
}
