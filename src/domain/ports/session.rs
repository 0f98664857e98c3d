//! Messaging session port - the channel to the bot-under-test.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::errors::SessionError;

/// Who authored a transcribed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// Echo of a message the harness sent
    Harness,
    /// Reply from the bot-under-test
    Counterpart,
}

/// A message observed on the session, in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEvent {
    /// Who wrote it
    pub speaker: Speaker,
    /// Message text as transcribed
    pub text: String,
    /// When the harness observed it
    pub received_at: DateTime<Utc>,
}

impl TranscriptEvent {
    /// A reply from the bot-under-test, observed now.
    pub fn counterpart(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Counterpart,
            text: text.into(),
            received_at: Utc::now(),
        }
    }

    /// An echo of the harness's own message, observed now.
    pub fn harness(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Harness,
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// Push-based stream of transcript events. Dropping it unsubscribes.
pub type TranscriptSubscription = broadcast::Receiver<TranscriptEvent>;

/// Port trait for a messaging session with the bot-under-test.
#[async_trait]
pub trait MessagingSession: Send + Sync {
    /// Connect and start a new guest conversation.
    async fn open(&self) -> Result<(), SessionError>;

    /// Send a text message as the guest.
    async fn send(&self, text: &str) -> Result<(), SessionError>;

    /// Subscribe to every message transcribed from now on.
    fn subscribe(&self) -> TranscriptSubscription;

    /// Release the session. Calling it on a closed session is a no-op.
    async fn close(&self) -> Result<(), SessionError>;
}
