//! In-memory messaging session for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

use crate::domain::errors::SessionError;
use crate::domain::ports::{MessagingSession, TranscriptEvent, TranscriptSubscription};

/// Replies the fake bot produces for one inbound message.
///
/// Each reply is published after its delay, measured from the moment the
/// message was sent.
#[derive(Debug, Clone, Default)]
pub struct ScriptedReplies {
    /// Delay and text of each reply, in publishing order
    pub replies: Vec<(Duration, String)>,
}

impl ScriptedReplies {
    /// The bot stays silent.
    pub fn none() -> Self {
        Self::default()
    }

    /// Add a reply published `delay` after the message is sent.
    pub fn after(mut self, delay: Duration, text: impl Into<String>) -> Self {
        self.replies.push((delay, text.into()));
        self
    }

    /// A single reply with no delay.
    pub fn immediately(text: impl Into<String>) -> Self {
        Self::none().after(Duration::ZERO, text)
    }
}

/// Session backed by a broadcast channel and a queue of scripted bot replies.
pub struct InMemorySession {
    events: broadcast::Sender<TranscriptEvent>,
    replies: RwLock<VecDeque<ScriptedReplies>>,
    sent: RwLock<Vec<String>>,
    open: AtomicBool,
    open_calls: AtomicUsize,
    close_calls: AtomicUsize,
    fail_open: bool,
}

impl InMemorySession {
    /// Closed session with no scripted replies.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            replies: RwLock::new(VecDeque::new()),
            sent: RwLock::new(Vec::new()),
            open: AtomicBool::new(false),
            open_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            fail_open: false,
        }
    }

    /// Queue the bot's answer to the next message sent.
    pub fn then_replies(mut self, replies: ScriptedReplies) -> Self {
        self.replies.get_mut().push_back(replies);
        self
    }

    /// Make `open()` fail with a connection error.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Messages sent by the harness, oldest first.
    pub async fn sent(&self) -> Vec<String> {
        self.sent.read().await.clone()
    }

    /// Whether `open` succeeded and `close` has not been called since.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Times `open` was called, including failed calls.
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// Times `close` was called.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl Default for InMemorySession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingSession for InMemorySession {
    async fn open(&self) -> Result<(), SessionError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(SessionError::Connect("scripted connection failure".to_string()));
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<(), SessionError> {
        if !self.is_open() {
            return Err(SessionError::Closed);
        }

        self.sent.write().await.push(text.to_string());
        let _ = self.events.send(TranscriptEvent::harness(text));

        let scripted = self.replies.write().await.pop_front().unwrap_or_default();
        for (delay, reply) in scripted.replies {
            let events = self.events.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = events.send(TranscriptEvent::counterpart(reply));
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> TranscriptSubscription {
        self.events.subscribe()
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}
