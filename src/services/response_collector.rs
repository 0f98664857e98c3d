//! Gathers the counterpart's replies within a fixed quiescence window.

use std::time::Duration;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::ports::{MessagingSession, Speaker, TranscriptSubscription};

/// Bridges the session's push-based transcript stream into a bounded wait.
///
/// The subscription is taken when the collector is created, so replies that
/// arrive between sending a message and calling [`collect`](Self::collect)
/// are not lost.
pub struct ResponseCollector {
    subscription: TranscriptSubscription,
}

impl ResponseCollector {
    /// Subscribe to `session` right away.
    pub fn new(session: &dyn MessagingSession) -> Self {
        Self::from_subscription(session.subscribe())
    }

    /// Collect from an existing subscription.
    pub const fn from_subscription(subscription: TranscriptSubscription) -> Self {
        Self { subscription }
    }

    /// Drop everything buffered so far, e.g. late replies to an earlier turn.
    ///
    /// Returns how many counterpart replies were discarded.
    pub fn discard_pending(&mut self) -> usize {
        let mut discarded = 0;
        loop {
            match self.subscription.try_recv() {
                Ok(event) if event.speaker == Speaker::Counterpart => {
                    debug!(text = %event.text, "discarding late counterpart reply");
                    discarded += 1;
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    discarded += usize::try_from(skipped).unwrap_or(usize::MAX);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        discarded
    }

    /// Wait for `timeout` and return every counterpart reply received, in arrival order.
    ///
    /// Echoes of the harness's own messages are skipped. Never fails: an empty
    /// vector means nothing arrived before the window elapsed.
    pub async fn collect(&mut self, timeout: Duration) -> Vec<String> {
        let window = sleep(timeout);
        tokio::pin!(window);

        let mut replies = Vec::new();
        let mut listening = true;

        loop {
            tokio::select! {
                () = &mut window => break,
                event = self.subscription.recv(), if listening => match event {
                    Ok(event) if event.speaker == Speaker::Counterpart => {
                        debug!(text = %event.text, "collected counterpart reply");
                        replies.push(event.text);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "transcript subscription lagged, replies were dropped");
                    }
                    Err(RecvError::Closed) => {
                        // Keep waiting out the window so the caller resumes on schedule.
                        listening = false;
                    }
                },
            }
        }

        debug!(count = replies.len(), ?timeout, "reply collection window closed");
        replies
    }
}
