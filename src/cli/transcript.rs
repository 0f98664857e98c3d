//! Live print-out of the conversation as it happens.

use console::style;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::domain::ports::{Speaker, TranscriptSubscription};

/// Prints every transcribed message on stdout until dropped or finished.
pub struct TranscriptPrinter {
    handle: JoinHandle<()>,
}

impl TranscriptPrinter {
    /// Start printing events from `events` in a background task.
    pub fn spawn(mut events: TranscriptSubscription) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => println!("{}", format_line(event.speaker, &event.text)),
                    Err(RecvError::Lagged(skipped)) => {
                        eprintln!("{}", style(format!("({skipped} messages not shown)")).dim());
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Self { handle }
    }

    /// Stop printing. Messages still in flight are dropped.
    pub async fn finish(self) {
        tokio::task::yield_now().await;
        self.handle.abort();
        let _ = self.handle.await;
    }
}

fn format_line(speaker: Speaker, text: &str) -> String {
    match speaker {
        Speaker::Harness => format!("{} {text}", style("Simulated user:").green().bold()),
        Speaker::Counterpart => format!("{} {text}", style("Chatbot:").bold()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_labelled_by_speaker() {
        let user = console::strip_ansi_codes(&format_line(Speaker::Harness, "Hello")).to_string();
        let bot = console::strip_ansi_codes(&format_line(Speaker::Counterpart, "Hi!")).to_string();
        assert_eq!(user, "Simulated user: Hello");
        assert_eq!(bot, "Chatbot: Hi!");
    }
}
