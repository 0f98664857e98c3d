//! Port interfaces for the external collaborators of a harness run.

pub mod completion;
pub mod session;

pub use completion::{Completion, CompletionClient, CompletionOptions};
pub use session::{MessagingSession, Speaker, TranscriptEvent, TranscriptSubscription};
