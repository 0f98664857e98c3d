//! In-memory collaborators for driving the harness without a network.

pub mod completion;
pub mod session;

pub use completion::{RecordedRequest, ScriptedCompletionClient};
pub use session::{InMemorySession, ScriptedReplies};
