//! Core harness services: completion retries, termination, reply collection
//! and the orchestrator that ties them together.

pub mod orchestrator;
pub mod response_collector;
pub mod retrying_completion;
pub mod termination;

pub use orchestrator::{ConversationOrchestrator, RunState};
pub use response_collector::ResponseCollector;
pub use retrying_completion::{RetryNotice, RetryObserver, RetryPolicy, RetryingCompletionClient};
pub use termination::{MaxTurnsRule, SentinelRule, TerminationPolicy, TerminationRule};
