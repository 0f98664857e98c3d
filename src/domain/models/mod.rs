//! Domain models for the conversation harness.

pub mod config;
pub mod message;
pub mod outcome;

pub use config::{
    CompletionConfig, Config, ConversationConfig, LogFormat, LoggingConfig, MatchStrategy,
    RetryConfig, RotationPolicy, SentinelConfig, SessionConfig, DEFAULT_SCENARIO_PROMPT,
};
pub use message::{Message, Role, Transcript};
pub use outcome::{ConversationOutcome, RunReport};
