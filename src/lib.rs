//! Chatbot harness - automated conversation testing for chatbots
//!
//! A language model plays a customer described by a scenario prompt and talks
//! to a chatbot-under-test until it reports a mistake or a turn bound is hit.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Transcript, configuration, port traits and errors
//! - **Service Layer** (`services`): Retrying completion, termination policy,
//!   reply collection and the conversation orchestrator
//! - **Adapters** (`adapters`): Web messenger session and in-memory fakes
//! - **Infrastructure Layer** (`infrastructure`): Config loading, logging, OpenAI client
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatbot_harness::adapters::messenger::{MessengerSettings, WebMessengerSession};
//! use chatbot_harness::infrastructure::{ConfigLoader, OpenAiClientConfig, OpenAiCompletionClient};
//! use chatbot_harness::services::ConversationOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load(None)?;
//!     let client = OpenAiCompletionClient::with_config(OpenAiClientConfig::from_config(&config.completion)?)?;
//!     let session = WebMessengerSession::new(MessengerSettings::from_config(&config.session)?);
//!     let report = ConversationOrchestrator::from_config(&config, Arc::new(client), Arc::new(session))
//!         .run()
//!         .await?;
//!     println!("{}", report.reason);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{
    CompletionError, CompletionServiceError, ConfigError, HarnessError, HarnessResult,
    SessionError,
};
pub use domain::models::{Config, ConversationOutcome, Message, Role, RunReport, Transcript};
pub use domain::ports::{CompletionClient, MessagingSession};
pub use infrastructure::ConfigLoader;
pub use services::{
    ConversationOrchestrator, ResponseCollector, RetryingCompletionClient, TerminationPolicy,
};
