//! Infrastructure layer: configuration, logging and the HTTP completion client.

pub mod config;
pub mod logging;
pub mod openai;

pub use config::ConfigLoader;
pub use logging::LoggerImpl;
pub use openai::{OpenAiClientConfig, OpenAiCompletionClient};
