//! OpenAI-compatible chat completion client
//!
//! Speaks `POST /v1/chat/completions` and classifies every failure into a
//! [`CompletionServiceError`](crate::domain::errors::CompletionServiceError).
//! Retrying is left to the caller.

pub mod client;
mod types;

pub use client::{OpenAiClientConfig, OpenAiCompletionClient};
