//! Completion service port - the simulated user's voice.

use async_trait::async_trait;

use crate::domain::errors::CompletionServiceError;
use crate::domain::models::Message;

/// Sampling options for a single completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Sampling temperature (0.0 to 1.0)
    pub temperature: f64,
    /// Number of candidates requested; the harness always asks for one
    pub candidates: u8,
}

impl CompletionOptions {
    /// Options for a single candidate at `temperature`.
    pub const fn with_temperature(temperature: f64) -> Self {
        Self {
            temperature,
            candidates: 1,
        }
    }
}

/// Generated continuation of the transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// `None` when the service answered without any message content
    pub content: Option<String>,
}

impl Completion {
    /// A completion carrying `content`.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
        }
    }

    /// A completion without message content.
    pub const fn empty() -> Self {
        Self { content: None }
    }
}

/// Port trait for a chat completion service.
///
/// Implementations perform exactly one request per call and classify the
/// failure; retrying is the caller's job.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Ask the service to continue `messages`, using the full transcript as context.
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion, CompletionServiceError>;
}
