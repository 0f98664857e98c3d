//! Request and response types for the chat completions API

use serde::{Deserialize, Serialize};

use crate::domain::models::Message;
use crate::domain::ports::{Completion, CompletionOptions};

/// Body of `POST /v1/chat/completions`
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// Model id, e.g. `gpt-3.5-turbo`
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    /// Number of choices to generate
    pub n: u8,
    pub temperature: f64,
}

impl<'a> ChatCompletionRequest<'a> {
    /// Request continuing `messages` with the given sampling options.
    pub fn new(model: &'a str, messages: &'a [Message], options: &CompletionOptions) -> Self {
        Self {
            model,
            messages: messages
                .iter()
                .map(|message| ChatMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            n: options.candidates,
            temperature: options.temperature,
        }
    }
}

/// Role/content pair as the API expects it
#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// Response body, reduced to the fields the harness reads
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// First choice's content; `None` when there are no choices at all.
    pub fn into_completion(self) -> Option<Completion> {
        let choice = self.choices.into_iter().next()?;
        Some(Completion {
            content: choice.message.and_then(|message| message.content),
        })
    }
}
