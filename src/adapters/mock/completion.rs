//! Scripted completion client for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::RwLock;

use crate::domain::errors::CompletionServiceError;
use crate::domain::models::Message;
use crate::domain::ports::{Completion, CompletionClient, CompletionOptions};

type ScriptedResult = Result<Completion, CompletionServiceError>;

/// A completion request as seen by the scripted client.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Transcript sent as context
    pub messages: Vec<Message>,
    /// Sampling options sent alongside
    pub options: CompletionOptions,
}

/// Completion client that replays a fixed script of responses.
///
/// Each call pops the next scripted result. Once the script runs out the
/// fallback is returned, or an upstream error when no fallback is set.
pub struct ScriptedCompletionClient {
    script: RwLock<VecDeque<ScriptedResult>>,
    fallback: Option<ScriptedResult>,
    requests: RwLock<Vec<RecordedRequest>>,
}

impl ScriptedCompletionClient {
    /// Client with an empty script and no fallback.
    pub fn new() -> Self {
        Self {
            script: RwLock::new(VecDeque::new()),
            fallback: None,
            requests: RwLock::new(Vec::new()),
        }
    }

    fn push(mut self, result: ScriptedResult) -> Self {
        self.script.get_mut().push_back(result);
        self
    }

    /// Next call produces `text`.
    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(Completion::text(text)))
    }

    /// Next call succeeds without any message content.
    pub fn then_empty(self) -> Self {
        self.push(Ok(Completion::empty()))
    }

    /// Next `count` calls are rejected with HTTP 429.
    pub fn then_rate_limited(mut self, count: usize) -> Self {
        for _ in 0..count {
            self = self.push(Err(rate_limited()));
        }
        self
    }

    /// Next call fails with `error`.
    pub fn then_fail(self, error: CompletionServiceError) -> Self {
        self.push(Err(error))
    }

    /// Result returned once the script is exhausted.
    pub fn otherwise(mut self, result: ScriptedResult) -> Self {
        self.fallback = Some(result);
        self
    }

    /// Every call is rejected with HTTP 429.
    pub fn always_rate_limited() -> Self {
        Self::new().otherwise(Err(rate_limited()))
    }

    /// Number of requests received so far.
    pub async fn calls(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }
}

impl Default for ScriptedCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

fn rate_limited() -> CompletionServiceError {
    CompletionServiceError::RateLimited {
        status: 429,
        reason: "Too Many Requests".to_string(),
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion, CompletionServiceError> {
        self.requests.write().await.push(RecordedRequest {
            messages: messages.to_vec(),
            options: *options,
        });

        let next = self.script.write().await.pop_front();
        next.or_else(|| self.fallback.clone()).unwrap_or_else(|| {
            Err(CompletionServiceError::Upstream {
                status: 500,
                reason: "completion script exhausted".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_is_replayed_in_order() {
        let client = ScriptedCompletionClient::new()
            .then_rate_limited(1)
            .then_reply("hello")
            .then_empty();
        let options = CompletionOptions::with_temperature(0.6);

        assert!(matches!(
            client.complete(&[], &options).await,
            Err(CompletionServiceError::RateLimited { status: 429, .. })
        ));
        assert_eq!(
            client.complete(&[], &options).await.unwrap(),
            Completion::text("hello")
        );
        assert_eq!(
            client.complete(&[], &options).await.unwrap(),
            Completion::empty()
        );
        assert!(matches!(
            client.complete(&[], &options).await,
            Err(CompletionServiceError::Upstream { status: 500, .. })
        ));
        assert_eq!(client.calls().await, 4);
    }

    #[tokio::test]
    async fn test_fallback_repeats_forever() {
        let client = ScriptedCompletionClient::always_rate_limited();
        let options = CompletionOptions::with_temperature(0.0);
        for _ in 0..5 {
            assert!(client.complete(&[], &options).await.is_err());
        }
        assert_eq!(client.calls().await, 5);
    }

    #[tokio::test]
    async fn test_requests_are_recorded() {
        let client = ScriptedCompletionClient::new().then_reply("hi");
        let messages = vec![Message::system("prompt")];
        client
            .complete(&messages, &CompletionOptions::with_temperature(0.3))
            .await
            .unwrap();

        let requests = client.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages, messages);
        assert_eq!(requests[0].options.candidates, 1);
    }
}
