//! HTTP client for `/v1/chat/completions`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::domain::errors::{CompletionServiceError, ConfigError};
use crate::domain::models::config::CompletionConfig;
use crate::domain::models::Message;
use crate::domain::ports::{Completion, CompletionClient, CompletionOptions};

/// Configuration for the chat completions client
#[derive(Clone)]
pub struct OpenAiClientConfig {
    /// Bearer token; never printed
    pub api_key: String,
    /// Scheme and host, without the `/v1/...` path
    pub base_url: String,
    /// Model impersonating the user
    pub model: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl OpenAiClientConfig {
    /// Client settings from the `completion` config section.
    ///
    /// # Errors
    /// Returns `MissingRequired` when no API key is configured.
    pub fn from_config(config: &CompletionConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired(vec!["completion.api_key"]))?;

        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }
}

impl fmt::Debug for OpenAiClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClientConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// HTTP client for an OpenAI-compatible chat completions endpoint
///
/// One call is one request. Rate limiting surfaces as
/// [`CompletionServiceError::RateLimited`] for the caller to back off on.
pub struct OpenAiCompletionClient {
    /// Reusable HTTP client with connection pooling
    http_client: ReqwestClient,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiCompletionClient {
    /// Build the client and its connection pool.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_config(config: OpenAiClientConfig) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            api_key: config.api_key,
            endpoint: format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model,
        })
    }

    /// Model sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(
        &self,
        request: &ChatCompletionRequest<'_>,
    ) -> Result<ChatCompletionResponse, CompletionServiceError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| CompletionServiceError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(classify_status(status, body));
        }

        let body = response
            .text()
            .await
            .map_err(|err| CompletionServiceError::Transport(err.to_string()))?;

        serde_json::from_str(&body).map_err(|err| CompletionServiceError::Malformed(err.to_string()))
    }
}

/// Map a non-success status to the error taxonomy.
fn classify_status(status: StatusCode, body: String) -> CompletionServiceError {
    let reason = status.canonical_reason().unwrap_or("Unknown Status").to_string();
    match status {
        StatusCode::TOO_MANY_REQUESTS => CompletionServiceError::RateLimited {
            status: status.as_u16(),
            reason,
        },
        _ => CompletionServiceError::Upstream {
            status: status.as_u16(),
            reason: if body.trim().is_empty() { reason } else { body },
        },
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion, CompletionServiceError> {
        let request = ChatCompletionRequest::new(&self.model, messages, options);
        let response = self.send_request(&request).await?;
        debug!(id = ?response.id, "completion received");

        response.into_completion().ok_or_else(|| {
            CompletionServiceError::Malformed("response contained no choices".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_status_is_retryable() {
        let error = classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down".to_string());
        assert_eq!(
            error,
            CompletionServiceError::RateLimited {
                status: 429,
                reason: "Too Many Requests".to_string()
            }
        );
        assert!(error.is_retryable());
    }

    #[test]
    fn test_other_statuses_keep_body_as_detail() {
        let error = classify_status(StatusCode::UNAUTHORIZED, r#"{"error":"bad key"}"#.to_string());
        assert_eq!(error.status(), Some(401));
        assert!(!error.is_retryable());
        assert!(error.to_string().contains("bad key"));

        let error = classify_status(StatusCode::BAD_GATEWAY, String::new());
        assert!(error.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_config_requires_api_key() {
        let config = CompletionConfig::default();
        assert!(matches!(
            OpenAiClientConfig::from_config(&config),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_endpoint_ignores_trailing_slash() {
        let client = OpenAiCompletionClient::with_config(OpenAiClientConfig {
            api_key: "sk-test".to_string(),
            base_url: "http://localhost:8080/".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.endpoint, "http://localhost:8080/v1/chat/completions");
        assert!(!format!("{:?}", OpenAiClientConfig {
            api_key: "sk-secret".to_string(),
            base_url: String::new(),
            model: String::new(),
            timeout_secs: 1,
        })
        .contains("sk-secret"));
    }
}
