//! Integration tests for the chat completions client against a mock server.

use std::sync::Arc;
use std::time::Duration;

use chatbot_harness::domain::errors::{CompletionError, CompletionServiceError};
use chatbot_harness::domain::models::{Message, Transcript};
use chatbot_harness::domain::ports::{CompletionClient, CompletionOptions};
use chatbot_harness::infrastructure::{OpenAiClientConfig, OpenAiCompletionClient};
use chatbot_harness::services::{RetryPolicy, RetryingCompletionClient};
use mockito::{Matcher, Server};

fn client_for(server: &Server) -> OpenAiCompletionClient {
    OpenAiCompletionClient::with_config(OpenAiClientConfig {
        api_key: "sk-test".to_string(),
        base_url: server.url(),
        model: "gpt-3.5-turbo".to_string(),
        timeout_secs: 5,
    })
    .expect("Failed to create client")
}

fn transcript() -> Vec<Message> {
    vec![
        Message::system("Act as a customer"),
        Message::assistant("Hello"),
        Message::user("Hi, how can I help?"),
    ]
}

fn completion_body(content: &serde_json::Value) -> String {
    serde_json::json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "model": "gpt-3.5-turbo",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 20, "completion_tokens": 5, "total_tokens": 25}
    })
    .to_string()
}

#[tokio::test]
async fn test_completion_success() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "gpt-3.5-turbo",
            "n": 1,
            "temperature": 0.6,
            "messages": [
                {"role": "system", "content": "Act as a customer"},
                {"role": "assistant", "content": "Hello"},
                {"role": "user", "content": "Hi, how can I help?"}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body(&serde_json::json!("I need a car in London")))
        .create_async()
        .await;

    let completion = client_for(&server)
        .complete(&transcript(), &CompletionOptions::with_temperature(0.6))
        .await
        .unwrap();

    assert_eq!(completion.content.as_deref(), Some("I need a car in London"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_null_content_is_not_an_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(completion_body(&serde_json::Value::Null))
        .create_async()
        .await;

    let completion = client_for(&server)
        .complete(&transcript(), &CompletionOptions::with_temperature(0.6))
        .await
        .unwrap();
    assert_eq!(completion.content, None);
}

#[tokio::test]
async fn test_rate_limit_is_classified() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .with_body(r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#)
        .create_async()
        .await;

    let error = client_for(&server)
        .complete(&transcript(), &CompletionOptions::with_temperature(0.6))
        .await
        .unwrap_err();

    assert_eq!(
        error,
        CompletionServiceError::RateLimited {
            status: 429,
            reason: "Too Many Requests".to_string()
        }
    );
}

#[tokio::test]
async fn test_auth_failure_is_upstream_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
        .create_async()
        .await;

    let error = client_for(&server)
        .complete(&transcript(), &CompletionOptions::with_temperature(0.6))
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(401));
    assert!(!error.is_retryable());
    assert!(error.to_string().contains("Incorrect API key"));
}

#[tokio::test]
async fn test_malformed_body() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    let error = client_for(&server)
        .complete(&transcript(), &CompletionOptions::with_temperature(0.6))
        .await
        .unwrap_err();
    assert!(matches!(error, CompletionServiceError::Malformed(_)));
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let client = OpenAiCompletionClient::with_config(OpenAiClientConfig {
        api_key: "sk-test".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        model: "gpt-3.5-turbo".to_string(),
        timeout_secs: 1,
    })
    .unwrap();

    let error = client
        .complete(&transcript(), &CompletionOptions::with_temperature(0.6))
        .await
        .unwrap_err();
    assert!(matches!(error, CompletionServiceError::Transport(_)));
}

#[tokio::test]
async fn test_retrying_client_gives_up_after_max_attempts() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .expect(3)
        .create_async()
        .await;

    let retrying = RetryingCompletionClient::new(
        Arc::new(client_for(&server)),
        RetryPolicy::new(3, Duration::from_millis(10), 2.0, Duration::from_millis(100)),
        0.6,
    );

    let error = retrying
        .generate_next(&Transcript::new("Act as a customer"))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        CompletionError::RetriesExhausted { attempts: 3, status: 429, .. }
    ));
    mock.assert_async().await;
}
