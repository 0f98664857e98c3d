//! End-to-end conversation scenarios over in-memory collaborators.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chatbot_harness::adapters::mock::{InMemorySession, ScriptedCompletionClient, ScriptedReplies};
use chatbot_harness::domain::errors::{CompletionError, HarnessError};
use chatbot_harness::domain::models::{ConversationOutcome, Message, Role, Transcript};
use chatbot_harness::services::TerminationPolicy;

use common::{orchestrator, test_config};

#[tokio::test(start_paused = true)]
async fn test_clean_exchange_keeps_conversation_going() {
    common::setup_test_logging();
    let mut config = test_config();
    config.conversation.max_turns = 2;

    let client = Arc::new(
        ScriptedCompletionClient::new()
            .then_reply("Hello, I would like to rent a car")
            .then_reply("Pick up in London next Saturday, please"),
    );
    let session = Arc::new(
        InMemorySession::new()
            .then_replies(
                ScriptedReplies::none()
                    .after(Duration::from_millis(500), "Hi! Where would you like to pick it up?"),
            )
            .then_replies(ScriptedReplies::immediately("Booked: London, Saturday.")),
    );

    let report = orchestrator(&config, &client, &session).run().await.unwrap();

    // The first exchange alone is not terminal: the loop went on to a second turn
    let mut after_first_turn = Transcript::new(config.conversation.scenario_prompt.clone());
    for message in &report.transcript.messages()[1..3] {
        after_first_turn.push(message.clone());
    }
    assert_eq!(
        TerminationPolicy::from_config(&config.conversation).evaluate(&after_first_turn),
        ConversationOutcome::Ongoing
    );

    assert_eq!(client.calls().await, 2);
    assert_eq!(session.sent().await.len(), 2);
    assert_eq!(report.turns, 2);
    assert!(report.reason.contains("maximum of 2 turns"));
    assert_eq!(
        report.transcript.messages()[2],
        Message::user("Hi! Where would you like to pick it up?")
    );
    assert_eq!(session.close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sentinel_ends_run_without_sending() {
    let config = test_config();
    let client = Arc::new(
        ScriptedCompletionClient::new()
            .then_reply("Hello")
            .then_reply("WRONG - I said London, not Leeds"),
    );
    let session = Arc::new(
        InMemorySession::new().then_replies(ScriptedReplies::immediately("Sure, a car in Leeds then.")),
    );

    let report = orchestrator(&config, &client, &session).run().await.unwrap();

    assert!(report.reason.contains("\"WRONG\""));
    assert_eq!(session.sent().await, vec!["Hello".to_string()]);
    assert_eq!(client.calls().await, 2);

    let last = report.transcript.last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert!(last.content.starts_with("WRONG"));
    assert_eq!(session.close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_exhaustion_fails_run_and_closes_session_once() {
    let mut config = test_config();
    config.retry.max_attempts = 10;

    let client = Arc::new(ScriptedCompletionClient::new().then_rate_limited(10));
    let session = Arc::new(InMemorySession::new());

    let result = orchestrator(&config, &client, &session).run().await;

    match result {
        Err(HarnessError::Completion(CompletionError::RetriesExhausted { attempts, status, .. })) => {
            assert_eq!(attempts, 10);
            assert_eq!(status, 429);
        }
        other => panic!("Expected retry exhaustion, got {other:?}"),
    }
    assert_eq!(client.calls().await, 10);
    assert!(session.sent().await.is_empty());
    assert_eq!(session.open_calls(), 1);
    assert_eq!(session.close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limits_below_cap_are_absorbed() {
    let mut config = test_config();
    config.conversation.max_turns = 1;

    let client = Arc::new(
        ScriptedCompletionClient::new()
            .then_rate_limited(3)
            .then_reply("Hello"),
    );
    let session = Arc::new(InMemorySession::new().then_replies(ScriptedReplies::immediately("Hi")));

    let report = orchestrator(&config, &client, &session).run().await.unwrap();

    assert_eq!(client.calls().await, 4);
    assert_eq!(session.sent().await, vec!["Hello".to_string()]);
    assert_eq!(report.turns, 1);
}

#[tokio::test(start_paused = true)]
async fn test_every_request_carries_full_transcript() {
    let mut config = test_config();
    config.conversation.max_turns = 2;

    let client = Arc::new(
        ScriptedCompletionClient::new()
            .then_reply("first question")
            .then_reply("second question"),
    );
    let session = Arc::new(
        InMemorySession::new()
            .then_replies(ScriptedReplies::immediately("first answer"))
            .then_replies(ScriptedReplies::immediately("second answer")),
    );

    orchestrator(&config, &client, &session).run().await.unwrap();

    let requests = client.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].messages[0].role, Role::System);
    assert_eq!(
        requests[1].messages,
        vec![
            Message::system(config.conversation.scenario_prompt.clone()),
            Message::assistant("first question"),
            Message::user("first answer"),
        ]
    );
    assert!(requests
        .iter()
        .all(|request| request.options.candidates == 1
            && (request.options.temperature - 0.6).abs() < f64::EPSILON));
}
