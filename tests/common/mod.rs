//! Common test utilities for integration tests
//!
//! Builds orchestrators over the in-memory fakes so scenarios run without a
//! network and under paused tokio time.

use std::sync::Arc;

use chatbot_harness::adapters::mock::{InMemorySession, ScriptedCompletionClient};
use chatbot_harness::domain::models::Config;
use chatbot_harness::services::ConversationOrchestrator;

/// Configuration with every required value filled in
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.session.deployment_id = Some("test-deployment".to_string());
    config.session.region = Some("mypurecloud.com".to_string());
    config.completion.api_key = Some("sk-test".to_string());
    config.conversation.scenario_prompt =
        "Act as a customer renting a car in London. Say WRONG if the bot makes a mistake.".to_string();
    config
}

/// Orchestrator wired to the given fakes with the defaults of `config`
pub fn orchestrator(
    config: &Config,
    client: &Arc<ScriptedCompletionClient>,
    session: &Arc<InMemorySession>,
) -> ConversationOrchestrator {
    ConversationOrchestrator::from_config(config, client.clone(), session.clone())
}

/// Setup test logging
///
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
