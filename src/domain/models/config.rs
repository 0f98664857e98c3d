//! Harness configuration model and its defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Scenario used when no prompt is configured: a customer renting a car.
pub const DEFAULT_SCENARIO_PROMPT: &str = r#"
I want you to act as a customer looking to rent a car for a holiday, and I will act as the company's chatbot that will
try and serve you. You want to rent a car in London for next Saturday and will drop it off in Liverpool 3 days later.
If I make a mistake you must include the word "WRONG" in your response. Now start our conversation by saying hello to me"#;

/// Main configuration structure for the harness
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Messaging session (bot-under-test) configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Completion service (simulated user) configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Retry policy for rate-limited completion requests
    #[serde(default)]
    pub retry: RetryConfig,

    /// Turn loop configuration
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Messaging session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Web messenger deployment identifier
    #[serde(default)]
    pub deployment_id: Option<String>,

    /// Region hosting the deployment, e.g. `mypurecloud.com`
    #[serde(default)]
    pub region: Option<String>,

    /// Origin header sent on connect, for deployments with an allow-list
    #[serde(default)]
    pub origin: Option<String>,
}

/// Completion service configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompletionConfig {
    /// API key for the completion service
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used to impersonate the user
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

const fn default_temperature() -> f64 {
    0.6
}

const fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts per completion request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Growth factor applied to the delay after each retry
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upper bound for a single delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

const fn default_max_attempts() -> u32 {
    10
}

const fn default_base_delay_ms() -> u64 {
    2000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_max_delay_ms() -> u64 {
    300_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Turn loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConversationConfig {
    /// System prompt describing who the simulated user is
    #[serde(default = "default_scenario_prompt")]
    pub scenario_prompt: String,

    /// Quiescence window for collecting the bot's replies, in milliseconds
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    /// Completed turns after which the run is ended
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Optional wall-clock bound for the whole run, in seconds
    #[serde(default)]
    pub max_run_duration_secs: Option<u64>,

    /// Marker the simulated user emits when the bot makes a mistake
    #[serde(default)]
    pub sentinel: SentinelConfig,
}

fn default_scenario_prompt() -> String {
    DEFAULT_SCENARIO_PROMPT.to_string()
}

const fn default_reply_timeout_ms() -> u64 {
    3000
}

const fn default_max_turns() -> usize {
    20
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            scenario_prompt: default_scenario_prompt(),
            reply_timeout_ms: default_reply_timeout_ms(),
            max_turns: default_max_turns(),
            max_run_duration_secs: None,
            sentinel: SentinelConfig::default(),
        }
    }
}

impl ConversationConfig {
    /// Reply collection window as a [`Duration`].
    pub const fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    /// Wall-clock bound for the run, when one is configured.
    pub fn max_run_duration(&self) -> Option<Duration> {
        self.max_run_duration_secs.map(Duration::from_secs)
    }
}

/// How the sentinel token is searched for in simulated-user messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Exact, case-sensitive substring
    #[default]
    Substring,
    /// Case-sensitive match on a whole word, ignoring surrounding punctuation
    WholeWord,
    /// Substring match ignoring case
    CaseInsensitive,
}

/// Sentinel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SentinelConfig {
    /// Text that marks a mistake, `WRONG` by default
    #[serde(default = "default_sentinel_token")]
    pub token: String,

    /// How `token` is matched
    #[serde(default)]
    pub matching: MatchStrategy,
}

fn default_sentinel_token() -> String {
    "WRONG".to_string()
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            token: default_sentinel_token(),
            matching: MatchStrategy::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Human-readable, multi-line
    #[default]
    Pretty,
}

/// Log file rotation policy
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    /// New file every day
    #[default]
    Daily,
    /// New file every hour
    Hourly,
    /// Single file that grows without bound
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files; logs go to stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log file rotation
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert!((config.completion.temperature - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.retry.max_attempts, 10);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert_eq!(config.conversation.reply_timeout(), Duration::from_millis(3000));
        assert_eq!(config.conversation.sentinel.token, "WRONG");
        assert!(config.conversation.scenario_prompt.contains("\"WRONG\""));
        assert!(config.session.deployment_id.is_none());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let completion = CompletionConfig {
            api_key: Some("sk-very-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{completion:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_match_strategy_parses_snake_case() {
        let sentinel: SentinelConfig =
            serde_yaml::from_str("token: OOPS\nmatching: case_insensitive").unwrap();
        assert_eq!(sentinel.token, "OOPS");
        assert_eq!(sentinel.matching, MatchStrategy::CaseInsensitive);
    }
}
