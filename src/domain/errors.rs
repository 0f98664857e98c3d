//! Error taxonomy for a harness run.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors, raised before any network activity.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The layered sources could not be merged into a [`Config`](crate::domain::models::Config)
    #[error("Failed to load configuration: {0}")]
    Extraction(String),

    /// Required values that no source provided, by dotted key
    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingRequired(Vec<&'static str>),

    /// Sampling temperature outside `0.0..=1.0`
    #[error("Invalid temperature: {0}. Must be between 0.0 and 1.0")]
    InvalidTemperature(f64),

    /// Retry policy allows no attempt at all
    #[error("Invalid max_attempts: {0}. Must be at least 1")]
    InvalidMaxAttempts(u32),

    /// Delays that would shrink or invert
    #[error("Invalid retry delay: {0}")]
    InvalidDelay(String),

    /// Zero-length reply window
    #[error("Invalid reply_timeout_ms: {0}. Must be positive")]
    InvalidTimeout(u64),

    /// Turn bound that would end the run before it starts
    #[error("Invalid max_turns: {0}. Must be at least 1")]
    InvalidMaxTurns(usize),

    /// Unknown tracing level name
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Blank sentinel, which would match every message
    #[error("Sentinel token cannot be empty")]
    EmptySentinel,
}

/// Failure of a single completion request, as reported by the service client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionServiceError {
    /// The service asked us to slow down (HTTP 429)
    #[error("{reason} ({status})")]
    RateLimited {
        /// HTTP status code
        status: u16,
        /// Status text or error message from the body
        reason: String,
    },

    /// Any other non-success response
    #[error("Upstream error ({status}): {reason}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Status text or error message from the body
        reason: String,
    },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body could not be understood
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl CompletionServiceError {
    /// Only rate limiting is recovered from; everything else is fatal.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// HTTP status, when the service answered at all.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { status, .. } | Self::Upstream { status, .. } => Some(*status),
            Self::Transport(_) | Self::Malformed(_) => None,
        }
    }

    /// Human-readable cause without the status code.
    pub fn reason(&self) -> &str {
        match self {
            Self::RateLimited { reason, .. } | Self::Upstream { reason, .. } => reason,
            Self::Transport(detail) | Self::Malformed(detail) => detail,
        }
    }
}

/// Terminal failure to obtain the next simulated-user message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// Every allowed attempt was rate limited
    #[error("Completion still rate limited after {attempts} attempts: {reason} ({status})")]
    RetriesExhausted {
        /// Requests made, including the first
        attempts: u32,
        /// Status of the last response
        status: u16,
        /// Reason given by the last response
        reason: String,
    },

    /// A failure that is never retried
    #[error(transparent)]
    Fatal(CompletionServiceError),
}

/// Messaging session failures.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The transport could not be established
    #[error("Failed to connect to messaging session: {0}")]
    Connect(String),

    /// No usable session came back from `configureSession`
    #[error("Session handshake failed: {0}")]
    Handshake(String),

    /// A message could not be written to the transport
    #[error("Failed to send message: {0}")]
    Send(String),

    /// Used before `open` or after `close`
    #[error("Session is not open")]
    Closed,

    /// The service sent a frame the session cannot handle
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Any failure that aborts a harness run.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Invalid or incomplete configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The simulated user could not produce its next message
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// The session with the bot-under-test failed
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result alias used by the orchestrator and the CLI.
pub type HarnessResult<T> = Result<T, HarnessError>;
