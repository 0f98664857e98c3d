//! Domain layer for the conversation harness
//!
//! This module contains core models, port traits and the error taxonomy.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{
    CompletionError, CompletionServiceError, ConfigError, HarnessError, HarnessResult,
    SessionError,
};
