//! Termination outcomes and the run report.

use serde::{Deserialize, Serialize};

/// Result of evaluating the termination policy over a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversationOutcome {
    /// Keep taking turns
    Ongoing,
    /// Stop; nothing more is sent
    Ended {
        /// Human-readable explanation for the report
        reason: String,
    },
}

impl ConversationOutcome {
    /// Ended with `reason`.
    pub fn ended(reason: impl Into<String>) -> Self {
        Self::Ended {
            reason: reason.into(),
        }
    }

    /// Whether the conversation is over.
    pub const fn has_ended(&self) -> bool {
        matches!(self, Self::Ended { .. })
    }

    /// Why it ended, or `None` while ongoing.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ongoing => None,
            Self::Ended { reason } => Some(reason),
        }
    }
}

/// Final summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Why the conversation ended
    pub reason: String,
    /// Simulated-user messages generated during the run
    pub turns: usize,
    /// Full transcript, starting with the scenario prompt
    pub transcript: super::Transcript,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        assert!(!ConversationOutcome::Ongoing.has_ended());
        assert_eq!(ConversationOutcome::Ongoing.reason(), None);

        let ended = ConversationOutcome::ended("done");
        assert!(ended.has_ended());
        assert_eq!(ended.reason(), Some("done"));
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(ConversationOutcome::ended("bye")).unwrap();
        assert_eq!(json["status"], "ended");
        assert_eq!(json["reason"], "bye");
    }
}
