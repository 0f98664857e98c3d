//! Termination policy: decides whether a conversation has reached a terminal state.
//!
//! The policy is an ordered list of rules evaluated against the transcript;
//! the first rule that reports a reason ends the conversation. Evaluation is
//! pure, so it can run after every transcript mutation.

use crate::domain::models::{ConversationConfig, ConversationOutcome, MatchStrategy, Transcript};

/// A single termination predicate.
pub trait TerminationRule: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Reason the conversation should end, or `None` to defer to later rules.
    fn check(&self, transcript: &Transcript) -> Option<String>;
}

/// Ends the conversation when the simulated user's latest message carries the sentinel token.
#[derive(Debug, Clone)]
pub struct SentinelRule {
    token: String,
    strategy: MatchStrategy,
}

impl SentinelRule {
    /// Rule matching `token` with `strategy`.
    pub fn new(token: impl Into<String>, strategy: MatchStrategy) -> Self {
        Self {
            token: token.into(),
            strategy,
        }
    }

    /// Whether `text` carries the token. An empty token never matches.
    pub fn matches(&self, text: &str) -> bool {
        if self.token.is_empty() {
            return false;
        }
        match self.strategy {
            MatchStrategy::Substring => text.contains(&self.token),
            MatchStrategy::CaseInsensitive => text.to_lowercase().contains(&self.token.to_lowercase()),
            MatchStrategy::WholeWord => text.match_indices(&self.token).any(|(start, token)| {
                let before = text[..start].chars().next_back();
                let after = text[start + token.len()..].chars().next();
                !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
            }),
        }
    }
}

impl TerminationRule for SentinelRule {
    fn name(&self) -> &'static str {
        "sentinel"
    }

    fn check(&self, transcript: &Transcript) -> Option<String> {
        let latest = transcript.last_simulated()?;
        self.matches(&latest.content).then(|| {
            format!(
                "Simulated user reported a mistake by the chatbot (message contained \"{}\")",
                self.token
            )
        })
    }
}

/// Ends the conversation once `max_turns` counterpart replies have been recorded.
#[derive(Debug, Clone, Copy)]
pub struct MaxTurnsRule {
    max_turns: usize,
}

impl MaxTurnsRule {
    /// Rule ending the run after `max_turns` completed turns.
    pub const fn new(max_turns: usize) -> Self {
        Self { max_turns }
    }
}

impl TerminationRule for MaxTurnsRule {
    fn name(&self) -> &'static str {
        "max_turns"
    }

    fn check(&self, transcript: &Transcript) -> Option<String> {
        (transcript.completed_turns() >= self.max_turns).then(|| {
            format!(
                "Conversation timed out after reaching the maximum of {} turns",
                self.max_turns
            )
        })
    }
}

/// Ordered set of termination rules; first match wins.
pub struct TerminationPolicy {
    rules: Vec<Box<dyn TerminationRule>>,
}

impl TerminationPolicy {
    /// Policy evaluating `rules` in order.
    pub fn new(rules: Vec<Box<dyn TerminationRule>>) -> Self {
        Self { rules }
    }

    /// Sentinel detection first, then the turn bound.
    pub fn from_config(config: &ConversationConfig) -> Self {
        Self::new(vec![
            Box::new(SentinelRule::new(
                config.sentinel.token.clone(),
                config.sentinel.matching,
            )),
            Box::new(MaxTurnsRule::new(config.max_turns)),
        ])
    }

    /// `Ended` with the first matching rule's reason, otherwise `Ongoing`.
    pub fn evaluate(&self, transcript: &Transcript) -> ConversationOutcome {
        self.rules
            .iter()
            .find_map(|rule| {
                rule.check(transcript).map(|reason| {
                    tracing::debug!(rule = rule.name(), %reason, "termination rule matched");
                    reason
                })
            })
            .map_or(ConversationOutcome::Ongoing, ConversationOutcome::ended)
    }
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self::from_config(&ConversationConfig::default())
    }
}
