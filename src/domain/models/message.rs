//! Transcript messages exchanged between the simulated user and the bot-under-test.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a transcript message, using completion-service role names.
///
/// The simulated user is the completion service's own voice, so it is
/// recorded as `Assistant`; the bot-under-test talks *to* the completion
/// service and is recorded as `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The scenario prompt
    System,
    /// The simulated user
    Assistant,
    /// The bot-under-test
    User,
}

impl Role {
    /// Wire name used by chat-completion APIs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Assistant => "assistant",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who said it
    pub role: Role,
    /// What was said, possibly empty
    pub content: String,
}

impl Message {
    /// The scenario prompt.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A message spoken by the simulated user.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// A message spoken by the bot-under-test.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Append-only, chronologically ordered conversation history.
///
/// Always starts with exactly one `system` message holding the scenario
/// prompt. Entries cannot be modified or removed once pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Seed a transcript with the scenario prompt.
    pub fn new(scenario_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(scenario_prompt)],
        }
    }

    /// Append a simulated-user or counterpart message.
    ///
    /// A second `system` message would break the single-prompt invariant, so
    /// it is recorded as a counterpart message instead of being rejected.
    pub fn push(&mut self, message: Message) {
        let message = if message.role == Role::System {
            Message::user(message.content)
        } else {
            message
        };
        self.messages.push(message);
    }

    /// Every message, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages, including the scenario prompt.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true: the scenario prompt is always present.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Content of the seeding `system` message.
    pub fn scenario_prompt(&self) -> &str {
        &self.messages[0].content
    }

    /// Most recent message of any role.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent message produced by the simulated user.
    pub fn last_simulated(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
    }

    /// Number of simulated-user messages generated so far.
    pub fn simulated_turns(&self) -> usize {
        self.count_role(Role::Assistant)
    }

    /// Number of turns whose counterpart reply has been appended.
    pub fn completed_turns(&self) -> usize {
        self.count_role(Role::User)
    }

    fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transcript_holds_only_the_prompt() {
        let transcript = Transcript::new("act as a customer");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].role, Role::System);
        assert_eq!(transcript.scenario_prompt(), "act as a customer");
        assert!(transcript.last_simulated().is_none());
    }

    #[test]
    fn test_push_preserves_order() {
        let mut transcript = Transcript::new("prompt");
        transcript.push(Message::assistant("hello"));
        transcript.push(Message::user("hi, how can I help?"));
        transcript.push(Message::assistant("I need a car"));

        let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(transcript.simulated_turns(), 2);
        assert_eq!(transcript.completed_turns(), 1);
        assert_eq!(
            transcript.last_simulated().map(|m| m.content.as_str()),
            Some("I need a car")
        );
    }

    #[test]
    fn test_second_system_message_is_not_a_prompt() {
        let mut transcript = Transcript::new("prompt");
        transcript.push(Message::system("injected"));

        assert_eq!(
            transcript
                .messages()
                .iter()
                .filter(|m| m.role == Role::System)
                .count(),
            1
        );
        assert_eq!(transcript.last().map(|m| m.role), Some(Role::User));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("x")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"x"}"#);
    }
}
