//! Building the model-input message sequence.
//!
//! The remote chat-completion API consumes an ordered list of role-tagged
//! messages. This module replays prior exchanges exactly as they occurred,
//! including mid-conversation system-prompt changes, then appends the new
//! system instruction and prompt. No deduplication, summarization, or
//! truncation happens here; token-budget management belongs to the caller
//! and the remote API.

use serde::{Deserialize, Serialize};

use crate::store::Exchange;

/// Role tag for a chat message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction.
    System,

    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

/// One role-tagged message in the model input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// The role of the message.
    pub role: Role,

    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Create a new `ChatMessage` with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system `ChatMessage`.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user `ChatMessage`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant `ChatMessage`.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Convert prior exchanges plus the new system/prompt pair into the ordered
/// message list the model consumes.
///
/// For each prior exchange in order: its system instruction (when it had a
/// non-empty one), its prompt as a user message, its response as an
/// assistant message. Then the new system instruction (when non-empty) and
/// the new prompt.
pub fn build_messages(
    history: &[Exchange],
    system: Option<&str>,
    prompt: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 3 + 2);
    for exchange in history {
        if let Some(prior_system) = exchange.system.as_deref() {
            if !prior_system.is_empty() {
                messages.push(ChatMessage::system(prior_system));
            }
        }
        messages.push(ChatMessage::user(exchange.prompt.clone()));
        messages.push(ChatMessage::assistant(exchange.response.clone()));
    }
    if let Some(system) = system {
        if !system.is_empty() {
            messages.push(ChatMessage::system(system));
        }
    }
    messages.push(ChatMessage::user(prompt));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn exchange(id: i64, system: Option<&str>, prompt: &str, response: &str) -> Exchange {
        Exchange {
            id,
            conversation_id: None,
            system: system.map(String::from),
            prompt: prompt.to_string(),
            response: response.to_string(),
            model: "gpt-4o-mini".to_string(),
            timestamp: OffsetDateTime::UNIX_EPOCH,
            duration_ms: None,
            debug: None,
        }
    }

    #[test]
    fn fresh_prompt_without_system() {
        let messages = build_messages(&[], None, "hello");
        assert_eq!(messages, vec![ChatMessage::user("hello")]);
    }

    #[test]
    fn fresh_prompt_with_system() {
        let messages = build_messages(&[], Some("be terse"), "hello");
        assert_eq!(
            messages,
            vec![ChatMessage::system("be terse"), ChatMessage::user("hello")]
        );
    }

    #[test]
    fn length_is_three_h_plus_two_when_fully_populated() {
        let history: Vec<Exchange> = (1..=4)
            .map(|i| {
                exchange(
                    i,
                    Some("sys"),
                    &format!("prompt {i}"),
                    &format!("response {i}"),
                )
            })
            .collect();
        let messages = build_messages(&history, Some("new sys"), "new prompt");
        assert_eq!(messages.len(), 3 * 4 + 2);
    }

    #[test]
    fn replay_preserves_chronology_and_roles() {
        let history = vec![
            exchange(1, Some("first persona"), "q1", "a1"),
            exchange(2, None, "q2", "a2"),
            exchange(3, Some("second persona"), "q3", "a3"),
        ];
        let messages = build_messages(&history, None, "q4");
        assert_eq!(
            messages,
            vec![
                ChatMessage::system("first persona"),
                ChatMessage::user("q1"),
                ChatMessage::assistant("a1"),
                ChatMessage::user("q2"),
                ChatMessage::assistant("a2"),
                ChatMessage::system("second persona"),
                ChatMessage::user("q3"),
                ChatMessage::assistant("a3"),
                ChatMessage::user("q4"),
            ]
        );
    }

    #[test]
    fn empty_system_strings_are_omitted() {
        let history = vec![exchange(1, Some(""), "q1", "a1")];
        let messages = build_messages(&history, Some(""), "q2");
        assert_eq!(
            messages,
            vec![
                ChatMessage::user("q1"),
                ChatMessage::assistant("a1"),
                ChatMessage::user("q2"),
            ]
        );
    }

    #[test]
    fn repeated_systems_are_not_collapsed() {
        let history = vec![
            exchange(1, Some("same"), "q1", "a1"),
            exchange(2, Some("same"), "q2", "a2"),
        ];
        let messages = build_messages(&history, Some("same"), "q3");
        let systems = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .count();
        assert_eq!(systems, 3);
    }

    #[test]
    fn role_serialization_is_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "assistant", "content": "hi"})
        );
    }
}
