//! Conversation message types (spec §3 "Conversation Message").

use serde::{Deserialize, Serialize};

/// Role of a conversation message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
}

/// A single, list-ordered conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Author role.
    pub role: Role,
    /// Message text. The executor's prompt builder is the only consumer
    /// that interprets this positionally; everywhere else it's opaque.
    pub content: String,
}

impl ConversationMessage {
    /// Construct a message with the given role and text.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Convenience constructor for a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Convenience constructor for a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Convenience constructor for an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn message_roundtrip() {
        let msg = ConversationMessage::user("2+2?");
        let json = serde_json::to_value(&msg).unwrap();
        let back: ConversationMessage = serde_json::from_value(json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn convenience_constructors_set_role() {
        assert_eq!(ConversationMessage::user("x").role, Role::User);
        assert_eq!(ConversationMessage::system("x").role, Role::System);
        assert_eq!(ConversationMessage::assistant("x").role, Role::Assistant);
    }
}
