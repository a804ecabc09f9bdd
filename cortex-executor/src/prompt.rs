//! Role-prefixed prompt template (spec §4.4 step 1).

use cortex_types::{ConversationMessage, Role};

fn role_label(role: Role) -> &'static str {
    match role {
        Role::System => "System",
        Role::User => "User",
        Role::Assistant => "Assistant",
    }
}

/// Render an ordered message list into the prompt string the tokenizer sees:
/// `"System: …\n\nUser: …\n\nAssistant: …\n\nAssistant: "` — the trailing
/// empty `Assistant:` tag is the generation anchor, present even if the
/// conversation's last message was already from the assistant.
pub fn build_prompt(messages: &[ConversationMessage]) -> String {
    let mut prompt = String::new();
    for message in messages {
        prompt.push_str(role_label(message.role));
        prompt.push_str(": ");
        prompt.push_str(&message.content);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Assistant: ");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_role_prefixed_template_with_generation_anchor() {
        let messages = vec![
            ConversationMessage::system("be terse"),
            ConversationMessage::user("2+2?"),
        ];
        let prompt = build_prompt(&messages);
        assert_eq!(prompt, "System: be terse\n\nUser: 2+2?\n\nAssistant: ");
    }

    #[test]
    fn empty_conversation_is_just_the_anchor() {
        assert_eq!(build_prompt(&[]), "Assistant: ");
    }

    #[test]
    fn trailing_assistant_message_still_gets_a_fresh_anchor() {
        let messages = vec![
            ConversationMessage::user("hi"),
            ConversationMessage::assistant("hello"),
        ];
        let prompt = build_prompt(&messages);
        assert!(prompt.ends_with("Assistant: hello\n\nAssistant: "));
    }
}
