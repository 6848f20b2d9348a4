//! Prompt linearization, shared by the manager's token accounting and the
//! conversation surface's `build_prompt`.

use crate::message::Message;

/// Render `messages` as `"<role>: <content>\n"`-joined text: role
/// lowercase, exactly one `"<role>: "` prefix per message, newline
/// separated in the given order. A trailing newline is not guaranteed.
#[must_use]
pub fn linearize(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use chrono::Utc;

    #[test]
    fn joins_with_single_prefix_and_newlines() {
        let messages = vec![
            Message::with_id("a", Role::System, "be concise", Utc::now(), None).unwrap(),
            Message::with_id("b", Role::User, "hi", Utc::now(), None).unwrap(),
        ];
        assert_eq!(linearize(&messages), "system: be concise\nuser: hi");
    }

    #[test]
    fn empty_messages_is_empty_string() {
        assert_eq!(linearize(&[]), "");
    }
}
