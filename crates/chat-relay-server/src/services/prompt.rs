use conversation_memory::Turn;

use crate::models::chat::ChatMessage;

/// Replay the selected turns as user/assistant pairs, oldest first, then the
/// current question.
pub fn build_messages(window: &[Turn], question: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(window.len() * 2 + 1);

    for turn in window {
        messages.push(ChatMessage::user(turn.user_text.as_str()));
        messages.push(ChatMessage::assistant(turn.assistant_text.as_str()));
    }

    messages.push(ChatMessage::user(question));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_empty_window_is_just_the_question() {
        assert_eq!(build_messages(&[], "hi"), vec![ChatMessage::user("hi")]);
    }

    #[test]
    fn test_turns_replayed_in_order() {
        let now = Utc::now();
        let window = vec![Turn::new("A", "a", now), Turn::new("B", "b", now)];

        assert_eq!(
            build_messages(&window, "C"),
            vec![
                ChatMessage::user("A"),
                ChatMessage::assistant("a"),
                ChatMessage::user("B"),
                ChatMessage::assistant("b"),
                ChatMessage::user("C"),
            ]
        );
    }
}
