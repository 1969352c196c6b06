//! Flattening a transcript into backend prompt text

use crate::db::Message;

fn render_line(message: &Message) -> String {
    format!("{}: {}", message.role.label(), message.content)
}

/// Render `prior` then `pending`, one `"<Label>: <content>"` line each.
///
/// The pending line is always preceded by a newline, so a first message
/// yields a leading blank line. Backends have been prompted with this exact
/// shape, so it is kept.
pub fn assemble(prior: &[Message], pending: &Message) -> String {
    let history = prior.iter().map(render_line).collect::<Vec<_>>().join("\n");
    format!("{history}\n{}", render_line(pending))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_has_leading_blank_line() {
        assert_eq!(assemble(&[], &Message::user("Hi")), "\nUser: Hi");
    }

    #[test]
    fn history_is_rendered_in_order() {
        let prior = vec![Message::user("Hi"), Message::assistant("Hello!")];
        assert_eq!(
            assemble(&prior, &Message::user("Bye")),
            "User: Hi\nAssistant: Hello!\nUser: Bye"
        );
    }

    #[test]
    fn content_is_not_escaped_or_trimmed() {
        let prior = vec![Message::assistant("line one\nline two ")];
        assert_eq!(
            assemble(&prior, &Message::user("  spaced  ")),
            "Assistant: line one\nline two \nUser:   spaced  "
        );
    }
}
