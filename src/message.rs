use std::fmt;

use crate::types::Color;

/// A line fanned out to every session by the broadcaster.
///
/// Wire formats:
///   `<username> has joined the chat\n`
///   `<username> has left the chat\n`
///   `<username> rolled a <n>\n`
///   `<username>: <styled text>\n`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Joined { username: String },
    Left { username: String },
    Rolled { username: String, value: u8 },
    Chat {
        username: String,
        color: Color,
        text: String,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Joined { username } => writeln!(f, "{username} has joined the chat"),
            Notice::Left { username } => writeln!(f, "{username} has left the chat"),
            Notice::Rolled { username, value } => writeln!(f, "{username} rolled a {value}"),
            Notice::Chat {
                username,
                color,
                text,
            } => writeln!(f, "{username}: {}", color.paint(text)),
        }
    }
}

/// The queue carries fully formatted strings; this is the conversion point.
impl From<Notice> for String {
    fn from(notice: Notice) -> Self {
        notice.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_notices_match_wire_format() {
        let joined: String = Notice::Joined {
            username: "alice".into(),
        }
        .into();
        assert_eq!(joined, "alice has joined the chat\n");

        let left = Notice::Left {
            username: "bob".into(),
        };
        assert_eq!(left.to_string(), "bob has left the chat\n");

        let rolled = Notice::Rolled {
            username: "carol".into(),
            value: 4,
        };
        assert_eq!(rolled.to_string(), "carol rolled a 4\n");
    }

    #[test]
    fn chat_text_is_painted_in_the_sender_color() {
        let chat = Notice::Chat {
            username: "alice".into(),
            color: Color::Green,
            text: "hello".into(),
        };
        assert_eq!(chat.to_string(), "alice: \x1b[32mhello\x1b[0m\n");
    }
}
