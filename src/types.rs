use std::fmt;
use std::str::FromStr;

use crate::error::ChatError;

/// Resets every terminal attribute. Also the escape for [`Color::Default`].
pub const RESET: &str = "\x1b[0m";

/// Used only to frame the help block.
pub const PURPLE: &str = "\x1b[35m";

/// Moves the cursor home and clears the screen.
pub const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

/// A user's display attribute: the color their chat text is painted with.
///
/// The closed set means the escape code is always known, and the color is
/// baked into the text before it reaches the broadcaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    Red,
    Green,
    Blue,
}

impl Color {
    /// The terminal escape sequence that switches to this color.
    pub fn escape(self) -> &'static str {
        match self {
            Color::Default => RESET,
            Color::Red => "\x1b[31m",
            Color::Green => "\x1b[32m",
            Color::Blue => "\x1b[34m",
        }
    }

    /// Wrap `text` in this color, resetting afterwards.
    pub fn paint(self, text: &str) -> String {
        format!("{}{text}{RESET}", self.escape())
    }
}

/// Only the three selectable colors parse; `default` is not a choice the
/// client can make. Matching is case-insensitive.
impl FromStr for Color {
    type Err = ChatError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "blue" => Ok(Color::Blue),
            _ => Err(ChatError::InvalidColor),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Default => "default",
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
        };
        f.write_str(name)
    }
}
