use rand::Rng;

use crate::error::ChatError;
use crate::types::Color;

const COLOR_PREFIX: &str = "/color->";

/// Commands are a closed set, dispatched with a single `match`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Clear,
    Help,
    Users,
    Roll,
    /// `name` is the color as the client typed it, echoed back verbatim.
    SetColor { color: Color, name: String },
}

impl Command {
    /// Parse a `/`-prefixed line.
    ///
    /// Command words are case-sensitive and must match the whole line; only
    /// the color name after `/color->` ignores case.
    pub fn parse(input: &str) -> Result<Self, ChatError> {
        if let Some(name) = input.strip_prefix(COLOR_PREFIX) {
            let color = name.parse()?;
            return Ok(Command::SetColor {
                color,
                name: name.to_string(),
            });
        }

        match input {
            "/exit" => Ok(Command::Exit),
            "/clear" => Ok(Command::Clear),
            "/help" => Ok(Command::Help),
            "/users" => Ok(Command::Users),
            "/roll" => Ok(Command::Roll),
            _ => Err(ChatError::InvalidCommand),
        }
    }

    /// Whether a line should go through [`Command::parse`] rather than be
    /// treated as chat text.
    pub fn is_command(line: &str) -> bool {
        line.starts_with('/')
    }
}

/// A fair six-sided die.
pub fn roll_die<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(1..=6)
}
