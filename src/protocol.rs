//! Fixed text the server writes to clients.
//!
//! The wire is plain newline-delimited text in both directions. Styling is
//! carried inline as terminal escape sequences, never as a separate field.

use crate::types::{PURPLE, RESET};

/// Sent before every username attempt. No trailing newline: the client
/// types on the same line.
pub const USERNAME_PROMPT: &str = "Enter your username: ";

pub const USERNAME_TAKEN: &str = "Username is already taken. Please choose a different username.\n";

pub const NO_USERS: &str = "No users currently connected.\n";

const COMMANDS: &str = "Available commands:\n\
/help  - List available commands\n\
/clear - Clear the chat screen\n\
/users - List connected users\n\
/roll  - Roll a dice (1-6)\n\
/color->red   - Set your chat color to red\n\
/color->green - Set your chat color to green\n\
/color->blue  - Set your chat color to blue\n\
/exit  - Disconnect from the chat\n";

/// The command list, framed in purple.
pub fn help_text() -> String {
    format!("{PURPLE}{COMMANDS}{RESET}")
}

/// Reply to `/users`. The order of `usernames` is kept as given.
pub fn user_list<S: AsRef<str>>(usernames: &[S]) -> String {
    if usernames.is_empty() {
        return NO_USERS.to_string();
    }
    let names: Vec<&str> = usernames.iter().map(AsRef::as_ref).collect();
    format!("Connected users: {}\n", names.join(", "))
}

/// Strip terminal escape sequences (`ESC [ ... final-byte`) from `text`.
///
/// Handy for logging and for asserting on what a client would read.
pub fn strip_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // Parameters and intermediates run until a byte in '@'..='~'.
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}
