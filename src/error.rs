use thiserror::Error;

/// Errors raised anywhere in the server.
///
/// The user-facing variants render exactly the line the client sees, so a
/// handler can reply with `format!("{err}\n")`.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid command. Type /help for the list of commands.")]
    InvalidCommand,

    #[error("Invalid color. Available options: red, green, blue.")]
    InvalidColor,

    #[error("Username cannot be empty.")]
    EmptyUsername,

    #[error("line longer than {limit} bytes")]
    LineTooLong { limit: usize },
}

/// Helper for the bind path, which knows the address it tried.
pub(crate) fn bind_error(addr: impl Into<String>, source: std::io::Error) -> ChatError {
    ChatError::Bind {
        addr: addr.into(),
        source,
    }
}
