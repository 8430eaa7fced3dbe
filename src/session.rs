use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

use crate::types::Color;

/// Write half of a client connection. Boxed so that TCP halves and
/// in-memory test pipes share one session type.
pub type Outbound = Box<dyn AsyncWrite + Send + Unpin>;

/// Buffered read half of a client connection. `Sync` so a handler can
/// hold `&self` across awaits inside a spawned task.
pub type Inbound = Box<dyn AsyncBufRead + Send + Sync + Unpin>;

/// One connected, named user.
///
/// Sessions live only inside the registry; every field is read and
/// written under the registry lock.
pub struct Session {
    username: String,
    writer: Outbound,
    color: Color,
    last_sent: Option<String>,
}

impl Session {
    pub fn new(username: String, writer: Outbound) -> Self {
        Self {
            username,
            writer,
            color: Color::Default,
            last_sent: None,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    #[cfg(test)]
    pub fn last_sent(&self) -> Option<&str> {
        self.last_sent.as_deref()
    }

    /// Record `line` as this user's most recent broadcast. Returns `false`
    /// (and records nothing) when it repeats the previous one exactly.
    pub fn remember_sent(&mut self, line: &str) -> bool {
        if self.last_sent.as_deref() == Some(line) {
            return false;
        }
        self.last_sent = Some(line.to_string());
        true
    }

    /// Write one complete piece of text and flush it.
    pub async fn send(&mut self, text: &str) -> std::io::Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await
    }

    /// Shut the write half down. Consumes the session so a connection is
    /// closed at most once.
    pub async fn close(mut self) -> std::io::Result<()> {
        self.writer.shutdown().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("color", &self.color)
            .field("last_sent", &self.last_sent)
            .finish_non_exhaustive()
    }
}
