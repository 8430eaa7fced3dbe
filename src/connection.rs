//! Per-connection handler.
//!
//! The lifecycle is encoded as types:
//!
//!   Connection<AwaitingUsername> → Connection<Registered> → (terminated)
//!
//! Each state owns only what makes sense for it. Before registration the
//! handler owns the write half; afterwards the write half lives in the
//! registry and every reply goes through it.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::command::{Command, roll_die};
use crate::error::ChatError;
use crate::message::Notice;
use crate::protocol::{self, USERNAME_PROMPT, USERNAME_TAKEN};
use crate::server::ChatState;
use crate::session::{Inbound, Outbound};
use crate::types::CLEAR_SCREEN;

/// Longest line accepted from a client, excluding the newline.
pub const MAX_LINE_BYTES: usize = 4096;

/// State: accepted, no name yet. Holds the write half.
pub struct AwaitingUsername {
    writer: Outbound,
}

/// State: the username is in the registry.
pub struct Registered {
    username: String,
}

/// A client connection in state `S`.
pub struct Connection<S> {
    state: ChatState,
    reader: Inbound,
    buf: Vec<u8>,
    stage: S,
}

impl<S> Connection<S> {
    /// Next line without its terminator. `Ok(None)` at end of stream.
    ///
    /// Bytes that are not valid UTF-8 become U+FFFD rather than ending the
    /// connection. A line longer than [`MAX_LINE_BYTES`] is an error.
    async fn read_line(&mut self) -> Result<Option<String>, ChatError> {
        self.buf.clear();
        let limit = MAX_LINE_BYTES as u64 + 1;
        let bytes = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.buf)
            .await?;
        if bytes == 0 {
            return Ok(None);
        }
        if !self.buf.ends_with(b"\n") && self.buf.len() > MAX_LINE_BYTES {
            return Err(ChatError::LineTooLong {
                limit: MAX_LINE_BYTES,
            });
        }

        let mut end = self.buf.len();
        while end > 0 && matches!(self.buf[end - 1], b'\r' | b'\n') {
            end -= 1;
        }
        Ok(Some(String::from_utf8_lossy(&self.buf[..end]).into_owned()))
    }
}

impl Connection<AwaitingUsername> {
    pub fn new(state: ChatState, reader: Inbound, writer: Outbound) -> Self {
        Self {
            state,
            reader,
            buf: Vec::new(),
            stage: AwaitingUsername { writer },
        }
    }

    async fn write(&mut self, text: &str) -> Result<(), ChatError> {
        self.stage.writer.write_all(text.as_bytes()).await?;
        self.stage.writer.flush().await?;
        Ok(())
    }

    /// Prompt until the client picks a free name.
    ///
    /// Consumes the connection. `Ok(None)` means the client went away
    /// before registering; nothing was added to the registry.
    pub async fn register(mut self) -> Result<Option<Connection<Registered>>, ChatError> {
        let username = loop {
            self.write(USERNAME_PROMPT).await?;

            let Some(name) = self.read_line().await? else {
                debug!("disconnected before choosing a username");
                return Ok(None);
            };
            if name.trim().is_empty() {
                self.write(&format!("{}\n", ChatError::EmptyUsername)).await?;
                continue;
            }

            // Hand the writer to the registry; get it back if the name is taken.
            let writer = std::mem::replace(&mut self.stage.writer, Box::new(tokio::io::sink()));
            match self.state.registry.try_register(&name, writer).await {
                Ok(()) => break name,
                Err(writer) => {
                    self.stage.writer = writer;
                    debug!(username = %name, "username taken");
                    self.write(USERNAME_TAKEN).await?;
                }
            }
        };

        info!(%username, "joined the chat");
        let conn = Connection {
            state: self.state,
            reader: self.reader,
            buf: self.buf,
            stage: Registered { username },
        };
        conn.state.outbox.send(Notice::Joined {
            username: conn.stage.username.clone(),
        });
        conn.reply(&protocol::help_text()).await;
        Ok(Some(conn))
    }
}

impl Connection<Registered> {
    /// Write to this client only. A failure is logged; the read loop will
    /// notice the dead connection on its own.
    async fn reply(&self, text: &str) {
        if let Err(e) = self.state.registry.send_to(&self.stage.username, text).await {
            warn!(username = %self.stage.username, error = %e, "reply failed");
        }
    }

    /// Read and dispatch lines until `/exit`, end of stream, or a read error.
    pub async fn run(&mut self) {
        loop {
            let line = match self.read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(username = %self.stage.username, error = %e, "read failed, disconnecting");
                    break;
                }
            };

            if Command::is_command(&line) {
                match Command::parse(&line) {
                    Ok(Command::Exit) => break,
                    Ok(cmd) => self.execute(cmd).await,
                    Err(e) => self.reply(&format!("{e}\n")).await,
                }
                continue;
            }

            self.chat(&line).await;
        }
    }

    async fn execute(&self, cmd: Command) {
        let username = &self.stage.username;
        match cmd {
            Command::Exit => {}
            Command::Clear => self.reply(CLEAR_SCREEN).await,
            Command::Help => self.reply(&protocol::help_text()).await,
            Command::Users => {
                let names = self.state.registry.snapshot().await;
                self.reply(&protocol::user_list(&names)).await;
            }
            Command::Roll => {
                let value = roll_die(&mut rand::thread_rng());
                debug!(%username, value, "rolled");
                self.state.outbox.send(Notice::Rolled {
                    username: username.clone(),
                    value,
                });
            }
            Command::SetColor { color, name } => {
                if self.state.registry.update_color(username, color).await {
                    let confirm = format!("Your chat color is now {}{name}.\n", color.escape());
                    self.reply(&confirm).await;
                }
            }
        }
    }

    /// Broadcast chat text unless it repeats this user's previous line.
    /// Blank text is chat like any other.
    async fn chat(&self, text: &str) {
        match self.state.registry.prepare_chat(&self.stage.username, text).await {
            Some(line) => {
                self.state.outbox.send(line);
            }
            None => debug!(username = %self.stage.username, "repeated line suppressed"),
        }
    }

    /// Remove the session, close its connection once, and announce the
    /// departure to everyone still present.
    pub async fn terminate(self) {
        let Connection { state, stage, .. } = self;
        let Registered { username } = stage;

        if let Some(session) = state.registry.remove(&username).await {
            if let Err(e) = session.close().await {
                debug!(%username, error = %e, "close failed");
            }
        }
        state.outbox.send(Notice::Left {
            username: username.clone(),
        });
        info!(%username, "left the chat");
    }
}

/// Drive one client through its whole lifecycle.
pub async fn handle_client(
    state: ChatState,
    reader: Inbound,
    writer: Outbound,
) -> Result<(), ChatError> {
    let Some(mut conn) = Connection::new(state, reader, writer).register().await? else {
        return Ok(());
    };
    conn.run().await;
    conn.terminate().await;
    Ok(())
}
