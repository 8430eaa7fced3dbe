use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::registry::SessionRegistry;

/// Producer side of the outbound queue. Cheap to clone; one per
/// connection task.
///
/// The queue is unbounded: producers never wait, and a backlog grows in
/// memory until the broadcaster catches up.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<String>,
}

impl Outbox {
    /// Enqueue a fully formatted line for every session.
    ///
    /// Returns `false` if the broadcaster is gone; the line is dropped and
    /// logged.
    pub fn send(&self, line: impl Into<String>) -> bool {
        match self.tx.send(line.into()) {
            Ok(()) => true,
            Err(mpsc::error::SendError(line)) => {
                warn!(line = line.trim_end(), "broadcaster stopped, line dropped");
                false
            }
        }
    }
}

/// The single consumer of the outbound queue.
///
/// One pass per line, in FIFO order, so every client sees the same global
/// order of notices.
#[derive(Debug)]
pub struct Broadcaster {
    rx: mpsc::UnboundedReceiver<String>,
    registry: Arc<SessionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SessionRegistry>) -> (Self, Outbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx, registry }, Outbox { tx })
    }

    /// Drain the queue until every `Outbox` has been dropped.
    pub async fn run(mut self) {
        while let Some(line) = self.rx.recv().await {
            debug!(line = line.trim_end(), "broadcasting");
            self.registry.broadcast(&line).await;
        }
        info!("outbound queue closed, broadcaster stopping");
    }
}
