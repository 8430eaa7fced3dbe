use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::message::Notice;
use crate::session::{Outbound, Session};
use crate::types::Color;

/// Every registered session, keyed by username, behind one lock.
///
/// Callers never see the map itself: each method is one critical section.
/// The lock is async because a broadcast pass holds it across writes.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

/// Outcome of one broadcast pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-then-insert under a single lock acquisition.
    ///
    /// On a duplicate name the writer is handed back so the caller can keep
    /// talking to the client and let it retry.
    pub async fn try_register(&self, username: &str, writer: Outbound) -> Result<(), Outbound> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(username) {
            return Err(writer);
        }
        sessions.insert(
            username.to_string(),
            Session::new(username.to_string(), writer),
        );
        Ok(())
    }

    /// Remove and return a session. Absent names are a no-op.
    pub async fn remove(&self, username: &str) -> Option<Session> {
        self.sessions.lock().await.remove(username)
    }

    /// Change one session's display attribute. Returns `false` if the user
    /// is no longer registered.
    pub async fn update_color(&self, username: &str, color: Color) -> bool {
        match self.sessions.lock().await.get_mut(username) {
            Some(session) => {
                session.set_color(color);
                true
            }
            None => false,
        }
    }

    /// Format `text` as a chat line in the sender's current color.
    ///
    /// Returns `None` when the line repeats the sender's previous broadcast
    /// (or the sender is gone); otherwise records it as the new last-sent
    /// line and returns it ready to enqueue.
    pub async fn prepare_chat(&self, username: &str, text: &str) -> Option<String> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(username)?;
        let line = String::from(Notice::Chat {
            username: username.to_string(),
            color: session.color(),
            text: text.to_string(),
        });
        session.remember_sent(&line).then_some(line)
    }

    /// Registered usernames, sorted. The lock is held only while copying.
    pub async fn snapshot(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    #[cfg(test)]
    pub async fn contains(&self, username: &str) -> bool {
        self.sessions.lock().await.contains_key(username)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Write `text` to every session in one locked pass: no session joins or
    /// leaves part way through, so each pass is wholly before or after any
    /// registration change.
    ///
    /// A failed write is logged and skipped; the session stays registered.
    pub async fn broadcast(&self, text: &str) -> Delivery {
        let mut report = Delivery::default();
        let mut sessions = self.sessions.lock().await;
        for session in sessions.values_mut() {
            match session.send(text).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(username = session.username(), error = %e, "broadcast write failed");
                    report.failed += 1;
                }
            }
        }
        debug!(
            delivered = report.delivered,
            failed = report.failed,
            "broadcast pass complete"
        );
        report
    }

    /// Write `text` to one registered user only.
    pub async fn send_to(&self, username: &str, text: &str) -> Result<(), ChatError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(username) {
            session.send(text).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, DuplexStream};

    use super::*;

    fn sink() -> Outbound {
        Box::new(tokio::io::sink())
    }

    fn pipe() -> (Outbound, DuplexStream) {
        let (near, far) = tokio::io::duplex(4096);
        (Box::new(near), far)
    }

    async fn read_available(stream: &mut DuplexStream, len: usize) -> String {
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let registry = SessionRegistry::new();
        assert!(registry.try_register("alice", sink()).await.is_ok());
        assert!(registry.try_register("alice", sink()).await.is_err());
        assert!(registry.try_register("bob", sink()).await.is_ok());
        assert_eq!(registry.snapshot().await, vec!["alice", "bob"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registrations_admit_one_per_name() {
        let registry = Arc::new(SessionRegistry::new());
        let names = ["alice", "bob", "carol"];

        let mut tasks = Vec::new();
        for i in 0..60 {
            let registry = Arc::clone(&registry);
            let name = names[i % names.len()];
            tasks.push(tokio::spawn(async move {
                registry.try_register(name, sink()).await.is_ok().then_some(name)
            }));
        }

        let mut winners = Vec::new();
        for task in tasks {
            if let Some(name) = task.await.unwrap() {
                winners.push(name);
            }
        }

        assert_eq!(winners.len(), names.len());
        let unique: HashSet<_> = winners.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert_eq!(registry.len().await, names.len());
    }

    #[tokio::test]
    async fn remove_is_safe_when_absent() {
        let registry = SessionRegistry::new();
        assert!(registry.remove("ghost").await.is_none());
        registry.try_register("alice", sink()).await.ok();
        assert!(registry.remove("alice").await.is_some());
        assert!(registry.remove("alice").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn prepare_chat_uses_color_and_suppresses_repeats() {
        let registry = SessionRegistry::new();
        registry.try_register("alice", sink()).await.ok();

        assert_eq!(
            registry.prepare_chat("alice", "hi").await.as_deref(),
            Some("alice: \x1b[0mhi\x1b[0m\n")
        );
        assert_eq!(registry.prepare_chat("alice", "hi").await, None);

        assert!(registry.update_color("alice", Color::Red).await);
        // Same text in a new color is a different line.
        assert_eq!(
            registry.prepare_chat("alice", "hi").await.as_deref(),
            Some("alice: \x1b[31mhi\x1b[0m\n")
        );

        assert!(!registry.update_color("ghost", Color::Red).await);
        assert_eq!(registry.prepare_chat("ghost", "hi").await, None);
    }

    #[tokio::test]
    async fn repeat_suppression_is_per_user() {
        let registry = SessionRegistry::new();
        registry.try_register("alice", sink()).await.ok();
        registry.try_register("bob", sink()).await.ok();

        assert!(registry.prepare_chat("alice", "same").await.is_some());
        assert!(registry.prepare_chat("bob", "same").await.is_some());
        assert!(registry.prepare_chat("alice", "same").await.is_none());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_registered_session_once() {
        let registry = SessionRegistry::new();
        let (alice_out, mut alice_in) = pipe();
        let (bob_out, mut bob_in) = pipe();
        registry.try_register("alice", alice_out).await.ok();
        registry.try_register("bob", bob_out).await.ok();

        let report = registry.broadcast("first\n").await;
        assert_eq!(report, Delivery { delivered: 2, failed: 0 });

        registry.remove("bob").await;
        registry.broadcast("second\n").await;

        assert_eq!(read_available(&mut alice_in, 13).await, "first\nsecond\n");
        // Bob left before the second pass and only ever saw the first line.
        assert_eq!(read_available(&mut bob_in, 6).await, "first\n");
    }

    #[tokio::test]
    async fn failed_write_does_not_block_other_recipients() {
        let registry = SessionRegistry::new();
        let (dead_out, dead_in) = pipe();
        drop(dead_in);
        let (live_out, mut live_in) = pipe();
        registry.try_register("dead", dead_out).await.ok();
        registry.try_register("live", live_out).await.ok();

        let report = registry.broadcast("ping\n").await;
        assert_eq!(report, Delivery { delivered: 1, failed: 1 });
        assert_eq!(read_available(&mut live_in, 5).await, "ping\n");
        // Failures never evict.
        assert!(registry.contains("dead").await);
    }

    #[tokio::test]
    async fn send_to_targets_one_session() {
        let registry = SessionRegistry::new();
        let (alice_out, mut alice_in) = pipe();
        let (bob_out, mut bob_in) = pipe();
        registry.try_register("alice", alice_out).await.ok();
        registry.try_register("bob", bob_out).await.ok();

        registry.send_to("bob", "just you\n").await.unwrap();
        registry.send_to("ghost", "nobody\n").await.unwrap();
        registry.broadcast("all\n").await;

        assert_eq!(read_available(&mut alice_in, 4).await, "all\n");
        assert_eq!(read_available(&mut bob_in, 13).await, "just you\nall\n");
    }
}
