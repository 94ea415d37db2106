//! Process-wide registry of connected sessions.
//!
//! [`SessionRegistry`] is the single owner of every [`Session`]. It supports
//! register, unregister, targeted send, and broadcast.
//!
//! ## Concurrency
//!
//! All operations, including broadcast, go through one `Mutex`. A broadcast
//! therefore sees either the state before or after any concurrent
//! register/unregister, never a half-removed session. Delivery inside the lock
//! is `try_send`, so a stalled or closed client cannot hold it up.
//!
//! ## Eviction
//!
//! A session whose queue is full or closed is removed in the same critical
//! section that failed to deliver to it. Dropping it closes the queue, which
//! ends the connection's writer. Every registered session has therefore
//! received every broadcast made since it joined.
//!
//! ## Ordering
//!
//! The map preserves insertion order and removal uses `shift_remove`, so
//! broadcast visits sessions oldest first.

pub mod session;

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

pub use session::{Delivery, Session, SessionId};

/// Shared handle to the session pool.
///
/// Cloneable; all clones share the same inner `Arc<Mutex<...>>`.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<IndexMap<SessionId, Session>>>,
}

/// Summary of one session, as exposed to command handlers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub connected_at: u64,
}

/// Read-only view of the registry at one instant.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrySnapshot {
    pub count: usize,
    /// Sessions in registration order.
    pub sessions: Vec<SessionInfo>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session around `outbound` and return its id.
    pub async fn register(&self, outbound: mpsc::Sender<String>) -> SessionId {
        let mut sessions = self.sessions.lock().await;
        insert(&mut sessions, Session::new(outbound))
    }

    /// Register only while fewer than `max` sessions exist.
    ///
    /// `greeting` receives the count including the new session; the line it
    /// returns is queued before any broadcast can reach the session.
    pub async fn try_register<F>(
        &self,
        outbound: mpsc::Sender<String>,
        max: usize,
        greeting: F,
    ) -> Option<SessionId>
    where
        F: FnOnce(usize) -> Option<String>,
    {
        let mut sessions = self.sessions.lock().await;
        if sessions.len() >= max {
            debug!(max, "session limit reached");
            return None;
        }
        let session = Session::new(outbound);
        if let Some(line) = greeting(sessions.len() + 1) {
            session.deliver(&line);
        }
        Some(insert(&mut sessions, session))
    }

    /// Remove a session. Returns `false` if it was already gone.
    pub async fn unregister(&self, id: &SessionId) -> bool {
        let mut sessions = self.sessions.lock().await;
        if sessions.shift_remove(id).is_some() {
            debug!(session_id = %id, count = sessions.len(), "session unregistered");
            true
        } else {
            false
        }
    }

    /// Enqueue `message` on one session. A missing session is not an error;
    /// a session that cannot take the message is evicted.
    pub async fn send_to(&self, id: &SessionId, message: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get(id) else {
            debug!(session_id = %id, "reply dropped, session gone");
            return false;
        };
        match session.deliver(message) {
            Delivery::Queued => true,
            delivery => {
                evict(&mut sessions, id, delivery);
                false
            }
        }
    }

    /// Enqueue `message` on every registered session, oldest first.
    ///
    /// Sessions that cannot take it are evicted. Returns how many sessions
    /// accepted the message, which is the registered count afterwards.
    pub async fn broadcast(&self, message: &str) -> usize {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|id, session| match session.deliver(message) {
            Delivery::Queued => true,
            Delivery::Full => {
                warn!(session_id = %id, "outbound queue full, evicting session");
                false
            }
            Delivery::Closed => {
                debug!(session_id = %id, "outbound queue closed, evicting session");
                false
            }
        });
        debug!(recipients = sessions.len(), "broadcast");
        sessions.len()
    }

    /// Number of registered sessions.
    pub async fn count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Count and list of sessions at this instant.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        let sessions = self.sessions.lock().await;
        RegistrySnapshot {
            count: sessions.len(),
            sessions: sessions
                .values()
                .map(|s| SessionInfo {
                    session_id: s.id(),
                    connected_at: s.connected_at(),
                })
                .collect(),
        }
    }
}

fn insert(sessions: &mut IndexMap<SessionId, Session>, session: Session) -> SessionId {
    let id = session.id();
    sessions.insert(id, session);
    debug!(session_id = %id, count = sessions.len(), "session registered");
    id
}

fn evict(sessions: &mut IndexMap<SessionId, Session>, id: &SessionId, delivery: Delivery) {
    sessions.shift_remove(id);
    match delivery {
        Delivery::Full => warn!(session_id = %id, "outbound queue full, evicting session"),
        _ => debug!(session_id = %id, "outbound queue closed, evicting session"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        mpsc::channel(64)
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn test_register_and_snapshot() {
        let registry = SessionRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let a = registry.register(tx1).await;
        let b = registry.register(tx2).await;
        assert_ne!(a, b);

        let snap = registry.snapshot().await;
        assert_eq!(snap.count, 2);
        let ids: Vec<_> = snap.sessions.iter().map(|s| s.session_id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = channel();
        let id = registry.register(tx).await;
        assert!(registry.unregister(&id).await);
        assert!(!registry.unregister(&id).await);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_unregister_closes_outbound_queue() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = channel();
        let id = registry.register(tx).await;
        registry.unregister(&id).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_registered_sessions_only() {
        let registry = SessionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        let gone = registry.register(tx1).await;
        let _stays = registry.register(tx2).await;
        registry.unregister(&gone).await;

        assert_eq!(registry.broadcast("first").await, 1);

        let (tx3, mut rx3) = channel();
        registry.register(tx3).await;
        assert_eq!(registry.broadcast("second").await, 2);

        assert!(drain(&mut rx1).is_empty());
        assert_eq!(drain(&mut rx2), vec!["first", "second"]);
        assert_eq!(drain(&mut rx3), vec!["second"]);
    }

    #[tokio::test]
    async fn test_removal_preserves_registration_order() {
        let registry = SessionRegistry::new();
        let mut ids = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..5 {
            let (tx, rx) = channel();
            ids.push(registry.register(tx).await);
            receivers.push(rx);
        }
        registry.unregister(&ids[2]).await;

        let remaining: Vec<_> = registry
            .snapshot()
            .await
            .sessions
            .iter()
            .map(|s| s.session_id)
            .collect();
        assert_eq!(remaining, vec![ids[0], ids[1], ids[3], ids[4]]);

        assert_eq!(registry.broadcast("ping").await, 4);
        for (i, rx) in receivers.iter_mut().enumerate() {
            let expected: Vec<String> = if i == 2 { vec![] } else { vec!["ping".into()] };
            assert_eq!(drain(rx), expected);
        }
    }

    #[tokio::test]
    async fn test_send_to_missing_session_is_noop() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = channel();
        let id = registry.register(tx).await;
        let (other_tx, _other_rx) = channel();
        let other = registry.register(other_tx).await;
        registry.unregister(&other).await;

        assert!(!registry.send_to(&other, "lost").await);
        assert!(registry.send_to(&id, "kept").await);
        assert_eq!(drain(&mut rx), vec!["kept"]);
    }

    #[tokio::test]
    async fn test_full_queue_evicts_slow_session() {
        let registry = SessionRegistry::new();
        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = channel();
        let slow = registry.register(slow_tx).await;
        let fast = registry.register(fast_tx).await;

        assert_eq!(registry.broadcast("a").await, 2);
        assert_eq!(registry.broadcast("b").await, 1);

        let snap = registry.snapshot().await;
        assert_eq!(snap.count, 1);
        assert_eq!(snap.sessions[0].session_id, fast);
        assert_eq!(registry.broadcast("c").await, snap.count);

        assert_eq!(drain(&mut fast_rx), vec!["a", "b", "c"]);
        // The evicted session keeps what was queued, then its queue ends.
        assert_eq!(slow_rx.recv().await.as_deref(), Some("a"));
        assert!(slow_rx.recv().await.is_none());
        assert!(!registry.unregister(&slow).await);
    }

    #[tokio::test]
    async fn test_send_to_full_queue_evicts() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::channel(1);
        let id = registry.register(tx).await;

        assert!(registry.send_to(&id, "one").await);
        assert!(!registry.send_to(&id, "two").await);
        assert_eq!(registry.count().await, 0);
        assert_eq!(drain(&mut rx), vec!["one"]);
    }

    #[tokio::test]
    async fn test_closed_transport_is_evicted() {
        let registry = SessionRegistry::new();
        let (closed_tx, closed_rx) = channel();
        let (open_tx, mut open_rx) = channel();
        registry.register(closed_tx).await;
        registry.register(open_tx).await;
        drop(closed_rx);

        assert_eq!(registry.broadcast("hello").await, 1);
        assert_eq!(registry.count().await, 1);
        assert_eq!(drain(&mut open_rx), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_try_register_enforces_limit() {
        let registry = SessionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, _rx2) = channel();

        let first = registry
            .try_register(tx1, 1, |count| Some(format!("joined as {count}")))
            .await;
        assert!(first.is_some());
        assert_eq!(drain(&mut rx1), vec!["joined as 1"]);

        let second = registry.try_register(tx2, 1, |_| None).await;
        assert!(second.is_none());
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_try_register_never_overshoots() {
        let registry = SessionRegistry::new();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (tx, rx) = channel();
                let id = registry.try_register(tx, 10, |_| None).await;
                (id, rx)
            }));
        }

        let mut accepted = Vec::new();
        for handle in handles {
            let (id, rx) = handle.await.unwrap();
            if id.is_some() {
                accepted.push(rx);
            }
        }
        assert_eq!(accepted.len(), 10);
        assert_eq!(registry.count().await, 10);
    }

    #[tokio::test]
    async fn test_greeting_precedes_broadcasts() {
        let registry = SessionRegistry::new();
        let (tx0, _rx0) = channel();
        registry.register(tx0).await;

        let (tx, mut rx) = channel();
        registry
            .try_register(tx, usize::MAX, |count| Some(format!("{count} sessions")))
            .await
            .unwrap();
        registry.broadcast("later").await;
        assert_eq!(drain(&mut rx), vec!["2 sessions", "later"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutation_keeps_count_consistent() {
        let registry = SessionRegistry::new();
        let mut handles = Vec::new();

        for worker in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let mut kept = Vec::new();
                for i in 0..50 {
                    let (tx, rx) = mpsc::channel(1024);
                    let id = registry.register(tx).await;
                    registry.broadcast("noise").await;
                    if (worker + i) % 3 == 0 {
                        registry.unregister(&id).await;
                        registry.unregister(&id).await;
                    } else {
                        kept.push(rx);
                    }
                }
                kept
            }));
        }

        let mut receivers = Vec::new();
        for handle in handles {
            receivers.extend(handle.await.unwrap());
        }

        let count = registry.snapshot().await.count;
        assert_eq!(count, receivers.len());
        assert_eq!(registry.broadcast("final").await, count);

        let mut got_final = 0;
        for rx in &mut receivers {
            if drain(rx).last().map(String::as_str) == Some("final") {
                got_final += 1;
            }
        }
        assert_eq!(got_final, count);
    }
}
