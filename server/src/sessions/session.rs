//! A single connected client.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Opaque, never-reused session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome of pushing one message onto a session's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queue at capacity; the client is not keeping up.
    Full,
    /// Transport side has gone away; the session is being torn down.
    Closed,
}

/// One connected client and its outbound queue.
///
/// The session owns the sending half of the queue. The transport holds the
/// receiving half, which ends once the session is dropped by the registry.
pub struct Session {
    id: SessionId,
    /// Epoch milliseconds when the connection was accepted.
    connected_at: u64,
    outbound: mpsc::Sender<String>,
}

impl Session {
    pub(crate) fn new(outbound: mpsc::Sender<String>) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let connected_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            id: SessionId::new(),
            connected_at,
            outbound,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn connected_at(&self) -> u64 {
        self.connected_at
    }

    /// Enqueue without waiting; never blocks the caller.
    pub(crate) fn deliver(&self, message: &str) -> Delivery {
        match self.outbound.try_send(message.to_string()) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}
