//! In-memory task log of executed commands.
//!
//! Every command that makes it past parsing is recorded here with its outcome,
//! for the `/api/tasks` and `/api/status` endpoints.
//!
//! ## Design
//!
//! - **Ring buffer**: `VecDeque<TaskEntry>` capped at `max_entries` (default 1000).
//!   Old entries are silently dropped when the buffer is full.
//! - **Monotonic IDs**: each entry gets a unique, always-increasing `id`
//!   starting at 1; `total()` is therefore the number ever recorded.
//! - Nothing is persisted; the log lives and dies with the process.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;

use crate::sessions::SessionId;

/// Where a command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "session_id")]
pub enum TaskOrigin {
    Ws(SessionId),
    Rest,
}

/// Outcome of a recorded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Failed,
}

/// A single task log entry.
#[derive(Debug, Clone, Serialize)]
pub struct TaskEntry {
    pub id: u64,
    /// Epoch milliseconds.
    pub timestamp: u64,
    pub command: String,
    pub origin: TaskOrigin,
    pub status: TaskStatus,
    /// Reply text, or the error line for failed tasks.
    pub result: String,
}

/// Fixed-capacity ring buffer of [`TaskEntry`] items.
pub struct TaskLog {
    entries: RwLock<VecDeque<TaskEntry>>,
    next_id: AtomicU64,
    max_entries: usize,
}

impl TaskLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_entries.min(1024))),
            next_id: AtomicU64::new(1),
            max_entries: max_entries.max(1),
        }
    }

    /// Append an entry and return the assigned ID.
    pub async fn record(
        &self,
        command: String,
        origin: TaskOrigin,
        status: TaskStatus,
        result: String,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        #[allow(clippy::cast_possible_truncation)]
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let entry = TaskEntry {
            id,
            timestamp,
            command,
            origin,
            status,
            result,
        };

        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);

        id
    }

    /// The newest `limit` entries, oldest first.
    pub async fn recent(&self, limit: usize) -> Vec<TaskEntry> {
        let entries = self.entries.read().await;
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Number of tasks ever recorded, including evicted ones.
    pub fn total(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed) - 1
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}
