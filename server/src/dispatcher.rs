//! Inbound message routing: parse → lookup → execute → deliver.
//!
//! The [`Dispatcher`] is transport-independent. The WebSocket layer calls
//! [`Dispatcher::connect`], [`Dispatcher::handle_message`] and
//! [`Dispatcher::disconnect`]; the REST layer calls [`Dispatcher::execute`]
//! directly.
//!
//! ## Failure isolation
//!
//! Every [`DispatchError`] is turned into an `error: ...` reply for the
//! originating session only. Nothing a single command does can remove another
//! session or stop the dispatcher.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::commands::{self, handlers, CommandContext, CommandRegistry, CommandResult};
use crate::error::{CommandError, DispatchError};
use crate::monitor::SystemMonitor;
use crate::sessions::{SessionId, SessionRegistry};
use crate::tasks::{TaskLog, TaskOrigin, TaskStatus};

/// A successfully executed command.
#[derive(Debug, Clone)]
pub struct Executed {
    pub result: CommandResult,
    pub task_id: u64,
}

/// Routes command lines to handlers and results to sessions.
///
/// Cloneable; all clones share the same registries and counters.
#[derive(Clone)]
pub struct Dispatcher {
    commands: Arc<CommandRegistry>,
    sessions: SessionRegistry,
    monitor: SystemMonitor,
    tasks: Arc<TaskLog>,
    commands_executed: Arc<AtomicU64>,
    announce_on_connect: bool,
    max_sessions: usize,
}

impl Dispatcher {
    pub fn new(
        commands: CommandRegistry,
        sessions: SessionRegistry,
        monitor: SystemMonitor,
        tasks: Arc<TaskLog>,
    ) -> Self {
        Self {
            commands: Arc::new(commands),
            sessions,
            monitor,
            tasks,
            commands_executed: Arc::new(AtomicU64::new(0)),
            announce_on_connect: false,
            max_sessions: usize::MAX,
        }
    }

    /// Send the current status line to each newly connected session.
    #[must_use]
    pub fn with_announce_on_connect(mut self, announce: bool) -> Self {
        self.announce_on_connect = announce;
        self
    }

    /// Refuse connections once `max` sessions are registered.
    #[must_use]
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn monitor(&self) -> &SystemMonitor {
        &self.monitor
    }

    pub fn tasks(&self) -> &TaskLog {
        &self.tasks
    }

    /// Number of non-empty commands processed since startup.
    pub fn commands_executed(&self) -> u64 {
        self.commands_executed.load(Ordering::Relaxed)
    }

    /// Transport opened: register a session around its outbound queue.
    ///
    /// Returns `None` when the session limit is reached. The connect-time
    /// status line reports the count the session joined.
    pub async fn connect(&self, outbound: mpsc::Sender<String>) -> Option<SessionId> {
        let announce = self.announce_on_connect;
        let uptime = self.monitor.sample().uptime_seconds;
        let id = self
            .sessions
            .try_register(outbound, self.max_sessions, |count| {
                announce.then(|| handlers::status_line(count, uptime))
            })
            .await;
        match id {
            Some(id) => info!(session_id = %id, "client connected"),
            None => warn!(max = self.max_sessions, "session limit reached, connection refused"),
        }
        id
    }

    /// Transport closed or failed. Safe to call more than once.
    pub async fn disconnect(&self, id: &SessionId) {
        if self.sessions.unregister(id).await {
            info!(session_id = %id, "client disconnected");
        }
    }

    /// Process one inbound line from `origin` and deliver the outcome.
    pub async fn handle_message(&self, origin: &SessionId, raw: &str) {
        match self.execute(TaskOrigin::Ws(*origin), raw).await {
            Ok(executed) if executed.result.broadcast => {
                // Already fanned out by `execute`.
            }
            Ok(executed) => {
                self.sessions.send_to(origin, &executed.result.text).await;
            }
            Err(e) => {
                self.sessions.send_to(origin, &e.reply_line()).await;
            }
        }
    }

    /// Parse, look up and run `raw`, recording it in the task log.
    ///
    /// Broadcast results are delivered to every session here; non-broadcast
    /// results are returned for the caller to deliver.
    pub async fn execute(&self, origin: TaskOrigin, raw: &str) -> Result<Executed, DispatchError> {
        let command = commands::parse(raw).map_err(|e| {
            debug!(origin = ?origin, "rejected line: {e}");
            DispatchError::from(e)
        })?;

        self.commands_executed.fetch_add(1, Ordering::Relaxed);

        let outcome = match self.commands.lookup(&command.name) {
            Some(spec) => {
                let ctx = CommandContext {
                    sessions: self.sessions.snapshot().await,
                    monitor: self.monitor.sample(),
                    commands: self.commands.names(),
                };
                spec.kind
                    .execute(command.argument.as_deref(), &ctx)
                    .map(|text| CommandResult {
                        text,
                        broadcast: spec.broadcast,
                    })
            }
            None => Err(CommandError::UnknownCommand(command.name.clone())),
        };

        match outcome {
            Ok(result) => {
                let task_id = self
                    .tasks
                    .record(
                        command.to_string(),
                        origin,
                        TaskStatus::Completed,
                        result.text.clone(),
                    )
                    .await;
                debug!(origin = ?origin, task_id, command = %command, broadcast = result.broadcast, "command completed");
                if result.broadcast {
                    self.sessions.broadcast(&result.text).await;
                }
                Ok(Executed { result, task_id })
            }
            Err(e) => {
                let e = DispatchError::from(e);
                let task_id = self
                    .tasks
                    .record(command.to_string(), origin, TaskStatus::Failed, e.reply_line())
                    .await;
                debug!(origin = ?origin, task_id, command = %command, code = e.code(), "command failed");
                Err(e)
            }
        }
    }
}
