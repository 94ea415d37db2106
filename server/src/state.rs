//! Shared application state passed to every handler via Axum's `State` extractor.

use std::sync::Arc;

use tokio::sync::watch;

use crate::commands::CommandRegistry;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::monitor::SystemMonitor;
use crate::sessions::SessionRegistry;
use crate::tasks::TaskLog;

/// Shared application state for the valon server.
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration loaded at startup.
    pub config: Arc<Config>,
    /// Command routing; owns the session registry, monitor and task log.
    pub dispatcher: Dispatcher,
    /// Flips to `true` once shutdown starts; connection workers watch it.
    pub shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Wire up the registries described by `config`.
    pub fn new(config: Config) -> Result<Self, String> {
        let commands = CommandRegistry::new(config.commands.broadcast.as_slice())?;
        let dispatcher = Dispatcher::new(
            commands,
            SessionRegistry::new(),
            SystemMonitor::new(),
            Arc::new(TaskLog::new(config.server.task_log_size)),
        )
        .with_announce_on_connect(config.server.announce_on_connect)
        .with_max_sessions(config.server.max_sessions);

        Ok(Self {
            config: Arc::new(config),
            dispatcher,
            shutdown: Arc::new(watch::channel(false).0),
        })
    }

    /// Tell every connection worker to close its session.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
