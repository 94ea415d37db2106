//! Configuration loading and defaults.
//!
//! Configuration is resolved in order of precedence (highest wins):
//!
//! 1. **Environment variables** — `VALON_LISTEN`, `PORT` (binds
//!    `0.0.0.0:$PORT`, ignored when `VALON_LISTEN` is set),
//!    `VALON_MAX_SESSIONS`
//! 2. **Config file** — path via `--config <path>`, or `valon.toml` in CWD
//! 3. **Compiled defaults** — see each field's default value below
//!
//! The TOML file mirrors the struct hierarchy:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:5000"
//! max_sessions = 100
//! outbound_queue_size = 256
//! task_log_size = 1000
//! announce_on_connect = true
//! cors_permissive = true
//!
//! [commands]
//! broadcast = ["status"]   # results of these commands go to every session
//!
//! [logging]
//! level = "info"
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::commands::CommandRegistry;

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener and resource-limit settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind (default `0.0.0.0:5000`).
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Maximum concurrent WebSocket sessions (default 100). Upgrades beyond
    /// this are refused with `503`.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Capacity of each session's outbound queue (default 256). Messages to a
    /// session whose queue is full are dropped for that session only.
    #[serde(default = "default_outbound_queue_size")]
    pub outbound_queue_size: usize,
    /// Number of recent commands kept in the task log (default 1000).
    #[serde(default = "default_task_log_size")]
    pub task_log_size: usize,
    /// Send the status line to each client right after it connects (default true).
    #[serde(default = "default_true")]
    pub announce_on_connect: bool,
    /// Allow any origin on the REST endpoints (default true).
    #[serde(default = "default_true")]
    pub cors_permissive: bool,
}

/// Per-command delivery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandsConfig {
    /// Commands whose results are broadcast to every session (default `["status"]`).
    #[serde(default = "default_broadcast")]
    pub broadcast: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter level (default `info`). Overridden by `RUST_LOG` env var.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}
fn default_max_sessions() -> usize {
    100
}
fn default_outbound_queue_size() -> usize {
    256
}
fn default_task_log_size() -> usize {
    1000
}
fn default_true() -> bool {
    true
}
fn default_broadcast() -> Vec<String> {
    vec!["status".to_string()]
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_sessions: default_max_sessions(),
            outbound_queue_size: default_outbound_queue_size(),
            task_log_size: default_task_log_size(),
            announce_on_connect: default_true(),
            cors_permissive: default_true(),
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            broadcast: default_broadcast(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with the precedence chain: env vars > file > defaults.
    ///
    /// If `path` is `Some`, that file must exist. Otherwise looks for
    /// `valon.toml` in the current directory, falling back to compiled defaults.
    pub fn load(path: Option<&str>) -> Result<Self, String> {
        let mut config = if let Some(p) = path {
            Self::from_file(p)?
        } else if Path::new("valon.toml").exists() {
            Self::from_file("valon.toml")?
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {path}: {e}"))?;
        Self::from_toml(&content).map_err(|e| format!("Failed to parse config file {path}: {e}"))
    }

    /// Parse a TOML document; missing sections and fields take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Apply environment overrides, reading variables through `var`.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), String> {
        if let Some(listen) = var("VALON_LISTEN") {
            self.server.listen = listen;
        } else if let Some(port) = var("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| format!("PORT must be a port number, got {port:?}"))?;
            self.server.listen = format!("0.0.0.0:{port}");
        }
        if let Some(max) = var("VALON_MAX_SESSIONS") {
            self.server.max_sessions = max
                .parse()
                .map_err(|_| format!("VALON_MAX_SESSIONS must be an integer, got {max:?}"))?;
        }
        Ok(())
    }

    /// Reject settings that would make the server unusable.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.outbound_queue_size == 0 {
            return Err("server.outbound_queue_size must be at least 1".to_string());
        }
        if self.server.task_log_size == 0 {
            return Err("server.task_log_size must be at least 1".to_string());
        }
        CommandRegistry::new(self.commands.broadcast.as_slice())
            .map(|_| ())
            .map_err(|e| format!("[commands] {e}"))
    }
}
