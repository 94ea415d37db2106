#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # valon
//!
//! Real-time multi-user command dashboard.
//!
//! Clients connect over a WebSocket, send short command lines (`status`,
//! `help`, `calculate:2+2`, `system:memory`) and receive one reply line per
//! command, plus broadcast lines when a command's result is shared with every
//! connected client.
//!
//! ## API surface
//!
//! | Method | Path           | Description                              |
//! |--------|----------------|------------------------------------------|
//! | GET    | `/api/health`  | Liveness probe                           |
//! | GET    | `/api/status`  | Uptime, memory, counters                 |
//! | POST   | `/api/execute` | Run one command, reply in the body       |
//! | GET    | `/api/tasks`   | Recent commands and outcomes             |
//! | GET    | `/api/ws`      | WebSocket for interactive commands       |
//!
//! ## Architecture
//!
//! ```text
//! main.rs          — entry point, clap subcommands, graceful shutdown
//! config.rs        — TOML + env-var configuration
//! error.rs         — ParseError / CommandError / DispatchError
//! commands/
//!   parser.rs      — raw line -> Command
//!   registry.rs    — fixed name -> handler table
//!   handlers.rs    — status, calculate, system, help
//! sessions/
//!   session.rs     — Session (id, connect time, outbound queue)
//!   mod.rs         — SessionRegistry (register, unregister, broadcast)
//! dispatcher.rs    — parse → lookup → execute → deliver
//! monitor.rs       — memory / uptime sampler
//! tasks.rs         — in-memory task log
//! ws/
//!   mod.rs         — WebSocket upgrade and per-connection worker
//! routes/
//!   health.rs      — GET /api/health
//!   status.rs      — GET /api/status
//!   execute.rs     — POST /api/execute
//!   tasks.rs       — GET /api/tasks
//! ```

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};

use valon::{AppState, Config};

/// Real-time multi-user command dashboard.
#[derive(Parser)]
#[command(name = "valon", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Path to TOML config file (when no subcommand is given).
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP/WS server (default when no subcommand given).
    Serve,
    /// Print the effective configuration and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("valon: configuration error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::CheckConfig) => {
            println!("{config:#?}");
        }
        Some(Commands::Serve) | None => run_server(config).await,
    }
}

async fn run_server(config: Config) {
    // Initialize tracing
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    info!("valon v{} starting", env!("CARGO_PKG_VERSION"));
    info!("Listening on {}", config.server.listen);

    let state = match AppState::new(config) {
        Ok(s) => s,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let app = valon::router(state.clone());

    let listener = match TcpListener::bind(&state.config.server.listen).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {e}", state.config.server.listen);
            std::process::exit(1);
        }
    };

    info!("Server ready");

    let shutdown_state = state.clone();
    let shutdown = async move {
        shutdown_signal().await;
        info!("Shutting down...");
        // Open WebSocket sessions keep graceful shutdown pending until released.
        let notified = shutdown_state
            .dispatcher
            .sessions()
            .broadcast("server: shutting down")
            .await;
        info!(sessions = notified, "Notified connected sessions");
        shutdown_state.begin_shutdown();
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!("Server error: {e}");
    }

    info!("Goodbye");
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                error!("Failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
                info!("Received SIGINT");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received SIGINT");
    }
}
