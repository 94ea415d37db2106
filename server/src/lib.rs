#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

//! valon library: the command-dispatch core and its HTTP/WebSocket surface.
//!
//! - `commands` — line parser, command registry, handlers
//! - `sessions` — session registry with ordered, lock-serialized broadcast
//! - `dispatcher` — parse → lookup → execute → deliver
//! - `monitor` — process memory/uptime sampler
//! - `tasks` — in-memory log of executed commands
//! - `ws` — WebSocket transport
//! - `routes` — REST endpoints and router assembly
//! - `config` — configuration loading

pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod monitor;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod tasks;
pub mod ws;

// Re-export key types at crate root for convenience.
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use routes::router;
pub use sessions::{SessionId, SessionRegistry};
pub use state::AppState;
