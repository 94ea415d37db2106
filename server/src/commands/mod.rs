//! Command parsing, registration, and execution.
//!
//! ```text
//! parser.rs    — raw line -> Command
//! registry.rs  — name -> CommandKind table, per-command broadcast flag
//! handlers.rs  — status, calculate, system, help
//! ```

pub mod handlers;
pub mod parser;
pub mod registry;

pub use handlers::CommandContext;
pub use parser::{parse, Command};
pub use registry::{CommandKind, CommandRegistry, CommandSpec};

/// What a successful command produced and where it should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub text: String,
    /// Deliver to every session rather than only the sender.
    pub broadcast: bool,
}
