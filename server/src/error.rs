//! Error taxonomy for command processing.
//!
//! Every variant here is recoverable and local to the session that sent the
//! command. The dispatcher turns them into `error: <message>` reply lines; the
//! REST surface additionally reports [`DispatchError::code`].

use thiserror::Error;

/// Failure to turn a raw line into a [`crate::commands::Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input was blank, or had no command name before the `:` separator.
    #[error("empty command")]
    Empty,
}

/// Failure while looking up or executing a parsed command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("invalid expression '{expression}': {reason}")]
    InvalidExpression {
        expression: String,
        reason: &'static str,
    },
    #[error("unknown resource '{0}' (expected memory, uptime or users)")]
    UnknownResource(String),
}

/// Anything that can go wrong between receiving a line and producing a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl DispatchError {
    /// Stable machine-readable code, used in REST error bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse(ParseError::Empty) => "EMPTY_COMMAND",
            Self::Command(CommandError::UnknownCommand(_)) => "UNKNOWN_COMMAND",
            Self::Command(CommandError::InvalidExpression { .. }) => "INVALID_EXPRESSION",
            Self::Command(CommandError::UnknownResource(_)) => "UNKNOWN_RESOURCE",
        }
    }

    /// The reply line delivered to the originating session.
    #[must_use]
    pub fn reply_line(&self) -> String {
        format!("error: {self}")
    }
}
