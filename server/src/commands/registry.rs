//! Fixed name -> handler mapping, built once at startup.

use std::collections::HashMap;

use super::handlers::{self, CommandContext};
use crate::error::CommandError;

/// One registered command. Dispatch is a `match` on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Status,
    Calculate,
    System,
    Help,
}

impl CommandKind {
    /// Every command, in registration order.
    pub const ALL: [Self; 4] = [Self::Status, Self::Calculate, Self::System, Self::Help];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Calculate => "calculate",
            Self::System => "system",
            Self::Help => "help",
        }
    }

    /// Run the handler. Never blocks.
    pub fn execute(self, argument: Option<&str>, ctx: &CommandContext<'_>) -> Result<String, CommandError> {
        match self {
            Self::Status => handlers::status(argument, ctx),
            Self::Calculate => handlers::calculate(argument, ctx),
            Self::System => handlers::system(argument, ctx),
            Self::Help => handlers::help(argument, ctx),
        }
    }
}

/// A registry entry: which handler, and whether its result goes to everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub kind: CommandKind,
    pub broadcast: bool,
}

/// Immutable lookup table of registered commands.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    entries: HashMap<&'static str, CommandSpec>,
    names: Vec<&'static str>,
}

impl CommandRegistry {
    /// Build the table, marking the commands named in `broadcast` as broadcast.
    ///
    /// Fails if `broadcast` names a command that doesn't exist.
    pub fn new<S: AsRef<str>>(broadcast: &[S]) -> Result<Self, String> {
        if let Some(unknown) = broadcast
            .iter()
            .map(AsRef::as_ref)
            .find(|name| !CommandKind::ALL.iter().any(|k| k.name() == *name))
        {
            return Err(format!("unknown command '{unknown}' in broadcast list"));
        }

        let entries = CommandKind::ALL
            .iter()
            .map(|&kind| {
                let spec = CommandSpec {
                    kind,
                    broadcast: broadcast.iter().any(|b| b.as_ref() == kind.name()),
                };
                (kind.name(), spec)
            })
            .collect();

        Ok(Self {
            entries,
            names: CommandKind::ALL.iter().map(|k| k.name()).collect(),
        })
    }

    /// Find a command by its (already lower-cased) name.
    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.entries.get(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }
}

impl Default for CommandRegistry {
    /// `status` broadcasts, everything else replies to the sender only.
    fn default() -> Self {
        Self::new(&["status"]).unwrap_or_else(|_| unreachable!("status is a registered command"))
    }
}
