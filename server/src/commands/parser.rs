//! Line parser: `name[:argument]` -> [`Command`].

use std::fmt;

use crate::error::ParseError;

/// A parsed command line.
///
/// `name` is always non-empty, trimmed and lower-cased. `argument` is trimmed
/// with its casing preserved, and is `None` when nothing follows the separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub argument: Option<String>,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.argument {
            Some(ref arg) => write!(f, "{}:{arg}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Parse a raw line into a [`Command`].
///
/// Splits on the first `:`. Unknown names are not rejected here.
pub fn parse(raw: &str) -> Result<Command, ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseError::Empty);
    }

    let (name, argument) = match raw.split_once(':') {
        Some((name, rest)) => (name, Some(rest.trim())),
        None => (raw, None),
    };

    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(Command {
        name,
        argument: argument.filter(|a| !a.is_empty()).map(ToString::to_string),
    })
}
