//! Command implementations.
//!
//! Every handler is a plain function over a pre-taken [`CommandContext`]: no
//! locks, no I/O, no suspension.

use crate::error::CommandError;
use crate::monitor::MonitorSnapshot;
use crate::sessions::RegistrySnapshot;

/// Read-only state visible to handlers, captured just before execution.
#[derive(Debug, Clone)]
pub struct CommandContext<'a> {
    pub sessions: RegistrySnapshot,
    pub monitor: MonitorSnapshot,
    /// Registered command names, in registration order.
    pub commands: &'a [&'static str],
}

/// `status` — session count and uptime.
pub fn status(_argument: Option<&str>, ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    Ok(status_line(ctx.sessions.count, ctx.monitor.uptime_seconds))
}

/// Format the status line shared by the `status` command and connect announcements.
pub fn status_line(sessions: usize, uptime_seconds: u64) -> String {
    format!("status: {sessions} sessions, uptime {uptime_seconds}s")
}

/// `calculate:<lhs><op><rhs>` — one binary operation over decimal operands.
pub fn calculate(argument: Option<&str>, _ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    let expression = argument.unwrap_or("").trim();
    let invalid = |reason: &'static str| CommandError::InvalidExpression {
        expression: expression.to_string(),
        reason,
    };

    if expression.is_empty() {
        return Err(invalid("no expression provided"));
    }

    let (op_idx, op) = find_operator(expression).ok_or_else(|| invalid("expected <number><op><number>"))?;
    let lhs = parse_operand(&expression[..op_idx]).ok_or_else(|| invalid("left operand is not a number"))?;
    let rhs = parse_operand(&expression[op_idx + 1..])
        .ok_or_else(|| invalid("right operand is not a number"))?;

    let value = match op {
        Operator::Add => lhs + rhs,
        Operator::Sub => lhs - rhs,
        Operator::Mul => lhs * rhs,
        Operator::Div => {
            if rhs == 0.0 {
                return Err(invalid("division by zero"));
            }
            lhs / rhs
        }
    };

    if !value.is_finite() {
        return Err(invalid("result out of range"));
    }
    Ok(format_number(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Sub),
            '*' => Some(Self::Mul),
            '/' => Some(Self::Div),
            _ => None,
        }
    }
}

/// Locate the binary operator: the first `+ - * /` that follows a digit or `.`
/// (ignoring whitespace), so leading signs and exponents stay with their operand.
fn find_operator(expression: &str) -> Option<(usize, Operator)> {
    let mut prev: Option<char> = None;
    for (idx, c) in expression.char_indices() {
        if let Some(op) = Operator::from_char(c) {
            if prev.is_some_and(|p| p.is_ascii_digit() || p == '.') {
                return Some((idx, op));
            }
        }
        if !c.is_whitespace() {
            prev = Some(c);
        }
    }
    None
}

fn parse_operand(s: &str) -> Option<f64> {
    let s = s.trim();
    // Reject words f64 would otherwise accept ("inf", "NaN").
    if !s.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'+' | b'-' | b'e' | b'E')) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Render integral values without a fractional part.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// `system:<resource>` — one field of the monitor sample, or the session list.
pub fn system(argument: Option<&str>, ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    match argument {
        Some("memory") => Ok(format!("memory: {} bytes", ctx.monitor.memory_bytes)),
        Some("uptime") => Ok(format!("uptime: {}s", ctx.monitor.uptime_seconds)),
        Some("users") => Ok(users_line(&ctx.sessions)),
        other => Err(CommandError::UnknownResource(other.unwrap_or("").to_string())),
    }
}

/// `users: 2 sessions (<id>, <id>)`, oldest session first.
fn users_line(snapshot: &RegistrySnapshot) -> String {
    if snapshot.sessions.is_empty() {
        return format!("users: {} sessions", snapshot.count);
    }
    let ids: Vec<String> = snapshot
        .sessions
        .iter()
        .map(|s| s.session_id.to_string())
        .collect();
    format!("users: {} sessions ({})", snapshot.count, ids.join(", "))
}

/// `help` — the registered command names.
pub fn help(_argument: Option<&str>, ctx: &CommandContext<'_>) -> Result<String, CommandError> {
    Ok(format!("commands: {}", ctx.commands.join(", ")))
}
