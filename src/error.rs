//! Error taxonomy and the injectable error sink

use serde_json::Value;
use std::fmt;

pub type Result<T> = std::result::Result<T, MacroError>;

/// Errors raised inside the engine.
///
/// None of these escape the public engine surface: invocation failures are
/// handed to an [`ErrorSink`], invalid arguments are shown to the user, and
/// await timeouts are only logged.
#[derive(Debug, thiserror::Error)]
pub enum MacroError {
    #[error("{phase}: '{command}' failed: {reason} (args: {args})")]
    Invocation {
        command: String,
        args: String,
        phase: Phase,
        reason: String,
    },

    #[error("Timeout after {timeout_ms}ms waiting for '{spec}'")]
    AwaitTimeout { spec: String, timeout_ms: u64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid await spec: {0}")]
    InvalidAwaitSpec(String),

    #[error("Failed to parse settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl MacroError {
    pub fn invocation(command: &str, args: Option<&Value>, phase: Phase, reason: impl Into<String>) -> Self {
        Self::Invocation {
            command: command.to_string(),
            args: args.map(Value::to_string).unwrap_or_else(|| "null".to_string()),
            phase,
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Where an operation was invoked from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Playback,
    Wrap,
    /// Body of a guarded or queued call
    Command,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Playback => "playback",
            Phase::Wrap => "wrap",
            Phase::Command => "command",
        };
        f.write_str(name)
    }
}

/// Failure reported by the host editor when it cannot perform an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for HostError {}

/// Receives errors caught by guarded calls, queued calls and playback
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &MacroError);
}

/// Default sink: logs through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, error: &MacroError) {
        tracing::error!("[kb-macro] {}", error);
    }
}
