//! Error types for forticonsole

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a [`Transport`](crate::Transport) while sending or
/// waiting for output.
///
/// These are the low-level conditions of the pseudo-terminal channel. The
/// console layers wrap them into [`ConsoleError`] so callers see which
/// step of the interaction failed.
#[derive(Error, Debug)]
pub enum ExpectError {
    /// None of the awaited patterns appeared in time.
    #[error("Timeout waiting for pattern (after {duration:?})")]
    Timeout {
        /// Duration that was waited before giving up
        duration: Duration,
    },

    /// The output stream ended before any awaited pattern matched.
    #[error("EOF reached before pattern matched")]
    Eof,

    /// Invalid pattern.
    #[error("Invalid pattern: {0}")]
    PatternError(#[from] PatternError),

    /// I/O error on the pseudo-terminal.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// PTY creation or manipulation failed.
    #[error("PTY error: {0}")]
    PtyError(String),

    /// The ssh client (or other command) could not be started.
    #[error("Failed to spawn process: {0}")]
    SpawnError(String),

    /// The transport was already closed.
    #[error("Transport is closed")]
    Closed,
}

/// Errors related to pattern creation.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Invalid regex pattern.
    #[error("Invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// Empty pattern.
    #[error("Pattern cannot be empty")]
    EmptyPattern,
}

/// Errors surfaced by the console session, the reboot tracker and the
/// actions.
///
/// Actions never return these to their caller: they are rendered into the
/// action transcript and turn the result into a failure.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Process spawn, pty or stream failure.
    #[error("transport error: {0}")]
    Transport(#[source] ExpectError),

    /// The console server kept resetting the connection.
    #[error("console server reset the connection {attempts} times in a row")]
    ConnectionReset {
        /// Connection attempts made before giving up
        attempts: u32,
    },

    /// The device rejected the login, including the blank-password retry.
    #[error("device login rejected for user '{user}'")]
    Auth {
        /// Device username that was tried
        user: String,
    },

    /// An expected prompt or message did not appear in time.
    #[error("timed out after {timeout:?} waiting for {waiting_for}")]
    Timeout {
        /// Description of the awaited alternatives
        waiting_for: String,
        /// Timeout of the failed step
        timeout: Duration,
    },

    /// Device output could not be parsed into something usable.
    #[error("could not parse {what}: {detail}")]
    Parse {
        /// What was being parsed
        what: &'static str,
        /// Why it failed
        detail: String,
    },

    /// The device dropped back to its login prompt or banner mid-step.
    #[error("device session lost: {0}")]
    SessionLost(String),

    /// A step kept receiving output that did not advance it.
    #[error("console stalled in {state} after {rounds} attempts")]
    Stalled {
        /// State machine step that made no progress
        state: &'static str,
        /// Rounds attempted
        rounds: usize,
    },

    /// The session has no live transport.
    #[error("console session is not connected")]
    NotConnected,
}

/// An action name that is not one of the supported actions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown action '{0}' (expected one of: cli, factoryreset, reboot, erasedisk, diskformat, restoreimage, purgedhcp)")]
pub struct UnknownAction(pub String);

impl ConsoleError {
    /// Wrap a transport error raised while waiting for `waiting_for`.
    pub fn from_expect(error: ExpectError, waiting_for: impl Into<String>) -> Self {
        match error {
            ExpectError::Timeout { duration } => ConsoleError::Timeout {
                waiting_for: waiting_for.into(),
                timeout: duration,
            },
            other => ConsoleError::Transport(other),
        }
    }

    pub(crate) fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        ConsoleError::Parse {
            what,
            detail: detail.into(),
        }
    }
}

impl From<ExpectError> for ConsoleError {
    fn from(error: ExpectError) -> Self {
        ConsoleError::from_expect(error, "device output")
    }
}
