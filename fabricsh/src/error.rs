//! Error types for fabricsh.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for fabricsh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A spawn configuration could not be built.
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Process or PTY level errors.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// An interactive step did not reach its expected prompt.
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    /// A non-interactive command exited with a failing status.
    #[error("Command '{command}' failed with status {status}")]
    CommandFailed {
        command: String,
        status: i32,
        output: String,
    },

    /// Captured CLI output could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Console recovery errors.
    #[error("Console error: {0}")]
    Console(#[from] ConsoleError),
}

impl Error {
    /// The step failure, if this error came from an interactive step.
    pub fn as_step(&self) -> Option<&StepError> {
        match self {
            Error::Step(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors raised while turning a request into a spawn configuration.
///
/// These never reach the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The connection class only supports interactive use.
    #[error("command not accepted for {role} connections")]
    BatchCommandRejected { role: &'static str },

    /// The connection class runs one command and there is none.
    #[error("{role} connections need a command")]
    MissingCommand { role: &'static str },

    /// CLI mode names are single bare words.
    #[error("invalid CLI mode '{mode}'")]
    InvalidMode { mode: String },

    /// scp direction must be `in` or `out`.
    #[error("invalid direction '{direction}'")]
    InvalidDirection { direction: String },

    /// scp needs at least one source and a destination.
    #[error("scp needs at least two paths, got {count}")]
    MissingPaths { count: usize },

    /// The role needs configuration that was not supplied.
    #[error("{what} is not configured")]
    NotConfigured { what: &'static str },

    /// Public key material contains characters that would break the shell line.
    #[error("invalid public key: {reason}")]
    InvalidKey { reason: &'static str },
}

/// Process and PTY errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Failed to allocate a pseudo-terminal.
    #[error("Failed to open PTY: {reason}")]
    PtyOpenFailed { reason: String },

    /// Failed to spawn the process.
    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    /// The session's input side is gone.
    #[error("Session closed")]
    Closed,

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// How a step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// A candidate other than the success pattern matched.
    Unexpected { ordinal: usize },

    /// Nothing matched before the deadline.
    TimedOut(Duration),

    /// The remote process exited before a pattern matched.
    StreamEnded,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepFailure::Unexpected { ordinal } => write!(f, "unexpected prompt #{ordinal}"),
            StepFailure::TimedOut(d) => write!(f, "timed out after {d:?}"),
            StepFailure::StreamEnded => write!(f, "stream ended"),
        }
    }
}

/// A send/expect step that did not end on its success branch.
#[derive(Error, Debug, Clone)]
#[error("step '{step}' failed ({failure}) after sending {input:?}")]
pub struct StepError {
    /// Name of the flow state that failed.
    pub step: String,

    /// Line that was sent before the expect (masked if hidden).
    pub input: Option<String>,

    /// Output captured before the failed match.
    pub before: String,

    /// The failure kind.
    pub failure: StepFailure,
}

impl StepError {
    /// Whether the remote side dropped the connection.
    pub fn is_stream_ended(&self) -> bool {
        self.failure == StepFailure::StreamEnded
    }

    /// Whether the step ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self.failure, StepFailure::TimedOut(_))
    }
}

/// Structured output decoding errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A line before the legend is neither informational nor `None.`.
    #[error("unexpected line before table legend: '{line}'")]
    UnexpectedLine { line: String },

    /// No legend/separator pair was found.
    #[error("missing table legend")]
    MissingLegend,

    /// The table has no `#` column.
    #[error("table has no '#' column")]
    MissingIndexColumn,

    /// A row's `#` value is not a positive integer.
    #[error("bad record index '{value}'")]
    BadIndex { value: String },

    /// A MAC address is not six colon-separated hex octets.
    #[error("bad MAC address '{value}'")]
    BadMac { value: String },
}

/// Console recovery errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    /// Backing out of an unknown state never produced a login prompt.
    #[error("no login prompt after {attempts} attempts")]
    LoginPromptNotFound { attempts: u32 },
}

/// Result type alias using fabricsh's Error.
pub type Result<T> = std::result::Result<T, Error>;
