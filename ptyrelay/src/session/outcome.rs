//! Typed result of a relay session.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

/// Exit code for a session that hit its deadline (same as `timeout(1)`).
pub const EXIT_TIMEOUT: u8 = 124;

/// Exit code for a session whose channel broke while the child was running.
pub const EXIT_CHANNEL_ERROR: u8 = 125;

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The stream closed and the child exited 0, or its status was not
    /// available after a clean close.
    Success,

    /// The deadline passed; the child was killed.
    Timeout,

    /// Reading from or writing to the channel failed while the child was
    /// still running.
    ChannelError(String),

    /// The child exited with a non-zero code.
    ChildExitedNonZero(u32),
}

impl Disposition {
    /// Whether the session completed normally.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Process exit code a command-line wrapper should return.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Timeout => EXIT_TIMEOUT,
            Self::ChannelError(_) => EXIT_CHANNEL_ERROR,
            Self::ChildExitedNonZero(code) => (*code).clamp(1, 255) as u8,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "completed"),
            Self::Timeout => write!(f, "timed out"),
            Self::ChannelError(message) => write!(f, "channel error: {}", message),
            Self::ChildExitedNonZero(code) => write!(f, "child exited with status {}", code),
        }
    }
}

/// Whether output is collected or forwarded as it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Collect everything and hand it back in [`SessionReport::output`].
    Buffer,

    /// Write each chunk to a sink as soon as it is read.
    Stream,
}

/// Everything a finished session has to say.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// How the session ended.
    pub disposition: Disposition,

    /// The collected output (buffer mode only; empty when streaming).
    pub output: Bytes,

    /// How output was relayed.
    pub mode: RelayMode,

    /// Total bytes read from the child.
    pub bytes_relayed: u64,

    /// Whether the credential was written.
    pub credential_sent: bool,

    /// The child's exit code, when it could be collected.
    pub exit_code: Option<u32>,

    /// Time from spawn to the end of the session.
    pub elapsed: Duration,
}

impl SessionReport {
    /// Check if the session completed normally.
    pub fn is_success(&self) -> bool {
        self.disposition.is_success()
    }

    /// Get the output as a string (lossy UTF-8).
    pub fn output_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }
}
