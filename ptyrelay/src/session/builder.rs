//! Builder for relay sessions.

use std::time::Duration;

use secrecy::SecretString;

use super::relay::Session;
use crate::channel::{DEFAULT_PROMPT_MARKER, PromptMarker, PtyConfig};
use crate::error::{ChannelError, Result, SessionError};

/// Default overall deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default wait per loop iteration.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default time to wait for an exit status after the stream closes.
pub const DEFAULT_EXIT_GRACE: Duration = Duration::from_secs(2);

/// Builder for constructing a [`Session`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use ptyrelay::{SessionBuilder, transport::{SshConfig, ssh_exec}};
///
/// # async fn example() -> Result<(), ptyrelay::Error> {
/// let session = SessionBuilder::new()
///     .password("secret")
///     .timeout(Duration::from_secs(20))
///     .build()?;
///
/// let report = session.execute(&ssh_exec(&SshConfig::new("example.net"), "uname -a")).await?;
/// print!("{}", report.output_lossy());
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    credential: Option<SecretString>,
    prompt_marker: String,
    timeout: Duration,
    poll_interval: Duration,
    exit_grace: Duration,
    pty: PtyConfig,
}

impl SessionBuilder {
    /// Create a new session builder with default settings.
    pub fn new() -> Self {
        Self {
            credential: None,
            prompt_marker: DEFAULT_PROMPT_MARKER.to_string(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            exit_grace: DEFAULT_EXIT_GRACE,
            pty: PtyConfig::default(),
        }
    }

    /// Set the credential to type at the prompt.
    pub fn credential(mut self, credential: SecretString) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the credential from a plain string.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.credential = Some(SecretString::from(password.into()));
        self
    }

    /// Set the prompt marker (matched case-insensitively, default `password:`).
    pub fn prompt_marker(mut self, marker: impl Into<String>) -> Self {
        self.prompt_marker = marker.into();
        self
    }

    /// Set the overall session deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how long each loop iteration waits for output.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set how long to wait for the exit status once the stream closes.
    pub fn exit_grace(mut self, grace: Duration) -> Self {
        self.exit_grace = grace;
        self
    }

    /// Set the maximum bytes per read.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.pty.chunk_size = size;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u16, height: u16) -> Self {
        self.pty.terminal_width = width;
        self.pty.terminal_height = height;
        self
    }

    /// Build the session.
    ///
    /// This validates settings but spawns nothing; call
    /// [`Session::execute`] or [`Session::run`] to start.
    pub fn build(self) -> Result<Session> {
        let credential = self.credential.ok_or_else(|| SessionError::InvalidConfig {
            message: "credential is required".to_string(),
        })?;

        if self.prompt_marker.is_empty() {
            return Err(SessionError::InvalidConfig {
                message: "prompt marker must not be empty".to_string(),
            }
            .into());
        }
        if self.timeout.is_zero() {
            return Err(SessionError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            }
            .into());
        }
        if self.poll_interval.is_zero() {
            return Err(SessionError::InvalidConfig {
                message: "poll interval must be greater than zero".to_string(),
            }
            .into());
        }
        if self.pty.chunk_size == 0 {
            return Err(SessionError::InvalidConfig {
                message: "chunk size must be greater than zero".to_string(),
            }
            .into());
        }

        let marker = PromptMarker::new(&self.prompt_marker).map_err(ChannelError::from)?;

        Ok(Session::new(
            credential,
            marker,
            self.timeout,
            self.poll_interval,
            self.exit_grace,
            self.pty,
        ))
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
