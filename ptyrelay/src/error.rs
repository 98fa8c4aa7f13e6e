//! Error types for ptyrelay.
//!
//! Session outcomes (timeout, broken channel, non-zero exit) are not errors;
//! they are reported through [`Disposition`](crate::session::Disposition).
//! The types here cover everything that fails before or outside the relay loop.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ptyrelay operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Process spawn and PTY allocation errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session-level errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration errors (missing settings, bad files, missing credential).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No destination host configured
    #[error("No host configured - set --host or PTYRELAY_HOST")]
    MissingHost,

    /// A setting had an unusable value
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid JSON for the expected shape
    #[error("Failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Credential environment variable unset or empty
    #[error("Credential variable '{0}' is not set")]
    MissingCredentialEnv(String),

    /// Credential file could not be read
    #[error("Failed to read credential file {path}: {source}")]
    CredentialFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Credential resolved to an empty string
    #[error("Credential is empty")]
    EmptyCredential,
}

/// Transport layer errors (PTY allocation, child spawn).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to allocate a pseudo-terminal
    #[error("Failed to open PTY: {0}")]
    PtyOpenFailed(String),

    /// Failed to spawn the child command
    #[error("Failed to spawn '{program}': {message}")]
    SpawnFailed { program: String, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (relay sink, prompt marker).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Writing relayed output to the sink failed
    #[error("Failed to write relayed output: {0}")]
    SinkFailed(#[source] io::Error),

    /// Invalid prompt marker
    #[error("Invalid prompt marker: {0}")]
    InvalidMarker(#[from] regex::Error),
}

/// Session builder and lifecycle errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias using ptyrelay's Error.
pub type Result<T> = std::result::Result<T, Error>;
