//! SSH endpoint configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// Host key verification mode, passed through as OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    #[default]
    Strict,

    /// Accept and record unknown keys, but reject changed keys.
    AcceptNew,

    /// Accept all keys without checking. For testing and lab use only.
    Disabled,
}

impl HostKeyVerification {
    /// Value for `-o StrictHostKeyChecking=`.
    pub fn ssh_option_value(self) -> &'static str {
        match self {
            Self::Strict => "yes",
            Self::AcceptNew => "accept-new",
            Self::Disabled => "no",
        }
    }
}

impl FromStr for HostKeyVerification {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" | "yes" => Ok(Self::Strict),
            "accept-new" => Ok(Self::AcceptNew),
            "disabled" | "no" | "off" => Ok(Self::Disabled),
            _ => Err(ConfigError::InvalidValue {
                key: "host key policy",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for HostKeyVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Strict => "strict",
            Self::AcceptNew => "accept-new",
            Self::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

/// Where the password comes from. It is never part of the config itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Read from an environment variable.
    Env(String),

    /// Read from a file; one trailing newline is dropped.
    File(PathBuf),
}

/// SSH endpoint configuration shared by `ssh` and `scp` invocations.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Remote user; when `None` the client's own default applies.
    pub username: Option<String>,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Alternate known_hosts file.
    pub known_hosts_path: Option<PathBuf>,

    /// ssh client binary.
    pub ssh_program: String,

    /// scp client binary.
    pub scp_program: String,
}

impl SshConfig {
    /// Create a config for `host` with defaults for everything else.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            ssh_program: "ssh".to_string(),
            scp_program: "scp".to_string(),
        }
    }

    /// `user@host`, or just `host` without a username.
    pub fn destination(&self) -> String {
        match &self.username {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    /// scp remote spec `[user@]host:path`; IPv6 literals are bracketed.
    pub fn remote_path(&self, path: &str) -> String {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        match &self.username {
            Some(user) => format!("{}@{}:{}", user, host, path),
            None => format!("{}:{}", host, path),
        }
    }
}
