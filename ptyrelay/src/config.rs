//! Runtime configuration.
//!
//! Settings are layered; a later layer overrides an earlier one:
//!
//! 1. built-in defaults
//! 2. a JSON config file (`--config` / `PTYRELAY_CONFIG`)
//! 3. `PTYRELAY_*` environment variables
//! 4. command-line flags
//!
//! Layers 3 and 4 are both handled by clap's `env` support. The password is
//! never part of any layer; only where to find it is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use log::debug;
use serde::Deserialize;

use crate::channel::DEFAULT_PROMPT_MARKER;
use crate::error::{ConfigError, Result};
use crate::session::{Session, SessionBuilder};
use crate::transport::{CredentialSource, HostKeyVerification, SshConfig, resolve_credential};

/// Environment variable read for the password when nothing else is configured.
pub const DEFAULT_PASSWORD_ENV: &str = "PTYRELAY_PASSWORD";

/// Exit code for configuration and startup failures.
pub const EXIT_CONFIG_ERROR: u8 = 2;

/// Connection flags shared by the command-line tools.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// JSON config file.
    #[arg(long, env = "PTYRELAY_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Remote host.
    #[arg(long, env = "PTYRELAY_HOST")]
    pub host: Option<String>,

    /// Remote SSH port [default: 22].
    #[arg(long, env = "PTYRELAY_PORT")]
    pub port: Option<u16>,

    /// Remote user [default: the ssh client's default].
    #[arg(long, env = "PTYRELAY_USER")]
    pub user: Option<String>,

    /// Environment variable holding the password [default: PTYRELAY_PASSWORD].
    #[arg(long, value_name = "VAR")]
    pub password_env: Option<String>,

    /// File holding the password.
    #[arg(long, env = "PTYRELAY_PASSWORD_FILE", value_name = "PATH")]
    pub password_file: Option<PathBuf>,

    /// Host key policy: strict, accept-new or disabled [default: strict].
    #[arg(long, env = "PTYRELAY_HOST_KEY_POLICY", value_name = "POLICY")]
    pub host_key_policy: Option<HostKeyVerification>,

    /// Alternate known_hosts file.
    #[arg(long, env = "PTYRELAY_KNOWN_HOSTS", value_name = "PATH")]
    pub known_hosts: Option<PathBuf>,

    /// Session timeout in seconds.
    #[arg(long, env = "PTYRELAY_TIMEOUT", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Case-insensitive text that marks the password prompt [default: password:].
    #[arg(long, env = "PTYRELAY_PROMPT")]
    pub prompt: Option<String>,
}

/// Shape of the JSON config file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password_env: Option<String>,
    pub password_file: Option<PathBuf>,
    pub host_key_policy: Option<HostKeyVerification>,
    pub known_hosts: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub prompt: Option<String>,
    pub ssh_program: Option<String>,
    pub scp_program: Option<String>,
}

impl FileConfig {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved settings for one tool invocation.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Endpoint and client settings.
    pub ssh: SshConfig,

    /// Where the password is read from.
    pub credential: CredentialSource,

    /// Overall session deadline.
    pub timeout: Duration,

    /// Prompt marker.
    pub prompt: String,
}

impl RelayConfig {
    /// Merge flags/environment over the optional config file and defaults.
    pub fn resolve(
        args: ConnectionArgs,
        default_timeout: Duration,
    ) -> std::result::Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => {
                debug!("loading config from {}", path.display());
                FileConfig::load(path)?
            }
            None => FileConfig::default(),
        };
        Self::merge(args, file, default_timeout)
    }

    fn merge(
        args: ConnectionArgs,
        file: FileConfig,
        default_timeout: Duration,
    ) -> std::result::Result<Self, ConfigError> {
        let host = args
            .host
            .or(file.host)
            .filter(|h| !h.trim().is_empty())
            .ok_or(ConfigError::MissingHost)?;

        let mut ssh = SshConfig::new(host);
        if let Some(port) = args.port.or(file.port) {
            if port == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "port",
                    value: port.to_string(),
                });
            }
            ssh.port = port;
        }
        ssh.username = args.user.or(file.user).filter(|u| !u.is_empty());
        ssh.host_key_verification = args
            .host_key_policy
            .or(file.host_key_policy)
            .unwrap_or_default();
        ssh.known_hosts_path = args.known_hosts.or(file.known_hosts);
        if let Some(program) = file.ssh_program {
            ssh.ssh_program = program;
        }
        if let Some(program) = file.scp_program {
            ssh.scp_program = program;
        }

        let credential = if let Some(path) = args.password_file {
            CredentialSource::File(path)
        } else if let Some(var) = args.password_env {
            CredentialSource::Env(var)
        } else if let Some(path) = file.password_file {
            CredentialSource::File(path)
        } else {
            CredentialSource::Env(
                file.password_env
                    .unwrap_or_else(|| DEFAULT_PASSWORD_ENV.to_string()),
            )
        };

        let timeout = match args.timeout.or(file.timeout_secs) {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "timeout",
                    value: "0".to_string(),
                });
            }
            Some(secs) => Duration::from_secs(secs),
            None => default_timeout,
        };

        let prompt = args
            .prompt
            .or(file.prompt)
            .unwrap_or_else(|| DEFAULT_PROMPT_MARKER.to_string());
        if prompt.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "prompt",
                value: prompt,
            });
        }

        Ok(Self {
            ssh,
            credential,
            timeout,
            prompt,
        })
    }

    /// Read the credential and build a session from these settings.
    pub fn session(&self) -> Result<Session> {
        let credential = resolve_credential(&self.credential)?;
        SessionBuilder::new()
            .credential(credential)
            .prompt_marker(&self.prompt)
            .timeout(self.timeout)
            .build()
    }
}
