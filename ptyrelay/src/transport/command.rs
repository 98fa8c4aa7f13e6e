//! Argument lists for the external clients.

use std::path::PathBuf;

use log::warn;

use super::config::{HostKeyVerification, SshConfig};

/// A program and its arguments, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute, looked up on `PATH`.
    pub program: String,

    /// Arguments, not including the program name.
    pub args: Vec<String>,

    /// Working directory for the child; the caller's when unset.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a command spec.
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    /// Run the child in `dir` instead of the current directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Space-joined rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn host_key_options(config: &SshConfig) -> Vec<String> {
    if config.host_key_verification == HostKeyVerification::Disabled {
        warn!(
            "host key verification disabled for {}; the remote end is not authenticated",
            config.host
        );
    }

    let mut args = vec![
        "-o".to_string(),
        format!(
            "StrictHostKeyChecking={}",
            config.host_key_verification.ssh_option_value()
        ),
    ];
    if let Some(path) = &config.known_hosts_path {
        args.push("-o".to_string());
        args.push(format!("UserKnownHostsFile={}", path.display()));
    }
    args
}

/// `ssh [options] -p <port> [user@]host <remote_command>`
pub fn ssh_exec(config: &SshConfig, remote_command: &str) -> CommandSpec {
    let mut args = host_key_options(config);
    args.push("-p".to_string());
    args.push(config.port.to_string());
    args.push(config.destination());
    args.push(remote_command.to_string());
    CommandSpec::new(config.ssh_program.clone(), args)
}

/// `scp [options] -P <port> <source> [user@]host:<remote_path>`
pub fn scp_upload(config: &SshConfig, source: &str, remote_path: &str) -> CommandSpec {
    let mut args = host_key_options(config);
    args.push("-P".to_string());
    args.push(config.port.to_string());
    args.push(source.to_string());
    args.push(config.remote_path(remote_path));
    CommandSpec::new(config.scp_program.clone(), args)
}
