//! Invocations of the external `ssh` and `scp` clients.
//!
//! Nothing here speaks the SSH protocol; this module only builds argument
//! lists and resolves the credential that the session will type in.

pub mod config;
mod command;
mod credential;

pub use command::{CommandSpec, scp_upload, ssh_exec};
pub use config::{CredentialSource, HostKeyVerification, SshConfig};
pub use credential::resolve_credential;
