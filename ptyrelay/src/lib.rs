//! # ptyrelay
//!
//! Drive the system `ssh` and `scp` clients through a pseudo-terminal,
//! answer their password prompt once, and relay what they print.
//!
//! ptyrelay does not speak SSH. It runs the installed client on a PTY (so the
//! client believes a person is at the keyboard), watches the output for a
//! prompt marker such as `password:`, types the credential exactly once, and
//! passes every byte through. A deadline bounds the whole session, and the
//! result says how it ended.
//!
//! ## Features
//!
//! - PTY-backed child processes via portable-pty
//! - Case-insensitive prompt detection, including markers split across reads
//! - Buffered or streaming output relay
//! - Typed session outcome with exit codes: success, timeout, channel error, non-zero exit
//! - Host key policy passed through to the ssh client, strict by default
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ptyrelay::SessionBuilder;
//! use ptyrelay::transport::{SshConfig, ssh_exec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ptyrelay::Error> {
//!     let mut ssh = SshConfig::new("192.0.2.10");
//!     ssh.username = Some("deploy".into());
//!
//!     let session = SessionBuilder::new()
//!         .password(std::env::var("PTYRELAY_PASSWORD").unwrap_or_default())
//!         .build()?;
//!
//!     let report = session.execute(&ssh_exec(&ssh, "uname -a")).await?;
//!     print!("{}", report.output_lossy());
//!     println!("{}", report.disposition);
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use channel::{Channel, PtyChannel};
pub use config::{ConnectionArgs, RelayConfig};
pub use error::{Error, Result};
pub use session::{Disposition, RelayMode, Session, SessionBuilder, SessionReport};
pub use transport::{CommandSpec, HostKeyVerification, SshConfig};
