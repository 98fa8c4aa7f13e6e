//! Run one command on a remote host over ssh, answering the password prompt.
//!
//! ```bash
//! PTYRELAY_HOST=192.0.2.10 PTYRELAY_USER=deploy PTYRELAY_PASSWORD=... \
//!     ptyrelay-exec 'df -h'
//! ```
//!
//! Output is collected and written to stdout when the session ends. The exit
//! code reflects how the session ended (see `Disposition::exit_code`).

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::info;

use ptyrelay::config::EXIT_CONFIG_ERROR;
use ptyrelay::transport::ssh_exec;
use ptyrelay::{ConnectionArgs, RelayConfig, SessionReport};

#[derive(Parser, Debug)]
#[command(name = "ptyrelay-exec")]
#[command(version, about = "Run a remote command over ssh with a non-interactive password")]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Command to run on the remote host.
    #[arg(default_value = "uname -a")]
    command: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    match run(args).await {
        Ok(report) => {
            if !report.is_success() {
                eprintln!("ptyrelay-exec: {}", report.disposition);
            }
            ExitCode::from(report.disposition.exit_code())
        }
        Err(e) => {
            eprintln!("ptyrelay-exec: {}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

async fn run(args: Args) -> Result<SessionReport, Box<dyn std::error::Error>> {
    let config = RelayConfig::resolve(args.connection, Duration::from_secs(20))?;
    let session = config.session()?;
    let command = ssh_exec(&config.ssh, &args.command);

    info!("running '{}' on {}", args.command, config.ssh.destination());
    let report = session.execute(&command).await?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&report.output)?;
    stdout.flush()?;

    Ok(report)
}
