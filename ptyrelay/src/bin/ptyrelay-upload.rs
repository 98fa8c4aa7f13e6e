//! Upload one file with scp, answering the password prompt.
//!
//! ```bash
//! PTYRELAY_HOST=192.0.2.10 PTYRELAY_USER=deploy PTYRELAY_PASSWORD=... \
//!     ptyrelay-upload build.tar.gz public_html/app/
//! ```
//!
//! scp's progress output is streamed to stdout as it arrives.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use ptyrelay::config::EXIT_CONFIG_ERROR;
use ptyrelay::transport::scp_upload;
use ptyrelay::{ConnectionArgs, Disposition, RelayConfig, SessionReport};

#[derive(Parser, Debug)]
#[command(name = "ptyrelay-upload")]
#[command(version, about = "Upload a file over scp with a non-interactive password")]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Local file to upload.
    source: String,

    /// Destination path on the remote host.
    remote_path: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    match run(args).await {
        Ok(report) => {
            match &report.disposition {
                Disposition::Success => {}
                Disposition::Timeout => println!("\nTimeout waiting for upload completion"),
                other => eprintln!("ptyrelay-upload: {}", other),
            }
            ExitCode::from(report.disposition.exit_code())
        }
        Err(e) => {
            eprintln!("ptyrelay-upload: {}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

async fn run(args: Args) -> Result<SessionReport, Box<dyn std::error::Error>> {
    let config = RelayConfig::resolve(args.connection, Duration::from_secs(300))?;
    let session = config.session()?;
    let command = scp_upload(&config.ssh, &args.source, &args.remote_path);

    println!(
        "Uploading {} to {}...",
        args.source,
        config.ssh.remote_path(&args.remote_path)
    );

    let mut stdout = tokio::io::stdout();
    let report = session.execute_streaming(&command, &mut stdout).await?;
    Ok(report)
}
