//! Streaming output example: relay a long-running remote command live.
//!
//! # Usage
//!
//! ```bash
//! PTYRELAY_PASSWORD=secret cargo run --example streaming -- deploy@192.0.2.10 'tail -n 50 /var/log/syslog'
//! ```

use std::env;
use std::time::Duration;

use ptyrelay::transport::{HostKeyVerification, SshConfig, ssh_exec};
use ptyrelay::SessionBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let target = args.next().unwrap_or_else(|| "localhost".to_string());
    let command = args.next().unwrap_or_else(|| "ls -la /".to_string());

    let mut ssh = match target.split_once('@') {
        Some((user, host)) => {
            let mut config = SshConfig::new(host);
            config.username = Some(user.to_string());
            config
        }
        None => SshConfig::new(target),
    };
    ssh.host_key_verification = HostKeyVerification::AcceptNew;

    let session = SessionBuilder::new()
        .password(env::var("PTYRELAY_PASSWORD")?)
        .timeout(Duration::from_secs(120))
        .build()?;

    let mut stdout = tokio::io::stdout();
    let report = session
        .execute_streaming(&ssh_exec(&ssh, &command), &mut stdout)
        .await?;

    eprintln!(
        "\nStreamed {} bytes in {:?} ({})",
        report.bytes_relayed, report.elapsed, report.disposition
    );
    Ok(())
}
