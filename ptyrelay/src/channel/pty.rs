//! Pseudo-terminal channel backed by `portable-pty`.

use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace, warn};
use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc;

use super::{Channel, ReadEvent};
use crate::error::{Result, TransportError};
use crate::transport::CommandSpec;

/// How often `wait_exit` polls the child while waiting for its status.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Maximum bytes per read.
    pub chunk_size: usize,

    /// Terminal width.
    pub terminal_width: u16,

    /// Terminal height.
    pub terminal_height: u16,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            terminal_width: 80,
            terminal_height: 24,
        }
    }
}

/// A child process attached to a pseudo-terminal.
///
/// The blocking PTY reader runs on its own thread and hands chunks over a
/// bounded channel, so [`read_chunk`](Channel::read_chunk) can wait with a
/// timeout without tying up a runtime worker. The thread ends when the slave
/// side closes or the channel is dropped.
pub struct PtyChannel {
    program: String,
    chunks: mpsc::Receiver<io::Result<Bytes>>,
    writer: Option<Box<dyn Write + Send>>,
    child: Box<dyn Child + Send + Sync>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    exit_code: Option<u32>,

    // Held so the master side stays open for the lifetime of the channel.
    _master: Box<dyn MasterPty + Send>,
}

impl PtyChannel {
    /// Open a PTY and spawn `command` on its slave side.
    pub fn spawn(command: &CommandSpec, config: &PtyConfig) -> Result<Self> {
        let pair = native_pty_system()
            .openpty(PtySize {
                rows: config.terminal_height,
                cols: config.terminal_width,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| TransportError::PtyOpenFailed(e.to_string()))?;

        // portable-pty starts children in $HOME unless told otherwise.
        let cwd = match &command.cwd {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(TransportError::Io)?,
        };
        let mut builder = CommandBuilder::new(&command.program);
        builder.args(&command.args);
        builder.cwd(&cwd);

        let child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| TransportError::SpawnFailed {
                program: command.program.clone(),
                message: e.to_string(),
            })?;
        // Only the child may hold the slave, otherwise reads never see EOF.
        drop(pair.slave);

        debug!(
            "spawned '{}' on pty in {} (pid {:?})",
            command.display(),
            cwd.display(),
            child.process_id()
        );

        let killer = child.clone_killer();
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| TransportError::PtyOpenFailed(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| TransportError::PtyOpenFailed(e.to_string()))?;

        let (tx, chunks) = mpsc::channel(64);
        let chunk_size = config.chunk_size.max(1);
        std::thread::Builder::new()
            .name("ptyrelay-reader".to_string())
            .spawn(move || pump(reader, tx, chunk_size))
            .map_err(TransportError::Io)?;

        Ok(Self {
            program: command.program.clone(),
            chunks,
            writer: Some(writer),
            child,
            killer,
            exit_code: None,
            _master: pair.master,
        })
    }

    /// Non-blocking exit status check; caches the code once seen.
    fn poll_exit(&mut self) -> io::Result<Option<u32>> {
        if self.exit_code.is_none() {
            if let Some(status) = self.child.try_wait()? {
                trace!("'{}' exited with {}", self.program, status.exit_code());
                self.exit_code = Some(status.exit_code());
            }
        }
        Ok(self.exit_code)
    }
}

/// Blocking read loop feeding the session.
fn pump(mut reader: Box<dyn Read + Send>, tx: mpsc::Sender<io::Result<Bytes>>, chunk_size: usize) {
    let mut buf = vec![0u8; chunk_size];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.blocking_send(Ok(Bytes::copy_from_slice(&buf[..n]))).is_err() {
                    break;
                }
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
}

impl Channel for PtyChannel {
    async fn read_chunk(&mut self, wait: Duration) -> ReadEvent {
        match tokio::time::timeout(wait, self.chunks.recv()).await {
            Err(_) => ReadEvent::Idle,
            Ok(None) => ReadEvent::Closed,
            Ok(Some(Ok(data))) => ReadEvent::Data(data),
            Ok(Some(Err(e))) => ReadEvent::Failed(e),
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::new(ErrorKind::BrokenPipe, "pty writer unavailable"))?;
        let data = data.to_vec();

        let (writer, result) = tokio::task::spawn_blocking(move || {
            let result = writer.write_all(&data).and_then(|_| writer.flush());
            (writer, result)
        })
        .await
        .map_err(io::Error::other)?;

        self.writer = Some(writer);
        result
    }

    async fn wait_exit(&mut self, grace: Duration) -> io::Result<Option<u32>> {
        let deadline = tokio::time::Instant::now() + grace;
        loop {
            if let Some(code) = self.poll_exit()? {
                return Ok(Some(code));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    async fn terminate(&mut self) -> io::Result<()> {
        if self.poll_exit()?.is_some() {
            return Ok(());
        }
        debug!("killing '{}'", self.program);
        self.killer.kill()
    }
}

impl Drop for PtyChannel {
    fn drop(&mut self) {
        if matches!(self.poll_exit(), Ok(None)) {
            warn!("'{}' still running when channel dropped; killing", self.program);
            let _ = self.killer.kill();
        }
    }
}
