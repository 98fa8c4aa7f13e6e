//! Scripted in-memory channel for driving the relay loop in tests.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWrite;

use crate::channel::{Channel, ReadEvent};

/// One step of a scripted child.
#[derive(Debug)]
pub enum Step {
    /// Emit a chunk of output.
    Chunk(&'static [u8]),

    /// Produce nothing until something has been written to the child.
    AwaitInput,

    /// Close the stream; the child exits with the given code.
    Exit(u32),

    /// Close the stream without an exit status ever becoming available.
    CloseSilently,

    /// Fail the read; the child has already exited with the given code.
    FailAfterExit(u32),

    /// Fail the read while the child keeps running.
    Fail,
}

/// A fake child process driven by a list of [`Step`]s.
///
/// Once the script runs out the child hangs: reads wait the full poll
/// interval and return [`ReadEvent::Idle`].
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    steps: VecDeque<Step>,
    pub writes: Vec<Vec<u8>>,
    pub terminated: bool,
    pub fail_writes: bool,
    exit_code: Option<u32>,
    closed: bool,
}

impl ScriptedChannel {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Channel for ScriptedChannel {
    async fn read_chunk(&mut self, wait: Duration) -> ReadEvent {
        if self.closed {
            return ReadEvent::Closed;
        }
        loop {
            match self.steps.front() {
                Some(Step::AwaitInput) if !self.writes.is_empty() => {
                    self.steps.pop_front();
                }
                Some(Step::AwaitInput) | None => {
                    tokio::time::sleep(wait).await;
                    return ReadEvent::Idle;
                }
                Some(_) => break,
            }
        }

        match self.steps.pop_front() {
            Some(Step::Chunk(data)) => ReadEvent::Data(Bytes::from_static(data)),
            Some(Step::Exit(code)) => {
                self.exit_code = Some(code);
                self.closed = true;
                ReadEvent::Closed
            }
            Some(Step::CloseSilently) => {
                self.closed = true;
                ReadEvent::Closed
            }
            Some(Step::FailAfterExit(code)) => {
                self.exit_code = Some(code);
                ReadEvent::Failed(io::Error::from_raw_os_error(5))
            }
            Some(Step::Fail) => ReadEvent::Failed(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "channel reset",
            )),
            Some(Step::AwaitInput) | None => ReadEvent::Idle,
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write refused"));
        }
        self.writes.push(data.to_vec());
        Ok(())
    }

    async fn wait_exit(&mut self, grace: Duration) -> io::Result<Option<u32>> {
        if self.exit_code.is_none() {
            tokio::time::sleep(grace).await;
        }
        Ok(self.exit_code)
    }

    async fn terminate(&mut self) -> io::Result<()> {
        self.terminated = true;
        if self.exit_code.is_none() {
            // SIGKILL as reported by a shell.
            self.exit_code = Some(137);
        }
        Ok(())
    }
}

/// A sink whose reader has gone away.
pub struct BrokenSink;

impl AsyncWrite for BrokenSink {
    fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed")))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
