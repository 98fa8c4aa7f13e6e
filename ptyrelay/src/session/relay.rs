//! The relay loop: watch for the prompt, answer it once, pass output through.

use std::io;
use std::time::Duration;

use log::{debug, trace, warn};
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use super::outcome::{Disposition, RelayMode, SessionReport};
use super::state::{SessionState, StateEvent};
use crate::channel::{Channel, PromptMarker, PtyChannel, PtyConfig, ReadEvent, RelayBuffer};
use crate::error::{ChannelError, Result};
use crate::transport::CommandSpec;

/// A configured relay session.
///
/// A `Session` holds settings only; each call to [`run`](Self::run) or
/// [`execute`](Self::execute) supervises one child from spawn to exit, so the
/// same `Session` can be reused for sequential commands.
pub struct Session {
    credential: SecretString,
    marker: PromptMarker,
    timeout: Duration,
    poll_interval: Duration,
    exit_grace: Duration,
    pty: PtyConfig,
}

impl Session {
    pub(crate) fn new(
        credential: SecretString,
        marker: PromptMarker,
        timeout: Duration,
        poll_interval: Duration,
        exit_grace: Duration,
        pty: PtyConfig,
    ) -> Self {
        Self {
            credential,
            marker,
            timeout,
            poll_interval,
            exit_grace,
            pty,
        }
    }

    /// Get the session deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the per-iteration wait.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Get the prompt marker.
    pub fn marker(&self) -> &PromptMarker {
        &self.marker
    }

    /// Spawn `command` on a fresh PTY and collect its output.
    pub async fn execute(&self, command: &CommandSpec) -> Result<SessionReport> {
        let mut channel = PtyChannel::spawn(command, &self.pty)?;
        self.run(&mut channel).await
    }

    /// Spawn `command` on a fresh PTY and stream its output into `sink`.
    pub async fn execute_streaming<W>(
        &self,
        command: &CommandSpec,
        sink: &mut W,
    ) -> Result<SessionReport>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let mut channel = PtyChannel::spawn(command, &self.pty)?;
        self.run_streaming(&mut channel, sink).await
    }

    /// Supervise an already-open channel, collecting all output.
    pub async fn run<C: Channel>(&self, channel: &mut C) -> Result<SessionReport> {
        self.relay::<C, tokio::io::Sink>(channel, None).await
    }

    /// Supervise an already-open channel, writing each chunk to `sink` as it
    /// arrives.
    pub async fn run_streaming<C, W>(&self, channel: &mut C, sink: &mut W) -> Result<SessionReport>
    where
        C: Channel,
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        self.relay(channel, Some(sink)).await
    }

    async fn relay<C, W>(&self, channel: &mut C, mut sink: Option<&mut W>) -> Result<SessionReport>
    where
        C: Channel,
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let mode = if sink.is_some() {
            RelayMode::Stream
        } else {
            RelayMode::Buffer
        };
        let start = Instant::now();
        let deadline = start + self.timeout;
        let mut buffer = RelayBuffer::new(mode == RelayMode::Buffer, self.marker.carry_len());
        let mut state = SessionState::Connecting;
        let mut credential_sent = false;

        debug!("session started: mode={:?}, timeout={:?}", mode, self.timeout);

        let (disposition, exit_code) = loop {
            let now = Instant::now();
            if now >= deadline {
                break self.on_timeout(channel).await;
            }
            let wait = self.poll_interval.min(deadline - now);

            match channel.read_chunk(wait).await {
                ReadEvent::Idle => continue,
                ReadEvent::Data(chunk) => {
                    trace!("read {} bytes", chunk.len());
                    state = state.next(StateEvent::Output);
                    buffer.extend(&chunk);

                    if let Some(sink) = sink.as_mut() {
                        if let Err(e) = forward(&mut **sink, &chunk).await {
                            break self.on_sink_failed(channel, e).await;
                        }
                    }

                    if state.awaiting_credential() && buffer.window_contains(&self.marker) {
                        debug!("prompt marker '{}' seen; sending credential", self.marker.text());
                        if let Err(e) = self.send_credential(channel).await {
                            warn!("failed to send credential: {}", e);
                            break self.on_broken(channel, e).await;
                        }
                        credential_sent = true;
                        state = state.next(StateEvent::CredentialSent);
                    }
                }
                ReadEvent::Closed => break self.on_closed(channel).await,
                ReadEvent::Failed(e) => break self.on_read_error(channel, e).await,
            }
        };

        let state = state.next(StateEvent::Finished(disposition.clone()));
        let elapsed = start.elapsed();
        if let Some(outcome) = state.disposition() {
            debug!(
                "session finished: {} after {:?}, {} bytes relayed",
                outcome,
                elapsed,
                buffer.total()
            );
        }

        Ok(SessionReport {
            disposition,
            output: buffer.take(),
            mode,
            bytes_relayed: buffer.total(),
            credential_sent,
            exit_code,
            elapsed,
        })
    }

    async fn send_credential<C: Channel>(&self, channel: &mut C) -> io::Result<()> {
        let secret = self.credential.expose_secret();
        let mut line = Vec::with_capacity(secret.len() + 1);
        line.extend_from_slice(secret.as_bytes());
        line.push(b'\n');
        let result = channel.write_all(&line).await;
        line.fill(0);
        result
    }

    /// The stream ended without error: report the child's exit status.
    async fn on_closed<C: Channel>(&self, channel: &mut C) -> (Disposition, Option<u32>) {
        match channel.wait_exit(self.exit_grace).await {
            Ok(Some(code)) => (exit_disposition(code), Some(code)),
            Ok(None) => {
                debug!("stream closed; no exit status within {:?}", self.exit_grace);
                (Disposition::Success, None)
            }
            Err(e) => {
                debug!("stream closed; exit status unavailable: {}", e);
                (Disposition::Success, None)
            }
        }
    }

    /// A read failed. On Linux the PTY master reports EIO once the child has
    /// gone, so an error after exit is still a normal close.
    async fn on_read_error<C: Channel>(
        &self,
        channel: &mut C,
        error: io::Error,
    ) -> (Disposition, Option<u32>) {
        match channel.wait_exit(self.exit_grace).await {
            Ok(Some(code)) => {
                trace!("read error after child exit treated as close: {}", error);
                (exit_disposition(code), Some(code))
            }
            _ => self.on_broken(channel, error).await,
        }
    }

    /// The channel is unusable while the child is still alive.
    async fn on_broken<C: Channel>(
        &self,
        channel: &mut C,
        error: io::Error,
    ) -> (Disposition, Option<u32>) {
        warn!("channel error: {}", error);
        let exit_code = self.kill_and_reap(channel).await;
        (Disposition::ChannelError(error.to_string()), exit_code)
    }

    /// The caller's sink rejected output; stop relaying into it.
    async fn on_sink_failed<C: Channel>(
        &self,
        channel: &mut C,
        error: io::Error,
    ) -> (Disposition, Option<u32>) {
        let error = ChannelError::SinkFailed(error);
        warn!("{}", error);
        let exit_code = self.kill_and_reap(channel).await;
        (Disposition::ChannelError(error.to_string()), exit_code)
    }

    async fn on_timeout<C: Channel>(&self, channel: &mut C) -> (Disposition, Option<u32>) {
        warn!("session timed out after {:?}", self.timeout);
        let exit_code = self.kill_and_reap(channel).await;
        (Disposition::Timeout, exit_code)
    }

    async fn kill_and_reap<C: Channel>(&self, channel: &mut C) -> Option<u32> {
        if let Err(e) = channel.terminate().await {
            warn!("failed to kill child: {}", e);
        }
        match channel.wait_exit(self.exit_grace).await {
            Ok(code) => code,
            Err(e) => {
                debug!("failed to reap child: {}", e);
                None
            }
        }
    }
}

async fn forward<W>(sink: &mut W, chunk: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin + Send + ?Sized,
{
    sink.write_all(chunk).await?;
    sink.flush().await
}

fn exit_disposition(code: u32) -> Disposition {
    if code == 0 {
        Disposition::Success
    } else {
        Disposition::ChildExitedNonZero(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{EXIT_CHANNEL_ERROR, SessionBuilder};
    use crate::session::testing::{BrokenSink, ScriptedChannel, Step};

    fn session(timeout: Duration) -> Session {
        SessionBuilder::new()
            .password("hunter2")
            .timeout(timeout)
            .poll_interval(Duration::from_secs(1))
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_then_clean_close() {
        let mut channel = ScriptedChannel::new([
            Step::Chunk(b"Enter password: "),
            Step::AwaitInput,
            Step::Chunk(b"login successful\n"),
            Step::Exit(0),
        ]);

        let report = session(Duration::from_secs(20)).run(&mut channel).await.unwrap();

        assert_eq!(&report.output[..], b"Enter password: login successful\n");
        assert_eq!(channel.writes, vec![b"hunter2\n".to_vec()]);
        assert_eq!(report.disposition, Disposition::Success);
        assert!(report.credential_sent);
        assert_eq!(report.exit_code, Some(0));
        assert!(!channel.terminated);
        assert!(report.elapsed < Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_sent_at_most_once() {
        let mut channel = ScriptedChannel::new([
            Step::Chunk(b"deploy@192.0.2.10's password: "),
            Step::AwaitInput,
            Step::Chunk(b"\r\nPermission denied, please try again.\r\n"),
            Step::Chunk(b"deploy@192.0.2.10's password: "),
            Step::Chunk(b"Password: "),
            Step::Exit(255),
        ]);

        let report = session(Duration::from_secs(20)).run(&mut channel).await.unwrap();

        assert_eq!(channel.writes.len(), 1);
        assert_eq!(report.disposition, Disposition::ChildExitedNonZero(255));
        assert_eq!(report.disposition.exit_code(), 255);
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_case_insensitive() {
        for prompt in [&b"Password:"[..], b"PASSWORD:", b"password:"] {
            let prompt: &'static [u8] = prompt;
            let mut channel =
                ScriptedChannel::new([Step::Chunk(prompt), Step::AwaitInput, Step::Exit(0)]);

            let report = session(Duration::from_secs(5)).run(&mut channel).await.unwrap();

            assert_eq!(channel.writes, vec![b"hunter2\n".to_vec()], "prompt {:?}", prompt);
            assert!(report.credential_sent);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_split_across_reads() {
        let mut channel = ScriptedChannel::new([
            Step::Chunk(b"deploy@host's pass"),
            Step::Chunk(b"word: "),
            Step::AwaitInput,
            Step::Exit(0),
        ]);

        let report = session(Duration::from_secs(5)).run(&mut channel).await.unwrap();

        assert_eq!(channel.writes.len(), 1);
        assert_eq!(&report.output[..], b"deploy@host's password: ");
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_order_preserved() {
        let mut channel = ScriptedChannel::new([
            Step::Chunk(b"Linux build"),
            Step::Chunk(b"er 6.1.0 #1 SMP"),
            Step::Chunk(b" x86_64 GNU/Linux\r"),
            Step::Chunk(b"\n"),
            Step::Exit(0),
        ]);

        let report = session(Duration::from_secs(5)).run(&mut channel).await.unwrap();

        assert_eq!(
            &report.output[..],
            b"Linux builder 6.1.0 #1 SMP x86_64 GNU/Linux\r\n"
        );
        assert_eq!(report.bytes_relayed, report.output.len() as u64);
        assert!(!report.credential_sent);
        assert!(channel.writes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_kills_child_and_keeps_output() {
        let mut channel = ScriptedChannel::new([Step::Chunk(b"Password: "), Step::AwaitInput]);

        let report = session(Duration::from_secs(5)).run(&mut channel).await.unwrap();

        assert_eq!(report.disposition, Disposition::Timeout);
        assert!(channel.terminated);
        assert_eq!(report.exit_code, Some(137));
        assert_eq!(&report.output[..], b"Password: ");
        assert!(report.elapsed >= Duration::from_secs(5));
        assert!(report.elapsed <= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_not_a_multiple_of_poll_interval() {
        let mut channel = ScriptedChannel::new([]);

        let report = session(Duration::from_millis(2500))
            .run(&mut channel)
            .await
            .unwrap();

        assert_eq!(report.disposition, Disposition::Timeout);
        assert!(report.elapsed >= Duration::from_millis(2500));
        assert!(report.elapsed < Duration::from_millis(2600));
        assert!(report.output.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_close_does_not_wait_for_timeout() {
        let mut channel = ScriptedChannel::new([Step::Chunk(b"done\n"), Step::Exit(0)]);

        let report = session(Duration::from_secs(300)).run(&mut channel).await.unwrap();

        assert_eq!(report.disposition, Disposition::Success);
        assert!(report.elapsed < Duration::from_secs(1));
        assert!(!channel.terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_without_exit_status() {
        let mut channel = ScriptedChannel::new([Step::Chunk(b"bye\n"), Step::CloseSilently]);

        let report = session(Duration::from_secs(20)).run(&mut channel).await.unwrap();

        assert_eq!(report.disposition, Disposition::Success);
        assert_eq!(report.exit_code, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_after_exit_is_a_close() {
        let mut channel =
            ScriptedChannel::new([Step::Chunk(b"ok\n"), Step::FailAfterExit(0)]);

        let report = session(Duration::from_secs(20)).run(&mut channel).await.unwrap();

        assert_eq!(report.disposition, Disposition::Success);
        assert!(!channel.terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_while_running_is_channel_error() {
        let mut channel = ScriptedChannel::new([Step::Chunk(b"partial"), Step::Fail]);

        let report = session(Duration::from_secs(20)).run(&mut channel).await.unwrap();

        assert!(matches!(report.disposition, Disposition::ChannelError(_)));
        assert!(channel.terminated);
        assert_eq!(&report.output[..], b"partial");
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_write_failure() {
        let mut channel = ScriptedChannel::new([Step::Chunk(b"Password: "), Step::AwaitInput]);
        channel.fail_writes = true;

        let report = session(Duration::from_secs(20)).run(&mut channel).await.unwrap();

        assert!(matches!(report.disposition, Disposition::ChannelError(_)));
        assert!(!report.credential_sent);
        assert!(channel.terminated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_streaming_writes_chunks_to_sink() {
        let mut channel = ScriptedChannel::new([
            Step::Chunk(b"deploy@host's password: "),
            Step::AwaitInput,
            Step::Chunk(b"\r\nbuild.tar.gz   10%"),
            Step::Chunk(b"\rbuild.tar.gz  100%\r\n"),
            Step::Exit(0),
        ]);
        let mut sink: Vec<u8> = Vec::new();

        let report = session(Duration::from_secs(300))
            .run_streaming(&mut channel, &mut sink)
            .await
            .unwrap();

        assert_eq!(report.mode, RelayMode::Stream);
        assert!(report.output.is_empty());
        assert_eq!(
            sink,
            b"deploy@host's password: \r\nbuild.tar.gz   10%\rbuild.tar.gz  100%\r\n".to_vec()
        );
        assert_eq!(report.bytes_relayed, sink.len() as u64);
        assert_eq!(channel.writes.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_is_channel_error() {
        let mut channel = ScriptedChannel::new([
            Step::Chunk(b"deploy@host's password: "),
            Step::AwaitInput,
            Step::Chunk(b"build.tar.gz  100%\r\n"),
            Step::Exit(0),
        ]);
        let mut sink = BrokenSink;

        let report = session(Duration::from_secs(300))
            .run_streaming(&mut channel, &mut sink)
            .await
            .unwrap();

        match &report.disposition {
            Disposition::ChannelError(message) => {
                assert!(message.contains("relayed output"), "{}", message)
            }
            other => panic!("unexpected disposition: {:?}", other),
        }
        assert_eq!(report.disposition.exit_code(), EXIT_CHANNEL_ERROR);
        assert!(channel.terminated);
        assert_eq!(report.exit_code, Some(137));
        assert!(!report.credential_sent);
        assert_eq!(report.bytes_relayed, 24);
    }
}
