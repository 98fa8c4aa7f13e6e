//! Channel layer: the byte stream to and from the child, prompt matching and
//! output buffering.

mod buffer;
mod patterns;
mod pty;

pub use buffer::RelayBuffer;
pub use patterns::{DEFAULT_PROMPT_MARKER, PromptMarker, PromptMatcher};
pub use pty::{PtyChannel, PtyConfig};

use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::Bytes;

/// Outcome of a single bounded read.
#[derive(Debug)]
pub enum ReadEvent {
    /// A chunk of output.
    Data(Bytes),

    /// Nothing arrived within the wait.
    Idle,

    /// The child closed its side of the stream.
    Closed,

    /// The read failed.
    Failed(io::Error),
}

/// Bidirectional byte channel to a supervised child process.
///
/// [`PtyChannel`] is the real implementation; the session loop only talks to
/// this trait.
pub trait Channel: Send {
    /// Wait up to `wait` for the next chunk of output.
    fn read_chunk(&mut self, wait: Duration) -> impl Future<Output = ReadEvent> + Send;

    /// Write bytes to the child's input.
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Wait up to `grace` for the child to exit; returns its exit code if it did.
    fn wait_exit(&mut self, grace: Duration)
    -> impl Future<Output = io::Result<Option<u32>>> + Send;

    /// Kill the child if it is still running.
    fn terminate(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}
