//! Output buffer with a small search window for the prompt marker.
//!
//! The relay loop reads the child's output in bounded chunks, so a marker like
//! `password:` can arrive split across two reads. The window keeps the last
//! `carry` bytes of earlier output in front of the newest chunk. `carry` is
//! one byte shorter than the marker, so the window never holds a complete
//! marker that was already seen.

use bytes::{Buf, Bytes, BytesMut};

use super::patterns::PromptMatcher;

/// Accumulates relayed output and tracks the marker search window.
#[derive(Debug)]
pub struct RelayBuffer {
    /// Aggregated output; only filled when `retain` is set.
    output: BytesMut,

    /// Whether chunks are kept for the final report.
    retain: bool,

    /// Tail of earlier output followed by the newest chunk.
    window: BytesMut,

    /// How many bytes of earlier output stay in the window.
    carry: usize,

    /// Total bytes seen, retained or not.
    total: u64,
}

impl RelayBuffer {
    /// Create a buffer.
    ///
    /// # Arguments
    ///
    /// * `retain` - keep every chunk for [`take`](Self::take)
    /// * `carry` - bytes of earlier output kept in front of each chunk when searching
    pub fn new(retain: bool, carry: usize) -> Self {
        Self {
            output: BytesMut::with_capacity(if retain { 4096 } else { 0 }),
            retain,
            window: BytesMut::with_capacity(carry + 1024),
            carry,
            total: 0,
        }
    }

    /// Record a chunk.
    pub fn extend(&mut self, chunk: &[u8]) {
        if self.window.len() > self.carry {
            let excess = self.window.len() - self.carry;
            self.window.advance(excess);
        }
        self.window.extend_from_slice(chunk);

        if self.retain {
            self.output.extend_from_slice(chunk);
        }
        self.total += chunk.len() as u64;
    }

    /// Check the window (carried tail plus newest chunk) for a match.
    pub fn window_contains(&self, matcher: &dyn PromptMatcher) -> bool {
        matcher.is_match(&self.window)
    }

    /// Take the retained output and reset it.
    pub fn take(&mut self) -> Bytes {
        std::mem::take(&mut self.output).freeze()
    }

    /// Get a reference to the retained output.
    pub fn as_slice(&self) -> &[u8] {
        &self.output
    }

    /// Total number of bytes recorded.
    pub fn total(&self) -> u64 {
        self.total
    }
}
