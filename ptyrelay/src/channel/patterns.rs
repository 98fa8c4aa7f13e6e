//! Prompt marker matching.

use regex::bytes::{Regex, RegexBuilder};

/// Default marker: the tail of `Password:` as printed by OpenSSH.
pub const DEFAULT_PROMPT_MARKER: &str = "password:";

/// Trait for prompt matching - regex by default, extensible for custom matchers.
pub trait PromptMatcher: Send + Sync {
    /// Returns byte offset where match ends, or None if no match.
    fn find_match(&self, data: &[u8]) -> Option<usize>;

    /// Check if the data matches the pattern.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_match(data).is_some()
    }
}

impl PromptMatcher for Regex {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.find(data).map(|m| m.end())
    }
}

/// A literal, case-insensitive prompt marker such as `password:`.
///
/// The marker text is escaped before compilation, so characters like `.` or
/// `[` match themselves.
#[derive(Debug, Clone)]
pub struct PromptMarker {
    text: String,
    pattern: Regex,
}

impl PromptMarker {
    /// Compile a marker. Empty markers are rejected by the caller, not here.
    pub fn new(text: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(&regex::escape(text))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            text: text.to_string(),
            pattern,
        })
    }

    /// The marker as given.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the marker in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// True when the marker has no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// How many trailing bytes of earlier output can still be part of a
    /// marker that completes in the next chunk.
    pub fn carry_len(&self) -> usize {
        self.text.len().saturating_sub(1)
    }
}

impl Default for PromptMarker {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_MARKER).expect("default marker is a valid literal")
    }
}

impl PromptMatcher for PromptMarker {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.pattern.find(data).map(|m| m.end())
    }
}
