//! Session lifecycle as an explicit state machine.
//!
//! ```text
//! Connecting --output--> AwaitingPrompt --credential--> Relaying
//!      \                       |                          |
//!       +---------- finish ----+---------- finish --------+--> Done
//! ```
//!
//! `Done` absorbs every further event.

use super::outcome::Disposition;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Child spawned, nothing read yet.
    Connecting,

    /// Output seen, credential not yet sent.
    AwaitingPrompt,

    /// Credential sent; output still flowing.
    Relaying,

    /// Terminal state.
    Done(Disposition),
}

/// Something that moves the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// A chunk of output arrived.
    Output,

    /// The credential was written to the child.
    CredentialSent,

    /// The session ended.
    Finished(Disposition),
}

impl SessionState {
    /// Apply an event.
    pub fn next(self, event: StateEvent) -> Self {
        use SessionState::*;

        match (self, event) {
            (Done(d), _) => Done(d),
            (_, StateEvent::Finished(d)) => Done(d),
            (Connecting, StateEvent::Output) => AwaitingPrompt,
            (Connecting | AwaitingPrompt, StateEvent::CredentialSent) => Relaying,
            (state, _) => state,
        }
    }

    /// True until the credential has been sent or the session is over.
    pub fn awaiting_credential(&self) -> bool {
        matches!(self, Self::Connecting | Self::AwaitingPrompt)
    }

    /// The final disposition, once done.
    pub fn disposition(&self) -> Option<&Disposition> {
        match self {
            Self::Done(d) => Some(d),
            _ => None,
        }
    }
}
