//! Relay sessions.
//!
//! A session spawns one child on a pseudo-terminal, answers its password
//! prompt once, relays its output and reports how it ended.

mod builder;
mod outcome;
mod relay;
mod state;
#[cfg(test)]
mod testing;

pub use builder::{DEFAULT_EXIT_GRACE, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, SessionBuilder};
pub use outcome::{Disposition, EXIT_CHANNEL_ERROR, EXIT_TIMEOUT, RelayMode, SessionReport};
pub use relay::Session;
pub use state::{SessionState, StateEvent};
