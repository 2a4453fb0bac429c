//! Connection session for i3link.
//!
//! This crate holds everything the client knows about its link to the
//! gateway, shared between the game thread and the network thread:
//!
//! 1. **State machine** — where the link is in its lifecycle
//!    ([`ConnectionState`], [`Session`])
//! 2. **Identity and counters** — the MUD name and session id assigned by
//!    the gateway, plus sent/received/error/reconnect statistics
//! 3. **Directory** — remote MUDs and channels learned from the gateway
//!    ([`MudDirectory`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Client facade (above)  ← queries state, submits commands
//!     ↕
//! Session Layer (this crate)  ← state, identity, counters, directory
//!     ↕
//! Protocol Layer (below)  ← provides RequestId, MudEntry
//! ```

mod directory;
mod error;
mod session;
mod state;

pub use directory::{MudDirectory, MudRecord};
pub use error::SessionError;
pub use session::{Session, SessionCounters};
pub use state::ConnectionState;
