//! Error types for the session layer.

use crate::ConnectionState;

/// Errors that can occur while driving the session or consulting the
/// MUD directory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The state machine does not allow this edge. Most often the session
    /// is already shut down.
    #[error("invalid state transition {from} -> {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// The gateway never told us about this MUD.
    #[error("unknown MUD: {0}")]
    UnknownMud(String),

    /// The MUD is known but currently offline.
    #[error("MUD {0} is currently offline")]
    MudOffline(String),
}
