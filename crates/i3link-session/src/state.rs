//! The connection lifecycle as a state machine.

use std::fmt;

/// Where the gateway link is in its lifecycle.
///
/// ```text
///                  ┌──────────── Reconnecting ◄───┐
///                  ▼                              │
///   Disconnected ─► Connecting ─► Authenticating ─► Connected
///        ▲              │               │              │
///        └──────────────┴───────────────┴──────────────┘
///                     (socket error / EOF / kick)
///
///   any state ─► Shutdown (terminal)
/// ```
///
/// A socket exists only in `Connecting`, `Authenticating` and `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
    /// Waiting out the reconnect delay before the next attempt.
    Reconnecting,
    Shutdown,
}

impl ConnectionState {
    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// Re-entering the current state is not a transition and is rejected,
    /// except `Shutdown -> Shutdown` which keeps shutdown idempotent.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Shutdown, Shutdown) => true,
            (Shutdown, _) => false,
            (_, Shutdown) => true,
            (Disconnected, Connecting | Reconnecting) => true,
            (Reconnecting, Connecting) => true,
            (Connecting, Authenticating | Disconnected) => true,
            (Authenticating, Connected | Disconnected) => true,
            (Connected, Disconnected) => true,
            _ => false,
        }
    }

    /// `true` for the states in which the driver owns an open socket.
    pub fn has_socket(self) -> bool {
        matches!(self, Self::Connecting | Self::Authenticating | Self::Connected)
    }

    /// Upper-case name used in status displays.
    pub fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Authenticating => "AUTHENTICATING",
            Self::Connected => "CONNECTED",
            Self::Reconnecting => "RECONNECTING",
            Self::Shutdown => "SHUTDOWN",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionState::*;
    use super::*;

    const ALL: [ConnectionState; 6] = [
        Disconnected,
        Connecting,
        Authenticating,
        Connected,
        Reconnecting,
        Shutdown,
    ];

    #[test]
    fn test_can_transition_to_from_disconnected_only_connect_paths() {
        let allowed: Vec<_> = ALL
            .into_iter()
            .filter(|s| Disconnected.can_transition_to(*s))
            .collect();
        assert_eq!(allowed, vec![Connecting, Reconnecting, Shutdown]);
    }

    #[test]
    fn test_can_transition_to_connected_only_from_authenticating() {
        for from in ALL {
            assert_eq!(
                from.can_transition_to(Connected),
                from == Authenticating,
                "{from} -> CONNECTED"
            );
        }
    }

    #[test]
    fn test_can_transition_to_shutdown_from_any_state() {
        for from in ALL {
            assert!(from.can_transition_to(Shutdown));
        }
    }

    #[test]
    fn test_can_transition_to_nothing_leaves_shutdown() {
        for to in ALL.into_iter().filter(|s| *s != Shutdown) {
            assert!(!Shutdown.can_transition_to(to));
        }
    }

    #[test]
    fn test_can_transition_to_reconnecting_goes_to_connecting() {
        assert!(Reconnecting.can_transition_to(Connecting));
        assert!(!Reconnecting.can_transition_to(Connected));
        assert!(!Reconnecting.can_transition_to(Authenticating));
    }

    #[test]
    fn test_has_socket() {
        assert!(Connecting.has_socket());
        assert!(Authenticating.has_socket());
        assert!(Connected.has_socket());
        assert!(!Disconnected.has_socket());
        assert!(!Reconnecting.has_socket());
        assert!(!Shutdown.has_socket());
    }

    #[test]
    fn test_display_uses_upper_case_name() {
        assert_eq!(Authenticating.to_string(), "AUTHENTICATING");
        assert_eq!(ConnectionState::default(), Disconnected);
    }
}
