//! The session record shared between the game thread and the network
//! thread.
//!
//! A [`Session`] tracks:
//! - WHAT state the link is in (see [`ConnectionState`])
//! - WHO the gateway says we are (MUD name, session id)
//! - HOW MUCH traffic went through (advisory counters)
//! - WHICH request id comes next
//!
//! State and `authenticated` live together behind one lock, so a reader
//! never sees `Connected` paired with `authenticated == false` or the
//! other way round. Counters are plain atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use i3link_protocol::RequestId;
use tracing::{debug, info};

use crate::{ConnectionState, SessionError};

#[derive(Debug, Default)]
struct StateCell {
    state: ConnectionState,
    authenticated: bool,
    connected_since: Option<Instant>,
}

#[derive(Debug, Default)]
struct Identity {
    mud_name: Option<String>,
    session_id: Option<String>,
}

/// Snapshot of the traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub errors: u64,
    pub reconnects: u64,
}

/// Process-wide connection record. Created by the client on initialize and
/// shared (behind an `Arc`) with the network driver.
#[derive(Debug)]
pub struct Session {
    state: Mutex<StateCell>,
    identity: Mutex<Identity>,
    next_request_id: AtomicU64,
    sent: AtomicU64,
    received: AtomicU64,
    errors: AtomicU64,
    reconnects: AtomicU64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn relock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    /// A fresh session: `Disconnected`, no identity, first request id 1.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StateCell::default()),
            identity: Mutex::new(Identity::default()),
            next_request_id: AtomicU64::new(1),
            sent: AtomicU64::new(0),
            received: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
        }
    }

    // -- state ---------------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        relock(&self.state).state
    }

    /// `true` only while `Connected` (and therefore authenticated).
    pub fn is_connected(&self) -> bool {
        let cell = relock(&self.state);
        cell.state == ConnectionState::Connected && cell.authenticated
    }

    pub fn is_authenticated(&self) -> bool {
        relock(&self.state).authenticated
    }

    pub fn is_shutdown(&self) -> bool {
        self.state() == ConnectionState::Shutdown
    }

    /// Moves to `next`, returning the previous state.
    ///
    /// `authenticated` follows the new state: it is `true` exactly when the
    /// new state is `Connected`.
    ///
    /// # Errors
    /// [`SessionError::InvalidTransition`] if the edge is not allowed; the
    /// state is left untouched.
    pub fn transition(&self, next: ConnectionState) -> Result<ConnectionState, SessionError> {
        let mut cell = relock(&self.state);
        let from = cell.state;
        if !from.can_transition_to(next) {
            return Err(SessionError::InvalidTransition { from, to: next });
        }
        cell.state = next;
        cell.authenticated = next == ConnectionState::Connected;
        if next == ConnectionState::Connected {
            cell.connected_since = Some(Instant::now());
        } else if !next.has_socket() {
            cell.connected_since = None;
        }
        drop(cell);

        debug!(%from, to = %next, "session state changed");
        Ok(from)
    }

    /// Completes authentication: `Authenticating -> Connected`, recording
    /// the identity the gateway assigned. Empty values keep what we had.
    ///
    /// # Errors
    /// [`SessionError::InvalidTransition`] unless currently `Authenticating`.
    pub fn mark_authenticated(
        &self,
        mud_name: &str,
        session_id: &str,
    ) -> Result<(), SessionError> {
        self.transition(ConnectionState::Connected)?;
        let mut id = relock(&self.identity);
        if !mud_name.is_empty() {
            id.mud_name = Some(mud_name.to_string());
        }
        if !session_id.is_empty() {
            id.session_id = Some(session_id.to_string());
        }
        info!(
            mud_name = id.mud_name.as_deref().unwrap_or(""),
            session_id = id.session_id.as_deref().unwrap_or(""),
            "authenticated with gateway"
        );
        Ok(())
    }

    /// Drops to `Disconnected` if a socket is currently held.
    ///
    /// Idempotent: returns `false` (and changes nothing) when already
    /// disconnected, reconnecting or shut down. The session id does not
    /// survive a disconnect.
    pub fn mark_disconnected(&self) -> bool {
        let mut cell = relock(&self.state);
        if !cell.state.has_socket() {
            return false;
        }
        let from = cell.state;
        cell.state = ConnectionState::Disconnected;
        cell.authenticated = false;
        cell.connected_since = None;
        drop(cell);

        relock(&self.identity).session_id = None;
        debug!(%from, "session disconnected");
        true
    }

    /// Enters the terminal `Shutdown` state. Returns the previous state.
    pub fn begin_shutdown(&self) -> ConnectionState {
        let mut cell = relock(&self.state);
        let from = cell.state;
        cell.state = ConnectionState::Shutdown;
        cell.authenticated = false;
        cell.connected_since = None;
        from
    }

    /// Time spent in the current `Connected` stretch.
    pub fn uptime(&self) -> Option<Duration> {
        relock(&self.state).connected_since.map(|t| t.elapsed())
    }

    // -- identity ------------------------------------------------------------

    pub fn mud_name(&self) -> Option<String> {
        relock(&self.identity).mud_name.clone()
    }

    pub fn session_id(&self) -> Option<String> {
        relock(&self.identity).session_id.clone()
    }

    // -- ids and counters ----------------------------------------------------

    /// Reserves the next request id. Never repeats for the life of the
    /// session.
    pub fn next_request_id(&self) -> RequestId {
        RequestId(self.next_request_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn counters(&self) -> SessionCounters {
        SessionCounters {
            messages_sent: self.sent.load(Ordering::Relaxed),
            messages_received: self.received.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}
