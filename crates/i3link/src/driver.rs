//! The network driver: the only code that touches the gateway socket.
//!
//! Runs on its own OS thread inside a current-thread tokio runtime. Each
//! pass of the loop:
//!
//! 1. reconnects if the link is down (after the backoff delay), or
//!    reconnects at once when the game thread asked for it;
//! 2. sends at most one queued command, only while `Connected`;
//! 3. waits for socket data, bounded by the poll interval, and feeds every
//!    complete line to the dispatcher;
//! 4. sends a heartbeat when due and enforces the authentication timeout.
//!
//! Sends are bounded by `send_timeout`; a gateway that stops reading is
//! treated as a dead link.
//!
//! Every wait also listens for the shutdown signal, so a shutdown is seen
//! within one poll interval at worst.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use i3link_protocol::{Command, CommandKind, Event, JsonLineCodec, LineFramer};
use i3link_session::ConnectionState;
use i3link_transport::{Connection, TcpConnection, TransportError};
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::client::Shared;
use crate::dispatch::{dispatch_frame, Dispatch, PendingRequests};

/// `from_user` for the automatic default-channel join.
const SYSTEM_USER: &str = "System";

pub(crate) async fn run(shared: Arc<Shared>) {
    info!("I3 network thread started");
    let mut driver = Driver::new(shared);
    driver.connect().await;

    while !driver.shared.session.is_shutdown() {
        driver.step().await;
    }

    driver.close_socket().await;
    info!("I3 network thread terminating");
}

/// How a bounded wait ended.
enum Wake {
    Shutdown,
    Woken,
    Elapsed,
}

struct Driver {
    shared: Arc<Shared>,
    codec: JsonLineCodec,
    framer: LineFramer,
    conn: Option<TcpConnection>,
    pending: PendingRequests,
    backoff: Backoff,
    /// Logged once when `max_reconnect_attempts` runs out.
    gave_up: bool,
    last_heartbeat: Instant,
    auth_deadline: Option<Instant>,
}

impl Driver {
    fn new(shared: Arc<Shared>) -> Self {
        let cfg = &shared.config;
        let backoff = Backoff::new(
            cfg.reconnect_delay,
            cfg.max_reconnect_delay,
            cfg.max_reconnect_attempts,
        );
        let framer = LineFramer::new(cfg.max_frame_bytes);
        Self {
            shared,
            codec: JsonLineCodec,
            framer,
            conn: None,
            pending: PendingRequests::default(),
            backoff,
            gave_up: false,
            last_heartbeat: Instant::now(),
            auth_deadline: None,
        }
    }

    async fn step(&mut self) {
        if self.shared.reconnect_requested.swap(false, Ordering::AcqRel) {
            self.disconnect("reconnect requested").await;
            self.backoff.reset();
            self.gave_up = false;
            self.shared.session.record_reconnect();
            self.connect().await;
            return;
        }

        match self.shared.session.state() {
            ConnectionState::Shutdown => return,
            ConnectionState::Disconnected | ConnectionState::Reconnecting => {
                if self.shared.config.auto_reconnect {
                    self.reconnect_after_delay().await;
                } else {
                    self.wait(self.shared.config.poll_interval).await;
                }
                return;
            }
            ConnectionState::Connected => {
                self.send_next_command().await;
                if self.shared.session.is_shutdown() {
                    return;
                }
            }
            ConnectionState::Connecting | ConnectionState::Authenticating => {}
        }

        self.poll_socket().await;
        self.check_timers().await;
    }

    // -- connection lifecycle ------------------------------------------------

    /// Opens a socket and sends `authenticate`. On failure the session is
    /// back in `Disconnected`.
    async fn connect(&mut self) {
        if self.shared.session.transition(ConnectionState::Connecting).is_err() {
            return;
        }
        let cfg = &self.shared.config;
        info!(host = %cfg.gateway_host, port = cfg.gateway_port, "connecting to I3 gateway");

        let shared = Arc::clone(&self.shared);
        let attempt = tokio::select! {
            biased;
            _ = shared.shutdown.notified() => return,
            res = TcpConnection::connect(&cfg.gateway_host, cfg.gateway_port, cfg.connect_timeout) => res,
        };

        let conn = match attempt {
            Ok(conn) => conn,
            Err(e) => {
                error!(error = %e, "failed to connect to I3 gateway");
                self.shared.session.record_error();
                self.shared.session.mark_disconnected();
                return;
            }
        };
        info!(conn = %conn.id(), peer = %conn.peer_addr(), "connected to I3 gateway");
        self.conn = Some(conn);
        self.framer.clear();
        self.pending.clear();

        if self.shared.session.transition(ConnectionState::Authenticating).is_err() {
            return;
        }
        self.auth_deadline = Some(Instant::now() + self.shared.config.auth_timeout);
        let api_key = self.shared.config.api_key.clone();
        self.send_request(CommandKind::Authenticate { api_key }).await;
    }

    async fn reconnect_after_delay(&mut self) {
        let Some(delay) = self.backoff.next_delay() else {
            if !self.gave_up {
                warn!(
                    attempts = self.backoff.attempts(),
                    "giving up on automatic reconnection"
                );
                self.gave_up = true;
            }
            self.wait(self.shared.config.poll_interval).await;
            return;
        };

        if self.shared.session.transition(ConnectionState::Reconnecting).is_err() {
            return;
        }
        info!(
            delay_ms = delay.as_millis() as u64,
            attempt = self.backoff.attempts(),
            "reconnecting to I3 gateway"
        );

        let deadline = Instant::now() + delay;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.wait(remaining).await {
                Wake::Shutdown => return,
                Wake::Elapsed => break,
                // A forced reconnect cuts the delay short.
                Wake::Woken if self.shared.reconnect_requested.swap(false, Ordering::AcqRel) => {
                    self.backoff.reset();
                    break;
                }
                Wake::Woken => {}
            }
        }

        self.shared.session.record_reconnect();
        self.connect().await;
    }

    /// Closes the socket and, if we were connected at all, tells the game
    /// thread why.
    async fn disconnect(&mut self, reason: &str) {
        self.close_socket().await;
        if self.shared.session.mark_disconnected() {
            info!(reason, "disconnected from I3 gateway");
            self.shared.emit(Event::Disconnected {
                reason: reason.to_string(),
            });
        }
    }

    async fn close_socket(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "error while closing gateway socket");
            }
        }
        self.framer.clear();
        self.pending.clear();
        self.auth_deadline = None;
    }

    // -- outbound ------------------------------------------------------------

    async fn send_next_command(&mut self) {
        let Some(command) = self.shared.commands.pop() else {
            return;
        };
        self.send_command(command).await;
        if !self.shared.commands.is_empty() {
            self.shared.wake.notify_one();
        }
    }

    async fn send_request(&mut self, kind: CommandKind) {
        let id = self.shared.session.next_request_id();
        self.send_command(Command::new(id, kind)).await;
    }

    async fn send_command(&mut self, command: Command) {
        let bytes = match self.codec.encode_command(&command) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(id = %command.id, method = command.method(), error = %e, "could not encode command");
                self.shared.session.record_error();
                return;
            }
        };
        let Some(conn) = self.conn.as_mut() else {
            debug!(id = %command.id, method = command.method(), "no socket, command dropped");
            return;
        };

        let shared = Arc::clone(&self.shared);
        let send_timeout = shared.config.send_timeout;
        let sent = tokio::select! {
            biased;
            _ = shared.shutdown.notified() => {
                debug!(id = %command.id, method = command.method(), "shutdown while sending");
                return;
            }
            res = timeout(send_timeout, conn.send(&bytes)) => {
                res.unwrap_or(Err(TransportError::SendTimeout(send_timeout)))
            }
        };
        match sent {
            Ok(()) => {
                debug!(id = %command.id, method = command.method(), "request sent");
                self.shared.session.record_sent();
                self.pending.insert(command.id, command.method());
            }
            Err(e) => {
                error!(id = %command.id, method = command.method(), error = %e, "send to I3 gateway failed");
                self.shared.session.record_error();
                self.disconnect(&disconnect_reason(&e)).await;
            }
        }
    }

    // -- inbound -------------------------------------------------------------

    async fn poll_socket(&mut self) {
        let deadline = self.next_deadline();
        let shared = Arc::clone(&self.shared);
        let Some(conn) = self.conn.as_mut() else {
            self.wait_until(deadline).await;
            return;
        };

        let received = tokio::select! {
            biased;
            _ = shared.shutdown.notified() => return,
            res = conn.recv() => res,
            _ = shared.wake.notified() => return,
            _ = sleep_until(deadline) => return,
        };

        match received {
            Ok(Some(bytes)) => {
                self.framer.push(&bytes);
                self.drain_frames().await;
            }
            Ok(None) => {
                self.disconnect("connection closed by gateway").await;
            }
            Err(e) => {
                error!(error = %e, "connection to I3 gateway lost");
                self.shared.session.record_error();
                self.disconnect(&disconnect_reason(&e)).await;
            }
        }
    }

    async fn drain_frames(&mut self) {
        while let Some(frame) = self.framer.next_frame() {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "discarding oversized frame");
                    self.shared.session.record_error();
                    continue;
                }
            };
            match dispatch_frame(&self.shared, &mut self.pending, &self.codec, &frame) {
                Dispatch::Handled | Dispatch::Ignored => {}
                Dispatch::Authenticated => self.on_authenticated().await,
                Dispatch::AuthRejected => {
                    self.disconnect("authentication rejected").await;
                    return;
                }
            }
            if self.conn.is_none() {
                // The socket went away mid-batch; the rest belongs to it.
                return;
            }
        }
    }

    async fn on_authenticated(&mut self) {
        self.auth_deadline = None;
        self.backoff.reset();
        self.gave_up = false;
        self.last_heartbeat = Instant::now();

        if let Some(channel) = self.shared.config.default_channel.clone() {
            info!(%channel, "joining default channel");
            self.send_request(CommandKind::ChannelJoin {
                channel,
                from_user: SYSTEM_USER.to_string(),
                listen_only: false,
            })
            .await;
        }
    }

    // -- timers --------------------------------------------------------------

    fn next_deadline(&self) -> Instant {
        let mut deadline = Instant::now() + self.shared.config.poll_interval;
        if self.heartbeat_enabled() && self.shared.session.is_connected() {
            deadline = deadline.min(self.last_heartbeat + self.shared.config.heartbeat_interval);
        }
        if let Some(auth) = self.auth_deadline {
            deadline = deadline.min(auth);
        }
        deadline
    }

    async fn check_timers(&mut self) {
        let now = Instant::now();
        match self.shared.session.state() {
            ConnectionState::Authenticating => {
                if self.auth_deadline.is_some_and(|d| now >= d) {
                    warn!("I3 gateway did not answer authentication in time");
                    self.shared.session.record_error();
                    self.disconnect("authentication timed out").await;
                }
            }
            ConnectionState::Connected if self.heartbeat_enabled() => {
                if now >= self.last_heartbeat + self.shared.config.heartbeat_interval {
                    debug!("sending heartbeat");
                    self.last_heartbeat = now;
                    self.send_request(CommandKind::Ping).await;
                }
            }
            _ => {}
        }
    }

    /// A zero interval turns heartbeats off.
    fn heartbeat_enabled(&self) -> bool {
        !self.shared.config.heartbeat_interval.is_zero()
    }

    async fn wait(&self, period: Duration) -> Wake {
        self.wait_until(Instant::now() + period).await
    }

    /// Sleeps until `deadline`, shutdown, or a wake-up from the game thread.
    async fn wait_until(&self, deadline: Instant) -> Wake {
        tokio::select! {
            biased;
            _ = self.shared.shutdown.notified() => Wake::Shutdown,
            _ = self.shared.wake.notified() => Wake::Woken,
            _ = sleep_until(deadline) => Wake::Elapsed,
        }
    }
}

fn disconnect_reason(e: &TransportError) -> String {
    match e {
        TransportError::ConnectionClosed(reason) => reason.clone(),
        TransportError::SendTimeout(_) => "send timed out".to_string(),
        other => other.to_string(),
    }
}
