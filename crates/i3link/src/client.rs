//! `I3Client`: the handle the game thread holds.
//!
//! Creating a client starts the network thread; dropping it (or calling
//! [`I3Client::shutdown`]) stops that thread and frees both queues. Every
//! method here is synchronous and returns promptly: submissions only touch
//! the command queue, queries only read shared state.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use i3link_protocol::{Command, CommandKind, Event, RequestId};
use i3link_queue::{BoundedQueue, QueueError, QueueStats};
use i3link_session::{ConnectionState, MudDirectory, MudRecord, Session, SessionCounters};
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::{driver, ClientConfig, I3Error};

/// Channel used by [`I3Client::send_chat`] when no default is configured.
pub const FALLBACK_CHAT_CHANNEL: &str = "intermud";

/// State shared between the client handle and the network thread.
pub(crate) struct Shared {
    pub(crate) config: ClientConfig,
    pub(crate) session: Session,
    pub(crate) commands: BoundedQueue<Command>,
    pub(crate) events: BoundedQueue<Event>,
    directory: Mutex<MudDirectory>,
    /// Pinged on every submission so the driver doesn't sit out its poll
    /// interval with work queued.
    pub(crate) wake: Notify,
    pub(crate) shutdown: Notify,
    pub(crate) reconnect_requested: AtomicBool,
}

impl Shared {
    pub(crate) fn new(config: ClientConfig) -> Self {
        let capacity = config.max_queue_size;
        Self {
            config,
            session: Session::new(),
            commands: BoundedQueue::new("commands", capacity),
            events: BoundedQueue::new("events", capacity),
            directory: Mutex::new(MudDirectory::new()),
            wake: Notify::new(),
            shutdown: Notify::new(),
            reconnect_requested: AtomicBool::new(false),
        }
    }

    pub(crate) fn directory(&self) -> MutexGuard<'_, MudDirectory> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands an event to the game thread. A full queue drops it (the queue
    /// logs and counts that).
    pub(crate) fn emit(&self, event: Event) {
        let _ = self.events.push(event);
    }
}

/// Result of a submission that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// In the command queue; it goes out once the link is `Connected`.
    Queued(RequestId),
    /// The command queue was full and the command was discarded.
    Dropped,
}

impl Submission {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::Queued(id) => Some(*id),
            Self::Dropped => None,
        }
    }
}

/// Everything a status command might want to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStats {
    pub state: ConnectionState,
    pub counters: SessionCounters,
    pub commands: QueueStats,
    pub events: QueueStats,
    pub known_muds: usize,
    pub online_muds: usize,
    pub known_channels: usize,
    pub uptime: Option<Duration>,
}

/// Handle to a running gateway client.
///
/// ```rust,no_run
/// use i3link::prelude::*;
///
/// let client = I3Client::initialize(ClientConfig::default())?;
/// client.send_tell("Alice", "OtherMUD", "Bob", "hi")?;
///
/// // Once per game tick:
/// for event in client.drain_events() {
///     if let Event::Tell(msg) = event {
///         println!("{}@{} tells you: {}", msg.from_user, msg.from_mud, msg.message);
///     }
/// }
///
/// client.shutdown();
/// # Ok::<(), I3Error>(())
/// ```
pub struct I3Client {
    shared: Arc<Shared>,
    driver: Option<JoinHandle<()>>,
}

impl I3Client {
    /// Starts the network thread. The first connection attempt begins
    /// immediately; this call does not wait for it.
    ///
    /// # Errors
    /// [`I3Error::ThreadSpawn`] if the runtime or thread cannot be created.
    pub fn initialize(config: ClientConfig) -> Result<Self, I3Error> {
        let config = config.validated();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(I3Error::ThreadSpawn)?;

        info!(
            host = %config.gateway_host,
            port = config.gateway_port,
            "initializing I3 client"
        );
        let shared = Arc::new(Shared::new(config));
        let driver_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("i3-network".into())
            .spawn(move || runtime.block_on(driver::run(driver_shared)))
            .map_err(I3Error::ThreadSpawn)?;

        Ok(Self {
            shared,
            driver: Some(handle),
        })
    }

    /// [`initialize`](Self::initialize) with settings read from `path`.
    /// An unreadable file logs a warning and falls back to the defaults.
    pub fn initialize_from_file(path: impl AsRef<Path>) -> Result<Self, I3Error> {
        Self::initialize(ClientConfig::load_or_default(path))
    }

    /// Like [`initialize_from_file`](Self::initialize_from_file), but a
    /// missing or unreadable file is an error.
    ///
    /// # Errors
    /// [`I3Error::Config`] if `path` cannot be read, otherwise as
    /// [`initialize`](Self::initialize).
    pub fn try_initialize_from_file(path: impl AsRef<Path>) -> Result<Self, I3Error> {
        Self::initialize(ClientConfig::load(path)?)
    }

    /// Stops the network thread, closes the socket and frees everything
    /// still queued. Blocks until the thread has exited, which takes at
    /// most one poll interval.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(handle) = self.driver.take() else {
            return;
        };
        info!("shutting down I3 client");
        self.shared.session.begin_shutdown();
        self.shared.shutdown.notify_one();
        self.shared.wake.notify_one();

        if handle.join().is_err() {
            error!("I3 network thread panicked");
        }

        self.shared.commands.close();
        self.shared.events.close();
        let commands = self.shared.commands.clear();
        let events = self.shared.events.clear();
        debug!(commands, events, "queues drained");
    }

    fn is_running(&self) -> bool {
        self.driver.is_some() && !self.shared.session.is_shutdown()
    }

    // -- submissions ---------------------------------------------------------

    fn submit(&self, kind: CommandKind) -> Result<Submission, I3Error> {
        if !self.is_running() {
            return Err(I3Error::NotRunning);
        }
        let id = self.shared.session.next_request_id();
        let method = kind.method();
        match self.shared.commands.push(Command::new(id, kind)) {
            Ok(()) => {
                debug!(%id, method, "command queued");
                self.shared.wake.notify_one();
                Ok(Submission::Queued(id))
            }
            Err(QueueError::Full { .. }) => Ok(Submission::Dropped),
            Err(QueueError::Closed) => Err(I3Error::NotRunning),
        }
    }

    fn require(enabled: bool, feature: &'static str) -> Result<(), I3Error> {
        if enabled {
            Ok(())
        } else {
            Err(I3Error::FeatureDisabled(feature))
        }
    }

    /// Sends a private message to `target_user@target_mud`.
    ///
    /// Whether the target MUD is known and online is not checked here; use
    /// [`ensure_mud_online`](Self::ensure_mud_online) first if you care.
    ///
    /// # Errors
    /// [`I3Error::FeatureDisabled`] when tells are off,
    /// [`I3Error::InvalidArgument`] for an empty name or message.
    pub fn send_tell(
        &self,
        from_user: &str,
        target_mud: &str,
        target_user: &str,
        message: &str,
    ) -> Result<Submission, I3Error> {
        Self::require(self.shared.config.enable_tell, "tell")?;
        non_empty(&[
            ("from_user", from_user),
            ("target_mud", target_mud),
            ("target_user", target_user),
            ("message", message),
        ])?;
        self.submit(CommandKind::Tell {
            from_user: from_user.to_string(),
            target_mud: target_mud.to_string(),
            target_user: target_user.to_string(),
            message: message.to_string(),
        })
    }

    /// Targeted emote; shares the tell toggle.
    pub fn send_emoteto(
        &self,
        from_user: &str,
        target_mud: &str,
        target_user: &str,
        message: &str,
    ) -> Result<Submission, I3Error> {
        Self::require(self.shared.config.enable_tell, "tell")?;
        non_empty(&[
            ("from_user", from_user),
            ("target_mud", target_mud),
            ("target_user", target_user),
            ("message", message),
        ])?;
        self.submit(CommandKind::Emoteto {
            from_user: from_user.to_string(),
            target_mud: target_mud.to_string(),
            target_user: target_user.to_string(),
            message: message.to_string(),
        })
    }

    pub fn send_channel_message(
        &self,
        channel: &str,
        from_user: &str,
        message: &str,
    ) -> Result<Submission, I3Error> {
        Self::require(self.shared.config.enable_channels, "channels")?;
        non_empty(&[("channel", channel), ("from_user", from_user), ("message", message)])?;
        self.submit(CommandKind::ChannelSend {
            channel: channel.to_string(),
            from_user: from_user.to_string(),
            message: message.to_string(),
        })
    }

    pub fn send_channel_emote(
        &self,
        channel: &str,
        from_user: &str,
        message: &str,
    ) -> Result<Submission, I3Error> {
        Self::require(self.shared.config.enable_channels, "channels")?;
        non_empty(&[("channel", channel), ("from_user", from_user), ("message", message)])?;
        self.submit(CommandKind::ChannelEmote {
            channel: channel.to_string(),
            from_user: from_user.to_string(),
            message: message.to_string(),
        })
    }

    /// Sends to the configured default channel, or to
    /// [`FALLBACK_CHAT_CHANNEL`] when none is set.
    pub fn send_chat(&self, from_user: &str, message: &str) -> Result<Submission, I3Error> {
        let channel = self
            .shared
            .config
            .default_channel
            .as_deref()
            .unwrap_or(FALLBACK_CHAT_CHANNEL);
        self.send_channel_message(channel, from_user, message)
    }

    pub fn request_who(&self, target_mud: &str) -> Result<Submission, I3Error> {
        Self::require(self.shared.config.enable_who, "who")?;
        non_empty(&[("target_mud", target_mud)])?;
        self.submit(CommandKind::Who {
            target_mud: target_mud.to_string(),
        })
    }

    /// Shares the who toggle.
    pub fn request_finger(&self, target_mud: &str, target_user: &str) -> Result<Submission, I3Error> {
        Self::require(self.shared.config.enable_who, "who")?;
        non_empty(&[("target_mud", target_mud), ("target_user", target_user)])?;
        self.submit(CommandKind::Finger {
            target_mud: target_mud.to_string(),
            target_user: target_user.to_string(),
        })
    }

    /// Shares the who toggle.
    pub fn request_locate(&self, target_user: &str) -> Result<Submission, I3Error> {
        Self::require(self.shared.config.enable_who, "who")?;
        non_empty(&[("target_user", target_user)])?;
        self.submit(CommandKind::Locate {
            target_user: target_user.to_string(),
        })
    }

    pub fn request_mudlist(&self, refresh: bool) -> Result<Submission, I3Error> {
        self.submit(CommandKind::MudList { refresh })
    }

    pub fn list_channels(&self) -> Result<Submission, I3Error> {
        Self::require(self.shared.config.enable_channels, "channels")?;
        self.submit(CommandKind::ChannelList)
    }

    pub fn join_channel(
        &self,
        channel: &str,
        from_user: &str,
        listen_only: bool,
    ) -> Result<Submission, I3Error> {
        Self::require(self.shared.config.enable_channels, "channels")?;
        non_empty(&[("channel", channel), ("from_user", from_user)])?;
        self.submit(CommandKind::ChannelJoin {
            channel: channel.to_string(),
            from_user: from_user.to_string(),
            listen_only,
        })
    }

    pub fn leave_channel(&self, channel: &str, from_user: &str) -> Result<Submission, I3Error> {
        Self::require(self.shared.config.enable_channels, "channels")?;
        non_empty(&[("channel", channel), ("from_user", from_user)])?;
        self.submit(CommandKind::ChannelLeave {
            channel: channel.to_string(),
            from_user: from_user.to_string(),
        })
    }

    pub fn channel_who(&self, channel: &str) -> Result<Submission, I3Error> {
        Self::require(self.shared.config.enable_channels, "channels")?;
        non_empty(&[("channel", channel)])?;
        self.submit(CommandKind::ChannelWho {
            channel: channel.to_string(),
        })
    }

    /// Asks the network thread to drop the current connection (if any)
    /// and connect again right away, skipping the reconnect delay.
    pub fn request_reconnect(&self) -> Result<(), I3Error> {
        if !self.is_running() {
            return Err(I3Error::NotRunning);
        }
        info!("reconnect requested");
        self.shared.reconnect_requested.store(true, Ordering::Release);
        self.shared.wake.notify_one();
        Ok(())
    }

    // -- events --------------------------------------------------------------

    /// Removes and returns every queued event, oldest first.
    pub fn drain_events(&self) -> Vec<Event> {
        self.shared.events.drain()
    }

    pub fn poll_event(&self) -> Option<Event> {
        self.shared.events.pop()
    }

    // -- queries -------------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.shared.session.state()
    }

    pub fn state_name(&self) -> &'static str {
        self.state().name()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.session.is_connected()
    }

    /// The name the gateway assigned us, or the configured one before that.
    pub fn mud_name(&self) -> String {
        self.shared
            .session
            .mud_name()
            .unwrap_or_else(|| self.shared.config.mud_name.clone())
    }

    pub fn session_id(&self) -> Option<String> {
        self.shared.session.session_id()
    }

    /// Time since the current connection authenticated.
    pub fn uptime(&self) -> Option<Duration> {
        self.shared.session.uptime()
    }

    pub fn stats(&self) -> ClientStats {
        let (known_muds, online_muds, known_channels) = {
            let dir = self.shared.directory();
            (dir.len(), dir.online_count(), dir.channel_count())
        };
        ClientStats {
            state: self.state(),
            counters: self.shared.session.counters(),
            commands: self.shared.commands.stats(),
            events: self.shared.events.stats(),
            known_muds,
            online_muds,
            known_channels,
            uptime: self.uptime(),
        }
    }

    /// Case-insensitive lookup of a MUD the gateway told us about.
    pub fn find_mud(&self, name: &str) -> Option<MudRecord> {
        self.shared.directory().get(name).cloned()
    }

    /// The MUD's record if it is known and online.
    ///
    /// # Errors
    /// [`I3Error::Session`] wrapping `UnknownMud` or `MudOffline`.
    pub fn ensure_mud_online(&self, name: &str) -> Result<MudRecord, I3Error> {
        Ok(self.shared.directory().ensure_online(name)?)
    }

    pub fn known_channels(&self) -> Vec<String> {
        self.shared.directory().channels()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }
}

impl Drop for I3Client {
    fn drop(&mut self) {
        self.stop();
    }
}

fn non_empty(args: &[(&str, &str)]) -> Result<(), I3Error> {
    match args.iter().find(|(_, v)| v.trim().is_empty()) {
        Some((name, _)) => Err(I3Error::InvalidArgument(format!("{name} must not be empty"))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_names_first_blank_argument() {
        let err = non_empty(&[("channel", "c"), ("message", "  ")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: message must not be empty");
        assert!(non_empty(&[("a", "x")]).is_ok());
    }

    #[test]
    fn test_submission_accessors() {
        assert!(Submission::Queued(RequestId(2)).is_queued());
        assert_eq!(Submission::Queued(RequestId(2)).request_id(), Some(RequestId(2)));
        assert_eq!(Submission::Dropped.request_id(), None);
    }

    #[test]
    fn test_shared_queues_use_configured_capacity() {
        let shared = Shared::new(ClientConfig {
            max_queue_size: 3,
            ..ClientConfig::default()
        });
        assert_eq!(shared.commands.capacity(), 3);
        assert_eq!(shared.events.capacity(), 3);
    }
}
