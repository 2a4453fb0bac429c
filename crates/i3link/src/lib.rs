//! # i3link
//!
//! Intermud3 gateway client for MUD servers.
//!
//! i3link keeps one persistent, line-delimited JSON-RPC connection to an I3
//! gateway on a background thread, so the game loop never blocks on the
//! network. The game thread talks to it through an [`I3Client`] handle:
//!
//! - **Commands** (tells, channel messages, who requests, ...) go into a
//!   bounded queue and are sent once the link is authenticated.
//! - **Events** (incoming tells, channel traffic, MUDs coming and going)
//!   come back through a second bounded queue, drained on the game's own
//!   schedule with [`I3Client::drain_events`].
//!
//! Reconnection, heartbeats and authentication are handled by the network
//! thread.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use i3link::prelude::*;
//!
//! let client = I3Client::initialize_from_file("config/i3.conf")?;
//! client.send_chat("Alice", "hello, world")?;
//! for event in client.drain_events() {
//!     println!("{event:?}");
//! }
//! # Ok::<(), I3Error>(())
//! ```

mod backoff;
mod client;
mod config;
mod dispatch;
mod driver;
mod error;

pub use client::{ClientStats, I3Client, Submission, FALLBACK_CHAT_CHANNEL};
pub use config::{ClientConfig, ConfigError};
pub use error::I3Error;

pub use i3link_protocol as protocol;
pub use i3link_queue as queue;
pub use i3link_session as session;
pub use i3link_transport as transport;

/// Everything a typical integration needs.
pub mod prelude {
    pub use crate::{ClientConfig, ClientStats, I3Client, I3Error, Submission};
    pub use i3link_protocol::{
        ChannelMembership, ChannelMessage, DirectMessage, Event, GatewayError, RequestId,
        WhoEntry,
    };
    pub use i3link_queue::QueueStats;
    pub use i3link_session::{ConnectionState, MudRecord, SessionCounters, SessionError};
}
