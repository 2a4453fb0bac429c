//! Wire protocol for i3link.
//!
//! This crate defines the "language" spoken between a MUD and the I3
//! gateway:
//!
//! - **Types** ([`RpcRequest`], [`RpcMessage`], [`RequestId`]) — the
//!   JSON-RPC 2.0 structures that travel on the wire.
//! - **Framing** ([`LineFramer`], [`split_frame`]) — recovering whole lines
//!   from a TCP byte stream.
//! - **Codec** ([`Codec`] trait, [`JsonLineCodec`]) — how one frame is
//!   converted to and from bytes.
//! - **Commands and events** ([`Command`], [`Event`]) — the typed values
//!   that cross the queue boundary between the game thread and the network
//!   thread.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (connection state). It knows nothing about sockets or threads; it only
//! knows how to frame, serialize and interpret messages.
//!
//! ```text
//! Transport (bytes) → LineFramer (lines) → JsonLineCodec (Value) → RpcMessage → Event
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod command;
mod error;
mod event;
mod frame;
mod payload;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, JsonLineCodec, FRAME_TERMINATOR};
pub use command::{Command, CommandKind};
pub use error::ProtocolError;
pub use event::{ChannelMembership, ChannelMessage, DirectMessage, Event, GatewayError};
pub use frame::{split_frame, LineFramer, DEFAULT_MAX_FRAME_BYTES};
pub use payload::{
    channel_names, locate_hits, mud_entries, status_is_online, who_entries, ErrorParams,
    MudEntry, MudStatusParams, WhoEntry,
};
pub use types::{
    Notification, RequestId, Response, RpcError, RpcMessage, RpcRequest, JSONRPC_VERSION,
};
