//! Turns decoded gateway documents into session updates and events.
//!
//! Runs on the network thread, one frame at a time, in arrival order.
//! Nothing here touches the socket: when a frame calls for a connection
//! level reaction (authentication finished or was refused) the outcome is
//! reported back to the driver as a [`Dispatch`] value.

use std::collections::HashMap;

use i3link_protocol::{
    channel_names, locate_hits, mud_entries, who_entries, ChannelMembership, ChannelMessage,
    DirectMessage, ErrorParams, Event, GatewayError, JsonLineCodec, MudStatusParams,
    Notification, RequestId, Response, RpcMessage,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::client::Shared;

/// What the driver should do after a frame was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// Routed to a handler.
    Handled,
    /// Malformed, unknown or not applicable; already logged.
    Ignored,
    /// The session just became `Connected`.
    Authenticated,
    /// The gateway answered our `authenticate` with an error.
    AuthRejected,
}

/// Requests sent on the current connection that have not been answered.
///
/// Cleared whenever the connection goes away, so a late response from an
/// old socket can never be matched against a new request.
#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    methods: HashMap<RequestId, &'static str>,
}

impl PendingRequests {
    pub(crate) fn insert(&mut self, id: RequestId, method: &'static str) {
        self.methods.insert(id, method);
    }

    pub(crate) fn take(&mut self, id: RequestId) -> Option<&'static str> {
        self.methods.remove(&id)
    }

    pub(crate) fn clear(&mut self) {
        self.methods.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.methods.len()
    }
}

/// Decodes one frame and routes it.
pub(crate) fn dispatch_frame(
    shared: &Shared,
    pending: &mut PendingRequests,
    codec: &JsonLineCodec,
    frame: &[u8],
) -> Dispatch {
    let doc = match codec.decode_document(frame) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, len = frame.len(), "discarding malformed frame");
            shared.session.record_error();
            return Dispatch::Ignored;
        }
    };
    shared.session.record_received();

    match RpcMessage::classify(doc) {
        Ok(RpcMessage::Response(resp)) => handle_response(shared, pending, resp),
        Ok(RpcMessage::Notification(n)) => handle_notification(shared, n),
        Err(e) => {
            warn!(error = %e, "discarding unrecognized document");
            shared.session.record_error();
            Dispatch::Ignored
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

fn handle_response(shared: &Shared, pending: &mut PendingRequests, resp: Response) -> Dispatch {
    let method = pending.take(resp.id);
    trace!(id = %resp.id, method = method.unwrap_or("?"), "response received");

    let result = match resp.outcome {
        Ok(result) => result,
        Err(err) => {
            warn!(id = %resp.id, method = method.unwrap_or("?"), error = %err, "gateway reported an error");
            shared.session.record_error();
            shared.emit(Event::Error(GatewayError {
                code: err.code.map(|c| c.to_string()),
                message: err.message,
                from_mud: None,
            }));
            return if method == Some("authenticate") {
                Dispatch::AuthRejected
            } else {
                Dispatch::Handled
            };
        }
    };

    if result.get("status").and_then(Value::as_str) == Some("authenticated") {
        return complete_authentication(shared, &result);
    }

    if method == Some("finger") {
        shared.emit(Event::FingerReply { info: result });
        return Dispatch::Handled;
    }

    if let Some(users) = result.get("users") {
        shared.emit(Event::WhoReply {
            mud_name: str_field(&result, "mud_name").or_else(|| str_field(&result, "target_mud")),
            channel: str_field(&result, "channel"),
            users: who_entries(users),
        });
    } else if let Some(muds) = result.get("muds") {
        let (total, online) = shared.directory().apply_mudlist(mud_entries(muds));
        debug!(total, online, "mudlist updated");
        shared.emit(Event::MudList { total, online });
    } else if let Some(channels) = result.get("channels") {
        let channels = channel_names(channels);
        shared.directory().add_channels(channels.iter().cloned());
        shared.emit(Event::ChannelList { channels });
    } else if let Some(locations) = result.get("locations") {
        shared.emit(Event::LocateReply {
            user_name: str_field(&result, "user_name").unwrap_or_default(),
            locations: locate_hits(locations),
        });
    }
    Dispatch::Handled
}

fn complete_authentication(shared: &Shared, result: &Value) -> Dispatch {
    let mud_name = str_field(result, "mud_name").unwrap_or_default();
    let session_id = str_field(result, "session_id").unwrap_or_default();

    if let Err(e) = shared.session.mark_authenticated(&mud_name, &session_id) {
        warn!(error = %e, "unexpected authentication result ignored");
        return Dispatch::Ignored;
    }
    shared.emit(Event::Connected {
        mud_name: shared
            .session
            .mud_name()
            .unwrap_or_else(|| shared.config.mud_name.clone()),
        session_id,
    });
    Dispatch::Authenticated
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

fn handle_notification(shared: &Shared, n: Notification) -> Dispatch {
    let Some(params) = n.params else {
        debug!(method = %n.method, "notification without params ignored");
        return Dispatch::Ignored;
    };

    let event = match n.method.as_str() {
        "tell_received" => parse::<DirectMessage>(shared, &n.method, params).map(Event::Tell),
        "emoteto_received" => parse::<DirectMessage>(shared, &n.method, params).map(Event::Emote),
        "channel_message" => {
            parse::<ChannelMessage>(shared, &n.method, params).map(Event::ChannelMessage)
        }
        "channel_emote" => {
            parse::<ChannelMessage>(shared, &n.method, params).map(Event::ChannelEmote)
        }
        "mud_online" | "mud_offline" => {
            let online = n.method == "mud_online";
            parse::<MudStatusParams>(shared, &n.method, params).and_then(|p| {
                if p.mud_name.is_empty() {
                    debug!(method = %n.method, "mud status without a name ignored");
                    return None;
                }
                shared.directory().set_online(&p.mud_name, online);
                Some(if online {
                    Event::MudOnline { mud_name: p.mud_name }
                } else {
                    Event::MudOffline { mud_name: p.mud_name }
                })
            })
        }
        "channel_joined" => parse::<ChannelMembership>(shared, &n.method, params).map(|m| {
            shared.directory().add_channels([m.channel.clone()]);
            Event::ChannelJoined(m)
        }),
        "channel_left" => {
            parse::<ChannelMembership>(shared, &n.method, params).map(Event::ChannelLeft)
        }
        "error_occurred" => parse::<ErrorParams>(shared, &n.method, params).map(|p| {
            let err = GatewayError::from(p);
            warn!(code = err.code.as_deref().unwrap_or(""), message = %err.message, "gateway error notification");
            shared.session.record_error();
            Event::Error(err)
        }),
        other => {
            trace!(method = other, "unhandled notification");
            None
        }
    };

    match event {
        Some(event) => {
            debug!(kind = event.kind(), "notification dispatched");
            shared.emit(event);
            Dispatch::Handled
        }
        None => Dispatch::Ignored,
    }
}

fn parse<T: DeserializeOwned>(shared: &Shared, method: &str, params: Value) -> Option<T> {
    match serde_json::from_value(params) {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(method, error = %e, "notification params have the wrong shape");
            shared.session.record_error();
            None
        }
    }
}
