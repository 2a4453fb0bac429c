//! Inbound events handed to the foreground thread.
//!
//! The dispatcher turns gateway notifications and interesting responses
//! into [`Event`] values. Each variant carries only the fields that matter
//! for it; how they are shown to players is up to the caller.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::payload::WhoEntry;

/// Deserializes a string field that the gateway may send as `null`.
pub(crate) fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A tell or targeted emote (`tell_received` / `emoteto_received`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DirectMessage {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub from_mud: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub from_user: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub to_user: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub message: String,
    /// Display name of the sender, when it differs from `from_user`.
    #[serde(default)]
    pub visname: Option<String>,
}

/// A channel message or channel emote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelMessage {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub channel: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub from_mud: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub from_user: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub message: String,
    #[serde(default)]
    pub visname: Option<String>,
}

/// Someone joined or left a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelMembership {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub channel: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, alias = "mud_name")]
    pub mud: Option<String>,
}

/// An error reported by the gateway, either in a response's `error`
/// member or through an `error_occurred` notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayError {
    pub code: Option<String>,
    pub message: String,
    pub from_mud: Option<String>,
}

/// Everything the network thread can tell the foreground about.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Authentication succeeded; the link is usable.
    Connected { mud_name: String, session_id: String },

    /// The link dropped (or was dropped on purpose).
    Disconnected { reason: String },

    Tell(DirectMessage),
    Emote(DirectMessage),

    ChannelMessage(ChannelMessage),
    ChannelEmote(ChannelMessage),

    MudOnline { mud_name: String },
    MudOffline { mud_name: String },

    ChannelJoined(ChannelMembership),
    ChannelLeft(ChannelMembership),

    Error(GatewayError),

    /// Result of a `who` or `channel_who` request.
    WhoReply {
        mud_name: Option<String>,
        channel: Option<String>,
        users: Vec<WhoEntry>,
    },

    /// A MUD list arrived and the directory was updated.
    MudList { total: usize, online: usize },

    ChannelList { channels: Vec<String> },

    LocateReply {
        user_name: String,
        /// Names of the MUDs the user was found on.
        locations: Vec<String>,
    },

    /// Raw `finger` result; its layout depends on the remote driver.
    FingerReply { info: Value },
}

impl Event {
    /// Short, stable name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::Tell(_) => "tell",
            Self::Emote(_) => "emote",
            Self::ChannelMessage(_) => "channel_message",
            Self::ChannelEmote(_) => "channel_emote",
            Self::MudOnline { .. } => "mud_online",
            Self::MudOffline { .. } => "mud_offline",
            Self::ChannelJoined(_) => "channel_joined",
            Self::ChannelLeft(_) => "channel_left",
            Self::Error(_) => "error",
            Self::WhoReply { .. } => "who_reply",
            Self::MudList { .. } => "mudlist",
            Self::ChannelList { .. } => "channel_list",
            Self::LocateReply { .. } => "locate_reply",
            Self::FingerReply { .. } => "finger_reply",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_message_from_tell_params() {
        let params = json!({
            "from_mud": "OtherMUD",
            "from_user": "Bob",
            "to_user": "Alice",
            "message": "hi"
        });
        let msg: DirectMessage = serde_json::from_value(params).unwrap();
        assert_eq!(msg.from_mud, "OtherMUD");
        assert_eq!(msg.from_user, "Bob");
        assert_eq!(msg.to_user, "Alice");
        assert_eq!(msg.message, "hi");
        assert_eq!(msg.visname, None);
    }

    #[test]
    fn test_missing_and_null_fields_become_empty() {
        let msg: ChannelMessage =
            serde_json::from_value(json!({"channel": "chat", "from_mud": null})).unwrap();
        assert_eq!(msg.channel, "chat");
        assert_eq!(msg.from_mud, "");
        assert_eq!(msg.message, "");
    }

    #[test]
    fn test_channel_membership_accepts_mud_name_alias() {
        let m: ChannelMembership = serde_json::from_value(
            json!({"channel": "dev", "user": "Ann", "mud_name": "Elsewhere"}),
        )
        .unwrap();
        assert_eq!(m.mud.as_deref(), Some("Elsewhere"));
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!(Event::Tell(DirectMessage::default()).kind(), "tell");
        assert_eq!(
            Event::MudOffline { mud_name: "X".into() }.kind(),
            "mud_offline"
        );
        assert_eq!(Event::Error(GatewayError::default()).kind(), "error");
    }
}
