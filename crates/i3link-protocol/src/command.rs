//! Outbound commands: everything the client can ask the gateway to do.
//!
//! A [`Command`] is built by the foreground thread, moved into the command
//! queue, and consumed by the network driver, which turns it into one
//! request line. Each variant of [`CommandKind`] knows its JSON-RPC method
//! name and how to lay out its `params`.

use serde_json::{json, Value};

use crate::{RequestId, RpcRequest};

/// A request waiting to be sent, tagged with the id the caller reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: RequestId,
    pub kind: CommandKind,
}

impl Command {
    pub fn new(id: RequestId, kind: CommandKind) -> Self {
        Self { id, kind }
    }

    /// The JSON-RPC method this command invokes.
    pub fn method(&self) -> &'static str {
        self.kind.method()
    }

    /// The wire form of this command.
    pub fn to_request(&self) -> RpcRequest {
        RpcRequest::new(self.id, self.kind.method(), self.kind.params())
    }
}

/// The operations the gateway understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Log in with the gateway API key.
    Authenticate { api_key: String },

    /// Keep-alive. Carries no params.
    Ping,

    /// Private message to a user on another MUD.
    Tell {
        from_user: String,
        target_mud: String,
        target_user: String,
        message: String,
    },

    /// Private emote to a user on another MUD.
    Emoteto {
        from_user: String,
        target_mud: String,
        target_user: String,
        message: String,
    },

    /// Message to a channel.
    ChannelSend {
        channel: String,
        from_user: String,
        message: String,
    },

    /// Emote to a channel.
    ChannelEmote {
        channel: String,
        from_user: String,
        message: String,
    },

    /// Who is logged in on `target_mud`.
    Who { target_mud: String },

    /// Details about one remote user.
    Finger {
        target_mud: String,
        target_user: String,
    },

    /// Which MUDs a user is on.
    Locate { target_user: String },

    /// The gateway's MUD list. `refresh` forces a router round-trip.
    MudList { refresh: bool },

    /// Channels known to the gateway.
    ChannelList,

    ChannelJoin {
        channel: String,
        from_user: String,
        listen_only: bool,
    },

    ChannelLeave { channel: String, from_user: String },

    /// Members of a channel.
    ChannelWho { channel: String },
}

impl CommandKind {
    /// The JSON-RPC method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::Ping => "ping",
            Self::Tell { .. } => "tell",
            Self::Emoteto { .. } => "emoteto",
            Self::ChannelSend { .. } => "channel_send",
            Self::ChannelEmote { .. } => "channel_emote",
            Self::Who { .. } => "who",
            Self::Finger { .. } => "finger",
            Self::Locate { .. } => "locate",
            Self::MudList { .. } => "mudlist",
            Self::ChannelList => "channel_list",
            Self::ChannelJoin { .. } => "channel_join",
            Self::ChannelLeave { .. } => "channel_leave",
            Self::ChannelWho { .. } => "channel_who",
        }
    }

    /// The `params` object, or `None` for methods that take none.
    pub fn params(&self) -> Option<Value> {
        let params = match self {
            Self::Ping => return None,
            Self::Authenticate { api_key } => json!({ "api_key": api_key }),
            Self::Tell {
                from_user,
                target_mud,
                target_user,
                message,
            }
            | Self::Emoteto {
                from_user,
                target_mud,
                target_user,
                message,
            } => json!({
                "from_user": from_user,
                "target_mud": target_mud,
                "target_user": target_user,
                "message": message,
            }),
            Self::ChannelSend {
                channel,
                from_user,
                message,
            }
            | Self::ChannelEmote {
                channel,
                from_user,
                message,
            } => json!({
                "channel": channel,
                "from_user": from_user,
                "message": message,
            }),
            Self::Who { target_mud } => json!({ "target_mud": target_mud }),
            Self::Finger {
                target_mud,
                target_user,
            } => json!({
                "target_mud": target_mud,
                "target_user": target_user,
            }),
            Self::Locate { target_user } => json!({ "target_user": target_user }),
            Self::MudList { refresh } => json!({ "refresh": refresh }),
            Self::ChannelList => json!({}),
            Self::ChannelJoin {
                channel,
                from_user,
                listen_only,
            } => json!({
                "channel": channel,
                "from_user": from_user,
                "listen_only": listen_only,
            }),
            Self::ChannelLeave { channel, from_user } => json!({
                "channel": channel,
                "from_user": from_user,
            }),
            Self::ChannelWho { channel } => json!({ "channel": channel }),
        };
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_has_no_params() {
        let cmd = Command::new(RequestId(4), CommandKind::Ping);
        let req = cmd.to_request();
        assert_eq!(req.method, "ping");
        assert!(req.params.is_none());
    }

    #[test]
    fn test_authenticate_carries_api_key() {
        let kind = CommandKind::Authenticate {
            api_key: "secret".into(),
        };
        assert_eq!(kind.method(), "authenticate");
        assert_eq!(kind.params(), Some(json!({"api_key": "secret"})));
    }

    #[test]
    fn test_tell_params_layout() {
        let kind = CommandKind::Tell {
            from_user: "Alice".into(),
            target_mud: "OtherMUD".into(),
            target_user: "Bob".into(),
            message: "hi".into(),
        };
        assert_eq!(kind.method(), "tell");
        assert_eq!(
            kind.params(),
            Some(json!({
                "from_user": "Alice",
                "target_mud": "OtherMUD",
                "target_user": "Bob",
                "message": "hi",
            }))
        );
    }

    #[test]
    fn test_emoteto_shares_tell_layout_with_own_method() {
        let kind = CommandKind::Emoteto {
            from_user: "Alice".into(),
            target_mud: "OtherMUD".into(),
            target_user: "Bob".into(),
            message: "waves".into(),
        };
        assert_eq!(kind.method(), "emoteto");
        assert_eq!(kind.params().unwrap()["target_user"], "Bob");
    }

    #[test]
    fn test_channel_join_includes_listen_only() {
        let kind = CommandKind::ChannelJoin {
            channel: "intermud".into(),
            from_user: "System".into(),
            listen_only: false,
        };
        assert_eq!(kind.method(), "channel_join");
        assert_eq!(kind.params().unwrap()["listen_only"], false);
    }

    #[test]
    fn test_method_names_match_gateway() {
        let cases = [
            (CommandKind::ChannelList, "channel_list"),
            (CommandKind::MudList { refresh: true }, "mudlist"),
            (CommandKind::Who { target_mud: "M".into() }, "who"),
            (CommandKind::Locate { target_user: "u".into() }, "locate"),
            (CommandKind::ChannelWho { channel: "c".into() }, "channel_who"),
            (
                CommandKind::ChannelLeave {
                    channel: "c".into(),
                    from_user: "u".into(),
                },
                "channel_leave",
            ),
            (
                CommandKind::ChannelEmote {
                    channel: "c".into(),
                    from_user: "u".into(),
                    message: "m".into(),
                },
                "channel_emote",
            ),
        ];
        for (kind, method) in cases {
            assert_eq!(kind.method(), method);
        }
    }
}
