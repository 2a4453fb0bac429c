//! Lenient readers for the `params` and `result` objects the gateway sends.
//!
//! Gateways in the wild disagree on small details (a who entry may be an
//! object, an array or a bare name; a MUD status may be a string or the
//! classic I3 `-1`), so these helpers accept every shape seen so far and
//! skip entries they cannot make sense of instead of failing the frame.

use serde::Deserialize;
use serde_json::Value;

use crate::event::{string_or_empty, GatewayError};

/// One user in a `who` or `channel_who` result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhoEntry {
    pub name: String,
    /// Idle time in seconds, when reported.
    pub idle: Option<u64>,
    pub extra: Option<String>,
}

impl WhoEntry {
    /// Reads an entry in object, `[name, idle, extra]` or plain-string form.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Self {
                name: name.clone(),
                ..Self::default()
            }),
            Value::Array(parts) => {
                let name = parts.first()?.as_str()?.to_string();
                Some(Self {
                    name,
                    idle: parts.get(1).and_then(Value::as_u64),
                    extra: parts.get(2).and_then(text),
                })
            }
            Value::Object(obj) => {
                let name = obj
                    .get("name")
                    .or_else(|| obj.get("user"))
                    .and_then(Value::as_str)?
                    .to_string();
                Some(Self {
                    name,
                    idle: obj.get("idle").and_then(Value::as_u64),
                    extra: obj
                        .get("extra")
                        .or_else(|| obj.get("title"))
                        .and_then(text),
                })
            }
            _ => None,
        }
    }
}

/// One MUD in a `mudlist` result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MudEntry {
    pub name: String,
    pub online: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl MudEntry {
    /// Reads one mudlist entry. Entries without a name are skipped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let name = obj.get("name").and_then(Value::as_str)?;
        if name.is_empty() {
            return None;
        }
        let host = obj
            .get("address")
            .or_else(|| obj.get("host"))
            .and_then(Value::as_str)
            .filter(|h| !h.is_empty())
            .map(str::to_string);
        let port = obj
            .get("player_port")
            .or_else(|| obj.get("port"))
            .and_then(Value::as_u64)
            .and_then(|p| u16::try_from(p).ok())
            .filter(|p| *p != 0);
        Some(Self {
            name: name.to_string(),
            online: status_is_online(obj.get("status")),
            host,
            port,
        })
    }
}

/// Interprets a mudlist `status` member.
///
/// `up`/`online` (any case) and the numeric `-1` mean online. A missing
/// status means the gateway only lists live MUDs, so it counts as online.
pub fn status_is_online(status: Option<&Value>) -> bool {
    match status {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => {
            s.eq_ignore_ascii_case("up") || s.eq_ignore_ascii_case("online")
        }
        Some(Value::Number(n)) => n.as_i64() == Some(-1),
        Some(Value::Bool(b)) => *b,
        Some(_) => false,
    }
}

/// Parses the `users` array of a who result.
pub fn who_entries(users: &Value) -> Vec<WhoEntry> {
    users
        .as_array()
        .map(|list| list.iter().filter_map(WhoEntry::from_value).collect())
        .unwrap_or_default()
}

/// Parses the `muds` member of a mudlist result.
///
/// Accepts an array of entries or an object keyed by MUD name.
pub fn mud_entries(muds: &Value) -> Vec<MudEntry> {
    match muds {
        Value::Array(list) => list.iter().filter_map(MudEntry::from_value).collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(name, info)| {
                let mut entry = MudEntry::from_value(info).unwrap_or_default();
                if entry.name.is_empty() {
                    entry.name = name.clone();
                    entry.online = status_is_online(info.get("status"));
                }
                (!entry.name.is_empty()).then_some(entry)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Parses the `channels` member of a channel list result.
pub fn channel_names(channels: &Value) -> Vec<String> {
    let Some(list) = channels.as_array() else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|c| match c {
            Value::String(name) => Some(name.clone()),
            Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Parses the `locations` member of a locate result into MUD names.
pub fn locate_hits(locations: &Value) -> Vec<String> {
    let Some(list) = locations.as_array() else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|loc| match loc {
            Value::String(mud) => Some(mud.clone()),
            Value::Object(obj) => obj
                .get("mud_name")
                .or_else(|| obj.get("mud"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

/// `params` of `mud_online` / `mud_offline`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MudStatusParams {
    #[serde(default, alias = "name", deserialize_with = "string_or_empty")]
    pub mud_name: String,
    #[serde(default)]
    pub info: Option<Value>,
}

/// `params` of `error_occurred`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorParams {
    #[serde(default)]
    pub error_code: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub from_mud: Option<String>,
}

impl From<ErrorParams> for GatewayError {
    fn from(p: ErrorParams) -> Self {
        Self {
            code: p.error_code.as_ref().and_then(text),
            message: p
                .error_message
                .or(p.message)
                .unwrap_or_else(|| "Unknown error".to_string()),
            from_mud: p.from_mud,
        }
    }
}

/// Renders a scalar as text; `null` and containers give `None`.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_who_entries_accepts_all_shapes() {
        let users = json!([
            {"name": "Alice", "idle": 30, "extra": "the Brave"},
            ["Bob", 5, "wizard"],
            "Carol",
            42
        ]);
        let entries = who_entries(&users);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "Alice");
        assert_eq!(entries[0].idle, Some(30));
        assert_eq!(entries[1].extra.as_deref(), Some("wizard"));
        assert_eq!(entries[2].name, "Carol");
        assert_eq!(entries[2].idle, None);
    }

    #[test]
    fn test_who_entries_non_array_is_empty() {
        assert!(who_entries(&json!({"users": 1})).is_empty());
    }

    #[test]
    fn test_status_is_online_variants() {
        assert!(status_is_online(None));
        assert!(status_is_online(Some(&json!("UP"))));
        assert!(status_is_online(Some(&json!("online"))));
        assert!(status_is_online(Some(&json!(-1))));
        assert!(!status_is_online(Some(&json!("down"))));
        assert!(!status_is_online(Some(&json!(0))));
        assert!(!status_is_online(Some(&json!(3600))));
    }

    #[test]
    fn test_mud_entries_array_form() {
        let muds = json!([
            {"name": "Dead Souls", "status": "up", "address": "1.2.3.4", "player_port": 6666},
            {"name": "Sleepy", "status": "down"},
            {"status": "up"}
        ]);
        let entries = mud_entries(&muds);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].online);
        assert_eq!(entries[0].host.as_deref(), Some("1.2.3.4"));
        assert_eq!(entries[0].port, Some(6666));
        assert!(!entries[1].online);
    }

    #[test]
    fn test_mud_entries_keyed_object_form() {
        let muds = json!({"Alpha": {"status": -1}, "Beta": {"status": 0}});
        let mut entries = mud_entries(&muds);
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries[0].name, "Alpha");
        assert!(entries[0].online);
        assert_eq!(entries[1].name, "Beta");
        assert!(!entries[1].online);
    }

    #[test]
    fn test_channel_names_strings_and_objects() {
        let channels = json!(["intermud", {"name": "dchat", "owner": "x"}, {"owner": "y"}, ""]);
        assert_eq!(channel_names(&channels), vec!["intermud", "dchat"]);
    }

    #[test]
    fn test_locate_hits() {
        let locations = json!([{"mud_name": "A", "idle": 3}, "B", {"x": 1}]);
        assert_eq!(locate_hits(&locations), vec!["A", "B"]);
    }

    #[test]
    fn test_error_params_into_gateway_error() {
        let params: ErrorParams = serde_json::from_value(json!({
            "error_code": "unk-user",
            "error_message": "No such user",
            "from_mud": "Far"
        }))
        .unwrap();
        let err = GatewayError::from(params);
        assert_eq!(err.code.as_deref(), Some("unk-user"));
        assert_eq!(err.message, "No such user");
        assert_eq!(err.from_mud.as_deref(), Some("Far"));
    }

    #[test]
    fn test_error_params_without_message_uses_placeholder() {
        let params: ErrorParams = serde_json::from_value(json!({"error_code": 7})).unwrap();
        let err = GatewayError::from(params);
        assert_eq!(err.code.as_deref(), Some("7"));
        assert_eq!(err.message, "Unknown error");
    }

    #[test]
    fn test_mud_status_params_accepts_name_alias() {
        let p: MudStatusParams = serde_json::from_value(json!({"name": "Z"})).unwrap();
        assert_eq!(p.mud_name, "Z");
    }
}
