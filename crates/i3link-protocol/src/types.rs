//! JSON-RPC 2.0 message model used on the gateway link.
//!
//! Outbound traffic is always a [`RpcRequest`]. Inbound documents are
//! classified into an [`RpcMessage`]: either a [`Response`] to one of our
//! requests (it carries an `id`) or a server-initiated [`Notification`]
//! (it carries a `method` and no `id`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::ProtocolError;

/// The only protocol version the gateway speaks.
pub const JSONRPC_VERSION: &str = "2.0";

/// Identifier of an outbound request.
///
/// Unique for the lifetime of a client; the gateway echoes it back in the
/// matching response. Serialized as a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A request as it travels on the wire:
/// `{"jsonrpc":"2.0","id":N,"method":"...","params":{...}}`.
///
/// `params` is left out of the JSON entirely when there are none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    /// Builds a request. A `Some(Value::Null)` payload counts as absent.
    pub fn new(
        id: RequestId,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params: params.filter(|p| !p.is_null()),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default = "unknown_error")]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

fn unknown_error() -> String {
    "Unknown error".to_string()
}

impl RpcError {
    /// Reads an `error` member, tolerating gateways that send a bare string.
    fn from_value(value: Value) -> Self {
        match value {
            Value::String(message) => Self {
                code: None,
                message,
                data: None,
            },
            other => serde_json::from_value(other).unwrap_or(Self {
                code: None,
                message: unknown_error(),
                data: None,
            }),
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Reply to one of our requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: RequestId,
    /// `Ok(result)` (which may be `null`) or the gateway-reported error.
    pub outcome: Result<Value, RpcError>,
}

/// A server-initiated message: `{"method": "...", "params": {...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    /// `None` when the member is absent or `null`.
    pub params: Option<Value>,
}

/// An inbound document, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcMessage {
    Response(Response),
    Notification(Notification),
}

impl RpcMessage {
    /// Classifies a decoded JSON document.
    ///
    /// A non-null `id` makes it a response, even if a `method` is also
    /// present. Otherwise a string `method` makes it a notification.
    /// `"id": null` counts as no id, so a null-id document carrying a
    /// `method` is a notification rather than an unmatched response.
    pub fn classify(doc: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut obj) = doc else {
            return Err(ProtocolError::InvalidMessage(
                "document is not a JSON object".into(),
            ));
        };

        match obj.remove("id") {
            Some(Value::Null) | None => {}
            Some(id) => {
                let id = parse_id(&id)?;
                return Ok(Self::Response(Response {
                    id,
                    outcome: take_outcome(&mut obj),
                }));
            }
        }

        match obj.remove("method") {
            Some(Value::String(method)) => {
                let params = obj.remove("params").filter(|p| !p.is_null());
                Ok(Self::Notification(Notification { method, params }))
            }
            Some(_) => Err(ProtocolError::InvalidMessage(
                "method is not a string".into(),
            )),
            None => Err(ProtocolError::InvalidMessage(
                "document has neither id nor method".into(),
            )),
        }
    }

    /// Whether this is the reply path (as opposed to a notification).
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }
}

fn parse_id(id: &Value) -> Result<RequestId, ProtocolError> {
    let parsed = match id {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.map(RequestId).ok_or_else(|| {
        ProtocolError::InvalidMessage(format!("unsupported request id {id}"))
    })
}

fn take_outcome(obj: &mut Map<String, Value>) -> Result<Value, RpcError> {
    match obj.remove("error") {
        Some(Value::Null) | None => Ok(obj.remove("result").unwrap_or(Value::Null)),
        Some(err) => Err(RpcError::from_value(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&RequestId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_request_id_display() {
        assert_eq!(RequestId(7).to_string(), "#7");
    }

    #[test]
    fn test_request_without_params_omits_member() {
        let req = RpcRequest::new(RequestId(3), "ping", None);
        let json: Value = serde_json::to_value(&req).unwrap();
        assert_eq!(json, json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}));
    }

    #[test]
    fn test_request_null_params_counts_as_absent() {
        let req = RpcRequest::new(RequestId(3), "ping", Some(Value::Null));
        assert!(req.params.is_none());
    }

    #[test]
    fn test_classify_result_is_response() {
        let doc = json!({"jsonrpc": "2.0", "id": 1, "result": {"status": "ok"}});
        let msg = RpcMessage::classify(doc).unwrap();
        assert_eq!(
            msg,
            RpcMessage::Response(Response {
                id: RequestId(1),
                outcome: Ok(json!({"status": "ok"})),
            })
        );
    }

    #[test]
    fn test_classify_error_member_wins_over_result() {
        let doc = json!({
            "id": 5,
            "error": {"code": -32000, "message": "no such mud"},
            "result": {"status": "ignored"}
        });
        let RpcMessage::Response(resp) = RpcMessage::classify(doc).unwrap() else {
            panic!("expected response");
        };
        let err = resp.outcome.unwrap_err();
        assert_eq!(err.message, "no such mud");
        assert_eq!(err.code, Some(-32000));
        assert_eq!(err.to_string(), "no such mud (code -32000)");
    }

    #[test]
    fn test_classify_error_without_message_uses_placeholder() {
        let doc = json!({"id": 5, "error": {"code": 1}});
        let RpcMessage::Response(resp) = RpcMessage::classify(doc).unwrap() else {
            panic!("expected response");
        };
        assert_eq!(resp.outcome.unwrap_err().message, "Unknown error");
    }

    #[test]
    fn test_classify_method_without_id_is_notification() {
        let doc = json!({"jsonrpc": "2.0", "method": "mud_online", "params": {"mud_name": "X"}});
        let msg = RpcMessage::classify(doc).unwrap();
        assert!(!msg.is_response());
        let RpcMessage::Notification(n) = msg else { unreachable!() };
        assert_eq!(n.method, "mud_online");
        assert_eq!(n.params, Some(json!({"mud_name": "X"})));
    }

    #[test]
    fn test_classify_null_id_with_method_is_notification() {
        let doc = json!({"id": null, "method": "ping"});
        let msg = RpcMessage::classify(doc).unwrap();
        assert!(matches!(msg, RpcMessage::Notification(n) if n.params.is_none()));
    }

    #[test]
    fn test_classify_string_id_is_parsed() {
        let doc = json!({"id": "12", "result": null});
        let msg = RpcMessage::classify(doc).unwrap();
        assert!(matches!(msg, RpcMessage::Response(r) if r.id == RequestId(12)));
    }

    #[test]
    fn test_classify_rejects_non_object_and_shapeless_documents() {
        assert!(RpcMessage::classify(json!([1, 2])).is_err());
        assert!(RpcMessage::classify(json!({"jsonrpc": "2.0"})).is_err());
        assert!(RpcMessage::classify(json!({"id": "abc", "result": 1})).is_err());
    }
}
