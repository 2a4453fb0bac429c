//! Codec trait and the line-delimited JSON implementation.
//!
//! A codec converts between Rust values and the bytes of ONE frame. The
//! gateway protocol puts exactly one compact JSON document on each line, so
//! [`JsonLineCodec::encode`] appends the `\n` terminator and
//! [`JsonLineCodec::decode`] expects a single line with the terminator
//! already stripped (see [`LineFramer`](crate::LineFramer)).

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{Command, ProtocolError, RequestId, RpcRequest};

/// Line terminator between frames.
pub const FRAME_TERMINATOR: u8 = b'\n';

/// A codec that can encode Rust types to frame bytes and decode them back.
///
/// `Send + Sync + 'static` because the codec lives inside the network
/// driver for the whole life of the client.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one terminated frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes one frame (terminator already removed).
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] for newline-delimited compact JSON.
///
/// Compact `serde_json` output never contains a raw newline (newlines in
/// strings are escaped), so the terminator is unambiguous.
///
/// ```rust
/// use i3link_protocol::{Codec, JsonLineCodec, RequestId, RpcRequest};
///
/// let codec = JsonLineCodec;
/// let req = RpcRequest::new(RequestId(1), "ping", None);
///
/// let bytes = codec.encode(&req).unwrap();
/// assert!(bytes.ends_with(b"\n"));
///
/// let decoded: RpcRequest = codec.decode(&bytes[..bytes.len() - 1]).unwrap();
/// assert_eq!(decoded, req);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLineCodec;

impl Codec for JsonLineCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        let mut bytes = serde_json::to_vec(value).map_err(ProtocolError::Encode)?;
        bytes.push(FRAME_TERMINATOR);
        Ok(bytes)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

impl JsonLineCodec {
    /// Encodes `method` + `params` under `id` as one request line.
    pub fn encode_request(
        &self,
        id: RequestId,
        method: &str,
        params: Option<Value>,
    ) -> Result<Vec<u8>, ProtocolError> {
        self.encode(&RpcRequest::new(id, method, params))
    }

    /// Encodes a queued [`Command`] as one request line.
    pub fn encode_command(&self, command: &Command) -> Result<Vec<u8>, ProtocolError> {
        self.encode(&command.to_request())
    }

    /// Decodes one frame into a generic JSON document.
    pub fn decode_document(&self, frame: &[u8]) -> Result<Value, ProtocolError> {
        self.decode(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_request_is_single_terminated_line() {
        let bytes = JsonLineCodec
            .encode_request(
                RequestId(9),
                "tell",
                Some(json!({"message": "line one\nline two"})),
            )
            .unwrap();

        assert_eq!(bytes.last(), Some(&FRAME_TERMINATOR));
        let newlines = bytes.iter().filter(|b| **b == FRAME_TERMINATOR).count();
        assert_eq!(newlines, 1, "embedded newlines must be escaped");
    }

    #[test]
    fn test_encode_request_field_layout() {
        let bytes = JsonLineCodec
            .encode_request(RequestId(2), "who", Some(json!({"target_mud": "Dead Souls"})))
            .unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            doc,
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "who",
                "params": {"target_mud": "Dead Souls"}
            })
        );
    }

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result = JsonLineCodec.decode_document(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_truncated_document_returns_error() {
        let result = JsonLineCodec.decode_document(br#"{"id": 1, "result": {"#);
        assert!(result.is_err());
    }
}
