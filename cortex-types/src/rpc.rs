//! JSON-RPC 2.0 envelope shared by every MCP transport (spec §3/§4.7/§6).
//!
//! These types model the wire envelope only. Method-specific `params`/
//! `result` payloads stay as [`serde_json::Value`] here and are typed at
//! the `cortex-mcp-client` call sites that know which method they're for.

use serde::{Deserialize, Serialize};

/// An id correlating a [`Message::Request`] to its eventual response.
///
/// JSON-RPC permits both numeric and string ids; servers in the wild use
/// both, so both are accepted on the way in and whichever the peer sent
/// is echoed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(u64),
    String(String),
}

impl std::fmt::Display for RpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcId::Number(n) => write!(f, "{n}"),
            RpcId::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for RpcId {
    fn from(n: u64) -> Self {
        RpcId::Number(n)
    }
}

/// A JSON-RPC 2.0 message in any of its three shapes.
///
/// Deserialization discriminates on the presence of `id`/`method`/`result`/
/// `error` rather than an explicit tag, matching what real MCP servers
/// actually emit on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

/// A call expecting a correlated response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "jsonrpc")]
    pub jsonrpc: JsonRpcVersion,
    pub id: RpcId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    /// Build a request, stamping the fixed `"2.0"` version marker.
    pub fn new(id: RpcId, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            method: method.into(),
            params,
        }
    }
}

/// A fire-and-forget call carrying no id and expecting no response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "jsonrpc")]
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    /// Build a notification, stamping the fixed `"2.0"` version marker.
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
        }
    }
}

/// A reply to a [`Request`], carrying either `result` or `error` — never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "jsonrpc")]
    pub jsonrpc: JsonRpcVersion,
    pub id: RpcId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Build a success response.
    pub fn success(id: RpcId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn failure(id: RpcId, error: RpcError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            result: None,
            error: Some(error),
        }
    }

    /// `Ok(result)` on success, `Err(error)` otherwise.
    pub fn into_result(self) -> Result<serde_json::Value, RpcError> {
        match (self.result, self.error) {
            (Some(result), _) => Ok(result),
            (None, Some(error)) => Err(error),
            (None, None) => Err(RpcError {
                code: RpcErrorCode::InternalError as i64,
                message: "response carried neither result nor error".to_string(),
                data: None,
            }),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("rpc error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Reserved JSON-RPC 2.0 error codes (and the MCP extensions that reuse them).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum RpcErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
}

/// Zero-sized marker that always (de)serializes as the literal string `"2.0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        if s != "2.0" {
            return Err(serde::de::Error::custom(format!(
                "unsupported jsonrpc version: {s}"
            )));
        }
        Ok(JsonRpcVersion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_with_numeric_id() {
        let req = Request::new(RpcId::Number(1), "tools/list", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, RpcId::Number(1));
        assert_eq!(back.method, "tools/list");
    }

    #[test]
    fn message_discriminates_request_vs_notification() {
        let request_json = r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#;
        let notif_json = r#"{"jsonrpc":"2.0","method":"notifications/cancelled"}"#;

        let request: Message = serde_json::from_str(request_json).unwrap();
        assert!(matches!(request, Message::Request(_)));

        let notif: Message = serde_json::from_str(notif_json).unwrap();
        assert!(matches!(notif, Message::Notification(_)));
    }

    #[test]
    fn message_discriminates_response_with_string_id() {
        let json = r#"{"jsonrpc":"2.0","id":"req-1","result":{"ok":true}}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        match message {
            Message::Response(resp) => {
                assert_eq!(resp.id, RpcId::String("req-1".to_string()));
                assert!(resp.error.is_none());
            }
            _ => panic!("expected Response"),
        }
    }

    #[test]
    fn response_into_result_extracts_error() {
        let resp = Response::failure(
            RpcId::Number(1),
            RpcError {
                code: RpcErrorCode::MethodNotFound as i64,
                message: "no such method".into(),
                data: None,
            },
        );
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, -32601);
    }

    #[test]
    fn response_into_result_extracts_success() {
        let resp = Response::success(RpcId::Number(1), serde_json::json!({"tools": []}));
        let value = resp.into_result().unwrap();
        assert_eq!(value["tools"], serde_json::json!([]));
    }

    #[test]
    fn rejects_non_2_0_version() {
        let json = r#""1.0""#;
        let result: Result<JsonRpcVersion, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
