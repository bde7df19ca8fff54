//! JSON-RPC 2.0 envelope types and the frame-payload codec.
//!
//! Parameter and result payloads stay opaque [`Value`]s here; typed views
//! (lsp-types) are applied by callers at the decode boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// JSON-RPC error code for an unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC 2.0 request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version, always "2.0".
    pub jsonrpc: String,
    /// Request identifier.
    pub id: RequestId,
    /// Method name.
    pub method: String,
    /// Optional method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version, always "2.0".
    pub jsonrpc: String,
    /// Identifier of the originating request.
    pub id: RequestId,
    /// Result value (if successful).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error object (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Build a successful response.
    #[must_use]
    pub const fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: String::new(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    #[must_use]
    pub const fn failure(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: String::new(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Resolve the response into its request outcome: the result value on
    /// success, [`Error::Remote`] if the server attached an error object.
    ///
    /// A missing result is treated as JSON `null`, which is a legal success
    /// value (e.g. for `shutdown`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] carrying the server's code, message and data.
    pub fn into_outcome(self) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(Error::Remote {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// JSON-RPC 2.0 notification message (no response expected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// JSON-RPC version, always "2.0".
    pub jsonrpc: String,
    /// Method name.
    pub method: String,
    /// Optional method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
    /// Optional additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Request ID can be a number or string per JSON-RPC 2.0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

/// One decoded JSON-RPC envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A request from the peer (server-to-client call).
    Request(JsonRpcRequest),
    /// A response to one of our requests.
    Response(JsonRpcResponse),
    /// An unsolicited notification.
    Notification(JsonRpcNotification),
}

/// Serialize an envelope into frame payload bytes, forcing `jsonrpc: "2.0"`.
///
/// # Errors
///
/// Returns [`Error::Json`] if serialization fails.
pub fn encode(message: &Message) -> Result<Vec<u8>> {
    let mut value = match message {
        Message::Request(r) => serde_json::to_value(r)?,
        Message::Response(r) => serde_json::to_value(r)?,
        Message::Notification(n) => serde_json::to_value(n)?,
    };
    if let Some(obj) = value.as_object_mut() {
        obj.insert("jsonrpc".to_string(), Value::String("2.0".to_string()));
    }
    Ok(serde_json::to_vec(&value)?)
}

/// Parse frame payload bytes and classify the envelope.
///
/// Classification follows the field shape: `method` + `id` is a Request,
/// `method` without `id` a Notification, `id` without `method` a Response.
///
/// # Errors
///
/// Returns [`Error::MalformedMessage`] on invalid JSON, on an envelope with
/// neither `method` nor `id`, or on required fields of the wrong shape.
pub fn decode(payload: &[u8]) -> Result<Message> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| Error::MalformedMessage(format!("invalid JSON: {e}")))?;

    let has_method = value.get("method").is_some();
    let has_id = value.get("id").is_some_and(|id| !id.is_null());

    match (has_method, has_id) {
        (true, true) => serde_json::from_value(value)
            .map(Message::Request)
            .map_err(|e| Error::MalformedMessage(format!("invalid request: {e}"))),
        (true, false) => serde_json::from_value(value)
            .map(Message::Notification)
            .map_err(|e| Error::MalformedMessage(format!("invalid notification: {e}"))),
        (false, true) => serde_json::from_value(value)
            .map(Message::Response)
            .map_err(|e| Error::MalformedMessage(format!("invalid response: {e}"))),
        (false, false) => Err(Error::MalformedMessage(
            "envelope has neither method nor id".to_string(),
        )),
    }
}

/// Typed view of the server-to-client notifications an editor client sees.
#[derive(Debug)]
pub enum ServerNotification {
    /// textDocument/publishDiagnostics
    PublishDiagnostics(lsp_types::PublishDiagnosticsParams),
    /// window/showMessage
    ShowMessage(lsp_types::ShowMessageParams),
    /// window/logMessage
    LogMessage(lsp_types::LogMessageParams),
    /// telemetry/event (arbitrary payload by design)
    Telemetry(Option<Value>),
    /// Unknown or unhandled notification.
    Other {
        /// Method name.
        method: String,
        /// Optional parameters.
        params: Option<Value>,
    },
}

impl ServerNotification {
    /// Parse a notification from method name and params.
    ///
    /// Known methods with malformed params fall back to `Other` with the
    /// params dropped, so one odd notification never disturbs the session.
    #[must_use]
    pub fn parse(method: &str, params: Option<Value>) -> Self {
        fn typed<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Option<T> {
            params.and_then(|p| serde_json::from_value(p).ok())
        }

        match method {
            "textDocument/publishDiagnostics" => typed(params)
                .map_or_else(|| Self::other(method), Self::PublishDiagnostics),
            "window/showMessage" => {
                typed(params).map_or_else(|| Self::other(method), Self::ShowMessage)
            }
            "window/logMessage" => {
                typed(params).map_or_else(|| Self::other(method), Self::LogMessage)
            }
            "telemetry/event" => Self::Telemetry(params),
            _ => Self::Other {
                method: method.to_string(),
                params,
            },
        }
    }

    fn other(method: &str) -> Self {
        Self::Other {
            method: method.to_string(),
            params: None,
        }
    }
}

/// Resolve a completion result payload into its typed shape.
///
/// LSP allows both a bare item array and a `CompletionList`; lsp-types
/// models that as [`lsp_types::CompletionResponse`]. The variant is decided
/// here, once, so call sites never re-inspect the raw JSON. A `null` result
/// means the server had no completions.
///
/// # Errors
///
/// Returns [`Error::MalformedMessage`] if the payload matches neither shape.
pub fn completion_response(result: Value) -> Result<Option<lsp_types::CompletionResponse>> {
    serde_json::from_value(result)
        .map_err(|e| Error::MalformedMessage(format!("invalid completion result: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_round_trip() {
        let request = Message::Request(JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Number(1),
            method: "textDocument/completion".to_string(),
            params: Some(json!({"position": {"line": 6, "character": 10}})),
        });

        let bytes = encode(&request).unwrap();
        assert_eq!(decode(&bytes).unwrap(), request);
    }

    #[test]
    fn test_notification_round_trip() {
        let notification = Message::Notification(JsonRpcNotification {
            jsonrpc: "2.0".to_string(),
            method: "initialized".to_string(),
            params: None,
        });

        let bytes = encode(&notification).unwrap();
        assert!(!String::from_utf8(bytes.clone()).unwrap().contains("\"id\""));
        assert_eq!(decode(&bytes).unwrap(), notification);
    }

    #[test]
    fn test_response_round_trip() {
        let response = Message::Response(JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Number(7),
            result: Some(json!({"capabilities": {}})),
            error: None,
        });

        let bytes = encode(&response).unwrap();
        assert_eq!(decode(&bytes).unwrap(), response);
    }

    #[test]
    fn test_error_response_round_trip() {
        let response = Message::Response(JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: RequestId::String("req-1".to_string()),
            result: None,
            error: Some(JsonRpcError {
                code: METHOD_NOT_FOUND,
                message: "method not found".to_string(),
                data: Some(json!({"method": "bogus/method"})),
            }),
        });

        let bytes = encode(&response).unwrap();
        assert_eq!(decode(&bytes).unwrap(), response);
    }

    #[test]
    fn test_encode_forces_jsonrpc_version() {
        let notification = Message::Notification(JsonRpcNotification {
            jsonrpc: String::new(),
            method: "exit".to_string(),
            params: None,
        });

        let bytes = encode(&notification).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
    }

    #[rstest]
    #[case(r#"{"jsonrpc":"2.0","id":1,"method":"workspace/configuration"}"#, true, false, false)]
    #[case(r#"{"jsonrpc":"2.0","method":"initialized"}"#, false, false, true)]
    #[case(r#"{"jsonrpc":"2.0","id":1,"result":null}"#, false, true, false)]
    fn test_classification(
        #[case] raw: &str,
        #[case] is_request: bool,
        #[case] is_response: bool,
        #[case] is_notification: bool,
    ) {
        let message = decode(raw.as_bytes()).unwrap();
        assert_eq!(matches!(message, Message::Request(_)), is_request);
        assert_eq!(matches!(message, Message::Response(_)), is_response);
        assert_eq!(matches!(message, Message::Notification(_)), is_notification);
    }

    #[test]
    fn test_null_id_notification() {
        // Some servers send "id": null on notifications; treat as no id.
        let message = decode(br#"{"jsonrpc":"2.0","id":null,"method":"window/logMessage"}"#).unwrap();
        assert!(matches!(message, Message::Notification(_)));
    }

    #[test]
    fn test_ambiguous_envelope_rejected() {
        let err = decode(br#"{"jsonrpc":"2.0","result":{}}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(_)));
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = decode(b"{not json").unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(_)));
    }

    #[test]
    fn test_response_outcome_success() {
        let response = JsonRpcResponse::success(RequestId::Number(1), json!({"ok": true}));
        assert_eq!(response.into_outcome().unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_response_outcome_null_result() {
        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert_eq!(response.into_outcome().unwrap(), Value::Null);
    }

    #[test]
    fn test_response_outcome_remote_error() {
        let response: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"nope","data":[1,2]}}"#,
        )
        .unwrap();
        match response.into_outcome().unwrap_err() {
            Error::Remote { code, message, data } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "nope");
                assert_eq!(data, Some(json!([1, 2])));
            }
            other => panic!("expected Remote error, got {other:?}"),
        }
    }

    #[test]
    fn test_publish_diagnostics_notification_parsing() {
        let params = json!({
            "uri": "file:///proj/src/main.rs",
            "version": 2,
            "diagnostics": [
                {
                    "range": {
                        "start": {"line": 0, "character": 0},
                        "end": {"line": 0, "character": 5}
                    },
                    "severity": 1,
                    "message": "unresolved name"
                }
            ]
        });

        match ServerNotification::parse("textDocument/publishDiagnostics", Some(params)) {
            ServerNotification::PublishDiagnostics(diag) => {
                assert_eq!(diag.diagnostics.len(), 1);
                assert_eq!(diag.diagnostics[0].message, "unresolved name");
            }
            other => panic!("expected PublishDiagnostics, got {other:?}"),
        }
    }

    #[test]
    fn test_log_message_notification_parsing() {
        let params = json!({"type": 3, "message": "indexing finished"});

        match ServerNotification::parse("window/logMessage", Some(params)) {
            ServerNotification::LogMessage(log) => {
                assert_eq!(log.typ, lsp_types::MessageType::INFO);
                assert_eq!(log.message, "indexing finished");
            }
            other => panic!("expected LogMessage, got {other:?}"),
        }
    }

    #[test]
    fn test_telemetry_notification_passthrough() {
        let params = json!({"kind": "startup", "elapsedMs": 125});

        match ServerNotification::parse("telemetry/event", Some(params.clone())) {
            ServerNotification::Telemetry(p) => assert_eq!(p, Some(params)),
            other => panic!("expected Telemetry, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_known_notification_falls_back() {
        let params = json!({"type": "not_a_number"});

        match ServerNotification::parse("window/showMessage", Some(params)) {
            ServerNotification::Other { method, params } => {
                assert_eq!(method, "window/showMessage");
                assert!(params.is_none());
            }
            other => panic!("expected Other, got {other:?}"),
        }
    }

    #[test]
    fn test_completion_response_item_array() {
        let result = json!([{"label": "println!"}, {"label": "print!"}]);
        match completion_response(result).unwrap() {
            Some(lsp_types::CompletionResponse::Array(items)) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].label, "println!");
            }
            other => panic!("expected Array, got {other:?}"),
        }
    }

    #[test]
    fn test_completion_response_list() {
        let result = json!({
            "isIncomplete": true,
            "items": [{"label": "push"}]
        });
        match completion_response(result).unwrap() {
            Some(lsp_types::CompletionResponse::List(list)) => {
                assert!(list.is_incomplete);
                assert_eq!(list.items.len(), 1);
            }
            other => panic!("expected List, got {other:?}"),
        }
    }

    #[test]
    fn test_completion_response_null() {
        assert!(completion_response(Value::Null).unwrap().is_none());
    }
}
