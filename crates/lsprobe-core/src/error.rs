//! Error types for lsprobe-core.
//!
//! Every failure kind a caller can observe is a distinct variant, so a
//! harness can report "the server returned -32601" differently from
//! "the connection dropped".

use std::time::Duration;

use serde_json::Value;

use crate::session::SessionState;

/// The main error type for lsprobe-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport produced a malformed frame header, a non-numeric
    /// Content-Length, or closed mid-frame. Fatal to the session.
    #[error("framing error: {0}")]
    Framing(String),

    /// A frame carried an undecodable or ambiguous JSON-RPC envelope.
    /// The frame is dropped; the session continues.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// An operation was invoked in a session state that does not permit it.
    #[error("operation '{op}' is not valid in state {state:?}")]
    Protocol {
        /// Name of the rejected operation.
        op: &'static str,
        /// Session state at the time of the call.
        state: SessionState,
    },

    /// No response arrived within the caller-supplied deadline.
    #[error("request '{method}' timed out after {timeout:?}")]
    Timeout {
        /// Method name of the timed-out request.
        method: String,
        /// Deadline that elapsed.
        timeout: Duration,
    },

    /// The server answered a request with a JSON-RPC error object.
    /// This is the request's outcome, not a transport failure.
    #[error("server returned error {code}: {message}")]
    Remote {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the server.
        message: String,
        /// Optional additional error data.
        data: Option<Value>,
    },

    /// The transport ended while the operation was outstanding, or the
    /// session had already reached the Closed state.
    #[error("connection closed")]
    ConnectionClosed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid URI format.
    #[error("invalid URI: {0}")]
    InvalidUri(String),
}

/// A specialized Result type for lsprobe-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_remote() {
        let err = Error::Remote {
            code: -32601,
            message: "method not found".to_string(),
            data: None,
        };
        assert_eq!(err.to_string(), "server returned error -32601: method not found");
    }

    #[test]
    fn test_error_display_protocol() {
        let err = Error::Protocol {
            op: "request",
            state: SessionState::Unconnected,
        };
        assert!(err.to_string().contains("request"));
        assert!(err.to_string().contains("Unconnected"));
    }

    #[test]
    fn test_error_display_timeout() {
        let err = Error::Timeout {
            method: "textDocument/completion".to_string(),
            timeout: Duration::from_secs(3),
        };
        assert!(err.to_string().contains("textDocument/completion"));
        assert!(err.to_string().contains("3s"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
