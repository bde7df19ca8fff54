//! A scripted mock language server bound to a loopback TCP port.
//!
//! The mock answers client requests from a per-method behavior table,
//! exposes every client frame (in wire order) through a channel, and lets
//! tests inject arbitrary server-to-client messages or drop the connection.

use std::collections::HashMap;

use lsprobe_core::framing::{FrameReader, FrameWriter};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

/// How the mock answers a request for a given method.
#[allow(dead_code)]
pub enum MockBehavior {
    /// Respond with this result value.
    Result(Value),
    /// Respond with a JSON-RPC error object.
    Error(i64, String),
    /// Never respond (for timeout and closure tests).
    Ignore,
}

/// Handle to a running mock server.
pub struct MockLsp {
    /// `host:port` the mock listens on.
    pub addr: String,
    inject: mpsc::UnboundedSender<Value>,
    seen: mpsc::UnboundedReceiver<Value>,
    close: Option<oneshot::Sender<()>>,
}

#[allow(dead_code)]
impl MockLsp {
    /// Start a mock with the given behavior table. Methods not in the table
    /// are answered with a `null` result.
    pub async fn spawn(behaviors: HashMap<String, MockBehavior>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
        let addr = listener.local_addr().expect("local addr").to_string();

        let (inject_tx, inject_rx) = mpsc::unbounded_channel();
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();

        tokio::spawn(serve(listener, behaviors, inject_rx, seen_tx, close_rx));

        Self {
            addr,
            inject: inject_tx,
            seen: seen_rx,
            close: Some(close_tx),
        }
    }

    /// Behavior table prefilled so the handshake succeeds: `initialize`
    /// gets an empty capabilities result. Tests extend this with their own
    /// methods; `shutdown` is covered by the default `null` reply.
    pub fn handshake_behaviors() -> HashMap<String, MockBehavior> {
        let mut behaviors = HashMap::new();
        behaviors.insert(
            "initialize".to_string(),
            MockBehavior::Result(json!({"capabilities": {}})),
        );
        behaviors
    }

    /// Start a mock that completes the handshake.
    pub async fn spawn_default() -> Self {
        Self::spawn(Self::handshake_behaviors()).await
    }

    /// Queue a raw server-to-client message.
    pub fn inject(&self, message: Value) {
        let _ = self.inject.send(message);
    }

    /// Drop the connection, closing both directions.
    pub fn close(&mut self) {
        if let Some(tx) = self.close.take() {
            let _ = tx.send(());
        }
    }

    /// Next client frame, decoded, in wire order.
    pub async fn next_seen(&mut self) -> Value {
        self.seen.recv().await.expect("client frame")
    }

    /// Whether any unread client frame is buffered.
    pub fn has_seen(&mut self) -> bool {
        !self.seen.is_empty()
    }
}

async fn serve(
    listener: TcpListener,
    behaviors: HashMap<String, MockBehavior>,
    mut inject_rx: mpsc::UnboundedReceiver<Value>,
    seen_tx: mpsc::UnboundedSender<Value>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let (stream, _) = listener.accept().await.expect("accept");
    let (read_half, write_half) = stream.into_split();
    let mut writer = FrameWriter::new(write_half);

    // Dedicated reader task keeps the select loop cancel-safe.
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
    let reader_task = tokio::spawn(async move {
        let mut reader = FrameReader::new(read_half);
        while let Ok(payload) = reader.read_frame().await {
            if frame_tx.send(payload).is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            payload = frame_rx.recv() => {
                let Some(payload) = payload else { break };
                let value: Value = serde_json::from_slice(&payload).expect("client JSON");
                let _ = seen_tx.send(value.clone());

                let id = value.get("id").cloned();
                let method = value.get("method").and_then(Value::as_str);
                if let (Some(id), Some(method)) = (id, method) {
                    let reply = match behaviors.get(method) {
                        Some(MockBehavior::Result(result)) => {
                            Some(json!({"jsonrpc": "2.0", "id": id, "result": result}))
                        }
                        Some(MockBehavior::Error(code, message)) => Some(json!({
                            "jsonrpc": "2.0",
                            "id": id,
                            "error": {"code": code, "message": message}
                        })),
                        Some(MockBehavior::Ignore) => None,
                        None => Some(json!({"jsonrpc": "2.0", "id": id, "result": null})),
                    };
                    if let Some(reply) = reply {
                        let bytes = serde_json::to_vec(&reply).expect("serialize reply");
                        writer.write_frame(&bytes).await.expect("write reply");
                    }
                }
            }
            message = inject_rx.recv() => {
                let Some(message) = message else { break };
                let bytes = serde_json::to_vec(&message).expect("serialize injected");
                writer.write_frame(&bytes).await.expect("write injected");
            }
            _ = &mut close_rx => break,
        }
    }

    reader_task.abort();
    // Dropping the writer closes the socket.
}
