//! Session coordination: request identifiers, pending-call correlation and
//! the LSP lifecycle state machine.
//!
//! A session has exactly two concurrent activities: the caller issuing
//! requests and notifications, and one background reader task that owns the
//! transport's read side. The pending-call table is the only structure both
//! touch, and every access goes through its lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use lsp_types::{InitializeParams, InitializeResult};
use serde_json::Value;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::framing::{FrameReader, FrameWriter};
use crate::rpc::{
    self, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Message, RequestId,
};

/// Callback invoked for every incoming server notification.
///
/// Runs on the reader's dispatch path; it must not block indefinitely, or
/// delivery of all subsequent messages stalls.
pub type NotificationHandler = Arc<dyn Fn(JsonRpcNotification) + Send + Sync>;

/// Handler for a server-to-client request, keyed by method name.
pub type RequestHandler =
    Arc<dyn Fn(Option<Value>) -> std::result::Result<Value, JsonRpcError> + Send + Sync>;

/// Lifecycle state of a session.
///
/// Transitions are one-way: Unconnected → Initializing → Ready →
/// ShuttingDown → Closed. A session that reaches Closed cannot be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport may be open, but `initialize` has not been sent.
    Unconnected,
    /// `initialize` sent, response not yet received.
    Initializing,
    /// Handshake complete; requests and notifications are accepted.
    Ready,
    /// `shutdown` sent.
    ShuttingDown,
    /// Transport closed or `exit` sent.
    Closed,
}

struct Shared {
    state: Mutex<SessionState>,
    /// Monotonically increasing, starting at 1, never reused per connection.
    next_id: AtomicI64,
    pending: Mutex<HashMap<i64, oneshot::Sender<JsonRpcResponse>>>,
    /// Serializes the write path; concurrent senders queue here, which
    /// preserves issue order on the wire.
    writer: tokio::sync::Mutex<Option<FrameWriter<OwnedWriteHalf>>>,
    notification_handler: Mutex<Option<NotificationHandler>>,
    request_handlers: Mutex<HashMap<String, RequestHandler>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client-side LSP session over a TCP transport.
///
/// Cloning is cheap and shares the underlying connection, so concurrent
/// tasks can issue requests against one session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create an unconnected session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::Unconnected),
                next_id: AtomicI64::new(1),
                pending: Mutex::new(HashMap::new()),
                writer: tokio::sync::Mutex::new(None),
                notification_handler: Mutex::new(None),
                request_handlers: Mutex::new(HashMap::new()),
                reader_task: Mutex::new(None),
            }),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *lock(&self.shared.state)
    }

    /// Register the callback invoked for every incoming server notification,
    /// replacing any previous one.
    pub fn on_notification<F>(&self, handler: F)
    where
        F: Fn(JsonRpcNotification) + Send + Sync + 'static,
    {
        *lock(&self.shared.notification_handler) = Some(Arc::new(handler));
    }

    /// Register a handler for a server-to-client request method.
    ///
    /// Methods without a handler are answered automatically with a
    /// `MethodNotFound` error.
    pub fn on_request<F>(&self, method: &str, handler: F)
    where
        F: Fn(Option<Value>) -> std::result::Result<Value, JsonRpcError> + Send + Sync + 'static,
    {
        lock(&self.shared.request_handlers).insert(method.to_string(), Arc::new(handler));
    }

    /// Open the TCP transport and start the background reader task.
    ///
    /// The state stays Unconnected; the transition to Initializing happens
    /// in [`initialize`](Self::initialize).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the session is not Unconnected or was
    /// already connected, and [`Error::Io`] if the TCP connect fails.
    pub async fn connect<A: ToSocketAddrs>(&self, addr: A) -> Result<()> {
        self.check_state("connect", &[SessionState::Unconnected])?;

        let mut writer_slot = self.shared.writer.lock().await;
        if writer_slot.is_some() {
            return Err(Error::Protocol {
                op: "connect",
                state: self.state(),
            });
        }

        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        *writer_slot = Some(FrameWriter::new(write_half));
        drop(writer_slot);

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(read_loop(shared, FrameReader::new(read_half)));
        *lock(&self.shared.reader_task) = Some(handle);

        debug!("transport connected");
        Ok(())
    }

    /// Perform the `initialize` request.
    ///
    /// Transitions Unconnected → Initializing when the request is sent and
    /// Initializing → Ready on a non-error response. An error response or a
    /// timeout leaves the session in Initializing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] outside the Unconnected state,
    /// [`Error::Timeout`] if no response arrives within the deadline, and
    /// [`Error::Remote`] if the server answers with an error object.
    pub async fn initialize(
        &self,
        params: InitializeParams,
        timeout: Duration,
    ) -> Result<InitializeResult> {
        self.check_state("initialize", &[SessionState::Unconnected])?;
        if self.shared.writer.lock().await.is_none() {
            // connect() has not attached a transport yet
            return Err(Error::Protocol {
                op: "initialize",
                state: self.state(),
            });
        }
        self.transition(SessionState::Initializing);

        let params = serde_json::to_value(params)?;
        let value = self.call("initialize", Some(params), timeout).await?;
        let result: InitializeResult = serde_json::from_value(value)?;

        self.transition(SessionState::Ready);
        debug!("session ready");
        Ok(result)
    }

    /// Send a notification. Never waits for anything beyond the frame flush.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] outside the Ready state and
    /// [`Error::ConnectionClosed`] if the transport has ended.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.check_state("notify", &[SessionState::Ready])?;
        self.write_notification(method, params).await
    }

    /// Send a request and suspend until its response, the deadline, or
    /// transport closure.
    ///
    /// The deadline is mandatory; a zero deadline always fails with
    /// [`Error::Timeout`]. On timeout the pending call is removed and a late
    /// response for the identifier is dropped by the reader's lookup-miss
    /// path.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] outside Ready, [`Error::Timeout`] on deadline,
    /// [`Error::Remote`] if the server returns an error object, and
    /// [`Error::ConnectionClosed`] if the transport ends first.
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        self.check_state("request", &[SessionState::Ready])?;
        self.call(method, params, timeout).await
    }

    /// Send the `shutdown` request and await its response.
    ///
    /// Transitions Ready → ShuttingDown when the request is sent.
    ///
    /// # Errors
    ///
    /// Same failure surface as [`request`](Self::request).
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.check_state("shutdown", &[SessionState::Ready])?;
        self.transition(SessionState::ShuttingDown);
        self.call("shutdown", None, timeout).await?;
        Ok(())
    }

    /// Send the `exit` notification and close the session.
    ///
    /// Transitions ShuttingDown → Closed and drops the write half; the
    /// reader task ends when the server closes its side.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] outside the ShuttingDown state.
    pub async fn exit(&self) -> Result<()> {
        self.check_state("exit", &[SessionState::ShuttingDown])?;
        self.write_notification("exit", None).await?;
        self.transition(SessionState::Closed);
        *self.shared.writer.lock().await = None;
        debug!("session closed");
        Ok(())
    }

    fn check_state(&self, op: &'static str, allowed: &[SessionState]) -> Result<()> {
        let state = self.state();
        if state == SessionState::Closed {
            return Err(Error::ConnectionClosed);
        }
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(Error::Protocol { op, state })
        }
    }

    /// Apply a state transition unless the reader has already closed the
    /// session; Closed is terminal.
    fn transition(&self, new: SessionState) {
        let mut state = lock(&self.shared.state);
        if *state != SessionState::Closed || new == SessionState::Closed {
            *state = new;
        }
    }

    async fn call(&self, method: &str, params: Option<Value>, timeout: Duration) -> Result<Value> {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock(&self.shared.pending).insert(id, tx);

        let request = Message::Request(JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Number(id),
            method: method.to_string(),
            params,
        });

        if let Err(e) = write_message(&self.shared, &request).await {
            lock(&self.shared.pending).remove(&id);
            return Err(e);
        }
        debug!(id, method, "sent request");

        // A zero deadline must always time out, even if the response races in.
        let received = if timeout.is_zero() {
            None
        } else {
            tokio::time::timeout(timeout, rx).await.ok()
        };

        match received {
            None => {
                lock(&self.shared.pending).remove(&id);
                Err(Error::Timeout {
                    method: method.to_string(),
                    timeout,
                })
            }
            Some(Ok(response)) => response.into_outcome(),
            // Sender dropped: the reader tore the pending table down.
            Some(Err(_)) => Err(Error::ConnectionClosed),
        }
    }

    async fn write_notification(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = Message::Notification(JsonRpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
        write_message(&self.shared, &notification).await?;
        debug!(method, "sent notification");
        Ok(())
    }
}

async fn write_message(shared: &Shared, message: &Message) -> Result<()> {
    let payload = rpc::encode(message)?;
    let mut writer = shared.writer.lock().await;
    match writer.as_mut() {
        Some(w) => w.write_frame(&payload).await,
        None => Err(Error::ConnectionClosed),
    }
}

/// Background reader loop. Runs from `connect` until the transport closes
/// or a framing error occurs, then fails every outstanding pending call.
async fn read_loop(shared: Arc<Shared>, mut reader: FrameReader<OwnedReadHalf>) {
    loop {
        let payload = match reader.read_frame().await {
            Ok(payload) => payload,
            Err(Error::ConnectionClosed) => {
                debug!("transport closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "reader terminating");
                break;
            }
        };

        match rpc::decode(&payload) {
            Ok(Message::Response(response)) => dispatch_response(&shared, response),
            Ok(Message::Notification(notification)) => dispatch_notification(&shared, notification),
            Ok(Message::Request(request)) => answer_server_request(&shared, request).await,
            // An undecodable frame is dropped; the session continues.
            Err(e) => warn!(error = %e, "dropping malformed frame"),
        }
    }

    // Teardown: close the write path and fail everything outstanding.
    {
        let mut state = lock(&shared.state);
        *state = SessionState::Closed;
    }
    *shared.writer.lock().await = None;
    let outstanding = {
        let mut pending = lock(&shared.pending);
        pending.drain().count()
    };
    if outstanding > 0 {
        debug!(outstanding, "failed pending calls on close");
    }
}

fn dispatch_response(shared: &Shared, response: JsonRpcResponse) {
    let RequestId::Number(id) = response.id else {
        debug!(id = ?response.id, "response with non-numeric id; dropping");
        return;
    };

    let sender = lock(&shared.pending).remove(&id);
    match sender {
        // Send fails only if the caller already gave up; the response is
        // dropped either way.
        Some(tx) => drop(tx.send(response)),
        // Stale timeout resolution or a server bug.
        None => debug!(id, "no pending call for response; dropping"),
    }
}

fn dispatch_notification(shared: &Shared, notification: JsonRpcNotification) {
    // Clone the handler out before invoking it; a handler that calls
    // `on_notification` would otherwise deadlock the reader on this lock.
    let handler = lock(&shared.notification_handler).clone();
    if let Some(handler) = handler {
        handler(notification);
    } else {
        debug!(method = %notification.method, "unhandled server notification");
    }
}

async fn answer_server_request(shared: &Arc<Shared>, request: JsonRpcRequest) {
    let JsonRpcRequest {
        id, method, params, ..
    } = request;

    // Same re-entrancy rule as notifications: release the table lock
    // before running the handler.
    let handler = lock(&shared.request_handlers).get(&method).cloned();
    let reply = handler.map(|handler| handler(params));

    let response = match reply {
        Some(Ok(result)) => JsonRpcResponse::success(id, result),
        Some(Err(error)) => JsonRpcResponse::failure(id, error),
        None => {
            debug!(method = %method, "server request without handler");
            JsonRpcResponse::failure(
                id,
                JsonRpcError {
                    code: rpc::METHOD_NOT_FOUND,
                    message: format!("method not supported: {method}"),
                    data: None,
                },
            )
        }
    };

    if let Err(e) = write_message(shared, &Message::Response(response)).await {
        warn!(error = %e, method = %method, "failed to answer server request");
    }
}
