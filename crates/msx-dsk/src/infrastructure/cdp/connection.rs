//! One DevTools WebSocket shared by every command the driver sends.
//!
//! # Request/response over a single socket (for beginners)
//!
//! Commands and their responses are not strictly alternating: the browser
//! interleaves events with responses, and answers arrive tagged with the
//! command `id`.  The connection therefore runs a background *reader task*:
//!
//! ```text
//! send()  ── id=N ──► pending[N] = oneshot sender ──► WebSocket
//!                                                        │
//! reader task ◄──────────────────────────────────────────┘
//!   ├─ {"id": N, ...}      → pending[N].send(result)   (wakes send())
//!   └─ {"method": ..., ...} → events.send(event)       (broadcast)
//! ```
//!
//! Anyone waiting for an event calls [`CdpConnection::subscribe`] *before*
//! triggering it, so the event cannot slip past between the two.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use super::protocol::{Command, Event, Incoming};
use crate::application::driver::DriverError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, DriverError>>>>>;

/// Events buffered per subscriber before the slowest one starts losing them.
const EVENT_CAPACITY: usize = 256;

/// How long any single command may take.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct CdpConnection {
    sink: tokio::sync::Mutex<SplitSink<WsStream, WsMessage>>,
    pending: Pending,
    events: broadcast::Sender<Event>,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
}

impl CdpConnection {
    /// Opens the browser-level WebSocket at `url`.
    ///
    /// # Errors
    ///
    /// [`DriverError::Browser`] if the handshake fails.
    pub async fn connect(url: &str) -> Result<Self, DriverError> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| DriverError::Browser(format!("DevTools connect to {url} failed: {e}")))?;
        debug!("DevTools connected: {url}");

        let (sink, stream) = ws.split();
        let pending: Pending = Arc::default();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let reader = tokio::spawn(read_loop(stream, Arc::clone(&pending), events.clone()));

        Ok(Self {
            sink: tokio::sync::Mutex::new(sink),
            pending,
            events,
            next_id: AtomicU64::new(1),
            reader,
        })
    }

    /// A receiver for every event that arrives from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Sends `method` and waits for its result.
    ///
    /// # Errors
    ///
    /// [`DriverError::Protocol`] if the browser rejects the command,
    /// [`DriverError::Timeout`] after [`COMMAND_TIMEOUT`],
    /// [`DriverError::Browser`] if the socket is gone.
    pub async fn send(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<Value, DriverError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let text = serde_json::to_string(&Command { id, method, params, session_id })
            .map_err(|e| DriverError::Protocol(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);
        trace!("→ {text}");

        let sent = self.sink.lock().await.send(WsMessage::Text(text)).await;
        if let Err(e) = sent {
            lock(&self.pending).remove(&id);
            return Err(DriverError::Browser(format!("DevTools send failed: {e}")));
        }

        match timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DriverError::Browser("DevTools connection closed".into())),
            Err(_) => {
                lock(&self.pending).remove(&id);
                Err(DriverError::Timeout { what: method.to_string(), after: COMMAND_TIMEOUT })
            }
        }
    }

    /// Closes the socket and stops the reader task.
    pub async fn close(&self) {
        let _ = self.sink.lock().await.close().await;
        self.reader.abort();
    }
}

impl Drop for CdpConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Waits for the first event on `rx` matching `method` and `accept`.
///
/// Lagged receivers skip ahead; the awaited event is normally the newest.
///
/// # Errors
///
/// [`DriverError::Timeout`] naming `what` if nothing matches within `limit`.
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<Event>,
    method: &str,
    limit: Duration,
    what: &str,
    mut accept: F,
) -> Result<Event, DriverError>
where
    F: FnMut(&Event) -> bool,
{
    let deadline = Instant::now() + limit;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, rx.recv()).await {
            Ok(Ok(event)) if event.method == method && accept(&event) => return Ok(event),
            Ok(Ok(_)) => {}
            Ok(Err(broadcast::error::RecvError::Lagged(n))) => {
                warn!("event subscriber lagged, {n} events dropped");
            }
            Ok(Err(broadcast::error::RecvError::Closed)) => {
                return Err(DriverError::Browser("DevTools connection closed".into()));
            }
            Err(_) => {
                return Err(DriverError::Timeout { what: what.to_string(), after: limit });
            }
        }
    }
}

// ── Reader task ───────────────────────────────────────────────────────────────

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    pending: Pending,
    events: broadcast::Sender<Event>,
) {
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("DevTools socket error: {e}");
                break;
            }
        };
        trace!("← {text}");

        let msg: Incoming = match serde_json::from_str(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("unparseable DevTools message: {e}");
                continue;
            }
        };
        dispatch(msg, &pending, &events);
    }

    // Fail everyone still waiting.
    for (_, tx) in lock(&pending).drain() {
        let _ = tx.send(Err(DriverError::Browser("DevTools connection closed".into())));
    }
}

fn dispatch(msg: Incoming, pending: &Pending, events: &broadcast::Sender<Event>) {
    if let Some(id) = msg.id {
        let Some(tx) = lock(pending).remove(&id) else {
            debug!("response for unknown command id {id}");
            return;
        };
        let result = match msg.error {
            Some(err) => Err(DriverError::Protocol(format!("{} ({})", err.message, err.code))),
            None => Ok(msg.result.unwrap_or(Value::Null)),
        };
        let _ = tx.send(result);
    } else if let Some(method) = msg.method {
        // No subscribers is fine.
        let _ = events.send(Event {
            method,
            params: msg.params.unwrap_or(Value::Null),
            session_id: msg.session_id,
        });
    }
}
