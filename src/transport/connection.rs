//! Persistent WebSocket connection to one endpoint.
//!
//! A [`Connection`] owns at most one live socket, the listener registry for
//! its protocol, and the bounded reconnection policy.
//!
//! # State Machine
//!
//! ```text
//!                connect()                 handshake ok
//! Disconnected ───────────► Connecting ─────────────────► Connected
//!      ▲                        │ handshake failed             │ socket closed
//!      │◄───────────────────────┘                              ▼
//!      │       attempts exhausted                        Reconnecting
//!      └◄──────────────────────────────────────────────── (delay, dial)
//! ```
//!
//! `disconnect()` returns to `Disconnected` from any state and cancels a
//! pending reconnect.
//!
//! # Event Loop
//!
//! Each live socket gets a tokio task that:
//!
//! - Decodes inbound frames and dispatches them to listeners in arrival order
//! - Writes outbound frames queued by [`Connection::send`]
//! - Schedules a reconnect when the peer or network closes the socket

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{Endpoint, ListenerId};
use crate::protocol::{Frame, Protocol};

use super::config::{ConnectionConfig, validate_url};
use super::listeners::{ListenerRegistry, invoke_guarded};

// ============================================================================
// Types
// ============================================================================

/// Client socket type.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Callback for frames the protocol classifies as passthrough.
pub type PassthroughHandler = Arc<dyn Fn(&str) + Send + Sync>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket and no pending reconnect.
    Disconnected,
    /// Open handshake in progress.
    Connecting,
    /// Socket open; sends are accepted.
    Connected,
    /// Socket lost; a reconnect attempt is scheduled or dialing.
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Internal Types
// ============================================================================

/// Commands for the event loop.
enum SessionCommand {
    /// Write one text frame.
    Send(String),
    /// Close the socket without reconnecting.
    Shutdown,
}

/// Handle to a running event loop.
struct Session {
    command_tx: mpsc::UnboundedSender<SessionCommand>,
}

/// Mutable state guarded by one lock.
struct Shared {
    /// Bumped on every manual connect and disconnect; stale tasks compare
    /// against it and stand down.
    generation: u64,
    /// Consecutive reconnect attempts since the last open socket.
    reconnect_attempt: u32,
    /// Live socket, if any.
    session: Option<Session>,
    /// Scheduled or dialing reconnect.
    reconnect_task: Option<JoinHandle<()>>,
}

/// Outcome of the synchronous part of `connect`.
enum Start {
    /// Already connected.
    Ready,
    /// Another caller is mid-handshake.
    Pending(watch::Receiver<ConnectionState>),
    /// Dial with this generation.
    Dial(u64),
}

/// Resets a dial that was dropped mid-handshake.
///
/// Acts only while the state is still `Connecting` under the same generation,
/// so a settled or superseded attempt is left alone.
struct DialGuard<'a, P: Protocol> {
    inner: &'a Inner<P>,
    generation: u64,
}

impl<P: Protocol> Drop for DialGuard<'_, P> {
    fn drop(&mut self) {
        let shared = self.inner.shared.lock();
        if shared.generation == self.generation && self.inner.state() == ConnectionState::Connecting {
            self.inner.set_state(ConnectionState::Disconnected);
            debug!(endpoint = %P::ENDPOINT, "Connection attempt dropped mid-handshake");
        }
    }
}

/// State shared between handles and tasks.
struct Inner<P: Protocol> {
    url: String,
    config: ConnectionConfig,
    shared: Mutex<Shared>,
    state_tx: watch::Sender<ConnectionState>,
    listeners: ListenerRegistry<P::Key, P::Message>,
    passthrough: Mutex<Option<PassthroughHandler>>,
}

// ============================================================================
// Connection
// ============================================================================

/// Connection to one endpoint speaking protocol `P`.
///
/// Cloning yields another handle to the same connection.
///
/// # Example
///
/// ```no_run
/// use lasertag_bridge::protocol::{HostEnvelope, HostProtocol};
/// use lasertag_bridge::transport::{Connection, ConnectionConfig};
///
/// # async fn example() -> lasertag_bridge::Result<()> {
/// let connection = Connection::<HostProtocol>::new(
///     "ws://192.168.4.2:8080/LaserTag",
///     ConnectionConfig::default(),
/// )?;
///
/// connection.add_listener(200, |envelope: &HostEnvelope| {
///     println!("{}", envelope.message);
/// });
///
/// connection.connect().await?;
/// connection.send(&HostEnvelope::new(0, 0))?;
/// # Ok(())
/// # }
/// ```
pub struct Connection<P: Protocol> {
    inner: Arc<Inner<P>>,
}

impl<P: Protocol> Clone for Connection<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Protocol> fmt::Debug for Connection<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &P::ENDPOINT)
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Connection - Constructor
// ============================================================================

impl<P: Protocol> Connection<P> {
    /// Creates a disconnected connection for `url`.
    ///
    /// No I/O happens until [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` is not a `ws`/`wss` URL.
    pub fn new(url: impl Into<String>, config: ConnectionConfig) -> Result<Self> {
        let url = url.into();
        validate_url(&url)?;

        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            inner: Arc::new(Inner {
                url,
                config,
                shared: Mutex::new(Shared {
                    generation: 0,
                    reconnect_attempt: 0,
                    session: None,
                    reconnect_task: None,
                }),
                state_tx,
                listeners: ListenerRegistry::new(),
                passthrough: Mutex::new(None),
            }),
        })
    }
}

// ============================================================================
// Connection - Accessors
// ============================================================================

impl<P: Protocol> Connection<P> {
    /// Returns the endpoint this connection talks to.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        P::ENDPOINT
    }

    /// Returns `true` if both handles refer to the same connection.
    #[inline]
    #[must_use]
    pub fn same_connection(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the URL fixed at construction.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Returns `true` if the socket is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns the number of consecutive reconnect attempts made.
    #[inline]
    #[must_use]
    pub fn reconnect_attempt(&self) -> u32 {
        self.inner.shared.lock().reconnect_attempt
    }

    /// Subscribes to state transitions.
    #[inline]
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }
}

// ============================================================================
// Connection - Listeners
// ============================================================================

impl<P: Protocol> Connection<P> {
    /// Registers a listener for messages with dispatch key `key`.
    ///
    /// Pure registry mutation; no I/O.
    pub fn add_listener<F>(&self, key: impl Into<P::Key>, listener: F) -> ListenerId
    where
        F: Fn(&P::Message) + Send + Sync + 'static,
    {
        self.inner.listeners.add(key.into(), Arc::new(listener))
    }

    /// Removes a listener. Unknown keys or IDs are a no-op.
    ///
    /// Returns `true` if a listener was removed.
    pub fn remove_listener(&self, key: impl Into<P::Key>, id: ListenerId) -> bool {
        self.inner.listeners.remove(&key.into(), id)
    }

    /// Returns the number of listeners registered under `key`.
    #[must_use]
    pub fn listener_count(&self, key: impl Into<P::Key>) -> usize {
        self.inner.listeners.count(&key.into())
    }

    /// Sets the handler for passthrough frames, replacing any previous one.
    pub fn set_passthrough_handler<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.inner.passthrough.lock() = Some(Arc::new(handler));
    }

}

// ============================================================================
// Connection - Lifecycle
// ============================================================================

impl<P: Protocol> Connection<P> {
    /// Opens the socket and waits for the handshake.
    ///
    /// Idempotent: returns `Ok(())` at once when already connected, and
    /// waits for the pending attempt when another call is mid-handshake.
    /// From `Reconnecting` the scheduled attempt is cancelled and the
    /// endpoint is dialed immediately. The reconnect counter is reset.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the handshake fails or is cancelled
    /// - [`Error::ConnectionTimeout`] if the handshake exceeds the open timeout
    ///
    /// # Cancellation
    ///
    /// Dropping the future mid-handshake returns the connection to
    /// `Disconnected`, and callers waiting on that attempt get an error.
    pub async fn connect(&self) -> Result<()> {
        let start = {
            let mut shared = self.inner.shared.lock();
            match self.state() {
                ConnectionState::Connected => Start::Ready,
                ConnectionState::Connecting => Start::Pending(self.inner.state_tx.subscribe()),
                state => {
                    if let Some(task) = shared.reconnect_task.take() {
                        task.abort();
                        debug!(endpoint = %P::ENDPOINT, "Cancelled scheduled reconnect");
                    }
                    if state == ConnectionState::Reconnecting {
                        shared.session = None;
                    }
                    shared.generation += 1;
                    shared.reconnect_attempt = 0;
                    self.inner.set_state(ConnectionState::Connecting);
                    Start::Dial(shared.generation)
                }
            }
        };

        let generation = match start {
            Start::Ready => return Ok(()),
            Start::Pending(rx) => return Self::wait_pending(rx).await,
            Start::Dial(generation) => generation,
        };

        let _guard = DialGuard {
            inner: &self.inner,
            generation,
        };
        info!(endpoint = %P::ENDPOINT, url = %self.inner.url, "Connecting");

        match self.inner.open().await {
            Ok(ws_stream) => {
                let mut shared = self.inner.shared.lock();
                if shared.generation != generation {
                    debug!(endpoint = %P::ENDPOINT, "Handshake completed after disconnect, dropping socket");
                    return Err(Error::connection("connection attempt cancelled"));
                }
                Inner::install_session(&self.inner, &mut shared, ws_stream, generation);
                Ok(())
            }
            Err(e) => {
                let shared = self.inner.shared.lock();
                if shared.generation == generation {
                    self.inner.set_state(ConnectionState::Disconnected);
                }
                error!(endpoint = %P::ENDPOINT, url = %self.inner.url, error = %e, "Connection failed");
                Err(e)
            }
        }
    }

    /// Closes the socket and cancels any scheduled reconnect.
    ///
    /// No automatic attempts happen afterwards until the next
    /// [`connect`](Self::connect).
    pub fn disconnect(&self) {
        let mut shared = self.inner.shared.lock();
        shared.generation += 1;
        shared.reconnect_attempt = 0;

        if let Some(task) = shared.reconnect_task.take() {
            task.abort();
        }

        if let Some(session) = shared.session.take() {
            let _ = session.command_tx.send(SessionCommand::Shutdown);
        }

        if self.state() != ConnectionState::Disconnected {
            self.inner.set_state(ConnectionState::Disconnected);
            info!(endpoint = %P::ENDPOINT, "Disconnected");
        }
    }

    /// Waits for another caller's handshake to settle.
    async fn wait_pending(mut rx: watch::Receiver<ConnectionState>) -> Result<()> {
        loop {
            let state = *rx.borrow_and_update();
            match state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Disconnected => {
                    return Err(Error::connection("pending connection attempt failed"));
                }
                ConnectionState::Connecting | ConnectionState::Reconnecting => {}
            }
            rx.changed().await.map_err(|_| Error::ConnectionClosed)?;
        }
    }
}

// ============================================================================
// Connection - Send
// ============================================================================

impl<P: Protocol> Connection<P> {
    /// Encodes and queues one message for the socket.
    ///
    /// Never suspends. Nothing is queued unless the socket is open.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] unless the state is `Connected`
    /// - [`Error::Json`] if the message cannot be encoded
    pub fn send(&self, message: &P::Message) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::not_connected(P::ENDPOINT));
        }

        let text = P::encode(message)?;
        self.send_text(text)
    }

    /// Queues one pre-encoded text frame.
    fn send_text(&self, text: String) -> Result<()> {
        let shared = self.inner.shared.lock();

        let session = match (&shared.session, self.state()) {
            (Some(session), ConnectionState::Connected) => session,
            _ => return Err(Error::not_connected(P::ENDPOINT)),
        };

        session
            .command_tx
            .send(SessionCommand::Send(text))
            .map_err(|_| Error::not_connected(P::ENDPOINT))?;

        trace!(endpoint = %P::ENDPOINT, "Frame queued");
        Ok(())
    }
}

// ============================================================================
// Inner - State
// ============================================================================

impl<P: Protocol> Inner<P> {
    #[inline]
    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Publishes a new state. Callers hold the `shared` lock.
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(endpoint = %P::ENDPOINT, from = %previous, to = %state, "State changed");
        }
    }
}

// ============================================================================
// Inner - Socket Lifecycle
// ============================================================================

impl<P: Protocol> Inner<P> {
    /// Dials the endpoint and completes the open handshake.
    async fn open(&self) -> Result<WsStream> {
        let timeout_ms = self.config.open_timeout.as_millis() as u64;

        let (ws_stream, response) = timeout(self.config.open_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| Error::connection_timeout(timeout_ms))?
            .map_err(|e| Error::connection(format!("WebSocket handshake failed: {e}")))?;

        debug!(endpoint = %P::ENDPOINT, status = %response.status(), "Handshake completed");
        Ok(ws_stream)
    }

    /// Starts the event loop for a freshly opened socket.
    fn install_session(
        inner: &Arc<Self>,
        shared: &mut Shared,
        ws_stream: WsStream,
        generation: u64,
    ) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        shared.session = Some(Session { command_tx });
        shared.reconnect_attempt = 0;
        shared.reconnect_task = None;
        inner.set_state(ConnectionState::Connected);

        tokio::spawn(Self::run_event_loop(
            Arc::clone(inner),
            ws_stream,
            command_rx,
            generation,
        ));

        info!(endpoint = %P::ENDPOINT, url = %inner.url, "Connected");
    }

    /// Handles a socket closed by the peer or the network.
    fn handle_closed(self: &Arc<Self>, generation: u64) {
        let mut shared = self.shared.lock();
        if shared.generation != generation {
            return;
        }

        shared.session = None;
        info!(endpoint = %P::ENDPOINT, "Socket closed");

        self.schedule_reconnect(&mut shared, generation);
    }

    /// Schedules the next reconnect attempt or gives up.
    fn schedule_reconnect(self: &Arc<Self>, shared: &mut Shared, generation: u64) {
        let max = self.config.max_reconnect_attempts;

        if shared.reconnect_attempt >= max {
            shared.reconnect_task = None;
            self.set_state(ConnectionState::Disconnected);
            warn!(
                endpoint = %P::ENDPOINT,
                attempts = shared.reconnect_attempt,
                "Reconnect attempts exhausted, giving up"
            );
            return;
        }

        shared.reconnect_attempt += 1;
        let attempt = shared.reconnect_attempt;
        self.set_state(ConnectionState::Reconnecting);

        info!(
            endpoint = %P::ENDPOINT,
            attempt,
            max,
            delay_ms = self.config.reconnect_delay.as_millis() as u64,
            "Reconnecting"
        );

        let inner = Arc::clone(self);
        shared.reconnect_task = Some(tokio::spawn(async move {
            sleep(inner.config.reconnect_delay).await;
            inner.reconnect(generation, attempt).await;
        }));
    }

    /// One reconnect attempt.
    async fn reconnect(self: Arc<Self>, generation: u64, attempt: u32) {
        let result = self.open().await;

        let mut shared = self.shared.lock();
        if shared.generation != generation {
            return;
        }

        match result {
            Ok(ws_stream) => {
                Self::install_session(&self, &mut shared, ws_stream, generation);
                info!(endpoint = %P::ENDPOINT, attempt, "Reconnected");
            }
            Err(e) => {
                warn!(endpoint = %P::ENDPOINT, attempt, error = %e, "Reconnect attempt failed");
                self.schedule_reconnect(&mut shared, generation);
            }
        }
    }
}

// ============================================================================
// Inner - Event Loop
// ============================================================================

impl<P: Protocol> Inner<P> {
    /// Event loop that handles WebSocket I/O for one socket.
    async fn run_event_loop(
        inner: Arc<Self>,
        ws_stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
        generation: u64,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        let shutdown = loop {
            tokio::select! {
                // Incoming frames from the endpoint
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            inner.handle_frame(text.as_str());
                        }

                        Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                            Ok(text) => inner.handle_frame(text),
                            Err(e) => {
                                warn!(endpoint = %P::ENDPOINT, error = %e, "Dropping non-UTF-8 binary frame");
                            }
                        },

                        Some(Ok(Message::Close(frame))) => {
                            debug!(endpoint = %P::ENDPOINT, ?frame, "WebSocket closed by remote");
                            break false;
                        }

                        Some(Err(e)) => {
                            warn!(endpoint = %P::ENDPOINT, error = %e, "WebSocket error");
                            break false;
                        }

                        None => {
                            debug!(endpoint = %P::ENDPOINT, "WebSocket stream ended");
                            break false;
                        }

                        // Ignore Ping, Pong, raw Frame
                        _ => {}
                    }
                }

                // Outbound frames and shutdown
                command = command_rx.recv() => {
                    match command {
                        Some(SessionCommand::Send(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(endpoint = %P::ENDPOINT, error = %e, "Failed to write frame");
                                break false;
                            }
                            trace!(endpoint = %P::ENDPOINT, "Frame sent");
                        }

                        Some(SessionCommand::Shutdown) | None => {
                            let _ = ws_write.close().await;
                            break true;
                        }
                    }
                }
            }
        };

        if !shutdown {
            inner.handle_closed(generation);
        }

        debug!(endpoint = %P::ENDPOINT, "Event loop terminated");
    }

    /// Decodes one inbound frame and dispatches it.
    ///
    /// Malformed frames are logged and dropped.
    fn handle_frame(&self, raw: &str) {
        match P::decode(raw) {
            Ok(Frame::Message(message)) => {
                let key = P::key(&message);
                let invoked = self.listeners.dispatch(&key, &message);
                if invoked == 0 {
                    trace!(endpoint = %P::ENDPOINT, ?key, "No listener for key, frame dropped");
                } else {
                    trace!(endpoint = %P::ENDPOINT, ?key, invoked, "Frame dispatched");
                }
            }

            Ok(Frame::Passthrough(payload)) => {
                let handler = self.passthrough.lock().clone();
                match handler {
                    Some(handler) => {
                        if !invoke_guarded(|| handler(&payload)) {
                            error!(endpoint = %P::ENDPOINT, "Passthrough handler panicked");
                        }
                    }
                    None => {
                        debug!(endpoint = %P::ENDPOINT, "No passthrough handler, frame dropped");
                    }
                }
            }

            Err(e) => {
                warn!(endpoint = %P::ENDPOINT, error = %e, "Dropping malformed frame");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
