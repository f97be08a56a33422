//! In-process WebSocket peers for tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;

use crate::notify::{Notifier, Severity};

use super::connection::ConnectionState;

const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// TestServer
// ============================================================================

enum ServerCommand {
    Text(String),
    Close,
}

#[derive(Default)]
struct ServerState {
    accepted: AtomicUsize,
    rejected: AtomicUsize,
    reject: AtomicBool,
    peer: Mutex<Option<mpsc::UnboundedSender<ServerCommand>>>,
}

/// Endpoint stand-in bound to a random localhost port.
///
/// Keeps the most recently accepted socket as the current peer and
/// collects every text frame it receives.
pub(crate) struct TestServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    received_rx: mpsc::UnboundedReceiver<String>,
    accept_task: JoinHandle<()>,
}

impl TestServer {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let state = Arc::new(ServerState::default());
        let (received_tx, received_rx) = mpsc::unbounded_channel();

        let accept_state = Arc::clone(&state);
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                if accept_state.reject.load(Ordering::SeqCst) {
                    accept_state.rejected.fetch_add(1, Ordering::SeqCst);
                    drop(stream);
                    continue;
                }
                tokio::spawn(serve_peer(
                    stream,
                    Arc::clone(&accept_state),
                    received_tx.clone(),
                ));
            }
        });

        Self {
            addr,
            state,
            received_rx,
            accept_task,
        }
    }

    pub(crate) fn url(&self) -> String {
        format!("ws://{}/LaserTag", self.addr)
    }

    /// Sockets upgraded so far.
    pub(crate) fn accepted(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    /// Connections dropped before the handshake while rejecting.
    pub(crate) fn rejected(&self) -> usize {
        self.state.rejected.load(Ordering::SeqCst)
    }

    /// Drops new TCP connections before the handshake while set.
    pub(crate) fn set_reject(&self, reject: bool) {
        self.state.reject.store(reject, Ordering::SeqCst);
    }

    pub(crate) async fn wait_for_peer(&self) {
        eventually(|| self.state.peer.lock().is_some()).await;
    }

    pub(crate) async fn wait_for_accepted(&self, count: usize) {
        eventually(|| self.accepted() >= count).await;
    }

    /// Sends a text frame to the current peer.
    pub(crate) fn push(&self, text: impl Into<String>) {
        let peer = self.state.peer.lock();
        let peer = peer.as_ref().expect("no peer connected");
        peer.send(ServerCommand::Text(text.into()))
            .expect("peer task alive");
    }

    /// Closes the current peer socket from the server side.
    pub(crate) fn close_peer(&self) {
        if let Some(peer) = self.state.peer.lock().take() {
            let _ = peer.send(ServerCommand::Close);
        }
    }

    /// Next text frame received from any peer.
    pub(crate) async fn next_received(&mut self) -> String {
        timeout(WAIT, self.received_rx.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("server stopped")
    }

    /// Asserts nothing arrives within `window`.
    pub(crate) async fn assert_silent(&mut self, window: Duration) {
        if let Ok(Some(frame)) = timeout(window, self.received_rx.recv()).await {
            panic!("unexpected frame: {frame}");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve_peer(
    stream: TcpStream,
    state: Arc<ServerState>,
    received_tx: mpsc::UnboundedSender<String>,
) {
    let Ok(ws_stream) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws_stream.split();
    let (command_tx, mut command_rx) = mpsc::unbounded_channel();

    *state.peer.lock() = Some(command_tx);
    state.accepted.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let _ = received_tx.send(text.as_str().to_owned());
                }
                Some(Ok(_)) => {}
                _ => break,
            },
            command = command_rx.recv() => match command {
                Some(ServerCommand::Text(text)) => {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Some(ServerCommand::Close) | None => {
                    let _ = write.close().await;
                    break;
                }
            },
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// URL of a localhost port with nothing listening.
pub(crate) async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("ws://{addr}/LaserTag")
}

/// URL of a listener that accepts TCP but never answers the handshake.
pub(crate) async fn stalled_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("ws://{addr}/LaserTag")
}

/// Waits until the watched state equals `want`.
pub(crate) async fn wait_for_state(
    rx: &mut watch::Receiver<ConnectionState>,
    want: ConnectionState,
) {
    timeout(WAIT, rx.wait_for(|state| *state == want))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {want}"))
        .expect("connection dropped");
}

/// Polls `condition` until it holds.
pub(crate) async fn eventually(condition: impl Fn() -> bool) {
    let polled = timeout(WAIT, async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "condition not reached in time");
}

// ============================================================================
// RecordingNotifier
// ============================================================================

/// Notifier that keeps every notification.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    entries: Mutex<Vec<(Severity, String, String)>>,
}

impl RecordingNotifier {
    pub(crate) fn entries(&self) -> Vec<(Severity, String, String)> {
        self.entries.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, title: &str, body: &str) {
        self.entries
            .lock()
            .push((severity, title.to_owned(), body.to_owned()));
    }
}
