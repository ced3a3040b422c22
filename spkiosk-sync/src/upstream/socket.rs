//! WebSocket socket task
//!
//! One task per connection attempt. It performs the handshake, forwards
//! frames as [`SocketEvent`]s, and reports exactly one terminal event
//! (`Failed` or `Closed`) unless it was torn down deliberately, in which
//! case it reports nothing.

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, trace};

/// Socket activity as seen by the dispatch loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Handshake completed
    Opened,
    /// Text frame (binary frames arrive as lossy UTF-8)
    Frame(String),
    /// Peer closed the connection (close frame reason, if any)
    Closed(Option<String>),
    /// Handshake or transport error
    Failed(String),
}

/// A socket event stamped with the generation of the socket that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: SocketEvent,
}

/// Handle to a running socket task
pub(crate) struct SocketHandle {
    close: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SocketHandle {
    /// Spawn a socket task for `generation`
    pub(crate) fn spawn(
        url: String,
        connect_timeout: Duration,
        generation: u64,
        events: mpsc::Sender<TaggedEvent>,
    ) -> Self {
        let (close_tx, close_rx) = oneshot::channel();
        let task = tokio::spawn(run_socket(url, connect_timeout, generation, events, close_rx));
        Self {
            close: Some(close_tx),
            task,
        }
    }

    /// Ask the task to send a close frame and exit without reporting
    ///
    /// The task is left to finish on its own; anything it still manages to
    /// emit carries a stale generation and is discarded by the dispatcher.
    pub(crate) fn close(mut self) {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
    }

    /// Close and wait (bounded) for the task to finish
    pub(crate) async fn shutdown(mut self, grace: Duration) {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
        if tokio::time::timeout(grace, &mut self.task).await.is_err() {
            debug!("Socket task did not exit in {:?}, aborting", grace);
            self.task.abort();
        }
    }
}

/// rustls needs a process-wide crypto provider before the first `wss://` handshake
fn install_crypto_provider() {
    // Err only means a provider is already installed
    let _ = rustls::crypto::ring::default_provider().install_default();
}

async fn run_socket(
    url: String,
    connect_timeout: Duration,
    generation: u64,
    events: mpsc::Sender<TaggedEvent>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let emit = |event: SocketEvent| {
        let events = events.clone();
        async move {
            // Dispatcher gone means the service is stopping
            let _ = events.send(TaggedEvent { generation, event }).await;
        }
    };

    if url.starts_with("wss:") {
        install_crypto_provider();
    }

    let handshake = tokio::time::timeout(connect_timeout, connect_async(url.as_str()));
    let stream = tokio::select! {
        _ = &mut close_rx => return,
        result = handshake => match result {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                emit(SocketEvent::Failed(e.to_string())).await;
                return;
            }
            Err(_) => {
                emit(SocketEvent::Failed(format!(
                    "handshake timed out after {:?}",
                    connect_timeout
                )))
                .await;
                return;
            }
        },
    };

    emit(SocketEvent::Opened).await;
    let (mut sink, mut stream) = stream.split();

    loop {
        tokio::select! {
            _ = &mut close_rx => {
                trace!(generation, "Closing superseded socket");
                let _ = sink.send(Message::Close(None)).await;
                return;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => emit(SocketEvent::Frame(text)).await,
                Some(Ok(Message::Binary(bytes))) => {
                    emit(SocketEvent::Frame(String::from_utf8_lossy(&bytes).into_owned())).await
                }
                Some(Ok(Message::Close(frame))) => {
                    emit(SocketEvent::Closed(frame.map(|f| f.reason.to_string()))).await;
                    return;
                }
                // Ping/pong are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    emit(SocketEvent::Failed(e.to_string())).await;
                    return;
                }
                None => {
                    emit(SocketEvent::Closed(None)).await;
                    return;
                }
            },
        }
    }
}
