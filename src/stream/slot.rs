use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::stream::error::SendError;

/// Longest a single write may block before the client counts as stalled.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Write half of an accepted WebSocket connection.
pub type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Send target of the frame loop.
#[async_trait]
pub trait BoneSink: Send + Sync {
    /// Deliver one serialised bone frame, waiting for the write to complete.
    async fn send_text(&self, text: String) -> Result<(), SendError>;
}

struct Attached {
    id: u64,
    peer: SocketAddr,
    sink: WsSink,
    evicted: Arc<Notify>,
}

/// Held by the reader task of an attached connection.
pub struct Attachment {
    id: u64,
    evicted: Arc<Notify>,
}

impl Attachment {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Resolves once the slot dropped this connection on its own (failed or
    /// stalled write, shutdown). The reader should then stop.
    pub async fn evicted(&self) {
        self.evicted.notified().await;
    }
}

/// Holds the write half of the single active client, if any.
///
/// Only one connection can be attached at a time. Each attachment gets a
/// fresh id so the reader task of a finished connection can never detach the
/// one that replaced it. Writes are bounded by the send timeout, so the lock
/// is never held indefinitely by a client that stopped reading.
pub struct ConnectionSlot {
    active: Mutex<Option<Attached>>,
    next_id: AtomicU64,
    send_timeout: Duration,
}

impl ConnectionSlot {
    pub fn new() -> Self {
        Self::with_send_timeout(DEFAULT_SEND_TIMEOUT)
    }

    pub fn with_send_timeout(send_timeout: Duration) -> Self {
        Self {
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
            send_timeout,
        }
    }

    /// Attach a client. Hands the sink back if another client holds the slot.
    pub async fn attach(&self, peer: SocketAddr, sink: WsSink) -> Result<Attachment, WsSink> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(sink);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let evicted = Arc::new(Notify::new());
        *active = Some(Attached {
            id,
            peer,
            sink,
            evicted: Arc::clone(&evicted),
        });
        Ok(Attachment { id, evicted })
    }

    /// Release the slot if it still belongs to connection `id`.
    ///
    /// Returns `false` when the connection was already gone (for example
    /// because a failed send detached it first).
    pub async fn detach(&self, id: u64) -> bool {
        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|a| a.id == id) {
            *active = None;
            return true;
        }
        false
    }

    /// Say goodbye to the attached client and empty the slot.
    pub async fn close(&self) {
        let attached = self.active.lock().await.take();
        if let Some(mut attached) = attached {
            let frame = CloseFrame {
                code: CloseCode::Away,
                reason: "server shutting down".into(),
            };
            let goodbye = attached.sink.send(Message::Close(Some(frame)));
            match tokio::time::timeout(self.send_timeout, goodbye).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!("close to {} failed: {e}", attached.peer),
                Err(_) => tracing::debug!("close to {} timed out", attached.peer),
            }
            attached.evicted.notify_one();
        }
    }
}

impl Default for ConnectionSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BoneSink for ConnectionSlot {
    async fn send_text(&self, text: String) -> Result<(), SendError> {
        let mut active = self.active.lock().await;
        let attached = active.as_mut().ok_or(SendError::NotConnected)?;
        let write = attached.sink.send(Message::Text(text));
        let err = match tokio::time::timeout(self.send_timeout, write).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => SendError::Closed(e),
            Err(_) => SendError::Stalled(self.send_timeout),
        };

        // The connection is unusable from here on; free the slot and tell
        // its reader to hang up.
        if let Some(attached) = active.take() {
            tracing::info!("dropping client {}: {err}", attached.peer);
            attached.evicted.notify_one();
        }
        Err(err)
    }
}

/// Close frame sent to a client that connects while the slot is taken.
pub fn busy_close_frame() -> CloseFrame<'static> {
    CloseFrame {
        code: CloseCode::Again,
        reason: "another client is already connected".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tokio::net::{TcpListener, TcpSocket};
    use tokio::time::timeout;

    /// A connected server-side sink plus a client that never reads.
    ///
    /// The client's receive buffer is shrunk so a few writes fill the pipe.
    async fn stalled_pair() -> (WsSink, SocketAddr, WebSocketStream<TcpStream>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = async {
            let socket = TcpSocket::new_v4().unwrap();
            socket.set_recv_buffer_size(4096).unwrap();
            let stream = socket.connect(addr).await.unwrap();
            let (ws, _) = tokio_tungstenite::client_async(format!("ws://{addr}"), stream)
                .await
                .unwrap();
            ws
        };
        let server = async {
            let (stream, peer) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            (ws, peer)
        };
        let (client, (server_ws, peer)) = tokio::join!(client, server);
        let (sink, _incoming) = server_ws.split();
        (sink, peer, client)
    }

    fn attached(result: Result<Attachment, WsSink>) -> Attachment {
        match result {
            Ok(attachment) => attachment,
            Err(_) => panic!("slot unexpectedly busy"),
        }
    }

    #[tokio::test]
    async fn empty_slot_reports_not_connected() {
        let slot = ConnectionSlot::new();
        let err = slot.send_text("{}".to_string()).await.unwrap_err();
        assert!(matches!(err, SendError::NotConnected));
    }

    #[tokio::test]
    async fn detach_of_unknown_id_is_a_no_op() {
        let slot = ConnectionSlot::new();
        assert!(!slot.detach(42).await);
    }

    #[tokio::test]
    async fn close_on_empty_slot_is_harmless() {
        let slot = ConnectionSlot::new();
        slot.close().await;
        assert!(matches!(
            slot.send_text("{}".to_string()).await,
            Err(SendError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn second_attach_is_refused_until_detach() {
        let (sink_a, peer_a, _client_a) = stalled_pair().await;
        let (sink_b, peer_b, _client_b) = stalled_pair().await;
        let slot = ConnectionSlot::new();

        let first = attached(slot.attach(peer_a, sink_a).await);
        let sink_b = match slot.attach(peer_b, sink_b).await {
            Ok(_) => panic!("second client attached"),
            Err(sink) => sink,
        };
        assert!(slot.detach(first.id()).await);
        let second = attached(slot.attach(peer_b, sink_b).await);
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn client_that_stops_reading_is_evicted() {
        let (sink, peer, _client) = stalled_pair().await;
        let slot = ConnectionSlot::with_send_timeout(Duration::from_millis(50));
        let attachment = attached(slot.attach(peer, sink).await);

        let payload = "x".repeat(64 * 1024);
        let mut outcome = Ok(());
        for _ in 0..4096 {
            outcome = timeout(Duration::from_secs(5), slot.send_text(payload.clone()))
                .await
                .expect("send was not bounded by the send timeout");
            if outcome.is_err() {
                break;
            }
        }

        assert!(matches!(outcome, Err(SendError::Stalled(_))));
        // The slot is free again and the reader has been told to stop.
        assert!(!slot.detach(attachment.id()).await);
        timeout(Duration::from_secs(1), attachment.evicted())
            .await
            .expect("reader was not notified");
        assert!(matches!(
            slot.send_text("{}".to_string()).await,
            Err(SendError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn close_notifies_the_reader() {
        let (sink, peer, _client) = stalled_pair().await;
        let slot = ConnectionSlot::new();
        let attachment = attached(slot.attach(peer, sink).await);

        slot.close().await;
        timeout(Duration::from_secs(1), attachment.evicted())
            .await
            .expect("reader was not notified");
        assert!(!slot.detach(attachment.id()).await);
    }

    #[test]
    fn busy_frame_asks_client_to_retry_later() {
        let frame = busy_close_frame();
        assert_eq!(u16::from(frame.code), 1013);
        assert_eq!(frame.reason, "another client is already connected");
    }

    #[test]
    fn slot_is_shareable_across_tasks() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConnectionSlot>();
        assert_send_sync::<std::sync::Arc<dyn BoneSink>>();
    }
}
