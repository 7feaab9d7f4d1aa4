use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::stream::error::{Result, ServerError};
use crate::stream::slot::{busy_close_frame, ConnectionSlot, DEFAULT_SEND_TIMEOUT};

/// Default listen address: localhost only.
pub const DEFAULT_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 8765);

/// A peer that has not finished the WebSocket handshake by then is dropped.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket endpoint serving a single client at a time.
pub struct StreamServer {
    listener: TcpListener,
    slot: Arc<ConnectionSlot>,
}

impl StreamServer {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Self {
            listener,
            slot: Arc::new(ConnectionSlot::new()),
        })
    }

    /// Bound every write to the client by `send_timeout`. Call before
    /// handing out [`StreamServer::slot`].
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.slot = Arc::new(ConnectionSlot::with_send_timeout(send_timeout));
        self
    }

    /// Address actually bound (differs from the requested one for port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The slot the frame loop sends through.
    pub fn slot(&self) -> Arc<ConnectionSlot> {
        Arc::clone(&self.slot)
    }

    /// Accept connections until `shutdown` flips to `true` (or its sender is
    /// dropped), then close the active client.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            let (stream, peer) = tokio::select! {
                _ = shutdown.changed() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("accept failed: {e}");
                        continue;
                    }
                },
            };
            tokio::spawn(handle_connection(stream, peer, Arc::clone(&self.slot)));
        }

        self.slot.close().await;
        info!("stream endpoint closed");
    }
}

/// Run one accepted socket: handshake, claim the slot, then read until the
/// client goes away.
async fn handle_connection(stream: TcpStream, peer: SocketAddr, slot: Arc<ConnectionSlot>) {
    let handshake = tokio_tungstenite::accept_async(stream);
    let ws = match tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake).await {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            debug!("handshake with {peer} failed: {e}");
            return;
        }
        Err(_) => {
            debug!("handshake with {peer} timed out");
            return;
        }
    };
    let (sink, mut incoming) = ws.split();

    let attachment = match slot.attach(peer, sink).await {
        Ok(attachment) => attachment,
        Err(mut sink) => {
            info!("rejected {peer}: another client is already connected");
            let goodbye = sink.send(Message::Close(Some(busy_close_frame())));
            match tokio::time::timeout(DEFAULT_SEND_TIMEOUT, goodbye).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("close to {peer} failed: {e}"),
                Err(_) => debug!("close to {peer} timed out"),
            }
            return;
        }
    };
    info!("client {peer} connected");

    // Client messages carry nothing; reading only tracks the connection state
    // and lets the transport answer pings.
    loop {
        let message = tokio::select! {
            _ = attachment.evicted() => {
                debug!("client {peer} evicted by the slot");
                break;
            }
            message = incoming.next() => message,
        };
        match message {
            Some(Ok(Message::Close(frame))) => {
                debug!("client {peer} sent close: {frame:?}");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!("read from {peer} failed: {e}");
                break;
            }
            None => break,
        }
    }

    if slot.detach(attachment.id()).await {
        info!("client {peer} disconnected");
    } else {
        debug!("client {peer} was already detached");
    }
}
