use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Why a bone frame could not be delivered.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("no client connected")]
    NotConnected,

    #[error("connection closed: {0}")]
    Closed(#[from] tungstenite::Error),

    /// The client stopped reading and the write did not finish in time.
    #[error("client stalled: write blocked for {0:?}")]
    Stalled(Duration),
}

/// Streaming endpoint errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, ServerError>;
