use std::net::SocketAddr;

/// Errors raised while listening for, upgrading, or talking to clients.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The TCP peer connected but the WebSocket upgrade did not complete.
    #[error("upgrade from {peer} failed: {reason}")]
    Handshake { peer: SocketAddr, reason: String },

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),

    /// The peer is gone; nothing more can be written.
    #[error("connection closed")]
    Closed,
}
