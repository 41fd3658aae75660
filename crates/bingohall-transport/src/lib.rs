//! Transport abstraction layer for Bingo Hall.
//!
//! Provides the [`Transport`] and [`Connection`] traits the gateway is
//! written against, plus a WebSocket implementation. A connection remembers
//! the request target of its upgrade request, because the route
//! (`/ws/bingo/game/<room>/?token=...`) is how a client names its room,
//! its channel and its identity.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Process-unique id handed out at accept time. Sessions and room
/// subscriptions are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener that yields upgraded client connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr>;
}

/// One client socket carrying JSON frames.
///
/// `send` and `recv` may run at the same time from different tasks: the
/// gateway pushes room events while it is parked on `recv`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Next frame from the client, or `Ok(None)` once it hung up.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// When the client last sent anything, control frames included.
    /// Starts at the moment the connection was accepted.
    fn last_activity(&self) -> tokio::time::Instant;

    /// Path and query of the upgrade request, e.g.
    /// `/ws/bingo/card-selection/main/?token=abc`.
    fn path(&self) -> &str;
}
