//! Error types for the session layer.

use bingohall_protocol::{RoomName, Username};
use bingohall_transport::ConnectionId;

/// Errors that can occur while admitting or tracking a connection.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection URL carried no `token` parameter.
    #[error("missing credentials")]
    MissingToken,

    /// The token was rejected by the [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No session exists for the given connection.
    #[error("no session for {0}")]
    NotFound(ConnectionId),

    /// The user already holds the maximum number of game-channel
    /// sessions in this room.
    #[error("{user} is already connected to room {room}")]
    AlreadyConnected { user: Username, room: RoomName },
}
