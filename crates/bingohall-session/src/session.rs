//! Session types: the server's record of one admitted connection.

use std::time::Instant;

use bingohall_protocol::{ChannelKind, RoomName, Username};
use bingohall_transport::ConnectionId;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Limits applied when admitting a connection.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How many game-channel connections one user may hold in one room.
    /// Card-selection connections are never limited.
    pub max_game_sessions_per_room: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_game_sessions_per_room: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One authenticated connection bound to one room and one channel.
#[derive(Debug, Clone)]
pub struct Session {
    pub conn_id: ConnectionId,
    pub user: Username,
    pub room: RoomName,
    pub channel: ChannelKind,
    /// Random 32-hex-digit id for correlating logs across layers.
    pub session_id: String,
    pub connected_at: Instant,
}
