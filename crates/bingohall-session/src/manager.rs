//! The session manager: tracks every admitted connection.
//!
//! `SessionManager` is a plain `HashMap` wrapper and is not thread-safe by
//! itself. The server keeps it behind a mutex and holds the lock only for
//! the map operation, never across network I/O.

use std::collections::HashMap;
use std::time::Instant;

use bingohall_protocol::{ChannelKind, RoomName, Username};
use bingohall_transport::ConnectionId;
use rand::Rng;

use crate::{Session, SessionConfig, SessionError};

/// Registry of live sessions, keyed by connection.
///
/// ```text
/// authenticate() ──→ create() ──→ ... ──→ remove()
/// ```
pub struct SessionManager {
    sessions: HashMap<ConnectionId, Session>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }

    /// Records a freshly authenticated connection.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] when `user` already holds the
    /// configured number of game-channel sessions in `room`.
    pub fn create(
        &mut self,
        conn_id: ConnectionId,
        user: Username,
        room: RoomName,
        channel: ChannelKind,
    ) -> Result<&Session, SessionError> {
        if channel == ChannelKind::Game {
            let held = self
                .sessions
                .values()
                .filter(|s| {
                    s.channel == ChannelKind::Game && s.user == user && s.room == room
                })
                .count();
            if held >= self.config.max_game_sessions_per_room {
                return Err(SessionError::AlreadyConnected { user, room });
            }
        }

        let session = Session {
            conn_id,
            user,
            room,
            channel,
            session_id: generate_session_id(),
            connected_at: Instant::now(),
        };
        tracing::info!(
            %conn_id,
            user = %session.user,
            room = %session.room,
            channel = %session.channel,
            session_id = %session.session_id,
            "session created"
        );

        Ok(self.sessions.entry(conn_id).insert_entry(session).into_mut())
    }

    /// Forgets a connection.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the connection was never admitted
    /// or was already removed.
    pub fn remove(&mut self, conn_id: ConnectionId) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(&conn_id)
            .ok_or(SessionError::NotFound(conn_id))?;
        tracing::info!(
            %conn_id,
            user = %session.user,
            room = %session.room,
            secs = session.connected_at.elapsed().as_secs(),
            "session closed"
        );
        Ok(session)
    }

    pub fn get(&self, conn_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&conn_id)
    }

    /// Every session `user` holds, across rooms and channels.
    pub fn sessions_for<'a>(&'a self, user: &'a Username) -> impl Iterator<Item = &'a Session> {
        self.sessions.values().filter(move |s| &s.user == user)
    }

    /// Number of sessions bound to `room`.
    pub fn count_in_room(&self, room: &RoomName) -> usize {
        self.sessions.values().filter(|s| &s.room == room).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// 128 random bits as 32 lowercase hex digits.
fn generate_session_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
