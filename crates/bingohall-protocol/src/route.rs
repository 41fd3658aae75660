//! Connection URL parsing.
//!
//! A client names everything in the upgrade request:
//!
//! ```text
//! /ws/bingo/game/<room>/?token=<token>
//! /ws/bingo/card-selection/<room>/?token=<token>
//! ```

use crate::{ChannelKind, ProtocolError, RoomName};

/// The room, channel and credentials a connection asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub room: RoomName,
    pub channel: ChannelKind,
    /// Value of the `token` query parameter, if present.
    pub token: Option<String>,
}

impl Route {
    /// Parses a request target (path plus optional query).
    pub fn parse(target: &str) -> Result<Self, ProtocolError> {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let (channel, room) = match segments.as_slice() {
            ["ws", "bingo", "game", room] => (ChannelKind::Game, *room),
            ["ws", "bingo", "card-selection", room] => (ChannelKind::CardSelection, *room),
            _ => {
                return Err(ProtocolError::InvalidRoute(format!(
                    "no bingo channel at {path}"
                )));
            }
        };
        if !room
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(ProtocolError::InvalidRoute(format!(
                "room name {room:?} has unsupported characters"
            )));
        }

        let token = query.and_then(|q| {
            q.split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(k, _)| *k == "token")
                .map(|(_, v)| v.to_string())
                .filter(|v| !v.is_empty())
        });

        Ok(Self {
            room: RoomName::new(room),
            channel,
            token,
        })
    }
}
