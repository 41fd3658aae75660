//! Commands clients send and events the server pushes.
//!
//! Both enums are internally tagged by `type`, so a frame looks like
//! `{"type": "select_card", "card_id": 12}`. Unknown tags fail to decode
//! and are answered with an `error` event by the gateway.

use serde::{Deserialize, Serialize};

use crate::{Amount, BingoLetter, CardCell, CardNumber, GamePhase, Username};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Everything a client may ask of its room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Pick (or switch to) a card. Reserves the room stake.
    SelectCard { card_id: CardNumber },

    /// Release a previously picked card.
    DeselectCard { card_id: CardNumber },

    /// Claim a win. `card_numbers` is the layout the client rendered;
    /// `card_numbers_claimed_called` is advisory and never trusted.
    DeclareBingo {
        username: Username,
        card_numbers: Vec<CardCell>,
        #[serde(default)]
        card_numbers_claimed_called: Vec<u8>,
    },

    /// Ask for a [`GameSnapshot`].
    GetState,

    /// Ask the room to abandon the current round.
    ResetGame,

    /// Keep-alive. Echoed back as `heartbeat_ack`.
    Heartbeat { client_time: u64 },
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A card currently held by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSelection {
    pub card_number: CardNumber,
    pub username: Username,
}

/// The pattern that completed a winning card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinningPattern {
    /// Stable name such as `"row_1"` or `"four_corners"`.
    pub name: String,
    /// Card indices (row-major, 0..25) that make up the pattern.
    pub indices: Vec<usize>,
}

/// Point-in-time view of a room, sent on connect and on `get_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub game_started: bool,
    /// Seconds left on the countdown, when one is running.
    pub countdown: Option<u32>,
    pub player_count: usize,
    pub called_numbers: Vec<u8>,
    pub selected_cards: Vec<CardSelection>,
    pub stake: Amount,
}

/// Everything the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    CardSelected {
        card_number: CardNumber,
        username: Username,
    },
    CardDeselected {
        card_number: CardNumber,
        username: Username,
    },
    CountdownUpdate {
        time_left: u32,
        message: String,
    },
    GameStarted {
        message: String,
    },
    NumberCalled {
        number: u8,
        display: String,
        letter: BingoLetter,
        called_numbers: Vec<u8>,
    },
    GameEnded {
        winner: Username,
        card_number: CardNumber,
        card_numbers: Vec<CardCell>,
        called_numbers: Vec<u8>,
        bonus: Amount,
        total_stake: Amount,
        player_count: usize,
        winning_pattern: WinningPattern,
        message: String,
    },
    GameReset {
        message: String,
    },
    PlayerCountUpdate {
        count: usize,
        message: String,
    },
    BalanceUpdate {
        balance: Amount,
    },
    GameState {
        game_state: GameSnapshot,
    },
    HeartbeatAck {
        client_time: u64,
        /// Milliseconds since the Unix epoch.
        server_time: i64,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    /// Shorthand for an `error` event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
