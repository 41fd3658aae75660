//! Error types for the room layer.

use bingohall_protocol::{Amount, RoomName};
use bingohall_transport::ConnectionId;

/// Errors a [`Ledger`](crate::Ledger) may report.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The backing service could not be reached. Worth retrying.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The balance would leave the representable range.
    #[error("balance overflow")]
    Overflow,
}

/// Errors a [`BingoStore`](crate::BingoStore) may report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached. Worth retrying.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A referenced row does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The write would break a stored invariant.
    #[error("conflicting write: {0}")]
    Conflict(String),
}

/// Coarse classification of a [`RoomError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or impossible request. Sender only, no state change.
    Validation,
    /// Well-formed but refused in the current state.
    Conflict,
    /// Room, player or game missing.
    NotFound,
    /// Ledger or persistence hiccup. The room carries on.
    Transient,
    /// The room actor is gone or shutting down.
    Unavailable,
}

/// Errors that can occur during room operations.
///
/// `Display` renders a message fit to show the acting player.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// The stake could not be debited.
    #[error("Insufficient balance")]
    InsufficientFunds { stake: Amount },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The connection is already subscribed to this room.
    #[error("{0} already joined room {1}")]
    AlreadyInRoom(ConnectionId, RoomName),

    /// The room's command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomName),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) | Self::InsufficientFunds { .. } | Self::AlreadyInRoom(..) => {
                ErrorKind::Conflict
            }
            Self::NotFound(_) | Self::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            Self::Ledger(_) | Self::Store(_) => ErrorKind::Transient,
            Self::Unavailable(_) => ErrorKind::Unavailable,
        }
    }
}
