//! Unified error type for Bingo Hall.

use bingohall_protocol::ProtocolError;
use bingohall_room::RoomError;
use bingohall_session::SessionError;
use bingohall_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes let `?` convert layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BingoError {
    /// Connection, send or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Bad bytes, bad route, or a value out of range.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Missing or rejected credentials, duplicate session.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Refused or failed room operation.
    #[error(transparent)]
    Room(#[from] RoomError),
}
