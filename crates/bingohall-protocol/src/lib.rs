//! Wire protocol for Bingo Hall.
//!
//! This crate defines the "language" browsers and the server speak:
//!
//! - **Values** ([`Username`], [`CardNumber`], [`Amount`], [`CardCell`], ...)
//!   with their range checks and wire formats.
//! - **Messages** ([`ClientCommand`], [`ServerEvent`]): JSON objects
//!   tagged by `type`.
//! - **Routes** ([`Route`]): which room and channel a connection URL names.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientCommand) → Room (state machine)
//! ```

mod codec;
mod error;
mod message;
mod route;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{
    CardSelection, ClientCommand, GameSnapshot, ServerEvent, WinningPattern,
};
pub use route::Route;
pub use types::{
    Amount, BingoLetter, CardCell, CardLayout, CardNumber, ChannelKind,
    GamePhase, RoomName, Username,
};
