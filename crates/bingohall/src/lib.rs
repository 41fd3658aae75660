//! # Bingo Hall
//!
//! Real-time multiplayer bingo rooms over WebSocket.
//!
//! A client connects to `/ws/bingo/game/<room>/?token=...` (number calling,
//! wins) or `/ws/bingo/card-selection/<room>/?token=...` (picking a card).
//! The server authenticates the token, subscribes the connection to the
//! room's actor, and relays JSON commands and events in both directions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bingohall::prelude::*;
//!
//! # async fn start() -> Result<(), BingoError> {
//! let store = Arc::new(InMemoryStore::new());
//! store.add_room(RoomName::new("hall"), Amount::from_units(10)).await;
//! let ledger = Arc::new(InMemoryLedger::new());
//! let tokens = TokenTable::from_pairs([("secret", "alice")]);
//!
//! let server = BingoServerBuilder::new()
//!     .bind("0.0.0.0:8000")
//!     .build(tokens, ledger, store)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::BingoError;
pub use server::{BingoServer, BingoServerBuilder};

/// Everything needed to stand up a server.
pub mod prelude {
    pub use crate::{BingoError, BingoServer, BingoServerBuilder};
    pub use bingohall_protocol::{
        Amount, CardNumber, ChannelKind, ClientCommand, RoomName, ServerEvent, Username,
    };
    pub use bingohall_room::{
        BingoStore, InMemoryLedger, InMemoryStore, Ledger, RoomConfig, RoomError,
    };
    pub use bingohall_session::{Authenticator, SessionConfig, SessionError, TokenTable};
}
