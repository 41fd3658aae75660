//! Bingo rooms for Bingo Hall.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! roster, card selections, phase timer and the game in progress.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: spawns rooms on first join, removes them when empty
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`CardCatalog`] and [`pattern`]: the card and win rules
//! - [`Ledger`] and [`BingoStore`]: the balance and persistence seams,
//!   with in-memory implementations
//! - [`RoomConfig`]: timings, minimum players and payout settings

mod catalog;
mod config;
mod error;
mod ledger;
pub mod pattern;
pub mod payout;
mod registry;
mod room;
mod store;

pub use catalog::{CardCatalog, FREE_CELL};
pub use config::RoomConfig;
pub use error::{ErrorKind, LedgerError, RoomError, StoreError};
pub use ledger::{InMemoryLedger, Ledger};
pub use registry::RoomRegistry;
pub use room::{EventSender, RoomHandle};
pub use store::{BingoStore, GameId, GameRecord, InMemoryStore, PlayerRecord, RoomRecord};
