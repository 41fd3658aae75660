//! Persistence interface for rooms, players and games.
//!
//! The room actor's memory is authoritative while it runs. The store is
//! the projection written at milestones (selection, draw, win, reset) and
//! the source a fresh actor hydrates from.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use bingohall_protocol::{Amount, CardNumber, RoomName, Username};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::StoreError;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "game-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub name: RoomName,
    pub stake: Amount,
    pub is_active: bool,
}

/// One (user, room) pair. Survives across games.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub user: Username,
    pub room: RoomName,
    /// The committed card. `None` means no stake is held.
    pub card_number: Option<CardNumber>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub room: RoomName,
    pub is_active: bool,
    /// Append-only, unique, each in `1..=75`.
    pub called_numbers: Vec<u8>,
    pub winner: Option<Username>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// BingoStore
// ---------------------------------------------------------------------------

/// What a room reads and writes.
pub trait BingoStore: Send + Sync + 'static {
    /// # Errors
    /// [`StoreError::NotFound`] for an unknown room.
    fn room(&self, room: &RoomName)
    -> impl Future<Output = Result<RoomRecord, StoreError>> + Send;

    /// Fetches the player row, creating it on first join.
    fn ensure_player(
        &self,
        room: &RoomName,
        user: &Username,
    ) -> impl Future<Output = Result<PlayerRecord, StoreError>> + Send;

    fn player(
        &self,
        room: &RoomName,
        user: &Username,
    ) -> impl Future<Output = Result<Option<PlayerRecord>, StoreError>> + Send;

    fn players(
        &self,
        room: &RoomName,
    ) -> impl Future<Output = Result<Vec<PlayerRecord>, StoreError>> + Send;

    /// Commits (or clears, with `None`) a player's card.
    ///
    /// # Errors
    /// [`StoreError::Conflict`] when another player of the room holds it.
    fn set_player_card(
        &self,
        room: &RoomName,
        user: &Username,
        card: Option<CardNumber>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Clears every committed card in the room.
    fn clear_cards(&self, room: &RoomName) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Creates an active game, deactivating any other active game of the
    /// room in the same step.
    fn create_game(
        &self,
        room: &RoomName,
    ) -> impl Future<Output = Result<GameRecord, StoreError>> + Send;

    fn active_game(
        &self,
        room: &RoomName,
    ) -> impl Future<Output = Result<Option<GameRecord>, StoreError>> + Send;

    /// Deactivates every active game of the room. Returns how many.
    fn deactivate_games(
        &self,
        room: &RoomName,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// # Errors
    /// [`StoreError::Conflict`] for a duplicate, out-of-range number or an
    /// inactive game.
    fn append_called_number(
        &self,
        game: GameId,
        number: u8,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deactivates the game and records the winner, if any.
    fn finish_game(
        &self,
        game: GameId,
        winner: Option<Username>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn game(&self, game: GameId)
    -> impl Future<Output = Result<Option<GameRecord>, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Tables {
    rooms: HashMap<RoomName, RoomRecord>,
    players: HashMap<(RoomName, Username), PlayerRecord>,
    games: BTreeMap<GameId, GameRecord>,
    next_game: u64,
}

/// A [`BingoStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) an active room.
    pub async fn add_room(&self, name: RoomName, stake: Amount) {
        let record = RoomRecord {
            name: name.clone(),
            stake,
            is_active: true,
        };
        self.tables.lock().await.rooms.insert(name, record);
    }

    /// Makes every call fail with [`StoreError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every game of `room`, oldest first.
    pub async fn games(&self, room: &RoomName) -> Vec<GameRecord> {
        self.tables
            .lock()
            .await
            .games
            .values()
            .filter(|g| &g.room == room)
            .cloned()
            .collect()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store switched off".into()))
        } else {
            Ok(())
        }
    }
}

fn deactivate(tables: &mut Tables, room: &RoomName) -> usize {
    let now = Utc::now();
    let mut count = 0;
    for game in tables.games.values_mut() {
        if &game.room == room && game.is_active {
            game.is_active = false;
            game.ended_at = Some(now);
            count += 1;
        }
    }
    count
}

impl BingoStore for InMemoryStore {
    async fn room(&self, room: &RoomName) -> Result<RoomRecord, StoreError> {
        self.check_available()?;
        self.tables
            .lock()
            .await
            .rooms
            .get(room)
            .filter(|r| r.is_active)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("room {room}")))
    }

    async fn ensure_player(
        &self,
        room: &RoomName,
        user: &Username,
    ) -> Result<PlayerRecord, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        if !tables.rooms.contains_key(room) {
            return Err(StoreError::NotFound(format!("room {room}")));
        }
        let record = tables
            .players
            .entry((room.clone(), user.clone()))
            .or_insert_with(|| PlayerRecord {
                user: user.clone(),
                room: room.clone(),
                card_number: None,
                is_active: true,
            });
        record.is_active = true;
        Ok(record.clone())
    }

    async fn player(
        &self,
        room: &RoomName,
        user: &Username,
    ) -> Result<Option<PlayerRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .tables
            .lock()
            .await
            .players
            .get(&(room.clone(), user.clone()))
            .cloned())
    }

    async fn players(&self, room: &RoomName) -> Result<Vec<PlayerRecord>, StoreError> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        let mut players: Vec<_> = tables
            .players
            .values()
            .filter(|p| &p.room == room)
            .cloned()
            .collect();
        players.sort_by(|a, b| a.user.cmp(&b.user));
        Ok(players)
    }

    async fn set_player_card(
        &self,
        room: &RoomName,
        user: &Username,
        card: Option<CardNumber>,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        if let Some(card) = card {
            let taken = tables
                .players
                .values()
                .any(|p| &p.room == room && &p.user != user && p.card_number == Some(card));
            if taken {
                return Err(StoreError::Conflict(format!("card {card} is already taken")));
            }
        }
        let record = tables
            .players
            .get_mut(&(room.clone(), user.clone()))
            .ok_or_else(|| StoreError::NotFound(format!("player {user}")))?;
        record.card_number = card;
        Ok(())
    }

    async fn clear_cards(&self, room: &RoomName) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        for player in tables.players.values_mut().filter(|p| &p.room == room) {
            player.card_number = None;
        }
        Ok(())
    }

    async fn create_game(&self, room: &RoomName) -> Result<GameRecord, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        if !tables.rooms.contains_key(room) {
            return Err(StoreError::NotFound(format!("room {room}")));
        }
        deactivate(&mut tables, room);

        tables.next_game += 1;
        let game = GameRecord {
            id: GameId(tables.next_game),
            room: room.clone(),
            is_active: true,
            called_numbers: Vec::new(),
            winner: None,
            created_at: Utc::now(),
            ended_at: None,
        };
        tables.games.insert(game.id, game.clone());
        Ok(game)
    }

    async fn active_game(&self, room: &RoomName) -> Result<Option<GameRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .tables
            .lock()
            .await
            .games
            .values()
            .find(|g| &g.room == room && g.is_active)
            .cloned())
    }

    async fn deactivate_games(&self, room: &RoomName) -> Result<usize, StoreError> {
        self.check_available()?;
        Ok(deactivate(&mut *self.tables.lock().await, room))
    }

    async fn append_called_number(&self, game: GameId, number: u8) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let record = tables
            .games
            .get_mut(&game)
            .ok_or_else(|| StoreError::NotFound(game.to_string()))?;
        if !record.is_active {
            return Err(StoreError::Conflict(format!("{game} is not active")));
        }
        if !(1..=75).contains(&number) {
            return Err(StoreError::Conflict(format!("{number} is not a bingo number")));
        }
        if record.called_numbers.contains(&number) {
            return Err(StoreError::Conflict(format!("{number} already called in {game}")));
        }
        record.called_numbers.push(number);
        Ok(())
    }

    async fn finish_game(&self, game: GameId, winner: Option<Username>) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let record = tables
            .games
            .get_mut(&game)
            .ok_or_else(|| StoreError::NotFound(game.to_string()))?;
        record.is_active = false;
        record.ended_at = Some(Utc::now());
        if winner.is_some() {
            record.winner = winner;
        }
        Ok(())
    }

    async fn game(&self, game: GameId) -> Result<Option<GameRecord>, StoreError> {
        self.check_available()?;
        Ok(self.tables.lock().await.games.get(&game).cloned())
    }
}
