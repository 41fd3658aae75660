//! Room registry: the one cross-room structure.
//!
//! Maps room names to running actors. Lookups of a live room take the
//! read lock only; spawning and removal take the write lock for the map
//! operation alone, never across persistence I/O or an actor join.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bingohall_protocol::RoomName;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::room::spawn_room;
use crate::{BingoStore, Ledger, RoomConfig, RoomError, RoomHandle, StoreError};

struct RoomEntry {
    handle: RoomHandle,
    task: JoinHandle<()>,
}

/// Creates rooms on first join and tears them down once empty.
pub struct RoomRegistry<L: Ledger, S: BingoStore> {
    rooms: RwLock<HashMap<RoomName, RoomEntry>>,
    ledger: Arc<L>,
    store: Arc<S>,
    config: RoomConfig,
    next_actor: AtomicU64,
}

impl<L: Ledger, S: BingoStore> RoomRegistry<L, S> {
    pub fn new(ledger: Arc<L>, store: Arc<S>, config: RoomConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            ledger,
            store,
            config: config.validated(),
            next_actor: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the live actor for `room`, spawning one if there is none or
    /// the previous one stopped.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] with `"room not found"` for a room the
    /// store does not know.
    pub async fn get_or_create(&self, room: &RoomName) -> Result<RoomHandle, RoomError> {
        if let Some(handle) = self.live_handle(room).await {
            return Ok(handle);
        }

        let record = self.store.room(room).await.map_err(|e| match e {
            StoreError::NotFound(_) => RoomError::NotFound("room not found".into()),
            other => RoomError::Store(other),
        })?;

        let mut rooms = self.rooms.write().await;
        if let Some(entry) = rooms.get(room) {
            if !entry.handle.is_closed() {
                return Ok(entry.handle.clone());
            }
            warn!(%room, actor_id = entry.handle.actor_id(), "replacing stopped room actor");
        }

        let actor_id = self.next_actor.fetch_add(1, Ordering::Relaxed);
        let (handle, task) = spawn_room(
            record,
            self.config.clone(),
            Arc::clone(&self.ledger),
            Arc::clone(&self.store),
            actor_id,
        );
        rooms.insert(
            room.clone(),
            RoomEntry {
                handle: handle.clone(),
                task,
            },
        );
        info!(%room, actor_id, rooms = rooms.len(), "room created");
        Ok(handle)
    }

    /// The live actor for `room`, if any.
    pub async fn get(&self, room: &RoomName) -> Option<RoomHandle> {
        self.live_handle(room).await
    }

    async fn live_handle(&self, room: &RoomName) -> Option<RoomHandle> {
        self.rooms
            .read()
            .await
            .get(room)
            .filter(|entry| !entry.handle.is_closed())
            .map(|entry| entry.handle.clone())
    }

    /// Stops and removes `room` if nobody is subscribed to it.
    ///
    /// The actor is joined before this returns. Returns `true` if the room
    /// is gone afterwards.
    pub async fn remove_if_empty(&self, room: &RoomName) -> bool {
        let Some(handle) = self
            .rooms
            .read()
            .await
            .get(room)
            .map(|entry| entry.handle.clone())
        else {
            return true;
        };

        match handle.shutdown_if_empty().await {
            Ok(false) => return false,
            Ok(true) | Err(_) => {}
        }

        let entry = {
            let mut rooms = self.rooms.write().await;
            match rooms.get(room) {
                Some(entry) if entry.handle.actor_id() == handle.actor_id() => rooms.remove(room),
                _ => None,
            }
        };
        if let Some(entry) = entry {
            if let Err(e) = entry.task.await {
                warn!(%room, error = %e, "room task ended abnormally");
            }
            info!(%room, actor_id = handle.actor_id(), "room removed");
        }
        true
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    pub async fn room_names(&self) -> Vec<RoomName> {
        let mut names: Vec<_> = self.rooms.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Stops every room and waits for the actors to finish.
    pub async fn shutdown_all(&self) {
        let entries: Vec<_> = self.rooms.write().await.drain().collect();
        for (room, entry) in entries {
            let _ = entry.handle.shutdown().await;
            if let Err(e) = entry.task.await {
                warn!(%room, error = %e, "room task ended abnormally");
            }
        }
        info!("all rooms stopped");
    }
}
