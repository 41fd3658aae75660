//! Room actor: an isolated Tokio task that owns one bingo room.
//!
//! Every session of the room talks to the actor through a bounded mpsc
//! mailbox; the actor answers on oneshot reply channels and pushes
//! [`ServerEvent`]s to each subscriber's unbounded outbound channel. The
//! actor also owns the room's only timer, so countdown ticks, draws and
//! the post-game settle delay are serialized with player commands.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bingohall_protocol::{
    Amount, BingoLetter, CardCell, CardNumber, CardSelection, ChannelKind, ClientCommand,
    GamePhase, GameSnapshot, RoomName, ServerEvent, Username,
};
use bingohall_tick::{Beat, Pacer};
use bingohall_transport::ConnectionId;
use futures_util::FutureExt;
use rand::seq::SliceRandom;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::store::{GameId, RoomRecord};
use crate::{pattern, payout, BingoStore, CardCatalog, Ledger, RoomConfig, RoomError};

const NOT_SELECTABLE: &str = "Game has already started. No more card selections allowed.";
const INVALID_BINGO: &str = "Invalid BINGO! No winning pattern found.";
const RESET_GAME: &str = "Game has been reset. Waiting for players...";
const RESET_CARDS: &str = "Game reset: All cards are now available for selection.";
const RESET_NOT_ENOUGH: &str = "Game reset: Not enough players. Waiting for more players...";

/// Outbound events for one connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub(crate) enum RoomCommand {
    Join {
        conn: ConnectionId,
        user: Username,
        channel: ChannelKind,
        events: EventSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Replies `true` when no subscriber is left.
    Leave {
        conn: ConnectionId,
        reply: oneshot::Sender<bool>,
    },

    Client {
        conn: ConnectionId,
        command: ClientCommand,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Snapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },

    /// Stops the actor if nobody is subscribed. Replies whether it stopped.
    ShutdownIfEmpty {
        reply: oneshot::Sender<bool>,
    },

    Shutdown,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone. Every method maps a closed mailbox or a dropped reply
/// onto [`RoomError::Unavailable`], which is what a caller sees after the
/// actor stopped or panicked.
#[derive(Clone)]
pub struct RoomHandle {
    room: RoomName,
    actor_id: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room(&self) -> &RoomName {
        &self.room
    }

    /// Distinguishes successive actors of the same room.
    pub fn actor_id(&self) -> u64 {
        self.actor_id
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room.clone()))
    }

    /// Subscribes a connection. The room answers with a `game_state`
    /// snapshot on `events` before anything else.
    pub async fn join(
        &self,
        conn: ConnectionId,
        user: Username,
        channel: ChannelKind,
        events: EventSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            conn,
            user,
            channel,
            events,
            reply,
        })
        .await?
    }

    /// Unsubscribes a connection. Returns `true` when the room is now empty.
    pub async fn leave(&self, conn: ConnectionId) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Leave { conn, reply }).await
    }

    /// Runs one client command on behalf of `conn`.
    pub async fn command(
        &self,
        conn: ConnectionId,
        command: ClientCommand,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Client {
            conn,
            command,
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<GameSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    pub async fn shutdown_if_empty(&self) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::ShutdownIfEmpty { reply })
            .await
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room.clone()))
    }
}

// ---------------------------------------------------------------------------
// Actor state
// ---------------------------------------------------------------------------

struct Subscriber {
    user: Username,
    channel: ChannelKind,
    sender: EventSender,
}

#[derive(Debug, Clone, Copy)]
enum Audience {
    Game,
    CardSelection,
    Both,
}

impl Audience {
    fn includes(self, channel: ChannelKind) -> bool {
        match self {
            Self::Game => channel == ChannelKind::Game,
            Self::CardSelection => channel == ChannelKind::CardSelection,
            Self::Both => true,
        }
    }
}

struct ActiveGame {
    id: GameId,
    /// Shuffled 1..=75, drawn front to back.
    order: Vec<u8>,
    called: Vec<u8>,
}

impl ActiveGame {
    fn new(id: GameId) -> Self {
        let mut order: Vec<u8> = (1..=75).collect();
        order.shuffle(&mut rand::rng());
        Self {
            id,
            order,
            called: Vec::with_capacity(75),
        }
    }

    fn next_number(&mut self) -> Option<u8> {
        let number = *self.order.get(self.called.len())?;
        self.called.push(number);
        Some(number)
    }
}

struct RoomActor<L: Ledger, S: BingoStore> {
    room: RoomName,
    stake: Amount,
    config: RoomConfig,
    ledger: Arc<L>,
    store: Arc<S>,
    receiver: mpsc::Receiver<RoomCommand>,

    subscribers: HashMap<ConnectionId, Subscriber>,
    selections: BTreeMap<CardNumber, Username>,
    /// Players whose stake for the coming game has been debited.
    reserved: HashSet<Username>,

    phase: GamePhase,
    countdown_left: u32,
    game: Option<ActiveGame>,
    timer: Pacer,
}

/// Spawns a room actor and returns its handle and task.
///
/// A panic inside the actor is caught and logged here; the handle reports
/// the room as closed and the registry replaces it on the next join.
pub(crate) fn spawn_room<L: Ledger, S: BingoStore>(
    record: RoomRecord,
    config: RoomConfig,
    ledger: Arc<L>,
    store: Arc<S>,
    actor_id: u64,
) -> (RoomHandle, JoinHandle<()>) {
    let (sender, receiver) = mpsc::channel(config.mailbox_size.max(1));
    let room = record.name.clone();

    let actor = RoomActor {
        room: room.clone(),
        stake: record.stake,
        config,
        ledger,
        store,
        receiver,
        subscribers: HashMap::new(),
        selections: BTreeMap::new(),
        reserved: HashSet::new(),
        phase: GamePhase::Idle,
        countdown_left: 0,
        game: None,
        timer: Pacer::new("room"),
    };

    let task_room = room.clone();
    let task = tokio::spawn(async move {
        if let Err(panic) = AssertUnwindSafe(actor.run()).catch_unwind().await {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            error!(room = %task_room, actor_id, %reason, "room actor panicked");
        }
    });

    (
        RoomHandle {
            room,
            actor_id,
            sender,
        },
        task,
    )
}

impl<L: Ledger, S: BingoStore> RoomActor<L, S> {
    async fn run(mut self) {
        info!(room = %self.room, stake = %self.stake, "room actor started");
        self.hydrate().await;

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd).await {
                        break;
                    }
                }
                beat = self.timer.wait() => self.on_beat(beat).await,
            }
        }

        self.timer.stop();
        info!(room = %self.room, "room actor stopped");
    }

    /// Rebuilds selections from committed cards and retires any game a
    /// previous actor left active.
    async fn hydrate(&mut self) {
        match self.store.players(&self.room).await {
            Ok(players) => {
                for player in players {
                    if let Some(card) = player.card_number {
                        self.reserved.insert(player.user.clone());
                        self.selections.insert(card, player.user);
                    }
                }
                if !self.selections.is_empty() {
                    info!(room = %self.room, cards = self.selections.len(), "restored card selections");
                }
            }
            Err(e) => warn!(room = %self.room, error = %e, "could not restore card selections"),
        }
        match self.store.deactivate_games(&self.room).await {
            Ok(0) => {}
            Ok(n) => info!(room = %self.room, games = n, "deactivated stale games"),
            Err(e) => warn!(room = %self.room, error = %e, "could not deactivate stale games"),
        }
    }

    /// Returns `false` when the actor should stop.
    async fn handle(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                conn,
                user,
                channel,
                events,
                reply,
            } => {
                let result = self.handle_join(conn, user, channel, events).await;
                let _ = reply.send(result);
            }
            RoomCommand::Leave { conn, reply } => {
                self.handle_leave(conn).await;
                let _ = reply.send(self.subscribers.is_empty());
            }
            RoomCommand::Client {
                conn,
                command,
                reply,
            } => {
                let result = self.handle_command(conn, command).await;
                if let Err(e) = &result {
                    debug!(room = %self.room, %conn, error = %e, "command rejected");
                }
                let _ = reply.send(result);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RoomCommand::ShutdownIfEmpty { reply } => {
                let empty = self.subscribers.is_empty();
                let _ = reply.send(empty);
                if empty {
                    return false;
                }
            }
            RoomCommand::Shutdown => {
                info!(room = %self.room, "room shutting down");
                return false;
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    fn roster(&self) -> HashSet<&Username> {
        self.subscribers
            .values()
            .filter(|s| s.channel == ChannelKind::Game)
            .map(|s| &s.user)
            .collect()
    }

    fn player_count(&self) -> usize {
        self.roster().len()
    }

    fn in_roster(&self, user: &Username) -> bool {
        self.subscribers
            .values()
            .any(|s| s.channel == ChannelKind::Game && &s.user == user)
    }

    async fn handle_join(
        &mut self,
        conn: ConnectionId,
        user: Username,
        channel: ChannelKind,
        events: EventSender,
    ) -> Result<(), RoomError> {
        if self.subscribers.contains_key(&conn) {
            return Err(RoomError::AlreadyInRoom(conn, self.room.clone()));
        }
        if let Err(e) = self.store.ensure_player(&self.room, &user).await {
            warn!(room = %self.room, %user, error = %e, "could not record player");
        }

        let newcomer = channel == ChannelKind::Game && !self.in_roster(&user);
        self.subscribers.insert(
            conn,
            Subscriber {
                user: user.clone(),
                channel,
                sender: events,
            },
        );
        self.send_to(
            conn,
            ServerEvent::GameState {
                game_state: self.snapshot(),
            },
        );

        info!(
            room = %self.room,
            %conn,
            %user,
            %channel,
            players = self.player_count(),
            "player joined"
        );

        if newcomer {
            self.broadcast(
                Audience::Game,
                ServerEvent::PlayerCountUpdate {
                    count: self.player_count(),
                    message: format!("{user} joined the game."),
                },
            );
            self.maybe_arm_countdown();
        } else if channel == ChannelKind::CardSelection && self.phase == GamePhase::Drawing {
            self.send_to(
                conn,
                ServerEvent::GameStarted {
                    message: "Game has already started. You cannot join now.".into(),
                },
            );
        }
        Ok(())
    }

    async fn handle_leave(&mut self, conn: ConnectionId) {
        let Some(sub) = self.subscribers.remove(&conn) else {
            debug!(room = %self.room, %conn, "leave from unknown connection");
            return;
        };
        info!(room = %self.room, %conn, user = %sub.user, channel = %sub.channel, "player left");

        if sub.channel != ChannelKind::Game || self.in_roster(&sub.user) {
            return;
        }

        let count = self.player_count();
        self.broadcast(
            Audience::Game,
            ServerEvent::PlayerCountUpdate {
                count,
                message: format!(
                    "Player left: {} ({count}/{})",
                    sub.user, self.config.min_players
                ),
            },
        );

        if self.phase.is_selection_open() {
            if let Some(card) = self.card_of(&sub.user) {
                if let Err(e) = self.store.set_player_card(&self.room, &sub.user, None).await {
                    warn!(room = %self.room, user = %sub.user, error = %e, "could not clear card");
                }
                self.release(card, &sub.user).await;
            }
        }

        if count < self.config.min_players {
            self.abort_for_players().await;
        }
    }

    /// Players dropped below the minimum: stop whatever is running.
    async fn abort_for_players(&mut self) {
        match self.phase {
            GamePhase::AwaitingCountdown => {
                self.timer.stop();
                self.phase = GamePhase::Idle;
            }
            GamePhase::Countdown => {
                self.timer.stop();
                self.phase = GamePhase::Idle;
                self.countdown_left = 0;
                info!(room = %self.room, "countdown aborted, not enough players");
                self.broadcast(Audience::Both, reset_event(RESET_NOT_ENOUGH));
            }
            GamePhase::Drawing => {
                self.timer.stop();
                self.phase = GamePhase::Idle;
                if let Some(game) = self.game.take() {
                    if let Err(e) = self.store.finish_game(game.id, None).await {
                        warn!(room = %self.room, game = %game.id, error = %e, "could not close game");
                    }
                    info!(room = %self.room, game = %game.id, drawn = game.called.len(), "game aborted, not enough players");
                }
                for user in std::mem::take(&mut self.reserved) {
                    self.refund(&user).await;
                }
                self.clear_cards().await;
                self.broadcast(Audience::Both, reset_event(RESET_NOT_ENOUGH));
            }
            GamePhase::Idle | GamePhase::Ended => {}
        }
    }

    // -----------------------------------------------------------------------
    // Client commands
    // -----------------------------------------------------------------------

    async fn handle_command(
        &mut self,
        conn: ConnectionId,
        command: ClientCommand,
    ) -> Result<(), RoomError> {
        let user = self
            .subscribers
            .get(&conn)
            .map(|s| s.user.clone())
            .ok_or_else(|| RoomError::NotFound("You are not in this room.".into()))?;

        match command {
            ClientCommand::SelectCard { card_id } => self.select_card(user, card_id).await,
            ClientCommand::DeselectCard { card_id } => self.deselect_card(user, card_id).await,
            ClientCommand::DeclareBingo {
                username,
                card_numbers,
                card_numbers_claimed_called: _,
            } => self.declare_bingo(user, username, card_numbers).await,
            ClientCommand::GetState => {
                self.send_to(
                    conn,
                    ServerEvent::GameState {
                        game_state: self.snapshot(),
                    },
                );
                Ok(())
            }
            ClientCommand::ResetGame => self.reset_game(),
            ClientCommand::Heartbeat { client_time } => {
                self.send_to(
                    conn,
                    ServerEvent::HeartbeatAck {
                        client_time,
                        server_time: chrono::Utc::now().timestamp_millis(),
                    },
                );
                Ok(())
            }
        }
    }

    fn card_of(&self, user: &Username) -> Option<CardNumber> {
        self.selections
            .iter()
            .find(|(_, holder)| *holder == user)
            .map(|(card, _)| *card)
    }

    async fn select_card(&mut self, user: Username, card: CardNumber) -> Result<(), RoomError> {
        if !self.phase.is_selection_open() {
            return Err(RoomError::Conflict(NOT_SELECTABLE.into()));
        }
        match self.selections.get(&card) {
            Some(holder) if *holder == user => return Ok(()),
            Some(_) => {
                return Err(RoomError::Conflict(format!("Card {card} is already taken.")));
            }
            None => {}
        }

        let debited = if self.reserved.contains(&user) {
            false
        } else if self.ledger.debit(&user, self.stake).await? {
            true
        } else {
            return Err(RoomError::InsufficientFunds { stake: self.stake });
        };

        if let Err(e) = self.store.set_player_card(&self.room, &user, Some(card)).await {
            if debited {
                if let Err(refund) = self.ledger.credit(&user, self.stake).await {
                    error!(room = %self.room, %user, error = %refund, "could not return stake");
                }
            }
            return Err(e.into());
        }
        if debited {
            self.reserved.insert(user.clone());
            self.push_balance(&user).await;
        }

        if let Some(previous) = self.card_of(&user) {
            self.selections.remove(&previous);
            self.broadcast(
                Audience::Both,
                ServerEvent::CardDeselected {
                    card_number: previous,
                    username: user.clone(),
                },
            );
        }
        self.selections.insert(card, user.clone());
        info!(room = %self.room, %user, %card, "card selected");
        self.broadcast(
            Audience::Both,
            ServerEvent::CardSelected {
                card_number: card,
                username: user,
            },
        );
        Ok(())
    }

    async fn deselect_card(&mut self, user: Username, card: CardNumber) -> Result<(), RoomError> {
        if !self.phase.is_selection_open() {
            return Err(RoomError::Conflict(NOT_SELECTABLE.into()));
        }
        if self.selections.get(&card) != Some(&user) {
            return Err(RoomError::Validation(format!("You do not hold card {card}.")));
        }
        self.store.set_player_card(&self.room, &user, None).await?;
        self.release(card, &user).await;
        Ok(())
    }

    /// Drops `user`'s hold on `card` and returns their stake.
    async fn release(&mut self, card: CardNumber, user: &Username) {
        self.selections.remove(&card);
        info!(room = %self.room, %user, %card, "card released");
        self.broadcast(
            Audience::Both,
            ServerEvent::CardDeselected {
                card_number: card,
                username: user.clone(),
            },
        );
        if self.reserved.remove(user) {
            self.refund(user).await;
        }
    }

    async fn refund(&self, user: &Username) {
        match self.ledger.credit(user, self.stake).await {
            Ok(balance) => self.send_to_user(user, ServerEvent::BalanceUpdate { balance }),
            Err(e) => {
                error!(room = %self.room, %user, error = %e, "stake refund failed");
                self.send_to_user(user, ServerEvent::error(format!("Refund failed: {e}")));
            }
        }
    }

    async fn push_balance(&self, user: &Username) {
        match self.ledger.balance(user).await {
            Ok(balance) => self.send_to_user(user, ServerEvent::BalanceUpdate { balance }),
            Err(e) => warn!(room = %self.room, %user, error = %e, "could not read balance"),
        }
    }

    /// Forgets every card, committed and in memory.
    async fn clear_cards(&mut self) {
        if let Err(e) = self.store.clear_cards(&self.room).await {
            warn!(room = %self.room, error = %e, "could not clear committed cards");
        }
        for (card, user) in std::mem::take(&mut self.selections) {
            self.broadcast(
                Audience::Both,
                ServerEvent::CardDeselected {
                    card_number: card,
                    username: user,
                },
            );
        }
    }

    async fn declare_bingo(
        &mut self,
        user: Username,
        claimed_for: Username,
        card_numbers: Vec<CardCell>,
    ) -> Result<(), RoomError> {
        if self.phase != GamePhase::Drawing {
            return Err(RoomError::Conflict("No game is in progress.".into()));
        }
        if claimed_for != user {
            return Err(RoomError::Validation(
                "You can only declare BINGO for yourself.".into(),
            ));
        }

        let committed = match self.store.player(&self.room, &user).await {
            Ok(record) => record.and_then(|p| p.card_number),
            Err(e) => {
                warn!(room = %self.room, %user, error = %e, "falling back to in-memory card");
                self.card_of(&user)
            }
        };
        let card = committed
            .ok_or_else(|| RoomError::NotFound("You have no card in this game.".into()))?;
        if !CardCatalog::matches(card, &card_numbers) {
            return Err(RoomError::Validation(
                "Submitted card does not match your card.".into(),
            ));
        }

        let called = self.game.as_ref().map(|g| g.called.as_slice()).unwrap_or(&[]);
        let Some(pattern) = pattern::check(&card_numbers, called) else {
            return Err(RoomError::Validation(INVALID_BINGO.into()));
        };

        self.finish_with_winner(user, card, card_numbers, pattern).await;
        Ok(())
    }

    async fn finish_with_winner(
        &mut self,
        winner: Username,
        card: CardNumber,
        card_numbers: Vec<CardCell>,
        pattern: &'static pattern::Pattern,
    ) {
        self.timer.stop();
        self.phase = GamePhase::Ended;

        let player_count = self.player_count();
        let payout = match payout::compute(self.stake, player_count, &self.config) {
            Ok(payout) => payout,
            Err(e) => {
                error!(room = %self.room, error = %e, "payout computation failed");
                payout::Payout {
                    total_stake: Amount::ZERO,
                    bonus: Amount::ZERO,
                }
            }
        };
        let (game_id, called_numbers) = match &self.game {
            Some(game) => (Some(game.id), game.called.clone()),
            None => (None, Vec::new()),
        };
        info!(
            room = %self.room,
            %winner,
            %card,
            pattern = pattern.name,
            players = player_count,
            bonus = %payout.bonus,
            drawn = called_numbers.len(),
            "game won"
        );

        if let Some(id) = game_id {
            if let Err(e) = self.store.finish_game(id, Some(winner.clone())).await {
                warn!(room = %self.room, game = %id, error = %e, "could not record winner");
            }
        }

        match self.ledger.credit(&winner, payout.bonus).await {
            Ok(balance) => self.send_to_user(&winner, ServerEvent::BalanceUpdate { balance }),
            Err(e) => {
                error!(room = %self.room, %winner, error = %e, "payout credit failed");
                self.send_to_user(&winner, ServerEvent::error(format!("Payout failed: {e}")));
            }
        }

        self.broadcast(
            Audience::Game,
            ServerEvent::GameEnded {
                winner: winner.clone(),
                card_number: card,
                card_numbers,
                called_numbers,
                bonus: payout.bonus,
                total_stake: payout.total_stake,
                player_count,
                winning_pattern: pattern.to_wire(),
                message: format!("{winner} has won the game!"),
            },
        );
        self.broadcast(
            Audience::CardSelection,
            reset_event("Game has ended. Cards are now available."),
        );

        self.reserved.clear();
        self.clear_cards().await;
        self.timer.start_once(self.config.settle_delay());
    }

    fn reset_game(&mut self) -> Result<(), RoomError> {
        if self.phase == GamePhase::Drawing {
            return Err(RoomError::Conflict(
                "A game is in progress and cannot be reset.".into(),
            ));
        }
        info!(room = %self.room, phase = %self.phase, "room reset requested");
        self.timer.stop();
        self.back_to_waiting();
        Ok(())
    }

    /// Clears round state, tells both channels, and re-arms if possible.
    fn back_to_waiting(&mut self) {
        self.game = None;
        self.countdown_left = 0;
        self.phase = GamePhase::Idle;
        self.broadcast(Audience::Game, reset_event(RESET_GAME));
        self.broadcast(Audience::CardSelection, reset_event(RESET_CARDS));
        self.maybe_arm_countdown();
    }

    // -----------------------------------------------------------------------
    // Timer
    // -----------------------------------------------------------------------

    /// Arms exactly one countdown once enough players are present.
    fn maybe_arm_countdown(&mut self) {
        if self.phase != GamePhase::Idle || self.player_count() < self.config.min_players {
            return;
        }
        self.phase = GamePhase::AwaitingCountdown;
        self.timer.start_once(self.config.countdown_arm_delay());
        debug!(room = %self.room, "countdown armed");
    }

    async fn on_beat(&mut self, beat: Beat) {
        match self.phase {
            GamePhase::AwaitingCountdown => self.begin_countdown(),
            GamePhase::Countdown => {
                let elapsed = u32::try_from(beat.skipped + 1).unwrap_or(u32::MAX);
                self.countdown_left = self.countdown_left.saturating_sub(elapsed);
                if self.countdown_left == 0 {
                    self.start_game().await;
                } else {
                    self.announce_countdown();
                }
            }
            GamePhase::Drawing => self.draw().await,
            GamePhase::Ended => {
                info!(room = %self.room, "settle delay over");
                self.back_to_waiting();
            }
            GamePhase::Idle => self.timer.stop(),
        }
    }

    fn begin_countdown(&mut self) {
        if self.player_count() < self.config.min_players {
            self.timer.stop();
            self.phase = GamePhase::Idle;
            return;
        }
        self.phase = GamePhase::Countdown;
        self.countdown_left = self.config.countdown_secs;
        info!(room = %self.room, secs = self.countdown_left, players = self.player_count(), "countdown started");
        self.announce_countdown();
        self.timer
            .start_periodic(Duration::from_secs(1), Duration::from_secs(1));
    }

    fn announce_countdown(&self) {
        self.broadcast(
            Audience::Both,
            ServerEvent::CountdownUpdate {
                time_left: self.countdown_left,
                message: format!("Game starting in {} seconds...", self.countdown_left),
            },
        );
    }

    async fn start_game(&mut self) {
        self.timer.stop();
        if self.player_count() < self.config.min_players {
            self.phase = GamePhase::Idle;
            return;
        }

        let record = match self.store.create_game(&self.room).await {
            Ok(record) => record,
            Err(e) => {
                warn!(room = %self.room, error = %e, "could not create game, retrying countdown");
                self.broadcast(
                    Audience::Game,
                    ServerEvent::error("Could not start the game. Retrying shortly."),
                );
                self.phase = GamePhase::AwaitingCountdown;
                self.timer
                    .start_once(self.config.countdown_arm_delay().max(Duration::from_secs(1)));
                return;
            }
        };

        match self.store.players(&self.room).await {
            Ok(players) => {
                self.selections = players
                    .into_iter()
                    .filter_map(|p| p.card_number.map(|card| (card, p.user)))
                    .collect();
            }
            Err(e) => warn!(room = %self.room, error = %e, "could not reconcile cards, keeping memory"),
        }

        self.game = Some(ActiveGame::new(record.id));
        self.phase = GamePhase::Drawing;
        self.countdown_left = 0;
        info!(
            room = %self.room,
            game = %record.id,
            players = self.player_count(),
            cards = self.selections.len(),
            "game started"
        );

        self.broadcast(
            Audience::Game,
            ServerEvent::GameStarted {
                message: "Game started! No more players can join.".into(),
            },
        );
        self.broadcast(
            Audience::CardSelection,
            ServerEvent::GameStarted {
                message: "Game started! Cards are no longer selectable.".into(),
            },
        );
        self.timer
            .start_periodic(self.config.draw_interval(), self.config.first_draw_delay());
    }

    async fn draw(&mut self) {
        let Some(game) = self.game.as_mut() else {
            self.timer.stop();
            return;
        };
        let Some(number) = game.next_number() else {
            info!(room = %self.room, game = %game.id, "all numbers drawn");
            self.timer.stop();
            return;
        };
        let id = game.id;
        let called_numbers = game.called.clone();

        if let Err(e) = self.store.append_called_number(id, number).await {
            warn!(room = %self.room, game = %id, number, error = %e, "could not persist called number");
        }

        let Some(letter) = BingoLetter::for_number(number) else {
            return;
        };
        debug!(room = %self.room, game = %id, number, "number called");
        self.broadcast(
            Audience::Game,
            ServerEvent::NumberCalled {
                number,
                display: letter.announce(number),
                letter,
                called_numbers,
            },
        );
    }

    // -----------------------------------------------------------------------
    // Fan-out
    // -----------------------------------------------------------------------

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            game_started: self.phase == GamePhase::Drawing,
            countdown: (self.phase == GamePhase::Countdown).then_some(self.countdown_left),
            player_count: self.player_count(),
            called_numbers: self
                .game
                .as_ref()
                .map(|g| g.called.clone())
                .unwrap_or_default(),
            selected_cards: self
                .selections
                .iter()
                .map(|(card, user)| CardSelection {
                    card_number: *card,
                    username: user.clone(),
                })
                .collect(),
            stake: self.stake,
        }
    }

    /// Delivers to every subscriber in `audience`. A closed receiver means
    /// the connection is going away; its leave follows.
    fn broadcast(&self, audience: Audience, event: ServerEvent) {
        for sub in self.subscribers.values() {
            if audience.includes(sub.channel) {
                let _ = sub.sender.send(event.clone());
            }
        }
    }

    fn send_to(&self, conn: ConnectionId, event: ServerEvent) {
        if let Some(sub) = self.subscribers.get(&conn) {
            let _ = sub.sender.send(event);
        }
    }

    fn send_to_user(&self, user: &Username, event: ServerEvent) {
        for sub in self.subscribers.values().filter(|s| &s.user == user) {
            let _ = sub.sender.send(event.clone());
        }
    }
}

fn reset_event(message: &str) -> ServerEvent {
    ServerEvent::GameReset {
        message: message.to_owned(),
    }
}
