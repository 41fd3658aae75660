//! Integration tests for the room actor and registry.
//!
//! Rooms run on tokio's paused clock: countdowns, draws and the settle
//! delay fire as soon as every task is idle, so whole games play out
//! instantly and in a deterministic order.

use std::sync::Arc;
use std::time::Duration;

use bingohall_protocol::{
    Amount, CardCell, CardNumber, ChannelKind, ClientCommand, GamePhase, RoomName, ServerEvent,
    Username,
};
use bingohall_room::{
    BingoStore, CardCatalog, ErrorKind, GameId, GameRecord, InMemoryLedger, InMemoryStore,
    Ledger, PlayerRecord, RoomConfig, RoomError, RoomHandle, RoomRecord, RoomRegistry,
    StoreError, pattern,
};
use bingohall_transport::ConnectionId;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

const STAKE: Amount = Amount::from_units(10);
const START: Amount = Amount::from_units(100);

fn hall() -> RoomName {
    RoomName::new("hall")
}

fn user(name: &str) -> Username {
    Username::new(name)
}

fn card(n: i64) -> CardNumber {
    CardNumber::new(n).unwrap()
}

fn quick_config() -> RoomConfig {
    RoomConfig {
        countdown_secs: 3,
        ..RoomConfig::default()
    }
}

type Registry = RoomRegistry<InMemoryLedger, InMemoryStore>;

async fn setup(config: RoomConfig) -> (Arc<InMemoryLedger>, Arc<InMemoryStore>, Registry) {
    let ledger = Arc::new(InMemoryLedger::with_balances(
        ["alice", "bob", "carol", "dave"].map(|name| (user(name), START)),
    ));
    let store = Arc::new(InMemoryStore::new());
    store.add_room(hall(), STAKE).await;
    let registry = RoomRegistry::new(Arc::clone(&ledger), Arc::clone(&store), config);
    (ledger, store, registry)
}

struct Client {
    conn: ConnectionId,
    events: mpsc::UnboundedReceiver<ServerEvent>,
}

async fn join(handle: &RoomHandle, id: u64, name: &str, channel: ChannelKind) -> Client {
    let (tx, events) = mpsc::unbounded_channel();
    let conn = ConnectionId::new(id);
    handle.join(conn, user(name), channel, tx).await.unwrap();
    Client { conn, events }
}

impl Client {
    async fn next(&mut self) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(600), self.events.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("room closed the event channel")
    }

    /// Every event up to and including the first one matching `pred`.
    async fn until(&mut self, pred: impl Fn(&ServerEvent) -> bool) -> Vec<ServerEvent> {
        let mut seen = Vec::new();
        loop {
            let event = self.next().await;
            let done = pred(&event);
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    /// Events already queued, without waiting.
    fn drain(&mut self) -> Vec<ServerEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }
}

fn is_started(event: &ServerEvent) -> bool {
    matches!(event, ServerEvent::GameStarted { .. })
}

fn is_reset(event: &ServerEvent) -> bool {
    matches!(event, ServerEvent::GameReset { .. })
}

fn select(card_id: CardNumber) -> ClientCommand {
    ClientCommand::SelectCard { card_id }
}

fn layout(n: CardNumber) -> Vec<CardCell> {
    CardCatalog::card(n).to_vec()
}

/// Two game-channel players, alice on card 1 and bob on card 2, with the
/// game running.
async fn running_game(registry: &Registry) -> (RoomHandle, Client, Client) {
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let mut alice = join(&handle, 1, "alice", ChannelKind::Game).await;
    handle.command(alice.conn, select(card(1))).await.unwrap();
    let mut bob = join(&handle, 2, "bob", ChannelKind::Game).await;
    handle.command(bob.conn, select(card(2))).await.unwrap();

    alice.until(is_started).await;
    bob.until(is_started).await;
    (handle, alice, bob)
}

// =========================================================================
// Joining and the countdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_join_sends_snapshot_first() {
    let (_, _, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let mut alice = join(&handle, 1, "alice", ChannelKind::Game).await;

    match alice.next().await {
        ServerEvent::GameState { game_state } => {
            assert_eq!(game_state.phase, GamePhase::Idle);
            assert_eq!(game_state.player_count, 1);
            assert_eq!(game_state.stake, STAKE);
            assert!(!game_state.game_started);
        }
        other => panic!("expected game_state, got {other:?}"),
    }
    assert!(matches!(
        alice.next().await,
        ServerEvent::PlayerCountUpdate { count: 1, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_joins_start_one_countdown() {
    let (_, _, registry) = setup(RoomConfig::default()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();

    let (mut alice, mut bob) = tokio::join!(
        join(&handle, 1, "alice", ChannelKind::Game),
        join(&handle, 2, "bob", ChannelKind::Game),
    );

    let events = alice.until(is_started).await;
    let ticks: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::CountdownUpdate { time_left, .. } => Some(*time_left),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, (1..=30).rev().collect::<Vec<_>>());
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::CountdownUpdate { time_left: 30, message } if message == "Game starting in 30 seconds..."
    )));

    // One draw loop: called_numbers grows by exactly one per draw.
    let mut lengths = Vec::new();
    while lengths.len() < 4 {
        if let ServerEvent::NumberCalled { called_numbers, number, display, .. } = bob.next().await {
            assert_eq!(called_numbers.last(), Some(&number));
            assert!(display.ends_with(&format!("-{number}")));
            lengths.push(called_numbers.len());
        }
    }
    assert_eq!(lengths, vec![1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn test_second_session_of_same_player_does_not_count() {
    let (_, _, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let _a1 = join(&handle, 1, "alice", ChannelKind::Game).await;
    let _a2 = join(&handle, 2, "alice", ChannelKind::Game).await;
    let _picker = join(&handle, 3, "bob", ChannelKind::CardSelection).await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.player_count, 1);
    assert_eq!(snapshot.phase, GamePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_connection_is_rejected() {
    let (_, _, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let _alice = join(&handle, 1, "alice", ChannelKind::Game).await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let err = handle
        .join(ConnectionId::new(1), user("alice"), ChannelKind::Game, tx)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::AlreadyInRoom(..)));
}

#[tokio::test(start_paused = true)]
async fn test_leaving_during_countdown_resets_once() {
    let (_, store, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let mut alice = join(&handle, 1, "alice", ChannelKind::Game).await;
    handle.command(alice.conn, select(card(4))).await.unwrap();
    let bob = join(&handle, 2, "bob", ChannelKind::Game).await;

    alice
        .until(|e| matches!(e, ServerEvent::CountdownUpdate { .. }))
        .await;
    assert!(!handle.leave(bob.conn).await.unwrap());

    let events = alice.drain();
    assert_eq!(events.iter().filter(|e| is_reset(e)).count(), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::GameReset { message } if message.contains("Not enough players")
    )));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(alice.drain().is_empty(), "countdown must not keep ticking");

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, GamePhase::Idle);
    assert_eq!(snapshot.selected_cards.len(), 1, "cards survive a countdown abort");
    assert!(store.games(&hall()).await.is_empty());
}

// =========================================================================
// Card selection
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_broadcasts_to_both_channels() {
    let (ledger, store, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let alice = join(&handle, 1, "alice", ChannelKind::CardSelection).await;
    let mut watcher = join(&handle, 2, "bob", ChannelKind::Game).await;
    watcher.drain();

    handle.command(alice.conn, select(card(12))).await.unwrap();

    assert_eq!(
        watcher.drain(),
        vec![ServerEvent::CardSelected {
            card_number: card(12),
            username: user("alice"),
        }]
    );
    assert_eq!(ledger.balance(&user("alice")).await.unwrap(), Amount::from_units(90));
    let record = store.player(&hall(), &user("alice")).await.unwrap().unwrap();
    assert_eq!(record.card_number, Some(card(12)));
}

#[tokio::test(start_paused = true)]
async fn test_taken_card_is_rejected_without_broadcast() {
    let (ledger, _, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let alice = join(&handle, 1, "alice", ChannelKind::CardSelection).await;
    let mut bob = join(&handle, 2, "bob", ChannelKind::CardSelection).await;

    handle.command(alice.conn, select(card(5))).await.unwrap();
    bob.drain();

    let err = handle.command(bob.conn, select(card(5))).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.to_string(), "Card 5 is already taken.");
    assert!(bob.drain().is_empty());
    assert_eq!(ledger.balance(&user("bob")).await.unwrap(), START);
}

#[tokio::test(start_paused = true)]
async fn test_switching_cards_releases_first_and_charges_once() {
    let (ledger, _, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let mut alice = join(&handle, 1, "alice", ChannelKind::CardSelection).await;

    handle.command(alice.conn, select(card(5))).await.unwrap();
    alice.drain();
    handle.command(alice.conn, select(card(7))).await.unwrap();

    let events: Vec<_> = alice
        .drain()
        .into_iter()
        .filter(|e| !matches!(e, ServerEvent::BalanceUpdate { .. }))
        .collect();
    assert_eq!(
        events,
        vec![
            ServerEvent::CardDeselected {
                card_number: card(5),
                username: user("alice"),
            },
            ServerEvent::CardSelected {
                card_number: card(7),
                username: user("alice"),
            },
        ]
    );
    assert_eq!(ledger.balance(&user("alice")).await.unwrap(), Amount::from_units(90));

    // Re-selecting the held card changes nothing.
    handle.command(alice.conn, select(card(7))).await.unwrap();
    assert!(alice.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deselect_refunds_stake() {
    let (ledger, store, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let alice = join(&handle, 1, "alice", ChannelKind::CardSelection).await;

    handle.command(alice.conn, select(card(9))).await.unwrap();
    handle
        .command(alice.conn, ClientCommand::DeselectCard { card_id: card(9) })
        .await
        .unwrap();

    assert_eq!(ledger.balance(&user("alice")).await.unwrap(), START);
    let record = store.player(&hall(), &user("alice")).await.unwrap().unwrap();
    assert_eq!(record.card_number, None);

    let err = handle
        .command(alice.conn, ClientCommand::DeselectCard { card_id: card(9) })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test(start_paused = true)]
async fn test_insufficient_balance() {
    let (ledger, _, registry) = setup(quick_config()).await;
    ledger.set_balance(user("erin"), Amount::from_units(5)).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let erin = join(&handle, 1, "erin", ChannelKind::CardSelection).await;

    let err = handle.command(erin.conn, select(card(3))).await.unwrap_err();
    assert!(matches!(err, RoomError::InsufficientFunds { stake } if stake == STAKE));
    assert_eq!(err.to_string(), "Insufficient balance");
    assert!(handle.snapshot().await.unwrap().selected_cards.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_leaving_game_channel_releases_card() {
    let (ledger, store, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let alice = join(&handle, 1, "alice", ChannelKind::Game).await;
    let mut picker = join(&handle, 2, "bob", ChannelKind::CardSelection).await;
    handle.command(alice.conn, select(card(30))).await.unwrap();
    picker.drain();

    handle.leave(alice.conn).await.unwrap();

    assert_eq!(
        picker.drain(),
        vec![ServerEvent::CardDeselected {
            card_number: card(30),
            username: user("alice"),
        }]
    );
    assert_eq!(ledger.balance(&user("alice")).await.unwrap(), START);
    let record = store.player(&hall(), &user("alice")).await.unwrap().unwrap();
    assert_eq!(record.card_number, None);
}

#[tokio::test(start_paused = true)]
async fn test_leaving_card_selection_keeps_card() {
    let (_, _, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let alice = join(&handle, 1, "alice", ChannelKind::CardSelection).await;
    handle.command(alice.conn, select(card(30))).await.unwrap();

    handle.leave(alice.conn).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.selected_cards.len(), 1);
    assert_eq!(snapshot.selected_cards[0].username, user("alice"));
}

// =========================================================================
// Drawing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_selection_is_locked_while_drawing() {
    let (_, store, registry) = setup(quick_config()).await;
    let (handle, alice, _bob) = running_game(&registry).await;

    let err = handle.command(alice.conn, select(card(50))).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Game has already started. No more card selections allowed."
    );
    assert_eq!(store.games(&hall()).await.len(), 1);

    let mut late = join(&handle, 9, "carol", ChannelKind::CardSelection).await;
    late.until(|e| matches!(
        e,
        ServerEvent::GameStarted { message } if message == "Game has already started. You cannot join now."
    ))
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_reset_refused_while_drawing() {
    let (_, _, registry) = setup(quick_config()).await;
    let (handle, alice, _bob) = running_game(&registry).await;
    let err = handle
        .command(alice.conn, ClientCommand::ResetGame)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(handle.snapshot().await.unwrap().phase, GamePhase::Drawing);
}

fn reset_message(event: &ServerEvent) -> Option<&str> {
    match event {
        ServerEvent::GameReset { message } => Some(message),
        _ => None,
    }
}

fn countdown_ticks(events: &[ServerEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::CountdownUpdate { time_left, .. } => Some(*time_left),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_reset_during_countdown_restarts_it_once() {
    let (ledger, store, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let mut alice = join(&handle, 1, "alice", ChannelKind::Game).await;
    handle.command(alice.conn, select(card(1))).await.unwrap();
    let _bob = join(&handle, 2, "bob", ChannelKind::Game).await;
    let mut picker = join(&handle, 3, "carol", ChannelKind::CardSelection).await;
    alice
        .until(|e| matches!(e, ServerEvent::CountdownUpdate { .. }))
        .await;
    picker.drain();

    handle.command(alice.conn, ClientCommand::ResetGame).await.unwrap();

    let picked: Vec<_> = picker.drain();
    let resets: Vec<_> = picked.iter().filter_map(reset_message).collect();
    assert_eq!(resets, ["Game reset: All cards are now available for selection."]);

    // Persisted state is untouched: no game row, alice keeps card 1 and her stake.
    assert!(store.games(&hall()).await.is_empty());
    let players = store.players(&hall()).await.unwrap();
    let alice_row = players.iter().find(|p| p.user == user("alice")).unwrap();
    assert_eq!(alice_row.card_number, Some(card(1)));
    assert_eq!(ledger.balance(&user("alice")).await.unwrap(), Amount::from_units(90));

    // Exactly one fresh countdown follows, then one game.
    let events = alice.until(is_started).await;
    let resets: Vec<_> = events.iter().filter_map(reset_message).collect();
    assert_eq!(resets, ["Game has been reset. Waiting for players..."]);
    let after_reset = events.iter().position(is_reset).unwrap();
    assert_eq!(countdown_ticks(&events[after_reset..]), vec![3, 2, 1]);
    assert_eq!(store.games(&hall()).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reset_after_win_keeps_history_and_cancels_settle() {
    let (_, store, registry) = setup(quick_config()).await;
    let (handle, mut alice, mut bob) = running_game(&registry).await;
    let mut picker = join(&handle, 7, "carol", ChannelKind::CardSelection).await;
    let my_card = layout(card(1));

    loop {
        if let ServerEvent::NumberCalled { called_numbers, .. } = alice.next().await {
            if pattern::check(&my_card, &called_numbers).is_some() {
                break;
            }
        }
    }
    handle
        .command(alice.conn, declare("alice", card(1)))
        .await
        .unwrap();
    bob.until(|e| matches!(e, ServerEvent::GameEnded { .. })).await;
    assert_eq!(handle.snapshot().await.unwrap().phase, GamePhase::Ended);
    alice.drain();
    picker.drain();

    handle.command(bob.conn, ClientCommand::ResetGame).await.unwrap();

    let resets: Vec<_> = picker.drain();
    let resets: Vec<_> = resets.iter().filter_map(reset_message).collect();
    assert_eq!(resets, ["Game reset: All cards are now available for selection."]);

    let games = store.games(&hall()).await;
    assert_eq!(games.len(), 1);
    assert!(!games[0].is_active);
    assert_eq!(games[0].winner, Some(user("alice")));

    // The settle timer was cancelled: no second reset before the next game.
    let events = alice.until(is_started).await;
    let resets: Vec<_> = events.iter().filter_map(reset_message).collect();
    assert_eq!(resets, ["Game has been reset. Waiting for players..."]);
    assert_eq!(countdown_ticks(&events), vec![3, 2, 1]);
    assert_eq!(store.games(&hall()).await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_called_numbers_are_persisted() {
    let (_, store, registry) = setup(quick_config()).await;
    let (_handle, mut alice, _bob) = running_game(&registry).await;

    let mut last = Vec::new();
    for _ in 0..5 {
        if let ServerEvent::NumberCalled { called_numbers, .. } = alice
            .until(|e| matches!(e, ServerEvent::NumberCalled { .. }))
            .await
            .pop()
            .unwrap()
        {
            last = called_numbers;
        }
    }
    let game: GameRecord = store.active_game(&hall()).await.unwrap().unwrap();
    assert_eq!(game.called_numbers, last);
    assert_eq!(last.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_below_minimum_stops_drawing() {
    let (ledger, store, registry) = setup(quick_config()).await;
    let (handle, mut alice, bob) = running_game(&registry).await;
    alice
        .until(|e| matches!(e, ServerEvent::NumberCalled { .. }))
        .await;

    handle.leave(bob.conn).await.unwrap();

    let events = alice.drain();
    assert_eq!(events.iter().filter(|e| is_reset(e)).count(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(
        !alice
            .drain()
            .iter()
            .any(|e| matches!(e, ServerEvent::NumberCalled { .. })),
        "no draw after the abort"
    );

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, GamePhase::Idle);
    assert!(snapshot.selected_cards.is_empty());
    assert!(store.active_game(&hall()).await.unwrap().is_none());
    assert_eq!(ledger.balance(&user("alice")).await.unwrap(), START);
    assert_eq!(ledger.balance(&user("bob")).await.unwrap(), START);
}

// =========================================================================
// Declaring
// =========================================================================

fn declare(name: &str, n: CardNumber) -> ClientCommand {
    ClientCommand::DeclareBingo {
        username: user(name),
        card_numbers: layout(n),
        card_numbers_claimed_called: vec![],
    }
}

#[tokio::test(start_paused = true)]
async fn test_false_declaration_is_private() {
    let (ledger, _, registry) = setup(quick_config()).await;
    let (handle, mut alice, mut bob) = running_game(&registry).await;
    bob.drain();

    let err = handle
        .command(alice.conn, declare("alice", card(1)))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid BINGO! No winning pattern found.");
    assert!(bob.drain().is_empty());
    assert!(alice.drain().is_empty());
    assert_eq!(handle.snapshot().await.unwrap().phase, GamePhase::Drawing);
    assert_eq!(ledger.balance(&user("alice")).await.unwrap(), Amount::from_units(90));
}

#[tokio::test(start_paused = true)]
async fn test_declaration_checks_identity_and_card() {
    let (_, _, registry) = setup(quick_config()).await;
    let (handle, alice, _bob) = running_game(&registry).await;

    let err = handle
        .command(alice.conn, declare("bob", card(2)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = handle
        .command(alice.conn, declare("alice", card(2)))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Submitted card does not match your card.");
}

#[tokio::test(start_paused = true)]
async fn test_pot_counts_every_game_channel_player() {
    let (ledger, _, registry) = setup(quick_config()).await;
    let (handle, mut alice, _bob) = running_game(&registry).await;
    // Carol watches without a card; she still counts toward the pot.
    let mut carol = join(&handle, 8, "carol", ChannelKind::Game).await;
    let my_card = layout(card(1));

    loop {
        if let ServerEvent::NumberCalled { called_numbers, .. } = alice.next().await {
            if pattern::check(&my_card, &called_numbers).is_some() {
                break;
            }
        }
    }
    handle
        .command(alice.conn, declare("alice", card(1)))
        .await
        .unwrap();

    let ended = carol
        .until(|e| matches!(e, ServerEvent::GameEnded { .. }))
        .await
        .pop()
        .unwrap();
    let ServerEvent::GameEnded { player_count, total_stake, bonus, .. } = ended else {
        unreachable!()
    };
    assert_eq!(player_count, 3);
    assert_eq!(total_stake, Amount::from_units(30));
    assert_eq!(bonus, Amount::from_units(30));
    // Only 20 was staked, yet alice is credited the full 30.
    assert_eq!(ledger.balance(&user("alice")).await.unwrap(), Amount::from_units(120));
    assert_eq!(ledger.balance(&user("carol")).await.unwrap(), START);
}

#[tokio::test(start_paused = true)]
async fn test_winning_game_pays_and_clears_cards() {
    let (ledger, store, registry) = setup(quick_config()).await;
    let (handle, mut alice, mut bob) = running_game(&registry).await;
    let mut picker = join(&handle, 7, "carol", ChannelKind::CardSelection).await;
    let my_card = layout(card(1));

    loop {
        if let ServerEvent::NumberCalled { called_numbers, .. } = alice.next().await {
            if pattern::check(&my_card, &called_numbers).is_some() {
                break;
            }
        }
    }
    handle
        .command(alice.conn, declare("alice", card(1)))
        .await
        .unwrap();

    let ended = bob
        .until(|e| matches!(e, ServerEvent::GameEnded { .. }))
        .await
        .pop()
        .unwrap();
    let ServerEvent::GameEnded {
        winner,
        card_number,
        bonus,
        total_stake,
        player_count,
        winning_pattern,
        message,
        called_numbers,
        ..
    } = ended
    else {
        unreachable!()
    };
    assert_eq!(winner, user("alice"));
    assert_eq!(card_number, card(1));
    assert_eq!(player_count, 2);
    assert_eq!(total_stake, Amount::from_units(20));
    assert_eq!(bonus, Amount::from_units(20));
    assert_eq!(message, "alice has won the game!");
    assert!(winning_pattern.indices.iter().all(|&i| match my_card[i] {
        CardCell::Free => true,
        CardCell::Number(n) => called_numbers.contains(&n),
    }));

    picker
        .until(|e| matches!(
            e,
            ServerEvent::GameReset { message } if message == "Game has ended. Cards are now available."
        ))
        .await;

    // 100 - 10 stake + 20 bonus
    assert_eq!(ledger.balance(&user("alice")).await.unwrap(), Amount::from_units(110));
    assert_eq!(ledger.balance(&user("bob")).await.unwrap(), Amount::from_units(90));
    assert!(alice.drain().iter().any(|e| matches!(
        e,
        ServerEvent::BalanceUpdate { balance } if *balance == Amount::from_units(110)
    )));

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, GamePhase::Ended);
    assert!(snapshot.selected_cards.is_empty());
    assert!(store
        .players(&hall())
        .await
        .unwrap()
        .iter()
        .all(|p| p.card_number.is_none()));
    let games = store.games(&hall()).await;
    assert_eq!(games.len(), 1);
    assert!(!games[0].is_active);
    assert_eq!(games[0].winner, Some(user("alice")));

    // Selection reopens immediately.
    handle.command(bob.conn, select(card(1))).await.unwrap();

    // After the settle delay the room waits again and, with two players,
    // starts the next countdown.
    let events = alice.until(|e| matches!(e, ServerEvent::CountdownUpdate { .. })).await;
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::GameReset { message } if message == "Game has been reset. Waiting for players..."
    )));
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_and_get_state() {
    let (_, _, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let mut alice = join(&handle, 1, "alice", ChannelKind::Game).await;
    alice.drain();

    handle
        .command(alice.conn, ClientCommand::Heartbeat { client_time: 42 })
        .await
        .unwrap();
    assert!(matches!(
        alice.next().await,
        ServerEvent::HeartbeatAck { client_time: 42, .. }
    ));

    handle.command(alice.conn, ClientCommand::GetState).await.unwrap();
    assert!(matches!(alice.next().await, ServerEvent::GameState { .. }));
}

// =========================================================================
// Registry
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_unknown_room_is_not_found() {
    let (_, _, registry) = setup(quick_config()).await;
    let err = registry
        .get_or_create(&RoomName::new("nowhere"))
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "room not found");
    assert!(registry.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_same_room_same_actor() {
    let (_, _, registry) = setup(quick_config()).await;
    let a = registry.get_or_create(&hall()).await.unwrap();
    let b = registry.get_or_create(&hall()).await.unwrap();
    assert_eq!(a.actor_id(), b.actor_id());
    assert_eq!(registry.len().await, 1);
    assert_eq!(registry.room_names().await, vec![hall()]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_room_is_removed() {
    let (_, _, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    let alice = join(&handle, 1, "alice", ChannelKind::Game).await;
    let bob = join(&handle, 2, "bob", ChannelKind::Game).await;

    assert!(!handle.leave(alice.conn).await.unwrap());
    assert!(!registry.remove_if_empty(&hall()).await);
    assert_eq!(registry.len().await, 1);

    assert!(handle.leave(bob.conn).await.unwrap());
    assert!(registry.remove_if_empty(&hall()).await);
    assert!(registry.is_empty().await);
    assert!(handle.is_closed());

    let next = registry.get_or_create(&hall()).await.unwrap();
    assert_ne!(next.actor_id(), handle.actor_id());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_all() {
    let (_, _, registry) = setup(quick_config()).await;
    let handle = registry.get_or_create(&hall()).await.unwrap();
    registry.shutdown_all().await;
    assert!(registry.is_empty().await);
    assert!(handle.is_closed());
    assert!(matches!(
        handle.snapshot().await,
        Err(RoomError::Unavailable(_))
    ));
}

// =========================================================================
// Panic recovery
// =========================================================================

/// Delegates to an [`InMemoryStore`] but panics when `"boom"` joins.
struct PanickyStore {
    inner: InMemoryStore,
}

impl BingoStore for PanickyStore {
    async fn room(&self, room: &RoomName) -> Result<RoomRecord, StoreError> {
        self.inner.room(room).await
    }

    async fn ensure_player(
        &self,
        room: &RoomName,
        user: &Username,
    ) -> Result<PlayerRecord, StoreError> {
        if user.as_str() == "boom" {
            panic!("store exploded");
        }
        self.inner.ensure_player(room, user).await
    }

    async fn player(
        &self,
        room: &RoomName,
        user: &Username,
    ) -> Result<Option<PlayerRecord>, StoreError> {
        self.inner.player(room, user).await
    }

    async fn players(&self, room: &RoomName) -> Result<Vec<PlayerRecord>, StoreError> {
        self.inner.players(room).await
    }

    async fn set_player_card(
        &self,
        room: &RoomName,
        user: &Username,
        card: Option<CardNumber>,
    ) -> Result<(), StoreError> {
        self.inner.set_player_card(room, user, card).await
    }

    async fn clear_cards(&self, room: &RoomName) -> Result<(), StoreError> {
        self.inner.clear_cards(room).await
    }

    async fn create_game(&self, room: &RoomName) -> Result<GameRecord, StoreError> {
        self.inner.create_game(room).await
    }

    async fn active_game(&self, room: &RoomName) -> Result<Option<GameRecord>, StoreError> {
        self.inner.active_game(room).await
    }

    async fn deactivate_games(&self, room: &RoomName) -> Result<usize, StoreError> {
        self.inner.deactivate_games(room).await
    }

    async fn append_called_number(&self, game: GameId, number: u8) -> Result<(), StoreError> {
        self.inner.append_called_number(game, number).await
    }

    async fn finish_game(&self, game: GameId, winner: Option<Username>) -> Result<(), StoreError> {
        self.inner.finish_game(game, winner).await
    }

    async fn game(&self, game: GameId) -> Result<Option<GameRecord>, StoreError> {
        self.inner.game(game).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_room_is_replaced_and_hydrated() {
    let inner = InMemoryStore::new();
    inner.add_room(hall(), STAKE).await;
    let store = Arc::new(PanickyStore { inner });
    let ledger = Arc::new(InMemoryLedger::with_balances([(user("alice"), START)]));
    let registry = RoomRegistry::new(ledger, store, quick_config());

    let handle = registry.get_or_create(&hall()).await.unwrap();
    let alice = join(&handle, 1, "alice", ChannelKind::CardSelection).await;
    handle.command(alice.conn, select(card(8))).await.unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    let err = handle
        .join(ConnectionId::new(2), user("boom"), ChannelKind::Game, tx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);

    for _ in 0..100 {
        if handle.is_closed() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(handle.is_closed());

    let fresh = registry.get_or_create(&hall()).await.unwrap();
    assert_ne!(fresh.actor_id(), handle.actor_id());
    let snapshot = fresh.snapshot().await.unwrap();
    assert_eq!(snapshot.selected_cards.len(), 1);
    assert_eq!(snapshot.selected_cards[0].card_number, card(8));
    assert_eq!(snapshot.selected_cards[0].username, user("alice"));
}
