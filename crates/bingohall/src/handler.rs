//! Per-connection gateway: route, auth, room subscription and relay.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Parse the request target → room and channel
//!   2. Authenticate the `token` query parameter → user
//!   3. Register the session, subscribe to the room
//!   4. Loop: relay client commands to the room, room events to the client

use std::sync::Arc;
use std::time::Duration;

use bingohall_protocol::{ClientCommand, Codec, Route, ServerEvent, Username};
use bingohall_room::{BingoStore, EventSender, Ledger, RoomError, RoomHandle};
use bingohall_session::{Authenticator, SessionError};
use bingohall_transport::{Connection, ConnectionId, WebSocketConnection};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::BingoError;
use crate::server::ServerState;

/// Attempts to reach a live room actor before giving up.
const JOIN_ATTEMPTS: usize = 3;

const KNOWN_COMMANDS: &[&str] = &[
    "select_card",
    "deselect_card",
    "declare_bingo",
    "get_state",
    "reset_game",
    "heartbeat",
];

/// Drop guard that removes the session when the handler exits.
///
/// `Drop` is synchronous, so the async lock is taken in a spawned task.
struct SessionGuard<A, L, S, C>
where
    A: Authenticator,
    L: Ledger,
    S: BingoStore,
    C: Codec,
{
    conn_id: ConnectionId,
    state: Arc<ServerState<A, L, S, C>>,
}

impl<A, L, S, C> Drop for SessionGuard<A, L, S, C>
where
    A: Authenticator,
    L: Ledger,
    S: BingoStore,
    C: Codec,
{
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let _ = state.sessions.lock().await.remove(conn_id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, L, S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, L, S, C>>,
) -> Result<(), BingoError>
where
    A: Authenticator,
    L: Ledger,
    S: BingoStore,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, path = conn.path(), "handling new connection");

    // --- Step 1: Route ---
    let route = match Route::parse(conn.path()) {
        Ok(route) => route,
        Err(e) => {
            reject(&conn, &state.codec, &e.to_string()).await;
            return Err(e.into());
        }
    };

    // --- Step 2: Identity ---
    let user = match authenticate(&state, route.token.as_deref()).await {
        Ok(user) => user,
        Err(e) => {
            reject(&conn, &state.codec, &e.to_string()).await;
            return Err(e.into());
        }
    };

    // --- Step 3: Session and room ---
    let created = state
        .sessions
        .lock()
        .await
        .create(conn_id, user.clone(), route.room.clone(), route.channel)
        .map(|session| session.session_id.clone());
    let session_id = match created {
        Ok(id) => id,
        Err(e) => {
            reject(&conn, &state.codec, &e.to_string()).await;
            return Err(e.into());
        }
    };
    let _guard = SessionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let mut room = match join_room(&state, &route, conn_id, &user, events_tx).await {
        Ok(room) => room,
        Err(e) => {
            reject(&conn, &state.codec, &e.to_string()).await;
            return Err(e.into());
        }
    };
    tracing::info!(
        %conn_id,
        %user,
        room = %route.room,
        channel = %route.channel,
        %session_id,
        "player connected"
    );

    // --- Step 4: Relay ---
    let mut last_seen = Instant::now();
    let result = loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, %user, "connection closed cleanly");
                        break Ok(());
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break Err(e.into());
                    }
                };
                last_seen = Instant::now();
                if let Err(e) = handle_frame(&conn, &state, &room, &data).await {
                    break Err(e);
                }
            }
            event = events.recv() => match event {
                Some(event) => {
                    if let Err(e) = send_event(&conn, &state.codec, &event).await {
                        break Err(e);
                    }
                    last_seen = Instant::now();
                }
                None => {
                    // The room actor stopped under us; subscribe to its successor.
                    tracing::warn!(%conn_id, room = %route.room, "room went away, rejoining");
                    let (tx, rx) = mpsc::unbounded_channel();
                    match join_room(&state, &route, conn_id, &user, tx).await {
                        Ok(handle) => {
                            room = handle;
                            events = rx;
                        }
                        Err(e) => {
                            let _ = send_event(&conn, &state.codec, &ServerEvent::error(e.to_string())).await;
                            break Err(e.into());
                        }
                    }
                }
            },
            () = idle_deadline(state.idle_timeout, last_seen) => {
                // Pings and pongs never surface from `recv`.
                let seen = last_seen.max(conn.last_activity());
                if seen > last_seen {
                    last_seen = seen;
                    continue;
                }
                tracing::info!(%conn_id, %user, "connection timed out");
                break Ok(());
            }
        }
    };

    // --- Cleanup ---
    match room.leave(conn_id).await {
        Ok(true) => {
            state.rooms.remove_if_empty(&route.room).await;
        }
        Ok(false) => {}
        Err(e) => tracing::debug!(%conn_id, error = %e, "leave failed"),
    }
    let _ = conn.close().await;

    // _guard drops here → session removal fires.
    result
}

/// Resolves once `timeout` has passed since `last_seen`; never without one.
async fn idle_deadline(timeout: Option<Duration>, last_seen: Instant) {
    match timeout {
        Some(timeout) => time::sleep_until(last_seen + timeout).await,
        None => std::future::pending().await,
    }
}

async fn authenticate<A, L, S, C>(
    state: &ServerState<A, L, S, C>,
    token: Option<&str>,
) -> Result<Username, SessionError>
where
    A: Authenticator,
    L: Ledger,
    S: BingoStore,
{
    let token = token.ok_or(SessionError::MissingToken)?;
    state.auth.authenticate(token).await
}

/// Subscribes to the route's room, retrying while an actor is being
/// replaced.
async fn join_room<A, L, S, C>(
    state: &ServerState<A, L, S, C>,
    route: &Route,
    conn_id: ConnectionId,
    user: &Username,
    events: EventSender,
) -> Result<RoomHandle, RoomError>
where
    A: Authenticator,
    L: Ledger,
    S: BingoStore,
{
    let mut last_err = RoomError::Unavailable(route.room.clone());
    for attempt in 1..=JOIN_ATTEMPTS {
        let handle = state.rooms.get_or_create(&route.room).await?;
        match handle
            .join(conn_id, user.clone(), route.channel, events.clone())
            .await
        {
            Ok(()) => return Ok(handle),
            Err(RoomError::Unavailable(room)) => {
                tracing::debug!(%conn_id, %room, attempt, "room unavailable, retrying");
                last_err = RoomError::Unavailable(room);
                tokio::task::yield_now().await;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err)
}

/// Decodes one client frame and acts on it.
async fn handle_frame<A, L, S, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, L, S, C>,
    room: &RoomHandle,
    data: &[u8],
) -> Result<(), BingoError>
where
    A: Authenticator,
    L: Ledger,
    S: BingoStore,
    C: Codec,
{
    let command: ClientCommand = match state.codec.decode(data) {
        Ok(command) => command,
        Err(e) => {
            let message = describe_bad_frame(&state.codec, data, &e.to_string());
            tracing::debug!(conn_id = %conn.id(), %message, "rejected frame");
            return send_event(conn, &state.codec, &ServerEvent::error(message)).await;
        }
    };

    match command {
        ClientCommand::Heartbeat { client_time } => {
            let ack = ServerEvent::HeartbeatAck {
                client_time,
                server_time: chrono::Utc::now().timestamp_millis(),
            };
            send_event(conn, &state.codec, &ack).await
        }
        command => match room.command(conn.id(), command).await {
            Ok(()) => Ok(()),
            Err(e) => {
                send_event(conn, &state.codec, &ServerEvent::error(e.to_string())).await
            }
        },
    }
}

#[derive(Deserialize)]
struct Tagged {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Names an unknown `type` tag; otherwise reports the decode failure.
fn describe_bad_frame(codec: &impl Codec, data: &[u8], error: &str) -> String {
    match codec.decode::<Tagged>(data) {
        Ok(Tagged { kind: Some(kind) }) if !KNOWN_COMMANDS.contains(&kind.as_str()) => {
            format!("Unknown message type: {kind}")
        }
        Ok(Tagged { kind: None }) => "Message has no type".to_string(),
        _ => format!("Invalid message: {error}"),
    }
}

async fn send_event(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    event: &ServerEvent,
) -> Result<(), BingoError> {
    let bytes = codec.encode(event)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends a final `error` event and closes the connection.
async fn reject(conn: &WebSocketConnection, codec: &impl Codec, message: &str) {
    tracing::info!(conn_id = %conn.id(), %message, "connection rejected");
    let _ = send_event(conn, codec, &ServerEvent::error(message)).await;
    let _ = conn.close().await;
}
