//! `BingoServer` builder and accept loop.
//!
//! This is the entry point for running a bingo server. It ties together
//! all the layers: transport → protocol → session → room.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bingohall_protocol::{Codec, JsonCodec};
use bingohall_room::{BingoStore, Ledger, RoomConfig, RoomRegistry};
use bingohall_session::{Authenticator, SessionConfig, SessionManager};
use bingohall_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::BingoError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<A, L, S, C>
where
    L: Ledger,
    S: BingoStore,
{
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: RoomRegistry<L, S>,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a bingo server.
///
/// # Example
///
/// ```rust,ignore
/// use bingohall::prelude::*;
///
/// let server = BingoServerBuilder::new()
///     .bind("0.0.0.0:8000")
///     .build(tokens, ledger, store)
///     .await?;
/// server.run().await
/// ```
pub struct BingoServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    room_config: RoomConfig,
    idle_timeout: Option<Duration>,
}

impl BingoServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            session_config: SessionConfig::default(),
            room_config: RoomConfig::default(),
            idle_timeout: None,
        }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Drops connections that neither sent anything (pings included) nor
    /// received a room event for `timeout`. Off by default.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Binds the listener and wires the server to its collaborators.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<A, L, S>(
        self,
        auth: A,
        ledger: Arc<L>,
        store: Arc<S>,
    ) -> Result<BingoServer<A, L, S, JsonCodec>, BingoError>
    where
        A: Authenticator,
        L: Ledger,
        S: BingoStore,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            rooms: RoomRegistry::new(ledger, store, self.room_config),
            auth,
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(BingoServer { transport, state })
    }
}

impl Default for BingoServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound bingo server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct BingoServer<A, L, S, C>
where
    L: Ledger,
    S: BingoStore,
{
    transport: WebSocketTransport,
    state: Arc<ServerState<A, L, S, C>>,
}

impl<A, L, S, C> BingoServer<A, L, S, C>
where
    A: Authenticator,
    L: Ledger,
    S: BingoStore,
    C: Codec,
{
    pub fn builder() -> BingoServerBuilder {
        BingoServerBuilder::new()
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Accepts connections until the process is terminated.
    pub async fn run(self) -> Result<(), BingoError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves, then stops every
    /// room and waits for the room actors to finish.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), BingoError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "bingo server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "accept failed"),
                },
                () = &mut shutdown => break,
            }
        }

        tracing::info!("shutting down");
        self.state.rooms.shutdown_all().await;
        Ok(())
    }
}
