use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use bingohall::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything the server reads from its environment.
///
/// | Variable                        | Default               |
/// |---------------------------------|-----------------------|
/// | `BINGOHALL_BIND`                | `0.0.0.0:8000`        |
/// | `BINGOHALL_IDLE_TIMEOUT_SECS`   | `0` (never)           |
/// | `BINGOHALL_ROOM_CONFIG`         | built-in room timings |
/// | `BINGOHALL_ROOMS`               | `main:10`             |
/// | `BINGOHALL_STARTING_BALANCE`    | `100`                 |
/// | `BINGOHALL_TOKENS`              | none                  |
///
/// `BINGOHALL_ROOM_CONFIG` is the path of a JSON file holding a
/// [`RoomConfig`]; missing fields keep their defaults. Rooms and tokens are
/// comma-separated `name:stake` and `token:user` pairs.
#[derive(Debug)]
struct ServerConfig {
    bind: String,
    idle_timeout: Option<Duration>,
    rooms: RoomConfig,
    seeded_rooms: Vec<(RoomName, Amount)>,
    starting_balance: Amount,
    tokens: Vec<(String, String)>,
}

impl ServerConfig {
    fn from_env() -> Result<Self, Box<dyn Error>> {
        let rooms = match std::env::var("BINGOHALL_ROOM_CONFIG") {
            Ok(path) => serde_json::from_str(&std::fs::read_to_string(&path)?)?,
            Err(_) => RoomConfig::default(),
        };

        Ok(Self {
            bind: read_string("BINGOHALL_BIND", "0.0.0.0:8000"),
            idle_timeout: match read_u64("BINGOHALL_IDLE_TIMEOUT_SECS", 0) {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            rooms,
            seeded_rooms: parse_rooms(&read_string("BINGOHALL_ROOMS", "main:10"))?,
            starting_balance: read_string("BINGOHALL_STARTING_BALANCE", "100").parse()?,
            tokens: parse_pairs(&read_string("BINGOHALL_TOKENS", ""))?,
        })
    }
}

fn read_string(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

fn read_u64(key: &str, fallback: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(fallback)
}

/// Splits `a:b,c:d` into pairs. Blank entries are skipped.
fn parse_pairs(raw: &str) -> Result<Vec<(String, String)>, Box<dyn Error>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((left, right)) if !left.is_empty() && !right.is_empty() => {
                Ok((left.to_string(), right.to_string()))
            }
            _ => Err(format!("expected key:value, got {entry:?}").into()),
        })
        .collect()
}

fn parse_rooms(raw: &str) -> Result<Vec<(RoomName, Amount)>, Box<dyn Error>> {
    parse_pairs(raw)?
        .into_iter()
        .map(|(name, stake)| Ok((RoomName::new(name), stake.parse::<Amount>()?)))
        .collect()
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(?config, "starting bingo hall");

    let store = Arc::new(InMemoryStore::new());
    for (room, stake) in &config.seeded_rooms {
        store.add_room(room.clone(), *stake).await;
    }

    // Every token holder starts with the same balance.
    let ledger = Arc::new(InMemoryLedger::with_balances(
        config
            .tokens
            .iter()
            .map(|(_, user)| (Username::new(user.as_str()), config.starting_balance)),
    ));
    if config.tokens.is_empty() {
        tracing::warn!("no BINGOHALL_TOKENS configured; every connection will be rejected");
    }
    let tokens = TokenTable::from_pairs(config.tokens.clone());

    let mut builder = BingoServerBuilder::new()
        .bind(&config.bind)
        .room_config(config.rooms);
    if let Some(timeout) = config.idle_timeout {
        builder = builder.idle_timeout(timeout);
    }
    let server = builder.build(tokens, ledger, store).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}
