//! Connection sessions for Bingo Hall.
//!
//! 1. **Authentication**: turning a token into a user ([`Authenticator`])
//! 2. **Session tracking**: which connection is bound to which room and
//!    channel ([`SessionManager`])
//!
//! ```text
//! Room Layer (above)  ← receives (user, channel) subscriptions
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol / Transport (below)  ← Username, RoomName, ConnectionId
//! ```

mod auth;
mod error;
mod manager;
mod session;

pub use auth::{Authenticator, TokenTable};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig};
