//! Identity provider hook.
//!
//! Bingo Hall never stores passwords or issues logins. Whoever runs the
//! server hands it an [`Authenticator`] that turns the connection's
//! `token` query parameter into a [`Username`], or refuses it.

use std::collections::HashMap;

use bingohall_protocol::Username;
use tokio::sync::RwLock;

use crate::SessionError;

/// Validates a client's token and returns their identity.
///
/// # Example
///
/// ```rust
/// use bingohall_protocol::Username;
/// use bingohall_session::{Authenticator, SessionError};
///
/// /// Treats the token itself as the username. Development only.
/// struct TrustingAuthenticator;
///
/// impl Authenticator for TrustingAuthenticator {
///     async fn authenticate(&self, token: &str) -> Result<Username, SessionError> {
///         if token.is_empty() {
///             return Err(SessionError::AuthFailed("empty token".into()));
///         }
///         Ok(Username::new(token))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the given token and returns the user it belongs to.
    ///
    /// # Errors
    /// `SessionError::AuthFailed` when the token is unknown or expired.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Username, SessionError>> + Send;
}

/// An in-memory token → user table.
///
/// Useful for demos and tests; tokens can be issued while the server runs.
#[derive(Debug, Default)]
pub struct TokenTable {
    tokens: RwLock<HashMap<String, Username>>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(token, username)` pairs.
    pub fn from_pairs<I, T, U>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, U)>,
        T: Into<String>,
        U: Into<String>,
    {
        let tokens = pairs
            .into_iter()
            .map(|(t, u)| (t.into(), Username::new(u)))
            .collect();
        Self {
            tokens: RwLock::new(tokens),
        }
    }

    /// Issues (or re-points) a token.
    pub async fn insert(&self, token: impl Into<String>, user: Username) {
        self.tokens.write().await.insert(token.into(), user);
    }

    /// Revokes a token. Returns the user it belonged to.
    pub async fn revoke(&self, token: &str) -> Option<Username> {
        self.tokens.write().await.remove(token)
    }
}

impl Authenticator for TokenTable {
    async fn authenticate(&self, token: &str) -> Result<Username, SessionError> {
        self.tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| SessionError::AuthFailed("unknown token".into()))
    }
}
