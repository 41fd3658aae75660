//! Error types for the protocol layer.
//!
//! Each Bingo Hall crate defines its own error enum. A `ProtocolError`
//! always means the bytes or the values on the wire were wrong, never that
//! a room refused a perfectly well-formed request.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown `type` tag, missing
    /// fields, or a value that fails a newtype's range check.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A card number outside the catalog's `1..=100` range.
    #[error("card number must be between 1 and 100, got {0}")]
    InvalidCardNumber(i64),

    /// An amount that is not a non-negative decimal with at most two places.
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    /// The connection URL does not name a bingo channel.
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    /// The message is invalid at the protocol level.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
