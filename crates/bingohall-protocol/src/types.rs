//! Core value types for Bingo Hall's wire format.
//!
//! Every type here travels on the wire inside a
//! [`ClientCommand`](crate::ClientCommand) or [`ServerEvent`](crate::ServerEvent).
//! Range checks live in constructors and in `Deserialize`, so a value that
//! made it past decoding is already valid.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The identity the identity provider vouched for.
///
/// `#[serde(transparent)]` keeps it a bare JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A room's unique name, as it appears in the connection URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// CardNumber
// ---------------------------------------------------------------------------

/// A catalog card number, always in `1..=100`.
///
/// Deserializes from a JSON number or a numeric string (`"42"`), since
/// browser forms hand card ids around as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardNumber(u8);

impl CardNumber {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;

    /// Validates and wraps a raw card number.
    pub fn new(n: i64) -> Result<Self, ProtocolError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&n) {
            Ok(Self(n as u8))
        } else {
            Err(ProtocolError::InvalidCardNumber(n))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position in the catalog.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Every valid card number in ascending order.
    pub fn all() -> impl Iterator<Item = CardNumber> {
        (Self::MIN..=Self::MAX).map(CardNumber)
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for CardNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for CardNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CardNumberVisitor;

        impl Visitor<'_> for CardNumberVisitor {
            type Value = CardNumber;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a card number between 1 and 100")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CardNumber, E> {
                CardNumber::new(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CardNumber, E> {
                let v = i64::try_from(v).unwrap_or(i64::MAX);
                CardNumber::new(v).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CardNumber, E> {
                let n: i64 = v
                    .trim()
                    .parse()
                    .map_err(|_| E::custom(format!("card number {v:?} is not an integer")))?;
                CardNumber::new(n).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(CardNumberVisitor)
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A money amount with two decimal places, stored as integer cents.
///
/// On the wire it is a decimal string (`"30.00"`), which is what balance
/// and payout fields have always looked like to clients. Deserialization
/// also accepts plain JSON numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn checked_mul(self, factor: i64) -> Option<Amount> {
        self.0.checked_mul(factor).map(Amount)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Amount {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidAmount(s.to_string());
        let trimmed = s.trim();
        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };
        if whole.is_empty()
            || frac.len() > 2
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .map(Amount)
            .ok_or_else(invalid)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl Visitor<'_> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal amount such as \"10.00\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                i64::try_from(v)
                    .ok()
                    .and_then(|v| v.checked_mul(100))
                    .map(Amount)
                    .ok_or_else(|| E::custom("amount out of range"))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                v.checked_mul(100)
                    .map(Amount)
                    .ok_or_else(|| E::custom("amount out of range"))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
                if !v.is_finite() {
                    return Err(E::custom("amount must be finite"));
                }
                Ok(Amount((v * 100.0).round() as i64))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

// ---------------------------------------------------------------------------
// BingoLetter
// ---------------------------------------------------------------------------

/// The column letter a called number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BingoLetter {
    B,
    I,
    N,
    G,
    O,
}

impl BingoLetter {
    /// Maps `1..=75` onto B/I/N/G/O in blocks of fifteen.
    pub fn for_number(number: u8) -> Option<Self> {
        match number {
            1..=15 => Some(Self::B),
            16..=30 => Some(Self::I),
            31..=45 => Some(Self::N),
            46..=60 => Some(Self::G),
            61..=75 => Some(Self::O),
            _ => None,
        }
    }

    /// How a caller announces the number, e.g. `"B-9"`.
    pub fn announce(self, number: u8) -> String {
        format!("{self}-{number}")
    }
}

impl fmt::Display for BingoLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::B => "B",
            Self::I => "I",
            Self::N => "N",
            Self::G => "G",
            Self::O => "O",
        };
        f.write_str(letter)
    }
}

// ---------------------------------------------------------------------------
// CardCell
// ---------------------------------------------------------------------------

/// One cell of a 5×5 card: a number or the free centre, written `"*"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardCell {
    Free,
    Number(u8),
}

/// A card in row-major order; index 12 is the free centre.
pub type CardLayout = [CardCell; 25];

impl CardCell {
    pub fn number(self) -> Option<u8> {
        match self {
            Self::Free => None,
            Self::Number(n) => Some(n),
        }
    }

    pub fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }
}

impl Serialize for CardCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Free => serializer.serialize_str("*"),
            Self::Number(n) => serializer.serialize_u8(*n),
        }
    }
}

impl<'de> Deserialize<'de> for CardCell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CardCellVisitor;

        impl Visitor<'_> for CardCellVisitor {
            type Value = CardCell;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number between 1 and 75 or \"*\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CardCell, E> {
                match u8::try_from(v) {
                    Ok(n @ 1..=75) => Ok(CardCell::Number(n)),
                    _ => Err(E::custom(format!("card cell {v} is out of range"))),
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CardCell, E> {
                match u64::try_from(v) {
                    Ok(v) => self.visit_u64(v),
                    Err(_) => Err(E::custom(format!("card cell {v} is out of range"))),
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CardCell, E> {
                if v == "*" {
                    return Ok(CardCell::Free);
                }
                let n: u64 = v
                    .parse()
                    .map_err(|_| E::custom(format!("card cell {v:?} is not a number")))?;
                self.visit_u64(n)
            }
        }

        deserializer.deserialize_any(CardCellVisitor)
    }
}

// ---------------------------------------------------------------------------
// ChannelKind / GamePhase
// ---------------------------------------------------------------------------

/// Which of a room's two channels a connection is subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Number calling and win/lose announcements.
    Game,
    /// Pre-game card picking.
    CardSelection,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Game => f.write_str("game"),
            Self::CardSelection => f.write_str("card-selection"),
        }
    }
}

/// Where a room's game lifecycle currently stands.
///
/// ```text
/// Idle → AwaitingCountdown → Countdown → Drawing → Ended → Idle | AwaitingCountdown
/// ```
///
/// `Idle` means fewer than two players. `AwaitingCountdown` is the short
/// window in which enough players are present but the countdown has not
/// yet been armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Idle,
    AwaitingCountdown,
    Countdown,
    Drawing,
    Ended,
}

impl GamePhase {
    /// Cards may be picked or released. Only a game in progress locks them.
    pub fn is_selection_open(self) -> bool {
        !matches!(self, Self::Drawing)
    }

    /// A timer-driven phase that aborts when players drop below the minimum.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Countdown | Self::Drawing)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::AwaitingCountdown => write!(f, "AwaitingCountdown"),
            Self::Countdown => write!(f, "Countdown"),
            Self::Drawing => write!(f, "Drawing"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
