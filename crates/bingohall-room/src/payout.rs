//! Pot and bonus arithmetic.

use bingohall_protocol::Amount;

use crate::{LedgerError, RoomConfig};

/// What a winner is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    /// `stake × players`.
    pub total_stake: Amount,
    /// Credited to the winner.
    pub bonus: Amount,
}

/// Computes the payout for a game won with `player_count` players.
///
/// Small games pay the whole pot. Larger games keep `rake_percent` for the
/// house and round the bonus down to whole currency units.
pub fn compute(
    stake: Amount,
    player_count: usize,
    config: &RoomConfig,
) -> Result<Payout, LedgerError> {
    let players = i64::try_from(player_count).map_err(|_| LedgerError::Overflow)?;
    let total_stake = stake.checked_mul(players).ok_or(LedgerError::Overflow)?;

    let bonus = if player_count <= config.full_pot_max_players {
        total_stake
    } else {
        let keep = 100 - i64::from(config.rake_percent.min(100));
        let cents = total_stake
            .cents()
            .checked_mul(keep)
            .ok_or(LedgerError::Overflow)?
            / 100;
        Amount::from_units(cents / 100)
    };

    Ok(Payout { total_stake, bonus })
}
