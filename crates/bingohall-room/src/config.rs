//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables shared by every room a registry spawns.
///
/// `#[serde(default)]` lets a config file override only the fields it
/// names; everything else falls back to [`RoomConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Players required on the game channel to run a countdown and a game.
    pub min_players: usize,

    /// Countdown length; one `countdown_update` per second.
    pub countdown_secs: u32,

    /// Delay between reaching `min_players` and the countdown's first update.
    pub countdown_arm_delay_ms: u64,

    /// Pause between `game_started` and the first number.
    pub first_draw_delay_ms: u64,

    /// Pause between consecutive numbers.
    pub draw_interval_ms: u64,

    /// How long the result stays on screen before the room resets.
    pub settle_delay_ms: u64,

    /// Games with at most this many players pay the whole pot.
    pub full_pot_max_players: usize,

    /// House share of larger pots, in percent.
    pub rake_percent: u8,

    /// Room actor mailbox capacity.
    pub mailbox_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            countdown_secs: 30,
            countdown_arm_delay_ms: 0,
            first_draw_delay_ms: 1_000,
            draw_interval_ms: 3_000,
            settle_delay_ms: 10_000,
            full_pot_max_players: 3,
            rake_percent: 20,
            mailbox_size: 64,
        }
    }
}

impl RoomConfig {
    pub fn countdown_arm_delay(&self) -> Duration {
        Duration::from_millis(self.countdown_arm_delay_ms)
    }

    pub fn first_draw_delay(&self) -> Duration {
        Duration::from_millis(self.first_draw_delay_ms)
    }

    pub fn draw_interval(&self) -> Duration {
        Duration::from_millis(self.draw_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Clamps values that would stall or break a room.
    pub fn validated(mut self) -> Self {
        if self.min_players < 2 {
            tracing::warn!(min_players = self.min_players, "min_players below 2, clamping");
            self.min_players = 2;
        }
        if self.countdown_secs == 0 {
            self.countdown_secs = 1;
        }
        if self.draw_interval_ms == 0 {
            tracing::warn!("draw_interval_ms is 0, using 1ms");
            self.draw_interval_ms = 1;
        }
        if self.rake_percent > 100 {
            self.rake_percent = 100;
        }
        self.mailbox_size = self.mailbox_size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.min_players, 2);
        assert_eq!(config.countdown_secs, 30);
        assert_eq!(config.draw_interval(), Duration::from_secs(3));
        assert_eq!(config.first_draw_delay(), Duration::from_secs(1));
        assert_eq!(config.settle_delay(), Duration::from_secs(10));
        assert_eq!(config.full_pot_max_players, 3);
        assert_eq!(config.rake_percent, 20);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: RoomConfig =
            serde_json::from_str(r#"{"countdown_secs": 5, "draw_interval_ms": 500}"#).unwrap();
        assert_eq!(config.countdown_secs, 5);
        assert_eq!(config.draw_interval(), Duration::from_millis(500));
        assert_eq!(config.min_players, 2);
        assert_eq!(config.settle_delay_ms, 10_000);
    }

    #[test]
    fn test_validated_clamps() {
        let config = RoomConfig {
            min_players: 0,
            countdown_secs: 0,
            draw_interval_ms: 0,
            rake_percent: 150,
            mailbox_size: 0,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.min_players, 2);
        assert_eq!(config.countdown_secs, 1);
        assert_eq!(config.draw_interval_ms, 1);
        assert_eq!(config.rake_percent, 100);
        assert_eq!(config.mailbox_size, 1);
    }
}
