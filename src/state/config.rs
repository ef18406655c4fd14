//! Per-session rules configuration.

use serde::{Deserialize, Serialize};

use super::deck::DECK_SIZE;
use super::error::ConfigError;

/// Default cards dealt per participant.
pub const DEFAULT_HAND_SIZE: usize = 7;

/// Default maximum participants per session.
pub const DEFAULT_MAX_PLAYERS: usize = 10;

/// Default cards drawn for a missed declaration.
pub const DEFAULT_DECLARATION_PENALTY: usize = 2;

/// What happens when the draw pile cannot satisfy a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionPolicy {
    /// Shuffle the discard history back into the draw pile.
    #[default]
    Reshuffle,
    /// Never recycle; draws yield what is left and a drawless draw is reported.
    Report,
}

/// Rules knobs for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub hand_size: usize,
    pub min_players: usize,
    pub max_players: usize,
    pub declaration_penalty: usize,
    pub exhaustion: ExhaustionPolicy,
    /// Reject wild/draw4 plays that do not name a real color.
    pub require_wild_color: bool,
    pub max_name_len: usize,
    /// Fixed RNG seed. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            hand_size: DEFAULT_HAND_SIZE,
            min_players: 2,
            max_players: DEFAULT_MAX_PLAYERS,
            declaration_penalty: DEFAULT_DECLARATION_PENALTY,
            exhaustion: ExhaustionPolicy::Reshuffle,
            require_wild_color: true,
            max_name_len: 24,
            seed: None,
        }
    }
}

impl RulesConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Copy for one session. A fixed seed is mixed with the session id so
    /// sessions opened from the same rules deal different games, while the
    /// same id always gets the same seed.
    pub fn for_session(&self, session_id: &str) -> Self {
        Self {
            seed: self.seed.map(|seed| seed ^ fnv1a(session_id.as_bytes())),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hand_size == 0 {
            return Err(ConfigError::Invalid("hand_size must be at least 1".into()));
        }
        if self.min_players == 0 || self.min_players > self.max_players {
            return Err(ConfigError::Invalid(format!(
                "min_players must be in 1..={}",
                self.max_players
            )));
        }
        // Every hand dealt plus the flipped top card must fit in one deck.
        if self.hand_size * self.max_players + 1 > DECK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "{} players x {} cards does not fit in a {}-card deck",
                self.max_players, self.hand_size, DECK_SIZE
            )));
        }
        if self.max_name_len == 0 {
            return Err(ConfigError::Invalid("max_name_len must be at least 1".into()));
        }
        Ok(())
    }
}

/// 64-bit FNV-1a. `DefaultHasher` output is not stable across Rust releases.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME))
}
