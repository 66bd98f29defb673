//! Game setup options.

use crate::game::GameError;
use crate::water::MAX_STARTING_LEVEL;
use serde::{Deserialize, Serialize};

/// Fewest adventurers in a game
pub const MIN_PLAYERS: u8 = 2;

/// Most adventurers in a game
pub const MAX_PLAYERS: u8 = 4;

/// Options chosen when a game is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Starting water level index (0 = novice .. 3 = legendary)
    pub difficulty: u8,
    /// Number of adventurers (2-4)
    pub player_count: u8,
    /// Seed for every shuffle in the game. Random when absent.
    pub seed: Option<u64>,
}

impl GameConfig {
    pub fn new(difficulty: u8, player_count: u8) -> Self {
        Self {
            difficulty,
            player_count,
            seed: None,
        }
    }

    /// Use a fixed seed so the whole game is reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let config: GameConfig = serde_json::from_str(json)
            .map_err(|e| GameError::InitializationFailure(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the options are in range
    pub fn validate(&self) -> Result<(), GameError> {
        if self.difficulty > MAX_STARTING_LEVEL {
            return Err(GameError::InitializationFailure(format!(
                "difficulty must be 0-{}, got {}",
                MAX_STARTING_LEVEL, self.difficulty
            )));
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.player_count) {
            return Err(GameError::InitializationFailure(format!(
                "player count must be {}-{}, got {}",
                MIN_PLAYERS, MAX_PLAYERS, self.player_count
            )));
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new(0, MIN_PLAYERS)
    }
}
