//! The water level meter.
//!
//! The level only ever rises. Each level fixes how many flood cards are drawn
//! at the end of a turn, and reaching the top of the meter sinks the island.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Flood cards drawn per turn, indexed by water level
pub const FLOOD_CARDS_PER_LEVEL: [u8; 10] = [2, 2, 3, 3, 3, 4, 4, 4, 4, 6];

/// Highest level index. Reaching it loses the game.
pub const MAX_WATER_LEVEL: u8 = 9;

/// Highest starting level a difficulty may select
pub const MAX_STARTING_LEVEL: u8 = 3;

/// Level indices marked as dangerous on the meter
const DANGER_LEVELS: [u8; 4] = [4, 6, 8, 9];

/// Tracks the water level for one game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterLevelMeter {
    level: u8,
}

/// Everything a client needs to draw the meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterLevelInfo {
    /// Zero-based level index
    pub level_index: u8,
    /// Flood cards drawn at the end of each turn at this level
    pub cards_this_turn: u8,
    /// Whether this level is marked as dangerous
    pub is_danger: bool,
}

impl WaterLevelMeter {
    /// Create a meter at a starting level, clamped to the meter's range
    pub fn new(level: u8) -> Self {
        Self {
            level: level.min(MAX_WATER_LEVEL),
        }
    }

    /// Zero-based level index
    pub fn level(&self) -> u8 {
        self.level
    }

    /// One-based level as printed on the meter
    pub fn display_level(&self) -> u8 {
        self.level + 1
    }

    /// Flood cards to draw at the end of this turn
    pub fn cards_this_turn(&self) -> u8 {
        Self::cards_at(self.level)
    }

    /// Flood cards drawn at an arbitrary level
    pub fn cards_at(level: u8) -> u8 {
        FLOOD_CARDS_PER_LEVEL[usize::from(level.min(MAX_WATER_LEVEL))]
    }

    /// Whether the current level is a danger level
    pub fn is_danger(&self) -> bool {
        Self::is_danger_level(self.level)
    }

    /// Whether an arbitrary level is a danger level
    pub fn is_danger_level(level: u8) -> bool {
        DANGER_LEVELS.contains(&level)
    }

    /// Whether the water has reached the top of the meter
    pub fn is_max(&self) -> bool {
        self.level >= MAX_WATER_LEVEL
    }

    /// Raise the level by one. Returns false if already at the top.
    pub fn raise(&mut self) -> bool {
        if self.is_max() {
            warn!(level = self.display_level(), "water level already at maximum");
            return false;
        }
        self.level += 1;
        debug!(level = self.display_level(), "water level raised");
        true
    }

    /// Snapshot of the meter
    pub fn info(&self) -> WaterLevelInfo {
        WaterLevelInfo {
            level_index: self.level,
            cards_this_turn: self.cards_this_turn(),
            is_danger: self.is_danger(),
        }
    }
}

impl Default for WaterLevelMeter {
    fn default() -> Self {
        Self::new(0)
    }
}
