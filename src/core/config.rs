//! Match configuration with documented constants
//!
//! Every tunable number the scheduler consults lives here. The config is read
//! from the `[match]` table of a rules file; missing keys fall back to the
//! defaults below.

use serde::{Deserialize, Serialize};

use crate::core::error::{ArenaError, Result};

/// Configuration for one match
///
/// A config is shared read-only between every match simulated from the same
/// rule tables, so nothing in here may change once a match has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    // === TIME ===
    /// Length of one tick in simulated milliseconds
    ///
    /// 50 ms matches the cadence the playback layer assumes when it turns
    /// tick numbers back into wall-clock time.
    pub tick_ms: u32,

    /// Hard cap on ticks before the match is declared a timeout draw
    ///
    /// At 50 ms per tick the default of 1800 is 90 seconds of combat.
    pub max_ticks: u64,

    // === BOARD ===
    /// Battlefield width in hexes (columns)
    pub board_width: u32,

    /// Battlefield height in hexes (rows), split evenly between both sides
    pub board_height: u32,

    // === ROSTER LIMITS ===
    /// Upper bound on living + dead units per side, summons included
    pub max_units_per_side: usize,

    /// Item slots per unit
    pub max_items_per_unit: usize,

    /// Highest star level a roster entry may carry
    pub max_star_level: u8,

    // === MANA ===
    /// Mana gained by the attacker for every basic attack that lands
    pub mana_per_attack: f32,

    /// Fraction of pre-mitigation damage converted to mana for the defender
    pub mana_per_damage_ratio: f32,

    /// Cap on mana gained from a single damage instance
    pub mana_on_damage_cap: f32,

    // === ATTACK SPEED BOUNDS ===
    /// Floor on effective attack speed (attacks per second)
    ///
    /// Keeps heavily slowed units from dividing by zero when the cooldown is
    /// converted to ticks.
    pub min_attack_speed: f32,

    /// Ceiling on effective attack speed (attacks per second)
    pub max_attack_speed: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            // Time
            tick_ms: 50,
            max_ticks: 1800,

            // Board (two 7x4 halves)
            board_width: 7,
            board_height: 8,

            // Roster
            max_units_per_side: 12,
            max_items_per_unit: 3,
            max_star_level: 3,

            // Mana
            mana_per_attack: 10.0,
            mana_per_damage_ratio: 0.06,
            mana_on_damage_cap: 42.0,

            // Attack speed
            min_attack_speed: 0.2,
            max_attack_speed: 5.0,
        }
    }
}

impl MatchConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated seconds per tick
    pub fn tick_seconds(&self) -> f32 {
        self.tick_ms as f32 / 1000.0
    }

    /// Convert a duration in milliseconds to whole ticks (at least one)
    pub fn ms_to_ticks(&self, ms: u32) -> u32 {
        let ticks = (ms as f32 / self.tick_ms as f32).round() as u32;
        ticks.max(1)
    }

    /// Rows owned by each side
    pub fn half_height(&self) -> u32 {
        self.board_height / 2
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(ArenaError::InvalidRules("tick_ms must be positive".into()));
        }

        if self.max_ticks == 0 {
            return Err(ArenaError::InvalidRules("max_ticks must be positive".into()));
        }

        if self.board_width == 0 || self.board_height < 2 || self.board_height % 2 != 0 {
            return Err(ArenaError::InvalidRules(format!(
                "board must be at least 1x2 with an even height (got {}x{})",
                self.board_width, self.board_height
            )));
        }

        if self.max_star_level == 0 {
            return Err(ArenaError::InvalidRules(
                "max_star_level must be at least 1".into(),
            ));
        }

        if self.min_attack_speed <= 0.0 || self.min_attack_speed > self.max_attack_speed {
            return Err(ArenaError::InvalidRules(format!(
                "attack speed bounds are inverted or non-positive ({}..{})",
                self.min_attack_speed, self.max_attack_speed
            )));
        }

        if self.mana_per_attack < 0.0 || self.mana_per_damage_ratio < 0.0 {
            return Err(ArenaError::InvalidRules("mana gains must be non-negative".into()));
        }

        Ok(())
    }
}
