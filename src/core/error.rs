use thiserror::Error;

use crate::core::types::Side;

#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("Roster for side {0} is empty")]
    EmptyRoster(Side),

    #[error("Unknown unit template: {0}")]
    UnknownUnit(String),

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("Unknown trait: {0}")]
    UnknownTrait(String),

    #[error("Unknown crest: {0}")]
    UnknownCrest(String),

    #[error("Invalid star level {level} for unit {template_id} (expected 1..={max})")]
    InvalidStarLevel {
        template_id: String,
        level: u8,
        max: u8,
    },

    #[error("Unit {template_id} on side {side} has {count} items (max {max})")]
    TooManyItems {
        template_id: String,
        side: Side,
        count: usize,
        max: usize,
    },

    #[error("Position ({col},{row}) is outside side {side}'s half of the board")]
    PositionOutOfBounds { side: Side, col: i32, row: i32 },

    #[error("Position ({col},{row}) on side {side} is occupied by more than one unit")]
    PositionOccupied { side: Side, col: i32, row: i32 },

    #[error("Roster for side {side} has {count} units (max {max})")]
    RosterTooLarge { side: Side, count: usize, max: usize },

    #[error("Unit {template_id} on side {side} starts with a full mana pool after bonuses")]
    FullManaPool { template_id: String, side: Side },

    #[error("Trait {trait_id} has no tier {tier}")]
    InvalidTraitTier { trait_id: String, tier: usize },

    #[error("Invalid rule table: {0}")]
    InvalidRules(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ArenaError>;
