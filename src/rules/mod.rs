//! Authored rule tables loaded from TOML

pub mod loader;
pub mod tables;

pub use loader::{load_rules, load_team, parse_rules, parse_team};
pub use tables::{
    BaseStats, BonusMode, CrestCondition, CrestDefinition, ItemDefinition, RuleTables,
    StarScaling, StatBonus, StatKind, TraitDefinition, TraitScope, TraitTier, UnitTemplate,
};
