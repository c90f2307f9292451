//! Combat resolution: stats, damage, status effects, abilities

pub mod abilities;
pub mod damage;
pub mod stats;
pub mod status;

pub use abilities::{cast, AbilityDefinition, AbilityEffect, AbilityTrigger};
pub use damage::{
    apply_shield, deal_damage, heal, mitigate, resolve_attack, DamageOrigin, DamageOutcome,
    DamageRequest, DamageType,
};
pub use stats::{compute_trait_tiers, resolve, trait_bonuses_for, ResolvedStats};
pub use status::{apply_status, cleanse, StatusEffect, StatusKind, StatusSpec};
