//! Authored rule tables: unit templates, items, traits, crests, star scaling
//!
//! Everything in here is loaded once and shared read-only by every match.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::combat::abilities::{AbilityDefinition, AbilityEffect, AbilityTrigger};
use crate::combat::damage::DamageType;
use crate::core::config::MatchConfig;
use crate::core::error::{ArenaError, Result};

/// Every stat a bonus can touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Health,
    Armor,
    MagicResist,
    Attack,
    AbilityPower,
    AttackSpeed,
    Range,
    MoveSpeed,
    CritChance,
    CritDamage,
    MaxMana,
    StartingMana,
    Lifesteal,
    Thorns,
    HealthRegen,
}

impl StatKind {
    pub const COUNT: usize = 15;

    pub const ALL: [StatKind; StatKind::COUNT] = [
        StatKind::Health,
        StatKind::Armor,
        StatKind::MagicResist,
        StatKind::Attack,
        StatKind::AbilityPower,
        StatKind::AttackSpeed,
        StatKind::Range,
        StatKind::MoveSpeed,
        StatKind::CritChance,
        StatKind::CritDamage,
        StatKind::MaxMana,
        StatKind::StartingMana,
        StatKind::Lifesteal,
        StatKind::Thorns,
        StatKind::HealthRegen,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Stats multiplied by the star-level table
    pub fn scales_with_star(&self) -> bool {
        matches!(
            self,
            StatKind::Health | StatKind::Attack | StatKind::AbilityPower
        )
    }
}

/// How a bonus amount combines with the base value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusMode {
    /// Added after percentages
    #[default]
    Flat,
    /// Percent of the star-scaled base, summed with other percents (never compounded)
    Percent,
}

/// One stat bonus granted by an item, trait tier, or crest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBonus {
    pub stat: StatKind,
    pub amount: f32,
    #[serde(default)]
    pub mode: BonusMode,
}

impl StatBonus {
    pub fn flat(stat: StatKind, amount: f32) -> Self {
        Self {
            stat,
            amount,
            mode: BonusMode::Flat,
        }
    }

    pub fn percent(stat: StatKind, amount: f32) -> Self {
        Self {
            stat,
            amount,
            mode: BonusMode::Percent,
        }
    }
}

/// Template stats before any scaling or bonuses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseStats {
    pub health: f32,
    pub armor: f32,
    pub magic_resist: f32,
    pub attack: f32,
    /// 100 is neutral: ability payloads are multiplied by `ability_power / 100`
    pub ability_power: f32,
    /// Attacks per second
    pub attack_speed: f32,
    /// Attack range in hexes
    pub range: u32,
    /// Hexes per second
    pub move_speed: f32,
    /// 0.0 to 1.0
    pub crit_chance: f32,
    /// Damage multiplier on a crit
    pub crit_damage: f32,
    pub max_mana: f32,
    pub starting_mana: f32,
    /// Fraction of health damage returned as healing
    pub lifesteal: f32,
    /// Fraction of damage taken reflected to the attacker
    pub thorns: f32,
    /// Health per second
    pub health_regen: f32,
}

impl Default for BaseStats {
    fn default() -> Self {
        Self {
            health: 500.0,
            armor: 20.0,
            magic_resist: 20.0,
            attack: 50.0,
            ability_power: 100.0,
            attack_speed: 0.7,
            range: 1,
            move_speed: 2.0,
            crit_chance: 0.25,
            crit_damage: 1.4,
            max_mana: 0.0,
            starting_mana: 0.0,
            lifesteal: 0.0,
            thorns: 0.0,
            health_regen: 0.0,
        }
    }
}

impl BaseStats {
    pub fn get(&self, stat: StatKind) -> f32 {
        match stat {
            StatKind::Health => self.health,
            StatKind::Armor => self.armor,
            StatKind::MagicResist => self.magic_resist,
            StatKind::Attack => self.attack,
            StatKind::AbilityPower => self.ability_power,
            StatKind::AttackSpeed => self.attack_speed,
            StatKind::Range => self.range as f32,
            StatKind::MoveSpeed => self.move_speed,
            StatKind::CritChance => self.crit_chance,
            StatKind::CritDamage => self.crit_damage,
            StatKind::MaxMana => self.max_mana,
            StatKind::StartingMana => self.starting_mana,
            StatKind::Lifesteal => self.lifesteal,
            StatKind::Thorns => self.thorns,
            StatKind::HealthRegen => self.health_regen,
        }
    }
}

/// Immutable authored unit definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub id: String,
    pub name: String,
    #[serde(default = "default_cost")]
    pub cost: u32,
    #[serde(default)]
    pub stats: BaseStats,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub ability: Option<AbilityDefinition>,
    /// Damage type of basic attacks
    #[serde(default)]
    pub damage_type: DamageType,
}

fn default_cost() -> u32 {
    1
}

impl UnitTemplate {
    pub fn new(id: &str, name: &str, stats: BaseStats) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            cost: 1,
            stats,
            traits: Vec::new(),
            ability: None,
            damage_type: DamageType::Physical,
        }
    }

    pub fn with_traits(mut self, traits: &[&str]) -> Self {
        self.traits = traits.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_ability(mut self, ability: AbilityDefinition) -> Self {
        self.ability = Some(ability);
        self
    }

    pub fn has_trait(&self, trait_id: &str) -> bool {
        self.traits.iter().any(|t| t == trait_id)
    }
}

/// An equippable item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bonuses: Vec<StatBonus>,
}

/// Who receives a trait tier's bonuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitScope {
    /// Only units carrying the trait
    #[default]
    Members,
    /// Every unit on the side
    Team,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitTier {
    /// Distinct units carrying the trait needed to activate this tier
    pub threshold: u32,
    #[serde(default)]
    pub bonuses: Vec<StatBonus>,
    #[serde(default)]
    pub scope: TraitScope,
}

/// A trait (origin/class tag) with tiered bonuses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitDefinition {
    pub id: String,
    pub name: String,
    pub tiers: Vec<TraitTier>,
}

impl TraitDefinition {
    /// Index of the active tier for `count` units
    ///
    /// Thresholds are monotonic, so the highest threshold met wins: with
    /// thresholds [2, 4, 6] and 5 units the answer is tier 1.
    pub fn tier_for_count(&self, count: u32) -> Option<usize> {
        self.tiers
            .iter()
            .enumerate()
            .filter(|(_, tier)| count >= tier.threshold)
            .map(|(index, _)| index)
            .last()
    }
}

/// Predicate a unit must satisfy for a conditional crest to apply
///
/// Percent predicates are evaluated against the unit's spawn state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrestCondition {
    HasTrait { trait_id: String },
    /// Range of 1
    Melee,
    /// Range above 1
    Ranged,
    HealthPercentAtMost { percent: f32 },
    ManaPercentAtLeast { percent: f32 },
}

/// Team-wide passive bonus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrestDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bonuses: Vec<StatBonus>,
    #[serde(default)]
    pub condition: Option<CrestCondition>,
}

/// Star-level multiplier table, indexed by `star_level - 1`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarScaling {
    pub multipliers: Vec<f32>,
}

impl Default for StarScaling {
    fn default() -> Self {
        Self {
            multipliers: vec![1.0, 1.8, 3.24],
        }
    }
}

impl StarScaling {
    /// Multiplier for a star level (levels past the table use its last entry)
    pub fn multiplier(&self, star_level: u8) -> f32 {
        let index = (star_level.max(1) - 1) as usize;
        self.multipliers
            .get(index)
            .or_else(|| self.multipliers.last())
            .copied()
            .unwrap_or(1.0)
    }
}

/// All rule tables for a ruleset
#[derive(Debug, Clone, Default)]
pub struct RuleTables {
    pub config: MatchConfig,
    pub star_scaling: StarScaling,
    units: AHashMap<String, UnitTemplate>,
    items: AHashMap<String, ItemDefinition>,
    traits: AHashMap<String, TraitDefinition>,
    crests: AHashMap<String, CrestDefinition>,
}

impl RuleTables {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_star_scaling(mut self, scaling: StarScaling) -> Self {
        self.star_scaling = scaling;
        self
    }

    pub fn add_unit(&mut self, template: UnitTemplate) {
        self.units.insert(template.id.clone(), template);
    }

    pub fn add_item(&mut self, item: ItemDefinition) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn add_trait(&mut self, definition: TraitDefinition) {
        self.traits.insert(definition.id.clone(), definition);
    }

    pub fn add_crest(&mut self, crest: CrestDefinition) {
        self.crests.insert(crest.id.clone(), crest);
    }

    pub fn template(&self, id: &str) -> Option<&UnitTemplate> {
        self.units.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&ItemDefinition> {
        self.items.get(id)
    }

    pub fn trait_def(&self, id: &str) -> Option<&TraitDefinition> {
        self.traits.get(id)
    }

    pub fn crest(&self, id: &str) -> Option<&CrestDefinition> {
        self.crests.get(id)
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Sorted template ids (map iteration order is not stable)
    pub fn unit_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.units.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Check cross-references and invariants the simulation relies on
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;

        if self.star_scaling.multipliers.len() < self.config.max_star_level as usize {
            return Err(ArenaError::InvalidRules(format!(
                "star scaling has {} entries but max_star_level is {}",
                self.star_scaling.multipliers.len(),
                self.config.max_star_level
            )));
        }
        if self.star_scaling.multipliers.iter().any(|m| *m <= 0.0) {
            return Err(ArenaError::InvalidRules(
                "star multipliers must be positive".into(),
            ));
        }

        for id in self.unit_ids() {
            if let Some(template) = self.units.get(id) {
                self.validate_template(template)?;
            }
        }

        let mut traits: Vec<&TraitDefinition> = self.traits.values().collect();
        traits.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        for definition in traits {
            if definition.tiers.is_empty() {
                return Err(ArenaError::InvalidRules(format!(
                    "trait {} has no tiers",
                    definition.id
                )));
            }
            let monotonic = definition
                .tiers
                .windows(2)
                .all(|pair| pair[0].threshold < pair[1].threshold);
            if !monotonic {
                return Err(ArenaError::InvalidRules(format!(
                    "trait {} thresholds must be strictly increasing",
                    definition.id
                )));
            }
        }

        let mut crests: Vec<&CrestDefinition> = self.crests.values().collect();
        crests.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        for crest in crests {
            if let Some(CrestCondition::HasTrait { trait_id }) = &crest.condition {
                if !self.traits.contains_key(trait_id) {
                    return Err(ArenaError::UnknownTrait(trait_id.clone()));
                }
            }
        }

        Ok(())
    }

    fn validate_template(&self, template: &UnitTemplate) -> Result<()> {
        for trait_id in &template.traits {
            if !self.traits.contains_key(trait_id) {
                return Err(ArenaError::UnknownTrait(trait_id.clone()));
            }
        }

        if template.stats.health <= 0.0 {
            return Err(ArenaError::InvalidRules(format!(
                "unit {} must have positive health",
                template.id
            )));
        }

        let Some(ability) = &template.ability else {
            return Ok(());
        };

        match &ability.trigger {
            AbilityTrigger::ManaFull => {
                if template.stats.max_mana <= 0.0 {
                    return Err(ArenaError::InvalidRules(format!(
                        "unit {} has a mana ability but no mana pool",
                        template.id
                    )));
                }
                if template.stats.starting_mana >= template.stats.max_mana {
                    return Err(ArenaError::InvalidRules(format!(
                        "unit {} starts with a full mana pool and would cast every tick",
                        template.id
                    )));
                }
            }
            AbilityTrigger::OnHit { every } if *every == 0 => {
                return Err(ArenaError::InvalidRules(format!(
                    "unit {} has an on-hit ability that triggers every 0 hits",
                    template.id
                )));
            }
            AbilityTrigger::Timer { interval_ms } if *interval_ms == 0 => {
                return Err(ArenaError::InvalidRules(format!(
                    "unit {} has a timer ability with a zero interval",
                    template.id
                )));
            }
            _ => {}
        }

        if let AbilityEffect::Summon { template_id, .. } = &ability.effect {
            if !self.units.contains_key(template_id) {
                return Err(ArenaError::UnknownUnit(template_id.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiered_trait() -> TraitDefinition {
        TraitDefinition {
            id: "guardian".into(),
            name: "Guardian".into(),
            tiers: [2, 4, 6]
                .into_iter()
                .map(|threshold| TraitTier {
                    threshold,
                    bonuses: vec![StatBonus::flat(StatKind::Armor, 10.0 * threshold as f32)],
                    scope: TraitScope::Members,
                })
                .collect(),
        }
    }

    #[test]
    fn test_trait_tier_is_last_threshold_met() {
        let definition = tiered_trait();
        assert_eq!(definition.tier_for_count(1), None);
        assert_eq!(definition.tier_for_count(2), Some(0));
        assert_eq!(definition.tier_for_count(5), Some(1));
        assert_eq!(definition.tier_for_count(6), Some(2));
        assert_eq!(definition.tier_for_count(9), Some(2));
    }

    #[test]
    fn test_star_multiplier_lookup() {
        let scaling = StarScaling::default();
        assert_eq!(scaling.multiplier(1), 1.0);
        assert_eq!(scaling.multiplier(2), 1.8);
        assert_eq!(scaling.multiplier(3), 3.24);
        assert_eq!(scaling.multiplier(4), 3.24);
    }

    #[test]
    fn test_stat_kind_indices_match_all() {
        for (i, stat) in StatKind::ALL.iter().enumerate() {
            assert_eq!(stat.index(), i);
        }
    }

    #[test]
    fn test_non_monotonic_trait_rejected() {
        let mut rules = RuleTables::new(MatchConfig::default());
        let mut definition = tiered_trait();
        definition.tiers.swap(0, 1);
        rules.add_trait(definition);
        assert!(matches!(rules.validate(), Err(ArenaError::InvalidRules(_))));
    }

    #[test]
    fn test_validation_reports_first_trait_by_id() {
        let mut rules = RuleTables::new(MatchConfig::default());
        for id in ["zealot", "acolyte", "monk", "berserker"] {
            rules.add_trait(TraitDefinition {
                id: id.into(),
                name: id.into(),
                tiers: Vec::new(),
            });
        }
        for _ in 0..8 {
            match rules.validate() {
                Err(ArenaError::InvalidRules(message)) => {
                    assert_eq!(message, "trait acolyte has no tiers")
                }
                other => panic!("expected invalid rules, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_unknown_trait_on_template_rejected() {
        let mut rules = RuleTables::new(MatchConfig::default());
        rules.add_unit(UnitTemplate::new("knight", "Knight", BaseStats::default()).with_traits(&["ghost"]));
        assert!(matches!(rules.validate(), Err(ArenaError::UnknownTrait(_))));
    }
}
