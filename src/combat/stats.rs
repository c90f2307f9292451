//! Stat aggregation: template + star level + items + traits + crests → ResolvedStats
//!
//! Runs once per unit before the first tick (and once per summon). The result
//! never changes afterwards; status effects overlay it at read time.
//!
//! Composition order:
//! 1. base stats scaled by the star table (health, attack, ability power only)
//! 2. item bonuses in slot order
//! 3. trait-tier bonuses
//! 4. crest bonuses (conditional crests checked against the unit after step 3)
//!
//! Percent bonuses are summed and applied once to the scaled base; flat
//! bonuses are added afterwards. Nothing compounds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::battle::constants::{MELEE_RANGE, MIN_HEALTH, MIN_RANGE};
use crate::core::config::MatchConfig;
use crate::rules::tables::{
    BaseStats, BonusMode, CrestCondition, CrestDefinition, ItemDefinition, RuleTables,
    StarScaling, StatBonus, StatKind, TraitScope, UnitTemplate,
};

/// Final per-unit stats for one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStats {
    pub health: f32,
    pub armor: f32,
    pub magic_resist: f32,
    pub attack: f32,
    pub ability_power: f32,
    pub attack_speed: f32,
    pub range: u32,
    pub move_speed: f32,
    pub crit_chance: f32,
    pub crit_damage: f32,
    pub max_mana: f32,
    pub starting_mana: f32,
    pub lifesteal: f32,
    pub thorns: f32,
    pub health_regen: f32,
}

impl ResolvedStats {
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

    fn from_values(values: &[f32; StatKind::COUNT]) -> Self {
        let v = |stat: StatKind| values[stat.index()];
        Self {
            health: v(StatKind::Health),
            armor: v(StatKind::Armor),
            magic_resist: v(StatKind::MagicResist),
            attack: v(StatKind::Attack),
            ability_power: v(StatKind::AbilityPower),
            attack_speed: v(StatKind::AttackSpeed),
            range: v(StatKind::Range).round().max(0.0) as u32,
            move_speed: v(StatKind::MoveSpeed),
            crit_chance: v(StatKind::CritChance),
            crit_damage: v(StatKind::CritDamage),
            max_mana: v(StatKind::MaxMana),
            starting_mana: v(StatKind::StartingMana),
            lifesteal: v(StatKind::Lifesteal),
            thorns: v(StatKind::Thorns),
            health_regen: v(StatKind::HealthRegen),
        }
    }
}

/// Running sums for one unit while bonuses are folded in
struct Accumulator {
    base: [f32; StatKind::COUNT],
    percent: [f32; StatKind::COUNT],
    flat: [f32; StatKind::COUNT],
}

impl Accumulator {
    fn new(base: &BaseStats, star_multiplier: f32) -> Self {
        let mut values = [0.0; StatKind::COUNT];
        for stat in StatKind::ALL {
            let raw = base.get(stat);
            values[stat.index()] = if stat.scales_with_star() {
                raw * star_multiplier
            } else {
                raw
            };
        }
        Self {
            base: values,
            percent: [0.0; StatKind::COUNT],
            flat: [0.0; StatKind::COUNT],
        }
    }

    fn add(&mut self, bonus: &StatBonus) {
        let index = bonus.stat.index();
        match bonus.mode {
            BonusMode::Flat => self.flat[index] += bonus.amount,
            BonusMode::Percent => self.percent[index] += bonus.amount,
        }
    }

    fn value(&self, stat: StatKind) -> f32 {
        let index = stat.index();
        self.base[index] * (1.0 + self.percent[index] / 100.0) + self.flat[index]
    }

    fn finish(&self, config: &MatchConfig) -> ResolvedStats {
        let mut values = [0.0; StatKind::COUNT];
        for stat in StatKind::ALL {
            values[stat.index()] = self.value(stat);
        }
        let mut stats = ResolvedStats::from_values(&values);
        clamp(&mut stats, config);
        stats
    }
}

fn clamp(stats: &mut ResolvedStats, config: &MatchConfig) {
    stats.health = stats.health.max(MIN_HEALTH);
    stats.range = stats.range.max(MIN_RANGE);
    stats.crit_chance = stats.crit_chance.clamp(0.0, 1.0);
    stats.attack_speed = stats
        .attack_speed
        .clamp(config.min_attack_speed, config.max_attack_speed);

    // Resists may go negative from debuffs at runtime, never from authoring
    for value in [
        &mut stats.armor,
        &mut stats.magic_resist,
        &mut stats.attack,
        &mut stats.ability_power,
        &mut stats.move_speed,
        &mut stats.crit_damage,
        &mut stats.max_mana,
        &mut stats.lifesteal,
        &mut stats.thorns,
        &mut stats.health_regen,
    ] {
        *value = value.max(0.0);
    }
    stats.starting_mana = stats.starting_mana.clamp(0.0, stats.max_mana);
}

/// Whether a conditional crest applies to a unit with these stats so far
fn crest_applies(
    condition: Option<&CrestCondition>,
    template: &UnitTemplate,
    acc: &Accumulator,
) -> bool {
    let Some(condition) = condition else {
        return true;
    };
    let range = acc.value(StatKind::Range).round().max(MIN_RANGE as f32) as u32;
    match condition {
        CrestCondition::HasTrait { trait_id } => template.has_trait(trait_id),
        CrestCondition::Melee => range <= MELEE_RANGE,
        CrestCondition::Ranged => range > MELEE_RANGE,
        // Units spawn at full health
        CrestCondition::HealthPercentAtMost { percent } => *percent >= 100.0,
        CrestCondition::ManaPercentAtLeast { percent } => {
            let max_mana = acc.value(StatKind::MaxMana);
            if max_mana <= 0.0 {
                return false;
            }
            let starting = acc.value(StatKind::StartingMana).clamp(0.0, max_mana);
            starting / max_mana * 100.0 >= *percent
        }
    }
}

/// Compute a unit's final stats
///
/// `trait_bonuses` are the bonuses that apply to this unit from its side's
/// active trait tiers, as produced by [`trait_bonuses_for`].
pub fn resolve(
    template: &UnitTemplate,
    star_level: u8,
    items: &[&ItemDefinition],
    trait_bonuses: &[StatBonus],
    crests: &[&CrestDefinition],
    scaling: &StarScaling,
    config: &MatchConfig,
) -> ResolvedStats {
    let mut acc = Accumulator::new(&template.stats, scaling.multiplier(star_level));

    for item in items {
        for bonus in &item.bonuses {
            acc.add(bonus);
        }
    }

    for bonus in trait_bonuses {
        acc.add(bonus);
    }

    // Conditions see the unit as it stands before any crest lands
    let applicable: Vec<&CrestDefinition> = crests
        .iter()
        .copied()
        .filter(|crest| crest_applies(crest.condition.as_ref(), template, &acc))
        .collect();
    for crest in applicable {
        for bonus in &crest.bonuses {
            acc.add(bonus);
        }
    }

    acc.finish(config)
}

/// Active tier per trait for one side, counting distinct templates
pub fn compute_trait_tiers(
    templates: &[&UnitTemplate],
    rules: &RuleTables,
) -> BTreeMap<String, usize> {
    let mut carriers: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for template in templates {
        for trait_id in &template.traits {
            carriers
                .entry(trait_id.as_str())
                .or_default()
                .insert(template.id.as_str());
        }
    }

    carriers
        .into_iter()
        .filter_map(|(trait_id, distinct)| {
            let definition = rules.trait_def(trait_id)?;
            let tier = definition.tier_for_count(distinct.len() as u32)?;
            Some((trait_id.to_string(), tier))
        })
        .collect()
}

/// Trait bonuses that land on one unit given its side's active tiers
///
/// Iterates traits in id order so the bonus list is stable.
pub fn trait_bonuses_for(
    template: &UnitTemplate,
    tiers: &BTreeMap<String, usize>,
    rules: &RuleTables,
) -> Vec<StatBonus> {
    let mut bonuses = Vec::new();
    for (trait_id, tier_index) in tiers {
        let Some(tier) = rules
            .trait_def(trait_id)
            .and_then(|definition| definition.tiers.get(*tier_index))
        else {
            continue;
        };
        let applies = match tier.scope {
            TraitScope::Members => template.has_trait(trait_id),
            TraitScope::Team => true,
        };
        if applies {
            bonuses.extend(tier.bonuses.iter().cloned());
        }
    }
    bonuses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tables::{TraitDefinition, TraitTier};

    fn knight() -> UnitTemplate {
        UnitTemplate::new(
            "knight",
            "Knight",
            BaseStats {
                health: 600.0,
                attack: 50.0,
                armor: 30.0,
                ..BaseStats::default()
            },
        )
        .with_traits(&["guardian"])
    }

    fn item(id: &str, bonuses: Vec<StatBonus>) -> ItemDefinition {
        ItemDefinition {
            id: id.into(),
            name: id.into(),
            bonuses,
        }
    }

    fn resolve_plain(template: &UnitTemplate, star: u8, items: &[&ItemDefinition]) -> ResolvedStats {
        resolve(
            template,
            star,
            items,
            &[],
            &[],
            &StarScaling::default(),
            &MatchConfig::default(),
        )
    }

    #[test]
    fn test_star_scaling_hits_health_and_attack_only() {
        let stats = resolve_plain(&knight(), 2, &[]);
        assert!((stats.health - 1080.0).abs() < 1e-3);
        assert!((stats.attack - 90.0).abs() < 1e-3);
        assert_eq!(stats.armor, 30.0);
    }

    #[test]
    fn test_percent_bonuses_sum_not_compound() {
        let a = item("a", vec![StatBonus::percent(StatKind::Health, 10.0)]);
        let b = item("b", vec![StatBonus::percent(StatKind::Health, 10.0)]);
        let stats = resolve_plain(&knight(), 1, &[&a, &b]);
        // 600 × 1.2, not 600 × 1.1 × 1.1
        assert!((stats.health - 720.0).abs() < 1e-3);
    }

    #[test]
    fn test_flat_added_after_percent() {
        let a = item(
            "a",
            vec![
                StatBonus::flat(StatKind::Attack, 10.0),
                StatBonus::percent(StatKind::Attack, 50.0),
            ],
        );
        let stats = resolve_plain(&knight(), 1, &[&a]);
        assert!((stats.attack - 85.0).abs() < 1e-3);
    }

    #[test]
    fn test_clamps_apply() {
        let cursed = item(
            "cursed",
            vec![
                StatBonus::flat(StatKind::Health, -10_000.0),
                StatBonus::flat(StatKind::CritChance, 5.0),
                StatBonus::flat(StatKind::Range, -4.0),
            ],
        );
        let stats = resolve_plain(&knight(), 1, &[&cursed]);
        assert_eq!(stats.health, MIN_HEALTH);
        assert_eq!(stats.crit_chance, 1.0);
        assert_eq!(stats.range, MIN_RANGE);
    }

    #[test]
    fn test_conditional_crest_sees_items() {
        let bow = item("bow", vec![StatBonus::flat(StatKind::Range, 3.0)]);
        let sniper = CrestDefinition {
            id: "sniper".into(),
            name: "Sniper".into(),
            bonuses: vec![StatBonus::flat(StatKind::Attack, 20.0)],
            condition: Some(CrestCondition::Ranged),
        };
        let config = MatchConfig::default();
        let scaling = StarScaling::default();

        let melee = resolve(&knight(), 1, &[], &[], &[&sniper], &scaling, &config);
        let ranged = resolve(&knight(), 1, &[&bow], &[], &[&sniper], &scaling, &config);
        assert_eq!(melee.attack, 50.0);
        assert_eq!(ranged.attack, 70.0);
    }

    #[test]
    fn test_trait_tiers_count_distinct_templates() {
        let mut rules = RuleTables::new(MatchConfig::default());
        rules.add_trait(TraitDefinition {
            id: "guardian".into(),
            name: "Guardian".into(),
            tiers: [2, 4, 6]
                .into_iter()
                .map(|threshold| TraitTier {
                    threshold,
                    bonuses: vec![StatBonus::flat(StatKind::Armor, threshold as f32)],
                    scope: TraitScope::Members,
                })
                .collect(),
        });

        let a = knight();
        let mut b = knight();
        b.id = "squire".into();

        // Two copies of the same template count once
        let tiers = compute_trait_tiers(&[&a, &a], &rules);
        assert!(tiers.is_empty());

        let tiers = compute_trait_tiers(&[&a, &b, &a], &rules);
        assert_eq!(tiers.get("guardian"), Some(&0));

        let bonuses = trait_bonuses_for(&a, &tiers, &rules);
        assert_eq!(bonuses, vec![StatBonus::flat(StatKind::Armor, 2.0)]);

        let outsider = UnitTemplate::new("archer", "Archer", BaseStats::default());
        assert!(trait_bonuses_for(&outsider, &tiers, &rules).is_empty());
    }
}
