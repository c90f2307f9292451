//! Damage & mitigation resolution
//!
//! Every point of damage in a match flows through [`deal_damage`], which
//! settles crits, resist mitigation, shields, health clamping, lifesteal,
//! thorns and mana gain, and records exactly one Damage event.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::constants::RESIST_SCALE;
use crate::battle::events::CombatEventKind;
use crate::battle::execution::MatchContext;
use crate::core::types::UnitId;
use crate::rules::tables::StatKind;

/// Damage channel, selecting which resist mitigates it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    /// Mitigated by armor
    #[default]
    Physical,
    /// Mitigated by magic resist
    Magic,
    /// Never mitigated
    True,
}

/// What caused a damage instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOrigin {
    /// Basic attack: may crit, triggers thorns
    Attack,
    Ability,
    /// Damage over time
    Status,
    /// Thorns reflection: never lifesteals or reflects again
    Reflect,
}

impl DamageOrigin {
    fn can_crit(&self) -> bool {
        matches!(self, DamageOrigin::Attack)
    }

    fn lifesteals(&self) -> bool {
        matches!(self, DamageOrigin::Attack | DamageOrigin::Ability)
    }

    fn grants_mana(&self) -> bool {
        matches!(self, DamageOrigin::Attack | DamageOrigin::Ability)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DamageRequest {
    pub source: UnitId,
    pub target: UnitId,
    /// Pre-mitigation damage
    pub raw: f32,
    pub damage_type: DamageType,
    pub origin: DamageOrigin,
}

/// What one damage instance actually did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DamageOutcome {
    /// Post-mitigation, post-shield, pre-clamp
    pub amount: f32,
    pub absorbed: f32,
    pub health_removed: f32,
    pub overkill: f32,
    pub was_crit: bool,
    /// Health fraction of the target before the hit
    pub health_fraction_before: f32,
}

/// Resist formula shared by armor and magic resist
///
/// Negative resists are floored at zero.
pub fn mitigate(raw: f32, damage_type: DamageType, armor: f32, magic_resist: f32) -> f32 {
    let resist = match damage_type {
        DamageType::Physical => armor,
        DamageType::Magic => magic_resist,
        DamageType::True => return raw,
    };
    raw * RESIST_SCALE / (RESIST_SCALE + resist.max(0.0))
}

/// Resolve one damage instance against a target
///
/// Reaped units are ignored. Units already at zero health but not yet reaped
/// still take basic attacks (recorded entirely as overkill); other sources
/// skip them.
pub fn deal_damage(ctx: &mut MatchContext, request: DamageRequest) -> DamageOutcome {
    let DamageRequest {
        source,
        target,
        raw,
        damage_type,
        origin,
    } = request;

    {
        let defender = &ctx.units[target.index()];
        if defender.dead || (origin != DamageOrigin::Attack && defender.health <= 0.0) {
            return DamageOutcome::default();
        }
    }

    let mut raw = raw.max(0.0);
    let mut was_crit = false;
    if origin.can_crit() {
        let attacker = &ctx.units[source.index()];
        let crit_chance = attacker.effective(StatKind::CritChance).clamp(0.0, 1.0);
        let crit_damage = attacker.effective(StatKind::CritDamage);
        if crit_chance > 0.0 && ctx.rng.gen::<f32>() < crit_chance {
            raw *= crit_damage;
            was_crit = true;
        }
    }

    let config = &ctx.rules.config;
    let defender = &mut ctx.units[target.index()];
    let mitigated = mitigate(
        raw,
        damage_type,
        defender.effective(StatKind::Armor),
        defender.effective(StatKind::MagicResist),
    );

    let absorbed = mitigated.min(defender.shield);
    defender.shield -= absorbed;
    let amount = mitigated - absorbed;

    let health_before = defender.health.max(0.0);
    let max_health = defender.max_health();
    let health_removed = amount.min(health_before);
    let overkill = amount - health_removed;
    defender.health = health_before - health_removed;
    if source != target {
        defender.last_damaged_by = Some(source);
    }
    if origin.grants_mana() {
        let gain = (raw * config.mana_per_damage_ratio).min(config.mana_on_damage_cap);
        defender.gain_mana(gain);
    }
    let remaining_health = defender.health;
    let thorns = defender.effective(StatKind::Thorns);

    let tick = ctx.tick;
    ctx.recorder.record(
        tick,
        CombatEventKind::Damage {
            source_id: source,
            target_id: target,
            amount,
            damage_type,
            was_crit,
            absorbed,
            overkill,
            remaining_health,
        },
    );

    let source_side = ctx.units[source.index()].side;
    ctx.damage.record(source_side, health_removed);
    ctx.units[source.index()].damage_dealt += health_removed;

    if origin.lifesteals() && health_removed > 0.0 {
        let lifesteal = ctx.units[source.index()].effective(StatKind::Lifesteal);
        if lifesteal > 0.0 {
            heal(ctx, source, source, lifesteal * health_removed);
        }
    }

    let removed_total = health_removed + absorbed;
    if origin == DamageOrigin::Attack && thorns > 0.0 && removed_total > 0.0 && source != target {
        deal_damage(
            ctx,
            DamageRequest {
                source: target,
                target: source,
                raw: thorns * removed_total,
                damage_type: DamageType::Magic,
                origin: DamageOrigin::Reflect,
            },
        );
    }

    DamageOutcome {
        amount,
        absorbed,
        health_removed,
        overkill,
        was_crit,
        health_fraction_before: health_before / max_health,
    }
}

/// Basic attack from `attacker` against `defender`
///
/// Raw damage is the attacker's effective attack in its template's damage
/// type. The attacker gains the configured mana per attack.
pub fn resolve_attack(ctx: &mut MatchContext, attacker: UnitId, defender: UnitId) -> DamageOutcome {
    let (raw, damage_type) = {
        let unit = &ctx.units[attacker.index()];
        (unit.effective(StatKind::Attack), unit.damage_type)
    };

    let outcome = deal_damage(
        ctx,
        DamageRequest {
            source: attacker,
            target: defender,
            raw,
            damage_type,
            origin: DamageOrigin::Attack,
        },
    );

    let mana_per_attack = ctx.rules.config.mana_per_attack;
    ctx.units[attacker.index()].gain_mana(mana_per_attack);
    outcome
}

/// Restore health, clamped to max; returns the amount actually healed
///
/// Units at zero health cannot be healed back.
pub fn heal(ctx: &mut MatchContext, source: UnitId, target: UnitId, amount: f32) -> f32 {
    let unit = &mut ctx.units[target.index()];
    if unit.dead || unit.health <= 0.0 || amount <= 0.0 {
        return 0.0;
    }

    let healed = amount.min(unit.max_health() - unit.health).max(0.0);
    if healed <= 0.0 {
        return 0.0;
    }
    unit.health += healed;

    let tick = ctx.tick;
    ctx.recorder.record(
        tick,
        CombatEventKind::Heal {
            source_id: source,
            target_id: target,
            amount: healed,
        },
    );
    healed
}

/// Add a damage-absorbing shield (shields stack and never expire)
pub fn apply_shield(ctx: &mut MatchContext, source: UnitId, target: UnitId, amount: f32) {
    let unit = &mut ctx.units[target.index()];
    if unit.dead || unit.health <= 0.0 || amount <= 0.0 {
        return;
    }
    unit.shield += amount;

    let tick = ctx.tick;
    ctx.recorder.record(
        tick,
        CombatEventKind::ShieldApplied {
            source_id: source,
            target_id: target,
            amount,
        },
    );
}
