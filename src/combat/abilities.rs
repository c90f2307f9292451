//! Ability definitions and the cast resolver
//!
//! Each unit template carries at most one ability. The scheduler decides
//! *when* an ability fires (triggers); [`cast`] decides *what* it does.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::battle::constants::NEUTRAL_ABILITY_POWER;
use crate::battle::events::CombatEventKind;
use crate::battle::execution::MatchContext;
use crate::battle::targeting::{select_targets, TargetPolicy};
use crate::combat::damage::{
    apply_shield, deal_damage, heal, DamageOrigin, DamageRequest, DamageType,
};
use crate::combat::status::{apply_status, cleanse, StatusSpec};
use crate::core::types::UnitId;
use crate::rules::tables::StatKind;

/// When an ability fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AbilityTrigger {
    /// Once, during setup
    CombatStart,
    /// After every `every`-th basic attack that lands
    OnHit { every: u32 },
    /// When a unit this unit last damaged dies
    OnKill,
    /// When this unit dies
    OnDeath,
    /// When mana reaches max; consumes the pool
    ManaFull,
    /// Every `interval_ms` of combat time
    Timer { interval_ms: u32 },
}

/// What an ability does
///
/// Amounts are base payloads; they are scaled by the caster's ability power
/// (which carries the star multiplier) when the ability resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AbilityEffect {
    Damage {
        amount: f32,
        #[serde(default)]
        damage_type: DamageType,
        /// Extra damage as a fraction of the caster's attack
        #[serde(default)]
        attack_ratio: f32,
    },
    Heal {
        amount: f32,
    },
    Shield {
        amount: f32,
    },
    Buff {
        status: StatusSpec,
    },
    /// Any harmful status: DoT, stat debuff, stun, slow, root
    Debuff {
        status: StatusSpec,
    },
    Summon {
        template_id: String,
        #[serde(default = "default_star")]
        star_level: u8,
        #[serde(default = "default_count")]
        count: u32,
    },
    /// Damage, healing the caster for the health removed
    Drain {
        amount: f32,
        #[serde(default)]
        damage_type: DamageType,
    },
    /// Damage to every enemy within `radius` of the primary target
    AreaDamage {
        amount: f32,
        #[serde(default)]
        damage_type: DamageType,
        radius: u32,
    },
    /// Jump to a free hex adjacent to the primary target
    Blink,
    /// Status on every living ally, ignoring the target policy
    TeamBuff {
        status: StatusSpec,
    },
    /// Finish targets at or below `threshold` health fraction; otherwise a plain hit
    Execute {
        threshold: f32,
        #[serde(default)]
        amount: f32,
        #[serde(default)]
        damage_type: DamageType,
    },
    /// Remove negative statuses
    Cleanse,
}

fn default_star() -> u8 {
    1
}

fn default_count() -> u32 {
    1
}

impl AbilityEffect {
    /// Effects that do nothing without a resolved target
    fn needs_targets(&self) -> bool {
        !matches!(
            self,
            AbilityEffect::Summon { .. } | AbilityEffect::TeamBuff { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub name: String,
    pub trigger: AbilityTrigger,
    pub effect: AbilityEffect,
    #[serde(default)]
    pub target: TargetPolicy,
}

/// Ability power / 100
///
/// Ability power is already star-scaled by the stat aggregator, so this is
/// the only place the star multiplier reaches a payload.
pub fn payload_multiplier(ctx: &MatchContext, caster: UnitId) -> f32 {
    ctx.units[caster.index()].effective(StatKind::AbilityPower) / NEUTRAL_ABILITY_POWER
}

/// Resolve the caster's ability; returns false if it had nothing to act on
///
/// Records one AbilityCast event followed by the events of its effect.
pub fn cast(ctx: &mut MatchContext, caster: UnitId) -> bool {
    let Some(ability) = ctx.units[caster.index()].ability.clone() else {
        return false;
    };

    let targets = select_targets(ctx, caster, &ability.target);
    if targets.is_empty() && ability.effect.needs_targets() {
        debug!(caster = %caster, ability = %ability.name, "Ability has no targets");
        return false;
    }

    let tick = ctx.tick;
    ctx.recorder.record(
        tick,
        CombatEventKind::AbilityCast {
            caster_id: caster,
            ability_name: ability.name.clone(),
            target_ids: targets.clone(),
        },
    );
    ctx.units[caster.index()].acted_tick = Some(tick);

    let multiplier = payload_multiplier(ctx, caster);
    match &ability.effect {
        AbilityEffect::Damage {
            amount,
            damage_type,
            attack_ratio,
        } => {
            let raw = amount * multiplier
                + attack_ratio * ctx.units[caster.index()].effective(StatKind::Attack);
            for target in targets {
                ability_damage(ctx, caster, target, raw, *damage_type);
            }
        }
        AbilityEffect::Heal { amount } => {
            for target in targets {
                heal(ctx, caster, target, amount * multiplier);
            }
        }
        AbilityEffect::Shield { amount } => {
            for target in targets {
                apply_shield(ctx, caster, target, amount * multiplier);
            }
        }
        AbilityEffect::Buff { status } | AbilityEffect::Debuff { status } => {
            for target in targets {
                apply_status(ctx, caster, target, status, multiplier);
            }
        }
        AbilityEffect::TeamBuff { status } => {
            let side = ctx.units[caster.index()].side;
            let allies: Vec<UnitId> = ctx
                .units
                .iter()
                .filter(|unit| unit.side == side && unit.is_targetable())
                .map(|unit| unit.id)
                .collect();
            for ally in allies {
                apply_status(ctx, caster, ally, status, multiplier);
            }
        }
        AbilityEffect::Summon {
            template_id,
            star_level,
            count,
        } => {
            for _ in 0..*count {
                if ctx.spawn_summon(caster, template_id, *star_level).is_none() {
                    break;
                }
            }
        }
        AbilityEffect::Drain {
            amount,
            damage_type,
        } => {
            for target in targets {
                let drained =
                    ability_damage(ctx, caster, target, amount * multiplier, *damage_type);
                heal(ctx, caster, caster, drained);
            }
        }
        AbilityEffect::AreaDamage {
            amount,
            damage_type,
            radius,
        } => {
            if let Some(&primary) = targets.first() {
                let side = ctx.units[caster.index()].side;
                let center = ctx.units[primary.index()].position;
                let victims: Vec<UnitId> = ctx
                    .units
                    .iter()
                    .filter(|unit| {
                        unit.side != side
                            && unit.is_targetable()
                            && unit.position.distance(&center) <= *radius
                    })
                    .map(|unit| unit.id)
                    .collect();
                for victim in victims {
                    ability_damage(ctx, caster, victim, amount * multiplier, *damage_type);
                }
            }
        }
        AbilityEffect::Blink => {
            if let Some(&primary) = targets.first() {
                blink(ctx, caster, primary);
            }
        }
        AbilityEffect::Execute {
            threshold,
            amount,
            damage_type,
        } => {
            for target in targets {
                execute(ctx, caster, target, *threshold, amount * multiplier, *damage_type);
            }
        }
        AbilityEffect::Cleanse => {
            for target in targets {
                cleanse(ctx, target);
            }
        }
    }

    true
}

/// Ability damage; returns health removed
fn ability_damage(
    ctx: &mut MatchContext,
    caster: UnitId,
    target: UnitId,
    raw: f32,
    damage_type: DamageType,
) -> f32 {
    deal_damage(
        ctx,
        DamageRequest {
            source: caster,
            target,
            raw,
            damage_type,
            origin: DamageOrigin::Ability,
        },
    )
    .health_removed
}

/// Kill outright at or below the threshold (checked before the hit), else deal `amount`
fn execute(
    ctx: &mut MatchContext,
    caster: UnitId,
    target: UnitId,
    threshold: f32,
    amount: f32,
    damage_type: DamageType,
) {
    let unit = &ctx.units[target.index()];
    if !unit.is_targetable() {
        return;
    }
    let fraction = unit.health / unit.max_health();
    if fraction <= threshold {
        let finishing_blow = unit.health + unit.shield;
        ability_damage(ctx, caster, target, finishing_blow, DamageType::True);
    } else if amount > 0.0 {
        ability_damage(ctx, caster, target, amount, damage_type);
    }
}

/// Move the caster to the free hex next to `target` closest to where it stands
fn blink(ctx: &mut MatchContext, caster: UnitId, target: UnitId) {
    let from = ctx.units[caster.index()].position;
    let anchor = ctx.units[target.index()].position;
    if from.is_adjacent(&anchor) {
        ctx.units[caster.index()].target = Some(target);
        return;
    }

    let Some(landing) = ctx
        .field
        .free_neighbors(anchor)
        .into_iter()
        .min_by_key(|coord| (coord.distance(&from), *coord))
    else {
        debug!(caster = %caster, target = %target, "Blink has nowhere to land");
        return;
    };

    if !ctx.field.relocate(caster, from, landing) {
        warn!(caster = %caster, "Blink landing hex was taken");
        return;
    }
    let unit = &mut ctx.units[caster.index()];
    unit.position = landing;
    unit.target = Some(target);
    unit.move_progress = 0.0;

    let tick = ctx.tick;
    ctx.recorder.record(
        tick,
        CombatEventKind::Move {
            unit_id: caster,
            from: from.to_offset(),
            to: landing.to_offset(),
        },
    );
}
