//! Status effects: damage/heal over time, stat buffs and debuffs, crowd control
//!
//! Effects are owned by the unit they sit on. Re-applying the same kind from
//! the same source refreshes the duration instead of stacking; different
//! sources stack independently.

use serde::{Deserialize, Serialize};

use crate::battle::events::CombatEventKind;
use crate::battle::execution::MatchContext;
use crate::combat::damage::{deal_damage, heal, DamageOrigin, DamageRequest, DamageType};
use crate::core::types::UnitId;
use crate::rules::tables::StatKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusKind {
    DamageOverTime { damage_type: DamageType },
    HealOverTime,
    Buff { stat: StatKind },
    Debuff { stat: StatKind },
    /// No moving, attacking, or casting
    Stun,
    /// Multiplies attack speed and move speed by `1 - magnitude`
    Slow,
    /// No moving
    Root,
}

impl StatusKind {
    /// Removed by cleanse
    pub fn is_negative(&self) -> bool {
        !matches!(self, StatusKind::HealOverTime | StatusKind::Buff { .. })
    }

    /// Whether the magnitude scales with the caster's ability payload multiplier
    fn scales_with_power(&self) -> bool {
        matches!(
            self,
            StatusKind::DamageOverTime { .. }
                | StatusKind::HealOverTime
                | StatusKind::Buff { .. }
                | StatusKind::Debuff { .. }
        )
    }

    fn is_periodic(&self) -> bool {
        matches!(
            self,
            StatusKind::DamageOverTime { .. } | StatusKind::HealOverTime
        )
    }
}

/// An active effect on a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub name: String,
    pub remaining_ticks: u32,
    /// Per tick for DoT/HoT, additive delta for Buff/Debuff, fraction for Slow
    pub magnitude: f32,
    pub source: UnitId,
}

/// Authored description of a status an ability applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSpec {
    pub kind: StatusKind,
    pub name: String,
    pub duration_ms: u32,
    /// Per second for DoT/HoT, stat delta for Buff/Debuff, fraction for Slow
    #[serde(default)]
    pub magnitude: f32,
}

/// Net Buff minus Debuff adjustment for one stat
pub fn stat_delta(effects: &[StatusEffect], stat: StatKind) -> f32 {
    effects
        .iter()
        .map(|effect| match effect.kind {
            StatusKind::Buff { stat: s } if s == stat => effect.magnitude,
            StatusKind::Debuff { stat: s } if s == stat => -effect.magnitude,
            _ => 0.0,
        })
        .sum()
}

pub fn is_stunned(effects: &[StatusEffect]) -> bool {
    effects.iter().any(|effect| effect.kind == StatusKind::Stun)
}

pub fn is_rooted(effects: &[StatusEffect]) -> bool {
    effects
        .iter()
        .any(|effect| matches!(effect.kind, StatusKind::Root | StatusKind::Stun))
}

/// Speed multiplier from the strongest slow (slows do not stack)
pub fn slow_factor(effects: &[StatusEffect]) -> f32 {
    let strongest = effects
        .iter()
        .filter(|effect| effect.kind == StatusKind::Slow)
        .map(|effect| effect.magnitude)
        .fold(0.0_f32, f32::max);
    (1.0 - strongest).clamp(0.0, 1.0)
}

/// Put a status on `target`, refreshing an existing one from the same source
pub fn apply_status(
    ctx: &mut MatchContext,
    source: UnitId,
    target: UnitId,
    spec: &StatusSpec,
    payload_multiplier: f32,
) {
    let config = &ctx.rules.config;
    let duration = config.ms_to_ticks(spec.duration_ms);
    let mut magnitude = spec.magnitude;
    if spec.kind.scales_with_power() {
        magnitude *= payload_multiplier;
    }
    if spec.kind.is_periodic() {
        magnitude *= config.tick_seconds();
    }
    if spec.kind == StatusKind::Slow {
        magnitude = magnitude.clamp(0.0, 1.0);
    }

    let unit = &mut ctx.units[target.index()];
    if unit.dead || unit.health <= 0.0 {
        return;
    }

    match unit
        .statuses
        .iter_mut()
        .find(|effect| effect.kind == spec.kind && effect.source == source)
    {
        Some(existing) => {
            existing.remaining_ticks = duration;
            existing.magnitude = existing.magnitude.max(magnitude);
            existing.name = spec.name.clone();
        }
        None => unit.statuses.push(StatusEffect {
            kind: spec.kind,
            name: spec.name.clone(),
            remaining_ticks: duration,
            magnitude,
            source,
        }),
    }

    let tick = ctx.tick;
    ctx.recorder.record(
        tick,
        CombatEventKind::StatusApplied {
            target_id: target,
            status: spec.kind,
            name: spec.name.clone(),
            source_id: source,
        },
    );
}

/// Status phase work for one unit
///
/// Expired effects are removed (and recorded) first; survivors then deal
/// their periodic damage or healing and count down one tick. Health regen is
/// applied last.
pub fn advance_statuses(ctx: &mut MatchContext, unit_id: UnitId) {
    let tick = ctx.tick;
    let unit = &mut ctx.units[unit_id.index()];
    if unit.dead {
        return;
    }

    let (expired, active): (Vec<StatusEffect>, Vec<StatusEffect>) = unit
        .statuses
        .drain(..)
        .partition(|effect| effect.remaining_ticks == 0);
    unit.statuses = active;

    for effect in expired {
        ctx.recorder.record(
            tick,
            CombatEventKind::StatusExpired {
                target_id: unit_id,
                status: effect.kind,
                name: effect.name,
                source_id: effect.source,
            },
        );
    }

    let periodic: Vec<(StatusKind, f32, UnitId)> = ctx.units[unit_id.index()]
        .statuses
        .iter()
        .filter(|effect| effect.kind.is_periodic())
        .map(|effect| (effect.kind, effect.magnitude, effect.source))
        .collect();

    for (kind, magnitude, source) in periodic {
        match kind {
            StatusKind::DamageOverTime { damage_type } => {
                deal_damage(
                    ctx,
                    DamageRequest {
                        source,
                        target: unit_id,
                        raw: magnitude,
                        damage_type,
                        origin: DamageOrigin::Status,
                    },
                );
            }
            StatusKind::HealOverTime => {
                heal(ctx, source, unit_id, magnitude);
            }
            _ => {}
        }
    }

    let tick_seconds = ctx.rules.config.tick_seconds();
    let unit = &mut ctx.units[unit_id.index()];
    for effect in &mut unit.statuses {
        effect.remaining_ticks = effect.remaining_ticks.saturating_sub(1);
    }

    let regen = unit.effective(StatKind::HealthRegen) * tick_seconds;
    if regen > 0.0 {
        heal(ctx, unit_id, unit_id, regen);
    }
}

/// Strip every negative effect from `target`; returns how many were removed
pub fn cleanse(ctx: &mut MatchContext, target: UnitId) -> usize {
    let tick = ctx.tick;
    let unit = &mut ctx.units[target.index()];
    if unit.dead {
        return 0;
    }

    let (removed, kept): (Vec<StatusEffect>, Vec<StatusEffect>) = unit
        .statuses
        .drain(..)
        .partition(|effect| effect.kind.is_negative());
    unit.statuses = kept;

    let count = removed.len();
    for effect in removed {
        ctx.recorder.record(
            tick,
            CombatEventKind::StatusExpired {
                target_id: target,
                status: effect.kind,
                name: effect.name,
                source_id: effect.source,
            },
        );
    }
    count
}
