//! Unit movement toward targets
//!
//! Units accumulate fractional movement progress each tick and take one hex
//! step whenever a full step has built up. Steps are greedy when possible and
//! fall back to A* around blockers.

use tracing::trace;

use crate::battle::battlefield::Battlefield;
use crate::battle::constants::{PROGRESS_EPSILON, STEP_PROGRESS};
use crate::battle::events::CombatEventKind;
use crate::battle::execution::MatchContext;
use crate::battle::hex::HexCoord;
use crate::battle::pathfinding::path_into_range;
use crate::battle::targeting::nearest_enemy;
use crate::core::types::UnitId;

/// Best free neighbor that strictly closes the distance to `target`
///
/// Candidates are ranked by (distance, row distance, column distance, hex).
pub fn greedy_step(field: &Battlefield, from: HexCoord, target: HexCoord) -> Option<HexCoord> {
    let current = from.distance(&target);
    field
        .free_neighbors(from)
        .into_iter()
        .filter(|step| step.distance(&target) < current)
        .min_by_key(|step| {
            (
                step.distance(&target),
                step.row_distance(&target),
                step.col_distance(&target),
                *step,
            )
        })
}

/// Next hex to step onto when chasing a target at `range`
///
/// Greedy first; if every closing neighbor is blocked, the first hex of an
/// A* path to any free hex within range of the target.
pub fn next_step(
    field: &Battlefield,
    from: HexCoord,
    target: HexCoord,
    range: u32,
) -> Option<HexCoord> {
    if let Some(step) = greedy_step(field, from, target) {
        return Some(step);
    }
    path_into_range(field, from, target, range)
        .and_then(|path| path.get(1).copied())
}

/// Nearest enemy the unit can either already hit or take a step toward
fn reachable_enemy(ctx: &MatchContext, unit_id: UnitId) -> Option<UnitId> {
    let me = &ctx.units[unit_id.index()];
    let range = me.range();
    let mut candidates: Vec<_> = ctx
        .units
        .iter()
        .filter(|unit| unit.side == me.side.opponent() && unit.is_targetable())
        .collect();
    candidates.sort_by_key(|unit| (unit.position.distance(&me.position), unit.id));

    candidates
        .into_iter()
        .find(|unit| {
            me.in_range_of(unit) || next_step(&ctx.field, me.position, unit.position, range).is_some()
        })
        .map(|unit| unit.id)
}

/// Movement phase for one unit: retarget if needed, then step toward the target
pub fn move_unit(ctx: &mut MatchContext, unit_id: UnitId) {
    let rules = ctx.rules;
    let unit = &ctx.units[unit_id.index()];
    if !unit.is_targetable() || unit.is_stunned() {
        return;
    }

    let target_valid = unit
        .target
        .map(|id| ctx.units[id.index()].is_targetable())
        .unwrap_or(false);
    if !target_valid {
        let retarget = nearest_enemy(&ctx.units, unit_id);
        ctx.units[unit_id.index()].target = retarget;
    }

    let unit = &ctx.units[unit_id.index()];
    let Some(target_id) = unit.target else {
        return;
    };
    let target = &ctx.units[target_id.index()];
    if unit.in_range_of(target) {
        let unit = &mut ctx.units[unit_id.index()];
        unit.blocked = false;
        unit.move_progress = 0.0;
        return;
    }
    if unit.is_rooted() {
        return;
    }

    let from = unit.position;
    let goal = target.position;
    let range = unit.range();
    let gain = unit.move_gain(&rules.config);

    let unit = &mut ctx.units[unit_id.index()];
    unit.move_progress += gain;
    if unit.move_progress + PROGRESS_EPSILON < STEP_PROGRESS {
        return;
    }

    match next_step(&ctx.field, from, goal, range) {
        Some(step) => {
            if !ctx.field.relocate(unit_id, from, step) {
                return;
            }
            let unit = &mut ctx.units[unit_id.index()];
            unit.position = step;
            unit.move_progress = (unit.move_progress - STEP_PROGRESS).max(0.0);
            unit.blocked = false;

            let tick = ctx.tick;
            ctx.recorder.record(
                tick,
                CombatEventKind::Move {
                    unit_id,
                    from: from.to_offset(),
                    to: step.to_offset(),
                },
            );
        }
        None => {
            let unit = &mut ctx.units[unit_id.index()];
            unit.blocked = true;
            // Do not bank progress while stuck
            unit.move_progress = unit.move_progress.min(STEP_PROGRESS);

            let retarget = reachable_enemy(ctx, unit_id);
            if retarget.is_some() && retarget != Some(target_id) {
                trace!(unit = %unit_id, from = %target_id, "Blocked, switching target");
                ctx.units[unit_id.index()].target = retarget;
            }
        }
    }
}
