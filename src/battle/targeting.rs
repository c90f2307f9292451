//! Target selection
//!
//! All selection is a pure function of unit state (plus the match RNG for
//! `random_enemy`). Ties are broken by lowest unit index, then lowest hex, so
//! two simulations of the same match always agree.

use ordered_float::OrderedFloat;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::battle::battlefield::Battlefield;
use crate::battle::execution::MatchContext;
use crate::battle::units::CombatUnit;
use crate::core::types::UnitId;

/// Who an ability (or a basic attack) is aimed at
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetPolicy {
    #[default]
    NearestEnemy,
    /// The unit's attack target, falling back to the nearest enemy
    CurrentTarget,
    LowestHealthEnemy,
    HighestHealthEnemy,
    /// Includes the caster
    LowestHealthAlly,
    AllEnemies,
    AllAllies,
    EnemiesInRadius { radius: u32 },
    AlliesInRadius { radius: u32 },
    #[serde(rename = "self")]
    SelfUnit,
    RandomEnemy,
    /// Deepest enemy inside its own half
    BacklineEnemy,
    FarthestEnemy,
    /// Primary target plus every enemy adjacent to it
    AdjacentEnemies,
    /// Enemies on the hex line from the caster through its primary target
    Line { length: u32 },
}

fn enemies<'a>(units: &'a [CombatUnit], caster: &'a CombatUnit) -> impl Iterator<Item = &'a CombatUnit> {
    units
        .iter()
        .filter(move |unit| unit.side == caster.side.opponent() && unit.is_targetable())
}

fn allies<'a>(units: &'a [CombatUnit], caster: &'a CombatUnit) -> impl Iterator<Item = &'a CombatUnit> {
    units
        .iter()
        .filter(move |unit| unit.side == caster.side && unit.is_targetable())
}

fn health_key(unit: &CombatUnit) -> OrderedFloat<f32> {
    OrderedFloat(unit.health_fraction())
}

/// Nearest living enemy, ties to lowest index then lowest hex
pub fn nearest_enemy(units: &[CombatUnit], caster: UnitId) -> Option<UnitId> {
    let me = &units[caster.index()];
    enemies(units, me)
        .min_by_key(|unit| (unit.position.distance(&me.position), unit.id, unit.position))
        .map(|unit| unit.id)
}

/// The caster's current target if it is still targetable
fn current_or_nearest(units: &[CombatUnit], caster: UnitId) -> Option<UnitId> {
    let me = &units[caster.index()];
    me.target
        .filter(|id| {
            let target = &units[id.index()];
            target.is_targetable() && target.side != me.side
        })
        .or_else(|| nearest_enemy(units, caster))
}

/// Resolve a policy to a list of unit ids
///
/// Single-target policies return at most one id. Multi-target policies return
/// ids in unit-index order, except `line`, which returns them in ray order.
pub fn resolve_policy<R: Rng>(
    units: &[CombatUnit],
    field: &Battlefield,
    rng: &mut R,
    caster: UnitId,
    policy: &TargetPolicy,
) -> Vec<UnitId> {
    let me = &units[caster.index()];
    let here = me.position;

    let single = |id: Option<UnitId>| id.into_iter().collect::<Vec<_>>();

    match policy {
        TargetPolicy::NearestEnemy => single(nearest_enemy(units, caster)),
        TargetPolicy::CurrentTarget => single(current_or_nearest(units, caster)),
        TargetPolicy::LowestHealthEnemy => single(
            enemies(units, me)
                .min_by_key(|unit| (health_key(unit), unit.position.distance(&here), unit.id))
                .map(|unit| unit.id),
        ),
        TargetPolicy::HighestHealthEnemy => single(
            enemies(units, me)
                .min_by_key(|unit| {
                    (
                        Reverse(health_key(unit)),
                        unit.position.distance(&here),
                        unit.id,
                    )
                })
                .map(|unit| unit.id),
        ),
        TargetPolicy::LowestHealthAlly => single(
            allies(units, me)
                .min_by_key(|unit| (health_key(unit), unit.position.distance(&here), unit.id))
                .map(|unit| unit.id),
        ),
        TargetPolicy::AllEnemies => enemies(units, me).map(|unit| unit.id).collect(),
        TargetPolicy::AllAllies => allies(units, me).map(|unit| unit.id).collect(),
        TargetPolicy::EnemiesInRadius { radius } => enemies(units, me)
            .filter(|unit| unit.position.distance(&here) <= *radius)
            .map(|unit| unit.id)
            .collect(),
        TargetPolicy::AlliesInRadius { radius } => allies(units, me)
            .filter(|unit| unit.position.distance(&here) <= *radius)
            .map(|unit| unit.id)
            .collect(),
        TargetPolicy::SelfUnit => {
            if me.is_targetable() {
                vec![caster]
            } else {
                Vec::new()
            }
        }
        TargetPolicy::RandomEnemy => {
            let candidates: Vec<UnitId> = enemies(units, me).map(|unit| unit.id).collect();
            if candidates.is_empty() {
                Vec::new()
            } else {
                vec![candidates[rng.gen_range(0..candidates.len())]]
            }
        }
        TargetPolicy::BacklineEnemy => single(
            enemies(units, me)
                .min_by_key(|unit| {
                    (
                        Reverse(field.depth(unit.side, unit.position)),
                        unit.position.distance(&here),
                        unit.id,
                    )
                })
                .map(|unit| unit.id),
        ),
        TargetPolicy::FarthestEnemy => single(
            enemies(units, me)
                .min_by_key(|unit| (Reverse(unit.position.distance(&here)), unit.id))
                .map(|unit| unit.id),
        ),
        TargetPolicy::AdjacentEnemies => {
            let Some(primary) = current_or_nearest(units, caster) else {
                return Vec::new();
            };
            let center = units[primary.index()].position;
            let mut hit = vec![primary];
            hit.extend(
                enemies(units, me)
                    .filter(|unit| unit.id != primary && unit.position.is_adjacent(&center))
                    .map(|unit| unit.id),
            );
            hit
        }
        TargetPolicy::Line { length } => {
            let Some(primary) = current_or_nearest(units, caster) else {
                return Vec::new();
            };
            let through = units[primary.index()].position;
            here.ray_through(&through, *length)
                .into_iter()
                .filter_map(|coord| field.occupant(coord))
                .filter(|id| {
                    let unit = &units[id.index()];
                    unit.side != me.side && unit.is_targetable()
                })
                .collect()
        }
    }
}

/// Resolve a policy against the live match state
pub fn select_targets(ctx: &mut MatchContext, caster: UnitId, policy: &TargetPolicy) -> Vec<UnitId> {
    resolve_policy(&ctx.units, &ctx.field, &mut ctx.rng, caster, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::hex::OffsetCoord;
    use crate::battle::units::test_unit;
    use crate::core::types::Side;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Build units and a matching battlefield from (side, col, row) in battlefield coordinates
    fn setup(layout: &[(Side, i32, i32)]) -> (Vec<CombatUnit>, Battlefield) {
        let mut field = Battlefield::new(7, 8);
        let units: Vec<CombatUnit> = layout
            .iter()
            .enumerate()
            .map(|(i, (side, col, row))| {
                let position = OffsetCoord::new(*col, *row).to_hex();
                field.place(UnitId(i as u32), position);
                test_unit(i as u32, *side, position)
            })
            .collect();
        (units, field)
    }

    fn resolve(units: &[CombatUnit], field: &Battlefield, caster: u32, policy: TargetPolicy) -> Vec<UnitId> {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        resolve_policy(units, field, &mut rng, UnitId(caster), &policy)
    }

    #[test]
    fn test_nearest_enemy_tie_breaks_on_index() {
        // Two enemies at equal distance: the lower index wins even though
        // unit 2 sits on the lower hex
        let (units, _) = setup(&[(Side::A, 3, 3), (Side::B, 4, 4), (Side::B, 3, 4)]);
        assert!(units[2].position < units[1].position);
        let d1 = units[0].position.distance(&units[1].position);
        let d2 = units[0].position.distance(&units[2].position);
        assert_eq!(d1, d2);
        assert_eq!(nearest_enemy(&units, UnitId(0)), Some(UnitId(1)));
    }

    #[test]
    fn test_dead_units_are_never_chosen() {
        let (mut units, field) = setup(&[(Side::A, 3, 3), (Side::B, 3, 4), (Side::B, 3, 7)]);
        units[1].dead = true;
        units[1].health = 0.0;
        assert_eq!(nearest_enemy(&units, UnitId(0)), Some(UnitId(2)));
        assert_eq!(
            resolve(&units, &field, 0, TargetPolicy::AllEnemies),
            vec![UnitId(2)]
        );
    }

    #[test]
    fn test_lowest_health_uses_fraction() {
        let (mut units, field) = setup(&[(Side::A, 3, 0), (Side::B, 0, 7), (Side::B, 6, 7)]);
        // Unit 1: 300/1000 = 30%. Unit 2: 100/200 = 50%.
        units[1].stats.health = 1000.0;
        units[1].health = 300.0;
        units[2].stats.health = 200.0;
        units[2].health = 100.0;
        assert_eq!(
            resolve(&units, &field, 0, TargetPolicy::LowestHealthEnemy),
            vec![UnitId(1)]
        );
        assert_eq!(
            resolve(&units, &field, 0, TargetPolicy::HighestHealthEnemy),
            vec![UnitId(2)]
        );
    }

    #[test]
    fn test_backline_and_farthest() {
        let (units, field) = setup(&[(Side::A, 3, 3), (Side::B, 3, 4), (Side::B, 0, 7)]);
        assert_eq!(
            resolve(&units, &field, 0, TargetPolicy::BacklineEnemy),
            vec![UnitId(2)]
        );
        assert_eq!(
            resolve(&units, &field, 0, TargetPolicy::FarthestEnemy),
            vec![UnitId(2)]
        );
    }

    #[test]
    fn test_adjacent_enemies_cleave() {
        let (units, field) = setup(&[
            (Side::A, 3, 3),
            (Side::B, 3, 4),
            (Side::B, 4, 4),
            (Side::B, 0, 7),
        ]);
        let hit = resolve(&units, &field, 0, TargetPolicy::AdjacentEnemies);
        assert_eq!(hit, vec![UnitId(1), UnitId(2)]);
    }

    #[test]
    fn test_line_follows_ray() {
        let (units, field) = setup(&[
            (Side::A, 3, 2),
            (Side::B, 3, 4),
            (Side::B, 3, 6),
            (Side::B, 0, 7),
        ]);
        let hit = resolve(&units, &field, 0, TargetPolicy::Line { length: 5 });
        assert!(hit.contains(&UnitId(1)));
        assert!(!hit.contains(&UnitId(3)));
    }

    #[test]
    fn test_random_enemy_is_seeded() {
        let (units, field) = setup(&[(Side::A, 3, 3), (Side::B, 3, 4), (Side::B, 0, 7)]);
        let first = resolve(&units, &field, 0, TargetPolicy::RandomEnemy);
        let second = resolve(&units, &field, 0, TargetPolicy::RandomEnemy);
        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_allies_include_self() {
        let (units, field) = setup(&[(Side::A, 3, 3), (Side::A, 4, 3), (Side::B, 3, 7)]);
        assert_eq!(
            resolve(&units, &field, 0, TargetPolicy::AllAllies),
            vec![UnitId(0), UnitId(1)]
        );
        assert_eq!(
            resolve(&units, &field, 0, TargetPolicy::AlliesInRadius { radius: 0 }),
            vec![UnitId(0)]
        );
        assert_eq!(resolve(&units, &field, 0, TargetPolicy::SelfUnit), vec![UnitId(0)]);
    }
}
