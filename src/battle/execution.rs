//! Match execution loop
//!
//! Tick 0: spawn -> combat-start abilities -> outcome
//! Each later tick: status -> movement -> attacks -> abilities -> outcome
//!
//! Within a phase units act in unit-index order. Deaths are reaped at the
//! end of each phase (and after every ability cast), so a unit killed during
//! the attack phase still gets the attack it was eligible for.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::battle::battlefield::Battlefield;
use crate::battle::constants::MAX_TRIGGER_WAVES;
use crate::battle::events::{CombatEvent, CombatEventKind, EventRecorder};
use crate::battle::hex::HexCoord;
use crate::battle::movement::move_unit;
use crate::battle::outcome::{evaluate, DamageTotals, DrawReason, MatchOutcome, MatchPhase, MatchResult};
use crate::battle::roster::TeamComposition;
use crate::battle::units::CombatUnit;
use crate::combat::abilities::{cast, AbilityTrigger};
use crate::combat::damage::resolve_attack;
use crate::combat::stats::{resolve, trait_bonuses_for};
use crate::combat::status::advance_statuses;
use crate::core::error::{ArenaError, Result};
use crate::core::types::{Side, Tick, UnitId};
use crate::rules::tables::{CrestDefinition, ItemDefinition, RuleTables, UnitTemplate};

/// Trace plus result of one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub seed: u64,
    pub events: Vec<CombatEvent>,
    pub result: MatchResult,
}

/// Per-side state fixed before the first tick
#[derive(Debug, Clone, Default)]
struct TeamState {
    trait_tiers: BTreeMap<String, usize>,
    crests: Vec<String>,
}

/// Why a queued ability is waiting for the ability phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerCause {
    OnHit,
    OnKill,
    OnDeath,
}

#[derive(Debug, Clone, Copy)]
struct PendingTrigger {
    unit: UnitId,
    cause: TriggerCause,
}

/// All mutable state of one match
///
/// Passed by `&mut` through the scheduler and every resolver; nothing about a
/// match lives outside it.
pub struct MatchContext<'a> {
    pub rules: &'a RuleTables,
    pub units: Vec<CombatUnit>,
    pub field: Battlefield,
    pub rng: ChaCha8Rng,
    pub recorder: EventRecorder,
    pub tick: Tick,
    pub phase: MatchPhase,
    pub damage: DamageTotals,
    seed: u64,
    teams: [TeamState; 2],
    pending: Vec<PendingTrigger>,
    result: Option<MatchResult>,
}

impl<'a> MatchContext<'a> {
    /// Validate both teams and place every roster unit
    ///
    /// No events are recorded until [`Self::run_setup`].
    pub fn new(
        rules: &'a RuleTables,
        team_a: &TeamComposition,
        team_b: &TeamComposition,
        seed: u64,
    ) -> Result<Self> {
        rules.validate()?;
        team_a.validate(Side::A, rules)?;
        team_b.validate(Side::B, rules)?;

        let config = &rules.config;
        let mut ctx = Self {
            rules,
            units: Vec::new(),
            field: Battlefield::new(config.board_width, config.board_height),
            rng: ChaCha8Rng::seed_from_u64(seed),
            recorder: EventRecorder::new(),
            tick: 0,
            phase: MatchPhase::Setup,
            damage: DamageTotals::default(),
            seed,
            teams: [
                TeamState {
                    trait_tiers: team_a.trait_tiers(rules),
                    crests: team_a.crests.clone(),
                },
                TeamState {
                    trait_tiers: team_b.trait_tiers(rules),
                    crests: team_b.crests.clone(),
                },
            ],
            pending: Vec::new(),
            result: None,
        };

        for (side, team) in [(Side::A, team_a), (Side::B, team_b)] {
            for entry in &team.units {
                let template = rules
                    .template(&entry.template_id)
                    .ok_or_else(|| ArenaError::UnknownUnit(entry.template_id.clone()))?;
                let items = entry
                    .items
                    .iter()
                    .map(|id| rules.item(id).ok_or_else(|| ArenaError::UnknownItem(id.clone())))
                    .collect::<Result<Vec<&ItemDefinition>>>()?;
                let position = ctx.field.to_battlefield(side, entry.position);
                ctx.place_unit(side, template, entry.star_level, &items, position, false)?;
            }
        }

        debug!(
            seed,
            units_a = team_a.units.len(),
            units_b = team_b.units.len(),
            "Match created"
        );
        Ok(ctx)
    }

    /// Resolve stats and put a new unit on the board; returns its id
    ///
    /// A mana ability whose resolved starting mana already fills the pool
    /// is rejected, since the unit would recast every tick.
    fn place_unit(
        &mut self,
        side: Side,
        template: &UnitTemplate,
        star_level: u8,
        items: &[&ItemDefinition],
        position: HexCoord,
        is_summon: bool,
    ) -> Result<UnitId> {
        let rules = self.rules;
        let team = &self.teams[side.index()];
        let trait_bonuses = trait_bonuses_for(template, &team.trait_tiers, rules);
        let crests: Vec<&CrestDefinition> = team
            .crests
            .iter()
            .filter_map(|id| rules.crest(id))
            .collect();

        let stats = resolve(
            template,
            star_level,
            items,
            &trait_bonuses,
            &crests,
            &rules.star_scaling,
            &rules.config,
        );
        if template.ability.as_ref().map(|ability| &ability.trigger) == Some(&AbilityTrigger::ManaFull)
            && stats.starting_mana >= stats.max_mana
        {
            return Err(ArenaError::FullManaPool {
                template_id: template.id.clone(),
                side,
            });
        }

        let id = UnitId::new(self.units.len() as u32);
        let mut unit = CombatUnit::new(
            id,
            side,
            template,
            star_level,
            stats,
            position,
            &rules.config,
        );
        unit.is_summon = is_summon;

        let placed = self.field.place(id, position);
        debug_assert!(placed, "spawn hex {:?} was not free", position);
        self.units.push(unit);
        Ok(id)
    }

    fn record_spawn(&mut self, id: UnitId) {
        let unit = &self.units[id.index()];
        let event = CombatEventKind::Spawn {
            unit_id: id,
            side: unit.side,
            template_id: unit.template_id.clone(),
            star_level: unit.star_level,
            position: unit.position.to_offset(),
            stats: unit.stats.clone(),
        };
        let tick = self.tick;
        self.recorder.record(tick, event);
    }

    /// Spawn a summoned unit next to `caster`; None if the side is full or the board is
    pub fn spawn_summon(&mut self, caster: UnitId, template_id: &str, star_level: u8) -> Option<UnitId> {
        let rules = self.rules;
        let side = self.units[caster.index()].side;

        let on_side = self.units.iter().filter(|unit| unit.side == side).count();
        if on_side >= rules.config.max_units_per_side {
            debug!(caster = %caster, "Summon skipped, side is full");
            return None;
        }

        let Some(template) = rules.template(template_id) else {
            warn!(template_id, "Summon of unknown template");
            return None;
        };
        let position = self.field.nearest_free(self.units[caster.index()].position)?;
        let star_level = star_level.clamp(1, rules.config.max_star_level);

        let id = match self.place_unit(side, template, star_level, &[], position, true) {
            Ok(id) => id,
            Err(error) => {
                warn!(caster = %caster, %error, "Summon skipped");
                return None;
            }
        };
        self.record_spawn(id);
        Some(id)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn result(&self) -> Option<&MatchResult> {
        self.result.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == MatchPhase::Ended
    }

    fn unit_ids(&self) -> Vec<UnitId> {
        (0..self.units.len() as u32).map(UnitId::new).collect()
    }

    /// Tick 0: spawn events, combat-start abilities, outcome check
    pub fn run_setup(&mut self) {
        if self.phase != MatchPhase::Setup {
            return;
        }
        self.tick = 0;

        for id in self.unit_ids() {
            self.record_spawn(id);
        }

        for id in self.unit_ids() {
            if self.units[id.index()].trigger() == Some(&AbilityTrigger::CombatStart) {
                cast(self, id);
                self.reap();
            }
        }
        self.drain_triggers();

        self.phase = MatchPhase::Running;
        self.phase_outcome();
    }

    /// Run one tick of combat
    pub fn run_tick(&mut self) {
        if self.phase == MatchPhase::Setup {
            self.run_setup();
        }
        if self.is_finished() {
            return;
        }
        self.tick += 1;

        // ===== PHASE 1: STATUS =====
        self.phase_status();

        // ===== PHASE 2: MOVEMENT =====
        self.phase_movement();

        // ===== PHASE 3: ATTACKS =====
        self.phase_attacks();

        // ===== PHASE 4: ABILITIES =====
        self.phase_abilities();

        self.enforce_invariants();

        // ===== PHASE 5: OUTCOME =====
        self.phase_outcome();
    }

    /// Run until the outcome is decided
    pub fn run_to_completion(&mut self) -> MatchResult {
        if self.phase == MatchPhase::Setup {
            self.run_setup();
        }
        loop {
            if let Some(result) = &self.result {
                return result.clone();
            }
            self.run_tick();
        }
    }

    fn phase_status(&mut self) {
        for id in self.unit_ids() {
            advance_statuses(self, id);
        }
        self.reap();
    }

    fn phase_movement(&mut self) {
        for id in self.unit_ids() {
            move_unit(self, id);
        }
    }

    fn phase_attacks(&mut self) {
        let rules = self.rules;
        let tick = self.tick;

        for unit in self.units.iter_mut().filter(|unit| unit.is_alive()) {
            unit.attack_cooldown = unit.attack_cooldown.saturating_sub(1);
        }

        // Eligibility is fixed here; deaths during the phase don't revoke it
        let ready: Vec<(UnitId, UnitId)> = self
            .units
            .iter()
            .filter(|unit| unit.is_targetable() && !unit.is_stunned() && unit.attack_cooldown == 0)
            .filter_map(|unit| {
                let target = &self.units[unit.target?.index()];
                (target.is_targetable() && unit.in_range_of(target)).then_some((unit.id, target.id))
            })
            .collect();

        for (attacker, target) in ready {
            self.recorder.record(
                tick,
                CombatEventKind::AttackStart {
                    attacker_id: attacker,
                    target_id: target,
                },
            );
            resolve_attack(self, attacker, target);

            let unit = &mut self.units[attacker.index()];
            unit.attack_cooldown = unit.attack_interval_ticks(&rules.config);
            unit.hits_landed += 1;
            unit.acted_tick = Some(tick);

            if let Some(AbilityTrigger::OnHit { every }) = unit.trigger() {
                if *every > 0 && unit.hits_landed % every == 0 {
                    self.pending.push(PendingTrigger {
                        unit: attacker,
                        cause: TriggerCause::OnHit,
                    });
                }
            }
        }

        self.reap();
    }

    fn phase_abilities(&mut self) {
        let rules = self.rules;
        self.drain_triggers();

        for id in self.unit_ids() {
            let unit = &mut self.units[id.index()];
            if !unit.is_targetable() {
                continue;
            }
            let can_cast = !unit.is_stunned();

            match unit.trigger().cloned() {
                Some(AbilityTrigger::ManaFull) => {
                    if can_cast && unit.has_full_mana() && cast(self, id) {
                        let unit = &mut self.units[id.index()];
                        unit.mana = unit.stats.starting_mana;
                        self.reap();
                    }
                }
                Some(AbilityTrigger::Timer { interval_ms }) => {
                    unit.ability_timer = unit.ability_timer.saturating_sub(1);
                    if can_cast && unit.ability_timer == 0 && cast(self, id) {
                        self.units[id.index()].ability_timer = rules.config.ms_to_ticks(interval_ms);
                        self.reap();
                    }
                }
                _ => {}
            }
        }

        self.drain_triggers();
    }

    /// Fire queued on-hit, on-kill and on-death abilities
    ///
    /// Casts can kill, which can queue more triggers; each wave is fired in
    /// unit-index order.
    fn drain_triggers(&mut self) {
        for _ in 0..MAX_TRIGGER_WAVES {
            if self.pending.is_empty() {
                return;
            }
            let mut wave = std::mem::take(&mut self.pending);
            wave.sort_by_key(|trigger| trigger.unit);

            for PendingTrigger { unit, cause } in wave {
                let caster = &self.units[unit.index()];
                let allowed = match cause {
                    // A dying unit gets its last word even though it is already reaped
                    TriggerCause::OnDeath => true,
                    TriggerCause::OnHit | TriggerCause::OnKill => {
                        caster.is_targetable() && !caster.is_stunned()
                    }
                };
                if allowed {
                    cast(self, unit);
                    self.reap();
                }
            }
        }

        if !self.pending.is_empty() {
            warn!(
                tick = self.tick,
                dropped = self.pending.len(),
                "Trigger chain exceeded wave limit"
            );
            self.pending.clear();
        }
    }

    /// Mark every zero-health unit dead, free its hex, and queue death triggers
    fn reap(&mut self) {
        let tick = self.tick;
        let dying: Vec<UnitId> = self
            .units
            .iter()
            .filter(|unit| unit.is_alive() && unit.health <= 0.0)
            .map(|unit| unit.id)
            .collect();

        for id in dying {
            let unit = &mut self.units[id.index()];
            unit.dead = true;
            unit.health = 0.0;
            unit.shield = 0.0;
            unit.target = None;
            unit.statuses.clear();
            let position = unit.position;
            let killer = unit.last_damaged_by;
            let on_death = unit.trigger() == Some(&AbilityTrigger::OnDeath);

            self.field.vacate(id, position);
            self.recorder.record(
                tick,
                CombatEventKind::Death {
                    unit_id: id,
                    killer_id: killer,
                },
            );
            debug!(tick, unit = %id, killer = ?killer, "Unit died");

            if on_death {
                self.pending.push(PendingTrigger {
                    unit: id,
                    cause: TriggerCause::OnDeath,
                });
            }
            if let Some(killer) = killer.filter(|k| *k != id) {
                let killer_unit = &self.units[killer.index()];
                if killer_unit.is_alive()
                    && killer_unit.trigger() == Some(&AbilityTrigger::OnKill)
                {
                    self.pending.push(PendingTrigger {
                        unit: killer,
                        cause: TriggerCause::OnKill,
                    });
                }
            }
        }
    }

    /// Health must stay within [0, max]; clamp and complain if it did not
    fn enforce_invariants(&mut self) {
        for unit in &mut self.units {
            let max = unit.max_health();
            let in_bounds = unit.health >= 0.0 && unit.health <= max + 1e-3;
            debug_assert!(
                in_bounds,
                "unit {} health {} outside [0, {}]",
                unit.id, unit.health, max
            );
            if !in_bounds {
                warn!(unit = %unit.id, health = unit.health, max, "Health out of bounds, clamping");
                unit.health = unit.health.clamp(0.0, max);
            }
        }
    }

    fn phase_outcome(&mut self) {
        if self.result.is_some() {
            return;
        }
        let max_ticks = self.rules.config.max_ticks;
        if let Some((outcome, remaining_units)) = evaluate(&self.units, self.tick, max_ticks) {
            self.finish(outcome, remaining_units);
        }
    }

    fn finish(&mut self, outcome: MatchOutcome, remaining_units: u32) {
        let tick = self.tick;
        if matches!(
            outcome,
            MatchOutcome::Draw {
                reason: DrawReason::Timeout
            }
        ) {
            warn!(seed = self.seed, tick, "Match hit the tick cap");
        }

        self.recorder.record(
            tick,
            CombatEventKind::CombatEnd {
                outcome,
                remaining_units,
                total_damage: self.damage.total,
            },
        );
        self.phase = MatchPhase::Ended;
        self.result = Some(MatchResult {
            outcome,
            remaining_units,
            damage: self.damage,
            final_tick: tick,
        });

        debug!(
            seed = self.seed,
            tick,
            outcome = ?outcome,
            events = self.recorder.len(),
            "Match finished"
        );
    }

    /// Consume the context into its trace and result
    pub fn into_report(mut self) -> MatchReport {
        let result = self.run_to_completion();
        MatchReport {
            seed: self.seed,
            events: self.recorder.into_events(),
            result,
        }
    }
}

/// Simulate one match to completion
///
/// Fails before any tick runs if the rule tables or either team is invalid.
pub fn simulate(
    rules: &RuleTables,
    team_a: &TeamComposition,
    team_b: &TeamComposition,
    seed: u64,
) -> Result<MatchReport> {
    let ctx = MatchContext::new(rules, team_a, team_b, seed)?;
    Ok(ctx.into_report())
}

/// Simulate the same pairing under many seeds in parallel
///
/// Reports come back in seed order.
pub fn simulate_many(
    rules: &RuleTables,
    team_a: &TeamComposition,
    team_b: &TeamComposition,
    seeds: &[u64],
) -> Result<Vec<MatchReport>> {
    seeds
        .par_iter()
        .map(|seed| simulate(rules, team_a, team_b, *seed))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::roster::RosterEntry;
    use crate::core::config::MatchConfig;
    use crate::battle::targeting::TargetPolicy;
    use crate::combat::abilities::{AbilityDefinition, AbilityEffect};
    use crate::combat::damage::DamageType;
    use crate::rules::tables::{BaseStats, BonusMode, StatBonus, StatKind};

    fn rules_with(stats: BaseStats) -> RuleTables {
        let mut rules = RuleTables::new(MatchConfig::default());
        rules.add_unit(UnitTemplate::new("grunt", "Grunt", stats));
        rules
    }

    fn grunt_stats() -> BaseStats {
        BaseStats {
            health: 300.0,
            attack: 40.0,
            armor: 0.0,
            crit_chance: 0.0,
            ..BaseStats::default()
        }
    }

    fn single(col: i32, row: i32) -> TeamComposition {
        TeamComposition::new(vec![RosterEntry::new("grunt", col, row)])
    }

    #[test]
    fn test_setup_records_spawns_in_index_order() {
        let rules = rules_with(grunt_stats());
        let mut ctx = MatchContext::new(&rules, &single(0, 0), &single(0, 0), 1).unwrap();
        ctx.run_setup();

        let spawns: Vec<UnitId> = ctx
            .recorder
            .events()
            .iter()
            .filter_map(|event| match &event.event {
                CombatEventKind::Spawn { unit_id, .. } => Some(*unit_id),
                _ => None,
            })
            .collect();
        assert_eq!(spawns, vec![UnitId(0), UnitId(1)]);
        assert_eq!(ctx.phase, MatchPhase::Running);
        assert!(ctx.recorder.events().iter().all(|event| event.tick == 0));
    }

    #[test]
    fn test_side_b_is_mirrored_on_spawn() {
        let rules = rules_with(grunt_stats());
        let ctx = MatchContext::new(&rules, &single(0, 0), &single(0, 0), 1).unwrap();
        assert_eq!(ctx.units[0].position.to_offset().row, 0);
        assert_eq!(ctx.units[1].position.to_offset().row, 7);
        assert_eq!(ctx.units[1].position.to_offset().col, 6);
    }

    #[test]
    fn test_units_close_distance_before_fighting() {
        let rules = rules_with(grunt_stats());
        let mut ctx = MatchContext::new(&rules, &single(3, 0), &single(3, 0), 1).unwrap();
        let start = ctx.units[0].position.distance(&ctx.units[1].position);
        for _ in 0..20 {
            ctx.run_tick();
        }
        let now = ctx.units[0].position.distance(&ctx.units[1].position);
        assert!(now < start);
    }

    #[test]
    fn test_match_always_terminates() {
        let mut rules = RuleTables::new(MatchConfig {
            max_ticks: 50,
            ..MatchConfig::default()
        });
        // Nobody can hurt anybody
        rules.add_unit(UnitTemplate::new(
            "pacifist",
            "Pacifist",
            BaseStats {
                attack: 0.0,
                crit_chance: 0.0,
                ..BaseStats::default()
            },
        ));
        let team = TeamComposition::new(vec![RosterEntry::new("pacifist", 3, 3)]);
        let report = simulate(&rules, &team, &team, 3).unwrap();
        assert_eq!(
            report.result.outcome,
            MatchOutcome::Draw {
                reason: DrawReason::Timeout
            }
        );
        assert_eq!(report.result.final_tick, 50);
        assert_eq!(report.result.remaining_units, 2);
    }

    #[test]
    fn test_result_is_set_once_finished() {
        let rules = rules_with(grunt_stats());
        let mut ctx = MatchContext::new(&rules, &single(3, 3), &single(3, 3), 11).unwrap();
        assert_eq!(ctx.seed(), 11);
        assert!(ctx.result().is_none());

        let result = ctx.run_to_completion();
        assert!(ctx.is_finished());
        assert_eq!(ctx.result(), Some(&result));

        // Further ticks are no-ops
        let events = ctx.recorder.len();
        ctx.run_tick();
        assert_eq!(ctx.recorder.len(), events);
    }

    #[test]
    fn test_invalid_team_fails_before_simulating() {
        let rules = rules_with(grunt_stats());
        let empty = TeamComposition::default();
        assert!(matches!(
            simulate(&rules, &single(0, 0), &empty, 1),
            Err(ArenaError::EmptyRoster(Side::B))
        ));
    }

    #[test]
    fn test_simulate_many_keeps_seed_order() {
        let rules = rules_with(grunt_stats());
        let seeds = [5, 1, 9];
        let reports = simulate_many(&rules, &single(3, 3), &single(3, 3), &seeds).unwrap();
        let order: Vec<u64> = reports.iter().map(|report| report.seed).collect();
        assert_eq!(order, seeds);
    }

    fn mage_rules() -> RuleTables {
        let mut rules = rules_with(grunt_stats());
        rules.add_unit(
            UnitTemplate::new(
                "mage",
                "Mage",
                BaseStats {
                    max_mana: 100.0,
                    starting_mana: 50.0,
                    ..grunt_stats()
                },
            )
            .with_ability(AbilityDefinition {
                name: "Bolt".into(),
                trigger: AbilityTrigger::ManaFull,
                effect: AbilityEffect::Damage {
                    amount: 10.0,
                    damage_type: DamageType::Magic,
                    attack_ratio: 0.0,
                },
                target: TargetPolicy::NearestEnemy,
            }),
        );
        rules.add_item(ItemDefinition {
            id: "tome".into(),
            name: "Tome".into(),
            bonuses: vec![StatBonus::flat(StatKind::StartingMana, 60.0)],
        });
        rules.add_item(ItemDefinition {
            id: "dampener".into(),
            name: "Dampener".into(),
            bonuses: vec![StatBonus {
                stat: StatKind::MaxMana,
                amount: -60.0,
                mode: BonusMode::Percent,
            }],
        });
        rules
    }

    #[test]
    fn test_bonuses_that_fill_the_mana_pool_are_rejected() {
        let rules = mage_rules();
        for item in ["tome", "dampener"] {
            let team = TeamComposition::new(vec![RosterEntry::new("mage", 3, 3).with_items(&[item])]);
            let result = MatchContext::new(&rules, &team, &single(3, 3), 1);
            assert!(
                matches!(result, Err(ArenaError::FullManaPool { side: Side::A, .. })),
                "{} should leave the pool full",
                item
            );
        }

        let bare = TeamComposition::new(vec![RosterEntry::new("mage", 3, 3)]);
        let mut ctx = MatchContext::new(&rules, &bare, &single(3, 3), 1).unwrap();
        ctx.run_to_completion();
        let casts = ctx
            .recorder
            .events()
            .iter()
            .filter(|event| matches!(event.event, CombatEventKind::AbilityCast { .. }))
            .count();
        assert!((casts as u64) < ctx.tick);
    }
}
