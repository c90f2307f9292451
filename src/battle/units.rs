//! Per-match mutable unit state

use serde::{Deserialize, Serialize};

use crate::battle::hex::HexCoord;
use crate::combat::abilities::{AbilityDefinition, AbilityTrigger};
use crate::combat::damage::DamageType;
use crate::combat::stats::ResolvedStats;
use crate::combat::status::{self, StatusEffect};
use crate::core::config::MatchConfig;
use crate::core::types::{Side, Tick, UnitId};
use crate::rules::tables::{StatKind, UnitTemplate};

/// A unit on the battlefield
///
/// `stats` are fixed at spawn. Everything else changes as the match runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatUnit {
    pub id: UnitId,
    pub side: Side,
    pub template_id: String,
    pub star_level: u8,
    pub stats: ResolvedStats,
    pub damage_type: DamageType,
    pub ability: Option<AbilityDefinition>,

    // Resources
    pub health: f32,
    pub mana: f32,
    pub shield: f32,

    // Position and intent
    pub position: HexCoord,
    pub target: Option<UnitId>,
    pub move_progress: f32,
    /// Could not step toward its target last movement phase
    pub blocked: bool,

    // Timers
    /// Ticks until the next basic attack is allowed
    pub attack_cooldown: u32,
    /// Ticks until a timer-triggered ability fires
    pub ability_timer: u32,
    pub hits_landed: u32,

    pub statuses: Vec<StatusEffect>,
    pub acted_tick: Option<Tick>,
    pub dead: bool,
    pub last_damaged_by: Option<UnitId>,
    pub is_summon: bool,
    /// Health removed from enemies by this unit
    pub damage_dealt: f32,
}

impl CombatUnit {
    pub fn new(
        id: UnitId,
        side: Side,
        template: &UnitTemplate,
        star_level: u8,
        stats: ResolvedStats,
        position: HexCoord,
        config: &MatchConfig,
    ) -> Self {
        let ability_timer = match template.ability.as_ref().map(|a| &a.trigger) {
            Some(AbilityTrigger::Timer { interval_ms }) => config.ms_to_ticks(*interval_ms),
            _ => 0,
        };

        Self {
            id,
            side,
            template_id: template.id.clone(),
            star_level,
            health: stats.health,
            mana: stats.starting_mana,
            shield: 0.0,
            damage_type: template.damage_type,
            ability: template.ability.clone(),
            stats,
            position,
            target: None,
            move_progress: 0.0,
            blocked: false,
            attack_cooldown: 0,
            ability_timer,
            hits_landed: 0,
            statuses: Vec::new(),
            acted_tick: None,
            dead: false,
            last_damaged_by: None,
            is_summon: false,
            damage_dealt: 0.0,
        }
    }

    /// Not yet reaped (may be at zero health pending the end of a phase)
    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Can be chosen as a new target or receive effects
    pub fn is_targetable(&self) -> bool {
        !self.dead && self.health > 0.0
    }

    pub fn max_health(&self) -> f32 {
        self.stats.health
    }

    pub fn health_fraction(&self) -> f32 {
        self.health / self.max_health()
    }

    /// Resolved stat plus active buffs minus debuffs
    ///
    /// Max health is not affected by statuses; see [`Self::max_health`].
    pub fn effective(&self, stat: StatKind) -> f32 {
        let value = self.stats.get(stat) + status::stat_delta(&self.statuses, stat);
        match stat {
            // Resists may go negative and are floored in mitigation
            StatKind::Armor | StatKind::MagicResist => value,
            StatKind::Health => self.stats.health,
            _ => value.max(0.0),
        }
    }

    pub fn range(&self) -> u32 {
        self.effective(StatKind::Range).round().max(1.0) as u32
    }

    pub fn is_stunned(&self) -> bool {
        status::is_stunned(&self.statuses)
    }

    pub fn is_rooted(&self) -> bool {
        status::is_rooted(&self.statuses)
    }

    pub fn slow_factor(&self) -> f32 {
        status::slow_factor(&self.statuses)
    }

    pub fn in_range_of(&self, other: &CombatUnit) -> bool {
        self.position.distance(&other.position) <= self.range()
    }

    /// Cooldown after a basic attack, in ticks (at least one)
    pub fn attack_interval_ticks(&self, config: &MatchConfig) -> u32 {
        let attack_speed = (self.effective(StatKind::AttackSpeed) * self.slow_factor())
            .clamp(config.min_attack_speed, config.max_attack_speed);
        let interval_ms = 1000.0 / attack_speed;
        ((interval_ms / config.tick_ms as f32).round() as u32).max(1)
    }

    /// Hexes of movement progress gained this tick
    pub fn move_gain(&self, config: &MatchConfig) -> f32 {
        self.effective(StatKind::MoveSpeed) * config.tick_seconds() * self.slow_factor()
    }

    pub fn max_mana(&self) -> f32 {
        self.effective(StatKind::MaxMana)
    }

    /// Add mana, capped at the pool size (units without a pool gain nothing)
    pub fn gain_mana(&mut self, amount: f32) {
        let max_mana = self.max_mana();
        if max_mana <= 0.0 || amount <= 0.0 {
            return;
        }
        self.mana = (self.mana + amount).min(max_mana);
    }

    pub fn has_full_mana(&self) -> bool {
        let max_mana = self.max_mana();
        max_mana > 0.0 && self.mana >= max_mana
    }

    pub fn trigger(&self) -> Option<&AbilityTrigger> {
        self.ability.as_ref().map(|ability| &ability.trigger)
    }
}

/// Plain unit for unit tests: default stats, no ability, crit disabled
#[cfg(test)]
pub fn test_unit(index: u32, side: Side, position: HexCoord) -> CombatUnit {
    use crate::combat::stats::resolve;
    use crate::rules::tables::{BaseStats, StarScaling};

    let template = UnitTemplate::new(
        "dummy",
        "Dummy",
        BaseStats {
            crit_chance: 0.0,
            ..BaseStats::default()
        },
    );
    let config = MatchConfig::default();
    let stats = resolve(&template, 1, &[], &[], &[], &StarScaling::default(), &config);
    CombatUnit::new(UnitId(index), side, &template, 1, stats, position, &config)
}
