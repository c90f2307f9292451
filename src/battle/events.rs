//! Combat event trace
//!
//! The trace is the contract with anything that replays a match: a renderer,
//! a client verifying a server result, or a test. Events are appended in the
//! order they happen and never modified.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::battle::hex::OffsetCoord;
use crate::battle::outcome::MatchOutcome;
use crate::combat::damage::DamageType;
use crate::combat::stats::ResolvedStats;
use crate::combat::status::StatusKind;
use crate::core::types::{Side, Tick, UnitId};

/// One entry in the trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub tick: Tick,
    #[serde(flatten)]
    pub event: CombatEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CombatEventKind {
    Spawn {
        unit_id: UnitId,
        side: Side,
        template_id: String,
        star_level: u8,
        position: OffsetCoord,
        stats: ResolvedStats,
    },
    Move {
        unit_id: UnitId,
        from: OffsetCoord,
        to: OffsetCoord,
    },
    AttackStart {
        attacker_id: UnitId,
        target_id: UnitId,
    },
    Damage {
        source_id: UnitId,
        target_id: UnitId,
        /// Post-mitigation, post-shield, pre-clamp
        amount: f32,
        damage_type: DamageType,
        was_crit: bool,
        absorbed: f32,
        overkill: f32,
        remaining_health: f32,
    },
    Heal {
        source_id: UnitId,
        target_id: UnitId,
        amount: f32,
    },
    ShieldApplied {
        source_id: UnitId,
        target_id: UnitId,
        amount: f32,
    },
    StatusApplied {
        target_id: UnitId,
        status: StatusKind,
        name: String,
        source_id: UnitId,
    },
    StatusExpired {
        target_id: UnitId,
        status: StatusKind,
        name: String,
        source_id: UnitId,
    },
    AbilityCast {
        caster_id: UnitId,
        ability_name: String,
        target_ids: Vec<UnitId>,
    },
    Death {
        unit_id: UnitId,
        killer_id: Option<UnitId>,
    },
    CombatEnd {
        outcome: MatchOutcome,
        remaining_units: u32,
        total_damage: f32,
    },
}

impl CombatEventKind {
    /// Short tag used in logs and text output
    pub fn label(&self) -> &'static str {
        match self {
            CombatEventKind::Spawn { .. } => "spawn",
            CombatEventKind::Move { .. } => "move",
            CombatEventKind::AttackStart { .. } => "attack_start",
            CombatEventKind::Damage { .. } => "damage",
            CombatEventKind::Heal { .. } => "heal",
            CombatEventKind::ShieldApplied { .. } => "shield_applied",
            CombatEventKind::StatusApplied { .. } => "status_applied",
            CombatEventKind::StatusExpired { .. } => "status_expired",
            CombatEventKind::AbilityCast { .. } => "ability_cast",
            CombatEventKind::Death { .. } => "death",
            CombatEventKind::CombatEnd { .. } => "combat_end",
        }
    }
}

/// Append-only event log for one match
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Vec<CombatEvent>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tick: Tick, event: CombatEventKind) {
        trace!(tick, kind = event.label(), "event");
        self.events.push(CombatEvent { tick, event });
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<CombatEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_keep_order() {
        let mut recorder = EventRecorder::new();
        recorder.record(
            1,
            CombatEventKind::AttackStart {
                attacker_id: UnitId(0),
                target_id: UnitId(1),
            },
        );
        recorder.record(
            1,
            CombatEventKind::Death {
                unit_id: UnitId(1),
                killer_id: Some(UnitId(0)),
            },
        );
        let labels: Vec<_> = recorder.events().iter().map(|e| e.event.label()).collect();
        assert_eq!(labels, vec!["attack_start", "death"]);
    }

    #[test]
    fn test_event_json_shape() {
        let event = CombatEvent {
            tick: 12,
            event: CombatEventKind::Death {
                unit_id: UnitId(3),
                killer_id: None,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["tick"], 12);
        assert_eq!(json["kind"], "death");
        assert_eq!(json["unit_id"], 3);
        assert!(json["killer_id"].is_null());

        let back: CombatEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
