//! Match outcome evaluation

use serde::{Deserialize, Serialize};

use crate::battle::units::CombatUnit;
use crate::core::types::{Side, Tick};

/// Match lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    Setup,
    Running,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawReason {
    /// Both sides lost their last unit in the same tick
    MutualElimination,
    /// Tick cap reached with both sides standing
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MatchOutcome {
    Winner { side: Side },
    Draw { reason: DrawReason },
}

impl MatchOutcome {
    pub fn winner(&self) -> Option<Side> {
        match self {
            MatchOutcome::Winner { side } => Some(*side),
            MatchOutcome::Draw { .. } => None,
        }
    }
}

/// Health removed by each side over the match (overkill excluded)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageTotals {
    pub total: f32,
    pub side_a: f32,
    pub side_b: f32,
}

impl DamageTotals {
    pub fn record(&mut self, side: Side, amount: f32) {
        self.total += amount;
        match side {
            Side::A => self.side_a += amount,
            Side::B => self.side_b += amount,
        }
    }

    pub fn for_side(&self, side: Side) -> f32 {
        match side {
            Side::A => self.side_a,
            Side::B => self.side_b,
        }
    }
}

/// Final result of a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    /// Living units on the winning side (0 for a draw by elimination;
    /// both sides' survivors on timeout)
    pub remaining_units: u32,
    pub damage: DamageTotals,
    pub final_tick: Tick,
}

fn living(units: &[CombatUnit], side: Side) -> u32 {
    units
        .iter()
        .filter(|unit| unit.side == side && unit.is_alive())
        .count() as u32
}

/// Decide whether the match is over after `tick`
///
/// Expects deaths for the tick to have been reaped already.
pub fn evaluate(units: &[CombatUnit], tick: Tick, max_ticks: u64) -> Option<(MatchOutcome, u32)> {
    let alive_a = living(units, Side::A);
    let alive_b = living(units, Side::B);

    match (alive_a, alive_b) {
        (0, 0) => Some((
            MatchOutcome::Draw {
                reason: DrawReason::MutualElimination,
            },
            0,
        )),
        (0, survivors) => Some((MatchOutcome::Winner { side: Side::B }, survivors)),
        (survivors, 0) => Some((MatchOutcome::Winner { side: Side::A }, survivors)),
        (a, b) if tick >= max_ticks => Some((
            MatchOutcome::Draw {
                reason: DrawReason::Timeout,
            },
            a + b,
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::hex::HexCoord;
    use crate::battle::units::test_unit;

    fn two_v_one() -> Vec<CombatUnit> {
        vec![
            test_unit(0, Side::A, HexCoord::new(0, 0)),
            test_unit(1, Side::A, HexCoord::new(1, 0)),
            test_unit(2, Side::B, HexCoord::new(0, 7)),
        ]
    }

    #[test]
    fn test_ongoing_match() {
        assert_eq!(evaluate(&two_v_one(), 10, 100), None);
    }

    #[test]
    fn test_winner_counts_survivors() {
        let mut units = two_v_one();
        units[2].dead = true;
        assert_eq!(
            evaluate(&units, 10, 100),
            Some((MatchOutcome::Winner { side: Side::A }, 2))
        );
    }

    #[test]
    fn test_mutual_elimination_is_a_draw() {
        let mut units = two_v_one();
        for unit in &mut units {
            unit.dead = true;
        }
        let (outcome, remaining) = evaluate(&units, 10, 100).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Draw {
                reason: DrawReason::MutualElimination
            }
        );
        assert_eq!(outcome.winner(), None);
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_timeout_at_cap() {
        let (outcome, remaining) = evaluate(&two_v_one(), 100, 100).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Draw {
                reason: DrawReason::Timeout
            }
        );
        assert_eq!(remaining, 3);
    }

    #[test]
    fn test_elimination_beats_timeout() {
        let mut units = two_v_one();
        units[2].dead = true;
        let (outcome, _) = evaluate(&units, 100, 100).unwrap();
        assert_eq!(outcome.winner(), Some(Side::A));
    }

    #[test]
    fn test_damage_totals() {
        let mut totals = DamageTotals::default();
        totals.record(Side::A, 40.0);
        totals.record(Side::B, 10.0);
        assert_eq!(totals.total, 50.0);
        assert_eq!(totals.for_side(Side::A), 40.0);
    }
}
