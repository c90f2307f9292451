//! Battle system - the tick-driven combat simulation
//!
//! Two rosters are placed on mirrored halves of a hex board and fight until
//! one side is gone or the tick cap is hit.
//!
//! Key properties:
//! - Fully deterministic: same teams, rules and seed give the same trace
//! - Every state change is mirrored into an append-only event trace
//! - Units act in stable index order inside every phase

pub mod battlefield;
pub mod constants;
pub mod events;
pub mod execution;
pub mod hex;
pub mod movement;
pub mod outcome;
pub mod pathfinding;
pub mod roster;
pub mod targeting;
pub mod units;

// Re-exports for convenient access
pub use battlefield::Battlefield;
pub use constants::*;
pub use events::{CombatEvent, CombatEventKind, EventRecorder};
pub use execution::{simulate, simulate_many, MatchContext, MatchReport};
pub use hex::{HexCoord, OffsetCoord};
pub use movement::{greedy_step, move_unit, next_step};
pub use outcome::{evaluate, DamageTotals, DrawReason, MatchOutcome, MatchPhase, MatchResult};
pub use pathfinding::{find_path, path_into_range};
pub use roster::{RosterEntry, TeamComposition};
pub use targeting::{nearest_enemy, resolve_policy, select_targets, TargetPolicy};
pub use units::CombatUnit;
