//! Hexbrawl - deterministic combat core for a hex-grid auto-battler
//!
//! `simulate(rules, team_a, team_b, seed)` runs one match to completion and
//! returns the full event trace plus the result.

pub mod battle;
pub mod combat;
pub mod core;
pub mod rules;

pub use battle::{simulate, simulate_many, MatchReport, RosterEntry, TeamComposition};
pub use crate::core::{ArenaError, MatchConfig, Result, Side, UnitId};
pub use rules::{load_rules, load_team, parse_rules, RuleTables};
