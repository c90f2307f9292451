//! Combat constants - fixed values that are not part of the match config
//!
//! Anything a ruleset should be able to tune lives in `MatchConfig` instead.

// Mitigation: damage × RESIST_SCALE / (RESIST_SCALE + resist)
pub const RESIST_SCALE: f32 = 100.0;

// Ability power that leaves ability payloads unchanged
pub const NEUTRAL_ABILITY_POWER: f32 = 100.0;

// Movement progress needed for one hex step
pub const STEP_PROGRESS: f32 = 1.0;
// Slack for float accumulation (ten steps of 0.1 must make a full step)
pub const PROGRESS_EPSILON: f32 = 1e-4;

// Melee units have this range; anything longer counts as ranged
pub const MELEE_RANGE: u32 = 1;

// Upper bound on trigger waves drained in one ability phase
// (each wave is caused by deaths, so a match with N units needs at most N)
pub const MAX_TRIGGER_WAVES: usize = 64;

// Floors applied by the stat aggregator
pub const MIN_HEALTH: f32 = 1.0;
pub const MIN_RANGE: u32 = 1;
