pub mod config;
pub mod error;
pub mod types;

pub use config::MatchConfig;
pub use error::{ArenaError, Result};
pub use types::{Side, Tick, UnitId};
