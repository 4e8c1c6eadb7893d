//! Team data for battle start.
//!
//! A [`TeamService`] turns a team reference stored in the battle record into
//! combatant slots. [`CatalogTeams`] is the JSON-backed implementation.

mod catalog;
mod validate;

use duet_battle::CombatantSlot;
use thiserror::Error;

pub use catalog::{CatalogTeams, TeamMember};
pub use validate::{validate_team, MAX_MOVES, MAX_TEAM_SIZE};

#[derive(Error, Debug)]
pub enum TeamError {
    #[error("unknown team: {0}")]
    UnknownTeam(String),

    #[error("team {0} has no members")]
    EmptyTeam(String),

    #[error("team {team} has {count} members (max {MAX_TEAM_SIZE})")]
    TooManyMembers { team: String, count: usize },

    #[error("{species} knows {count} moves (max {MAX_MOVES})")]
    TooManyMoves { species: String, count: usize },

    #[error("{0} has no types")]
    MissingTypes(String),

    #[error("{0} has zero max HP")]
    ZeroMaxHp(String),

    #[error("{species} has {current} HP, above its max of {max}")]
    HpAboveMax { species: String, current: u32, max: u32 },

    #[error("{0} needs either maxHp or baseHp")]
    MissingHp(String),

    #[error("Invalid catalogue JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolves team references into rosters. Failure at battle start is fatal.
pub trait TeamService: Send + Sync {
    fn resolve_team(&self, team_ref: &str) -> Result<Vec<CombatantSlot>, TeamError>;
}
