//! Query helpers for battle decision making
//!
//! Type matchups and a deterministic move picker used by computer-controlled
//! sides and demos.

mod choice;
mod matchup;

pub use choice::{best_move, best_switch, score_move};
pub use matchup::{has_effect, is_immune_to, is_weak_to_any};
