//! Typed rejections for illegal actions

use thiserror::Error;

/// Why an action or switch was refused. A rejected action never produces a
/// new snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("not your turn")]
    NotYourTurn,

    #[error("move {0} is not usable")]
    InvalidMove(usize),

    #[error("a switch must be resolved first")]
    SwitchPending,

    #[error("no switch is pending")]
    NoSwitchPending,

    #[error("cannot switch to slot {0}")]
    InvalidSwitch(usize),

    #[error("battle is already complete")]
    BattleComplete,
}
