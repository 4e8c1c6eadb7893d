//! Full battle state at a synchronization point

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::event::Event;
use super::roster::Roster;
use super::side::{Side, SideLabel, Winner};

/// Structural hash of a snapshot, used to skip redundant view updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

/// Why a finished battle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// One side ran out of combatants (or both did)
    Victory,
    Forfeit,
}

/// Battle state labelled by `S`.
///
/// Locally `S` is [`Side`]; in the shared record it is [`Role`](super::Role).
/// Snapshots are replaced wholesale after every action, never edited in place
/// once published.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "S: SideLabel")]
pub struct BattleSnapshot<S = Side> {
    /// Indexed by [`SideLabel::index`]
    pub rosters: [Roster; 2],

    /// Side allowed to act. `None` while a switch is pending or after the end.
    pub turn_owner: Option<S>,

    pub is_complete: bool,

    #[serde(default)]
    pub winner: Option<Winner<S>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_reason: Option<EndReason>,

    /// Side that owes a replacement for a fainted active combatant
    #[serde(default)]
    pub pending_switch: Option<S>,

    #[serde(default)]
    pub log: Vec<Event<S>>,
}

impl<S: SideLabel> BattleSnapshot<S> {
    /// Start a battle with `first` to move
    pub fn new(first_roster: Roster, second_roster: Roster, first: S) -> Self {
        Self {
            rosters: [first_roster, second_roster],
            turn_owner: Some(first),
            is_complete: false,
            winner: None,
            ended_reason: None,
            pending_switch: None,
            log: Vec::new(),
        }
    }

    pub fn roster(&self, side: S) -> &Roster {
        &self.rosters[side.index()]
    }

    pub fn roster_mut(&mut self, side: S) -> &mut Roster {
        &mut self.rosters[side.index()]
    }

    /// Mutable access to `side`'s roster and the other one at once
    pub fn pair_mut(&mut self, side: S) -> (&mut Roster, &mut Roster) {
        let [first, second] = &mut self.rosters;
        if side.index() == 0 {
            (first, second)
        } else {
            (second, first)
        }
    }

    /// Relabel both sides. `f` must be a bijection.
    pub fn map_sides<T: SideLabel>(self, f: impl Fn(S) -> T) -> BattleSnapshot<T> {
        let [first, second] = self.rosters;
        let rosters = if f(S::ALL[0]).index() == 0 {
            [first, second]
        } else {
            [second, first]
        };
        BattleSnapshot {
            rosters,
            turn_owner: self.turn_owner.map(&f),
            is_complete: self.is_complete,
            winner: self.winner.map(|w| w.map_sides(&f)),
            ended_reason: self.ended_reason,
            pending_switch: self.pending_switch.map(&f),
            log: self.log.into_iter().map(|e| e.map_sides(&f)).collect(),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        Fingerprint(hasher.finish())
    }
}

impl BattleSnapshot<Side> {
    pub fn player(&self) -> &Roster {
        self.roster(Side::Player)
    }

    pub fn opponent(&self) -> &Roster {
        self.roster(Side::Opponent)
    }
}
