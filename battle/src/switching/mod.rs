//! Roster control: replacing fainted combatants and ending the battle

use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::types::{BattleSnapshot, EndReason, Event, SideLabel, Winner};

/// How a side picks its replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchMode {
    /// First non-fainted slot in roster order (AI-controlled sides)
    Automatic,
    /// Wait for an explicit choice from the player
    PromptRequired,
}

/// Sides whose active combatant is fainted, in storage order
pub fn faint_check<S: SideLabel>(snapshot: &BattleSnapshot<S>) -> Vec<S> {
    S::ALL
        .into_iter()
        .filter(|side| snapshot.roster(*side).active_fainted())
        .collect()
}

/// Winner if either side has nothing left to send out
pub fn check_completion<S: SideLabel>(snapshot: &BattleSnapshot<S>) -> Option<Winner<S>> {
    let [first, second] = S::ALL;
    match (
        snapshot.roster(first).all_fainted(),
        snapshot.roster(second).all_fainted(),
    ) {
        (true, true) => Some(Winner::Draw),
        (true, false) => Some(Winner::Won(second)),
        (false, true) => Some(Winner::Won(first)),
        (false, false) => None,
    }
}

/// Resolve the pending switch.
///
/// Completion is checked first and supersedes any switch. In
/// [`SwitchMode::PromptRequired`] without a choice the snapshot comes back
/// unchanged with the switch still pending.
pub fn resolve_pending_switch<S: SideLabel>(
    snapshot: &BattleSnapshot<S>,
    mode: SwitchMode,
    choice: Option<usize>,
) -> Result<BattleSnapshot<S>, Rejection> {
    if snapshot.is_complete {
        return Err(Rejection::BattleComplete);
    }
    let Some(side) = snapshot.pending_switch else {
        return Err(Rejection::NoSwitchPending);
    };

    if let Some(winner) = check_completion(snapshot) {
        return Ok(complete(snapshot.clone(), winner));
    }

    let roster = snapshot.roster(side);
    let slot = match (mode, choice) {
        (SwitchMode::Automatic, _) => match roster.first_replacement() {
            Some(slot) => slot,
            None => return Err(Rejection::InvalidSwitch(roster.active_index)),
        },
        (SwitchMode::PromptRequired, None) => return Ok(snapshot.clone()),
        (SwitchMode::PromptRequired, Some(slot)) => {
            if !roster.can_switch_to(slot) {
                return Err(Rejection::InvalidSwitch(slot));
            }
            slot
        }
    };

    let mut next = snapshot.clone();
    let roster = next.roster_mut(side);
    roster.set_active(slot);
    let species = roster.slots[slot].species.clone();
    next.log.push(Event::SwitchedIn { side, slot, species });

    let other = side.other();
    if next.roster(other).active_fainted() {
        next.pending_switch = Some(other);
        next.turn_owner = None;
    } else {
        next.pending_switch = None;
        next.turn_owner = Some(other);
    }
    Ok(next)
}

/// Mark the battle finished. Once complete a snapshot never changes again.
fn complete<S: SideLabel>(mut snapshot: BattleSnapshot<S>, winner: Winner<S>) -> BattleSnapshot<S> {
    snapshot.is_complete = true;
    snapshot.winner = Some(winner);
    snapshot.ended_reason = Some(EndReason::Victory);
    snapshot.turn_owner = None;
    snapshot.pending_switch = None;
    snapshot.log.push(Event::BattleEnded { winner });
    snapshot
}
