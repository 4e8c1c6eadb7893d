//! Turn coordination between the absolute roles and each client's perspective

use serde::{Deserialize, Serialize};

use crate::types::{BattleSnapshot, Role, Side, SideLabel};

/// What a side may do right now, as shown to the player
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LegalAction {
    UseMove { index: usize, name: String, pp: u32 },
    Pass,
    Switch { slot: usize, species: String },
    /// Pending switch with nothing left to send out; resolving it ends the battle
    Concede,
}

/// `player` if the record's turn belongs to this client
pub fn local_perspective(remote_turn: Role, local_role: Role) -> Side {
    if remote_turn == local_role {
        Side::Player
    } else {
        Side::Opponent
    }
}

/// Inverse of [`local_perspective`]
pub fn remote_turn(side: Side, local_role: Role) -> Role {
    match side {
        Side::Player => local_role,
        Side::Opponent => local_role.other(),
    }
}

/// Rotate a shared snapshot into this client's view
pub fn to_local(snapshot: BattleSnapshot<Role>, local_role: Role) -> BattleSnapshot<Side> {
    snapshot.map_sides(|role| local_perspective(role, local_role))
}

/// Rotate a local snapshot back into host/guest labels for publishing
pub fn to_remote(snapshot: BattleSnapshot<Side>, local_role: Role) -> BattleSnapshot<Role> {
    snapshot.map_sides(|side| remote_turn(side, local_role))
}

/// The side owns the turn and nothing is waiting on a switch
pub fn is_action_legal<S: SideLabel>(snapshot: &BattleSnapshot<S>, attempted_by: S) -> bool {
    !snapshot.is_complete
        && snapshot.pending_switch.is_none()
        && snapshot.turn_owner == Some(attempted_by)
}

/// Everything `side` can do on this snapshot. Empty when it has to wait.
///
/// Forfeiting is always possible until the battle ends and is not listed.
pub fn legal_actions<S: SideLabel>(snapshot: &BattleSnapshot<S>, side: S) -> Vec<LegalAction> {
    if snapshot.is_complete {
        return Vec::new();
    }

    let roster = snapshot.roster(side);

    if snapshot.pending_switch == Some(side) {
        let switches: Vec<LegalAction> = roster
            .bench()
            .map(|(slot, c)| LegalAction::Switch {
                slot,
                species: c.species.clone(),
            })
            .collect();
        if switches.is_empty() {
            return vec![LegalAction::Concede];
        }
        return switches;
    }

    if !is_action_legal(snapshot, side) {
        return Vec::new();
    }

    let mut actions: Vec<LegalAction> = roster
        .active()
        .into_iter()
        .flat_map(|c| c.moves.iter().enumerate())
        .filter(|(_, m)| m.has_pp())
        .map(|(index, m)| LegalAction::UseMove {
            index,
            name: m.name.clone(),
            pp: m.pp,
        })
        .collect();
    actions.push(LegalAction::Pass);
    actions
}
