//! Combat rules: the outcome of a single action.
//!
//! Everything here is a pure function of its inputs. The same snapshot, actor
//! and action always produce the same events and HP deltas.

pub mod damage;
mod effects;

use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::types::{BattleSnapshot, EndReason, Event, SideLabel, Winner};

/// An action taken by the side that owns the turn, or a forfeit by either side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum Action {
    /// Use the move at this index of the active combatant
    UseMove(usize),
    Pass,
    /// Give up. Allowed for either side at any point before the end.
    Forfeit,
}

/// New snapshot plus the events appended to its log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<S> {
    pub snapshot: BattleSnapshot<S>,
    pub events: Vec<Event<S>>,
}

/// Apply `action` for `actor`.
///
/// On a faint the turn owner is cleared and `pending_switch` names the side
/// that must replace its combatant (the target before the actor when both
/// go down). Otherwise the turn passes to the other side.
pub fn apply_action<S: SideLabel>(
    snapshot: &BattleSnapshot<S>,
    actor: S,
    action: Action,
) -> Result<Resolution<S>, Rejection> {
    if snapshot.is_complete {
        return Err(Rejection::BattleComplete);
    }
    if action == Action::Forfeit {
        return Ok(forfeit(snapshot, actor));
    }
    if snapshot.pending_switch.is_some() {
        return Err(Rejection::SwitchPending);
    }
    if snapshot.turn_owner != Some(actor) {
        return Err(Rejection::NotYourTurn);
    }
    if let Action::UseMove(index) = action {
        let usable = snapshot
            .roster(actor)
            .active()
            .filter(|c| !c.is_fainted())
            .and_then(|c| c.move_at(index))
            .is_some_and(|m| m.has_pp());
        if !usable {
            return Err(Rejection::InvalidMove(index));
        }
    }

    let target = actor.other();
    let mut next = snapshot.clone();
    let mut events = Vec::new();

    {
        let (own, theirs) = next.pair_mut(actor);
        let (Some(user), Some(foe)) = (own.active_mut(), theirs.active_mut()) else {
            return Err(Rejection::BattleComplete);
        };

        if !effects::consume_blocked_action(user, actor, &mut events) {
            match action {
                Action::Pass => events.push(Event::Passed { side: actor }),
                // resolved before any combat
                Action::Forfeit => {}
                Action::UseMove(index) => {
                    let mv = user.moves[index].clone();
                    user.moves[index].pp -= 1;
                    events.push(Event::MoveUsed {
                        side: actor,
                        species: user.species.clone(),
                        move_name: mv.name.clone(),
                    });

                    if mv.is_damaging() {
                        let hit = damage::calculate(&mv, user, foe);
                        let dealt = foe.take_damage(hit.amount);
                        events.push(Event::DamageDealt {
                            target,
                            amount: dealt,
                            remaining_hp: foe.current_hp,
                            effectiveness: hit.effectiveness,
                        });

                        let recoil = damage::recoil(&mv, dealt);
                        if recoil > 0 {
                            let amount = user.take_damage(recoil);
                            events.push(Event::Recoil {
                                side: actor,
                                amount,
                                remaining_hp: user.current_hp,
                            });
                        }
                    }

                    if let Some(status) = mv.inflicts {
                        effects::inflict(foe, target, status, &mut events);
                    }

                    if mv.heal_percent > 0 && !user.is_fainted() {
                        let restore = damage::healing(&mv, user);
                        let amount = user.heal(restore);
                        events.push(Event::Healed {
                            side: actor,
                            amount,
                            remaining_hp: user.current_hp,
                        });
                    }
                }
            }
        }

        effects::residual(user, actor, &mut events);
    }

    let mut fainted = Vec::with_capacity(2);
    for side in [target, actor] {
        let roster = next.roster_mut(side);
        roster.recount_fainted();
        if let Some(down) = roster.active().filter(|c| c.is_fainted()) {
            events.push(Event::PokemonFainted {
                side,
                species: down.species.clone(),
            });
            fainted.push(side);
        }
    }

    match fainted.first() {
        Some(&side) => {
            next.turn_owner = None;
            next.pending_switch = Some(side);
        }
        None => next.turn_owner = Some(target),
    }

    next.log.extend(events.iter().cloned());
    Ok(Resolution { snapshot: next, events })
}

fn forfeit<S: SideLabel>(snapshot: &BattleSnapshot<S>, actor: S) -> Resolution<S> {
    let winner = Winner::Won(actor.other());
    let events = vec![
        Event::Forfeited { side: actor },
        Event::BattleEnded { winner },
    ];

    let mut next = snapshot.clone();
    next.is_complete = true;
    next.winner = Some(winner);
    next.ended_reason = Some(EndReason::Forfeit);
    next.turn_owner = None;
    next.pending_switch = None;
    next.log.extend(events.iter().cloned());
    Resolution { snapshot: next, events }
}
