//! Status effects applied around an action

use crate::types::{CombatantSlot, Event, SideLabel, Status};

/// Consume one blocked action for a sleeping or frozen combatant.
///
/// Returns `true` if the action is skipped.
pub(crate) fn consume_blocked_action<S: SideLabel>(
    actor: &mut CombatantSlot,
    side: S,
    events: &mut Vec<Event<S>>,
) -> bool {
    let Some(status) = actor.status.filter(|s| s.blocking_turns().is_some()) else {
        return false;
    };

    let blocked = actor.status_turns > 0;
    if blocked {
        events.push(Event::Immobilized { side, status });
        actor.status_turns -= 1;
    }

    if actor.status_turns == 0 {
        actor.status = None;
        events.push(match status {
            Status::Freeze => Event::Thawed { side },
            _ => Event::WokeUp { side },
        });
    }

    blocked
}

/// Try to inflict `status` on the target, logging it if it sticks
pub(crate) fn inflict<S: SideLabel>(
    target: &mut CombatantSlot,
    side: S,
    status: Status,
    events: &mut Vec<Event<S>>,
) {
    if target.try_inflict(status) {
        events.push(Event::StatusApplied { target: side, status });
    }
}

/// Poison and burn damage taken by the actor after it moves
pub(crate) fn residual<S: SideLabel>(
    actor: &mut CombatantSlot,
    side: S,
    events: &mut Vec<Event<S>>,
) {
    if actor.is_fainted() {
        return;
    }
    let Some(status) = actor.status else {
        return;
    };
    if let Some(damage) = status.residual_damage(actor.max_hp) {
        let amount = actor.take_damage(damage);
        events.push(Event::StatusDamage {
            side,
            status,
            amount,
            remaining_hp: actor.current_hp,
        });
    }
}
