//! Battle log entries

use serde::{Deserialize, Serialize};

use super::pokemon_type::Effectiveness;
use super::side::{SideLabel, Winner};
use super::status::Status;

/// Something that happened during an action, in order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", bound = "S: SideLabel")]
pub enum Event<S> {
    MoveUsed {
        side: S,
        species: String,
        #[serde(rename = "move")]
        move_name: String,
    },
    DamageDealt {
        target: S,
        amount: u32,
        remaining_hp: u32,
        effectiveness: Effectiveness,
    },
    StatusApplied {
        target: S,
        status: Status,
    },
    /// Poison or burn damage after acting
    StatusDamage {
        side: S,
        status: Status,
        amount: u32,
        remaining_hp: u32,
    },
    Healed {
        side: S,
        amount: u32,
        remaining_hp: u32,
    },
    Recoil {
        side: S,
        amount: u32,
        remaining_hp: u32,
    },
    /// Action skipped by sleep or freeze
    Immobilized {
        side: S,
        status: Status,
    },
    WokeUp {
        side: S,
    },
    Thawed {
        side: S,
    },
    Passed {
        side: S,
    },
    PokemonFainted {
        side: S,
        species: String,
    },
    SwitchedIn {
        side: S,
        slot: usize,
        species: String,
    },
    /// Gave up; always followed by `BattleEnded`
    Forfeited {
        side: S,
    },
    BattleEnded {
        winner: Winner<S>,
    },
}

impl<S: SideLabel> Event<S> {
    /// Relabel every side reference
    pub fn map_sides<T: SideLabel>(self, f: impl Fn(S) -> T) -> Event<T> {
        match self {
            Event::MoveUsed { side, species, move_name } => Event::MoveUsed {
                side: f(side),
                species,
                move_name,
            },
            Event::DamageDealt { target, amount, remaining_hp, effectiveness } => {
                Event::DamageDealt {
                    target: f(target),
                    amount,
                    remaining_hp,
                    effectiveness,
                }
            }
            Event::StatusApplied { target, status } => Event::StatusApplied {
                target: f(target),
                status,
            },
            Event::StatusDamage { side, status, amount, remaining_hp } => Event::StatusDamage {
                side: f(side),
                status,
                amount,
                remaining_hp,
            },
            Event::Healed { side, amount, remaining_hp } => Event::Healed {
                side: f(side),
                amount,
                remaining_hp,
            },
            Event::Recoil { side, amount, remaining_hp } => Event::Recoil {
                side: f(side),
                amount,
                remaining_hp,
            },
            Event::Immobilized { side, status } => Event::Immobilized { side: f(side), status },
            Event::WokeUp { side } => Event::WokeUp { side: f(side) },
            Event::Thawed { side } => Event::Thawed { side: f(side) },
            Event::Passed { side } => Event::Passed { side: f(side) },
            Event::PokemonFainted { side, species } => Event::PokemonFainted {
                side: f(side),
                species,
            },
            Event::SwitchedIn { side, slot, species } => Event::SwitchedIn {
                side: f(side),
                slot,
                species,
            },
            Event::Forfeited { side } => Event::Forfeited { side: f(side) },
            Event::BattleEnded { winner } => Event::BattleEnded {
                winner: winner.map_sides(f),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, Side};

    #[test]
    fn test_event_json_shape() {
        let event: Event<Role> = Event::DamageDealt {
            target: Role::Guest,
            amount: 40,
            remaining_hp: 0,
            effectiveness: Effectiveness::Normal,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "damage_dealt");
        assert_eq!(json["target"], "guest");
        assert_eq!(json["remaining_hp"], 0);
    }

    #[test]
    fn test_map_sides() {
        let event = Event::BattleEnded { winner: Winner::Won(Role::Host) };
        let local = event.map_sides(|r| if r == Role::Host { Side::Opponent } else { Side::Player });
        assert_eq!(local, Event::BattleEnded { winner: Winner::Won(Side::Opponent) });
    }
}
