//! Domain types shared by the rules and the sync layer

mod combatant;
mod event;
mod moves;
mod pokemon_type;
mod roster;
mod side;
mod snapshot;
mod status;

pub use combatant::CombatantSlot;
pub use event::Event;
pub use moves::Move;
pub use pokemon_type::{Effectiveness, Type, TYPE_CHART};
pub use roster::Roster;
pub use side::{Role, Side, SideLabel, Winner};
pub use snapshot::{BattleSnapshot, EndReason, Fingerprint};
pub use status::Status;
