//! Combatant slot state

use serde::{Deserialize, Serialize};

use super::moves::Move;
use super::pokemon_type::Type;
use super::status::Status;

/// One Pokemon in a roster.
///
/// `current_hp` never exceeds `max_hp`; all HP changes go through
/// [`take_damage`](Self::take_damage) and [`heal`](Self::heal).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatantSlot {
    /// Species name (e.g., "Pikachu")
    pub species: String,

    /// Level (1-100)
    pub level: u8,

    pub current_hp: u32,

    pub max_hp: u32,

    /// One or two elemental types
    pub types: Vec<Type>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    /// Actions still blocked by sleep or freeze
    #[serde(default)]
    pub status_turns: u8,

    #[serde(default)]
    pub moves: Vec<Move>,
}

impl CombatantSlot {
    /// Create a healthy combatant at full HP
    pub fn new(species: impl Into<String>, level: u8, max_hp: u32, types: Vec<Type>) -> Self {
        Self {
            species: species.into(),
            level,
            current_hp: max_hp,
            max_hp,
            types,
            status: None,
            status_turns: 0,
            moves: Vec::new(),
        }
    }

    pub fn with_moves(mut self, moves: Vec<Move>) -> Self {
        self.moves = moves;
        self
    }

    pub fn with_hp(mut self, current_hp: u32) -> Self {
        self.current_hp = current_hp.min(self.max_hp);
        self
    }

    /// Max HP from a base stat at a given level (perfect IVs, no EVs)
    pub fn max_hp_for(base_hp: u32, level: u8) -> u32 {
        let level = level as u32;
        ((2 * base_hp + 31) * level) / 100 + level + 10
    }

    pub fn is_fainted(&self) -> bool {
        self.current_hp == 0
    }

    /// Subtract HP, floored at 0. Returns the HP actually lost.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let lost = amount.min(self.current_hp);
        self.current_hp -= lost;
        lost
    }

    /// Restore HP, capped at max. Returns the HP actually gained.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let gained = amount.min(self.max_hp - self.current_hp);
        self.current_hp += gained;
        gained
    }

    /// Get HP as percentage (0-100)
    pub fn hp_percent(&self) -> u32 {
        if self.max_hp == 0 {
            return 0;
        }
        (self.current_hp * 100) / self.max_hp
    }

    pub fn has_type(&self, t: Type) -> bool {
        self.types.contains(&t)
    }

    /// Apply a status if none is present and the types allow it
    pub fn try_inflict(&mut self, status: Status) -> bool {
        if self.status.is_some() || self.is_fainted() || status.is_blocked_by(&self.types) {
            return false;
        }
        self.status = Some(status);
        self.status_turns = status.blocking_turns().unwrap_or(0);
        true
    }

    pub fn move_at(&self, index: usize) -> Option<&Move> {
        self.moves.get(index)
    }
}
