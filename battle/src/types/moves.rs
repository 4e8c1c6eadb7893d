//! Moves known by a combatant

use serde::{Deserialize, Serialize};

use super::pokemon_type::Type;
use super::status::Status;

/// A move slot with its remaining uses
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub name: String,

    #[serde(rename = "type")]
    pub move_type: Type,

    /// Base power (0 for status-only moves)
    pub power: u32,

    /// Remaining uses
    pub pp: u32,

    pub max_pp: u32,

    /// Status inflicted on the target, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflicts: Option<Status>,

    /// Share of damage dealt taken back as recoil (0-100)
    #[serde(default)]
    pub recoil_percent: u8,

    /// Share of the user's max HP restored (0-100)
    #[serde(default)]
    pub heal_percent: u8,
}

impl Move {
    /// Create a plain damaging move with full PP
    pub fn new(name: impl Into<String>, move_type: Type, power: u32, pp: u32) -> Self {
        Self {
            name: name.into(),
            move_type,
            power,
            pp,
            max_pp: pp,
            inflicts: None,
            recoil_percent: 0,
            heal_percent: 0,
        }
    }

    /// Attach a status effect
    pub fn with_inflicts(mut self, status: Status) -> Self {
        self.inflicts = Some(status);
        self
    }

    pub fn with_recoil(mut self, percent: u8) -> Self {
        self.recoil_percent = percent;
        self
    }

    pub fn with_heal(mut self, percent: u8) -> Self {
        self.heal_percent = percent;
        self
    }

    pub fn is_damaging(&self) -> bool {
        self.power > 0
    }

    pub fn has_pp(&self) -> bool {
        self.pp > 0
    }
}
