//! Non-volatile status conditions

use serde::{Deserialize, Serialize};

use super::pokemon_type::Type;

/// Non-volatile status conditions (persist through switching)
///
/// Serialized with the short protocol codes ("brn", "frz", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "brn")]
    Burn,
    #[serde(rename = "frz")]
    Freeze,
    #[serde(rename = "par")]
    Paralysis,
    #[serde(rename = "psn")]
    Poison,
    #[serde(rename = "tox")]
    BadPoison, // Toxic
    #[serde(rename = "slp")]
    Sleep,
}

impl Status {
    /// Parse from protocol string ("brn", "frz", "par", "psn", "tox", "slp")
    pub fn from_protocol(s: &str) -> Option<Self> {
        match s {
            "brn" => Some(Status::Burn),
            "frz" => Some(Status::Freeze),
            "par" => Some(Status::Paralysis),
            "psn" => Some(Status::Poison),
            "tox" => Some(Status::BadPoison),
            "slp" => Some(Status::Sleep),
            _ => None,
        }
    }

    /// Convert to protocol format
    pub fn to_protocol(&self) -> &'static str {
        match self {
            Status::Burn => "brn",
            Status::Freeze => "frz",
            Status::Paralysis => "par",
            Status::Poison => "psn",
            Status::BadPoison => "tox",
            Status::Sleep => "slp",
        }
    }

    /// Get display name
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Burn => "Burn",
            Status::Freeze => "Freeze",
            Status::Paralysis => "Paralysis",
            Status::Poison => "Poison",
            Status::BadPoison => "Toxic",
            Status::Sleep => "Sleep",
        }
    }

    /// Whether a combatant with these types can never receive this status
    pub fn is_blocked_by(&self, types: &[Type]) -> bool {
        types.iter().any(|t| match self {
            Status::Paralysis => *t == Type::Electric,
            Status::Burn => *t == Type::Fire,
            Status::Poison | Status::BadPoison => matches!(t, Type::Poison | Type::Steel),
            Status::Freeze => *t == Type::Ice,
            Status::Sleep => false,
        })
    }

    /// Number of actions this status prevents before it wears off.
    /// `None` for statuses that never block.
    pub fn blocking_turns(&self) -> Option<u8> {
        match self {
            Status::Sleep => Some(2),
            Status::Freeze => Some(1),
            _ => None,
        }
    }

    /// End-of-action damage taken by a combatant with this status
    pub fn residual_damage(&self, max_hp: u32) -> Option<u32> {
        let divisor = match self {
            Status::Poison | Status::BadPoison => 8,
            Status::Burn => 16,
            _ => return None,
        };
        Some((max_hp / divisor).max(1))
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
