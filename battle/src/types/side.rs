//! Side labels: local perspective (player/opponent) and absolute roles (host/guest)

use std::fmt::Debug;
use std::hash::Hash;

use serde::de::value::StringDeserializer;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A two-valued label for the sides of a battle.
///
/// Snapshots are generic over this so the same structure is used for the
/// local view ([`Side`]) and the shared record ([`Role`]).
pub trait SideLabel:
    Copy + Eq + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Both labels, in storage order
    const ALL: [Self; 2];

    /// Storage index (0 or 1)
    fn index(self) -> usize;

    fn other(self) -> Self {
        Self::ALL[1 - self.index()]
    }
}

/// Local perspective of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player,
    Opponent,
}

impl SideLabel for Side {
    const ALL: [Self; 2] = [Side::Player, Side::Opponent];

    fn index(self) -> usize {
        match self {
            Side::Player => 0,
            Side::Opponent => 1,
        }
    }
}

/// Absolute role of a client in the shared record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

impl SideLabel for Role {
    const ALL: [Self; 2] = [Role::Host, Role::Guest];

    fn index(self) -> usize {
        match self {
            Role::Host => 0,
            Role::Guest => 1,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Host => write!(f, "host"),
            Role::Guest => write!(f, "guest"),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Player => write!(f, "player"),
            Side::Opponent => write!(f, "opponent"),
        }
    }
}

/// Battle outcome.
///
/// Encoded as the winning side's label, or `"draw"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winner<S> {
    Won(S),
    Draw,
}

impl<S: SideLabel> Winner<S> {
    pub fn map_sides<T: SideLabel>(self, f: impl Fn(S) -> T) -> Winner<T> {
        match self {
            Winner::Won(s) => Winner::Won(f(s)),
            Winner::Draw => Winner::Draw,
        }
    }

    pub fn side(self) -> Option<S> {
        match self {
            Winner::Won(s) => Some(s),
            Winner::Draw => None,
        }
    }
}

impl<S: Serialize> Serialize for Winner<S> {
    fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
        match self {
            Winner::Won(side) => side.serialize(serializer),
            Winner::Draw => serializer.serialize_str("draw"),
        }
    }
}

impl<'de, S: DeserializeOwned> Deserialize<'de> for Winner<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "draw" {
            return Ok(Winner::Draw);
        }
        let label: StringDeserializer<D::Error> = raw.into_deserializer();
        S::deserialize(label).map(Winner::Won)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other() {
        assert_eq!(Side::Player.other(), Side::Opponent);
        assert_eq!(Role::Guest.other(), Role::Host);
        assert_eq!(Role::Host.other().other(), Role::Host);
    }

    #[test]
    fn test_winner_encoding() {
        let w: Winner<Role> = Winner::Won(Role::Host);
        assert_eq!(serde_json::to_string(&w).unwrap(), "\"host\"");
        assert_eq!(serde_json::to_string(&Winner::<Role>::Draw).unwrap(), "\"draw\"");

        let back: Winner<Role> = serde_json::from_str("\"guest\"").unwrap();
        assert_eq!(back, Winner::Won(Role::Guest));
        let draw: Winner<Side> = serde_json::from_str("\"draw\"").unwrap();
        assert_eq!(draw, Winner::Draw);
        assert!(serde_json::from_str::<Winner<Role>>("\"player\"").is_err());
    }
}
