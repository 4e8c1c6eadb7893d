//! JSON team catalogue

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use duet_battle::{CombatantSlot, Move, Type};
use serde::{Deserialize, Serialize};

use crate::validate::validate_team;
use crate::{TeamError, TeamService};

/// One catalogue entry. HP is given directly (`maxHp`) or derived from the
/// species base stat (`baseHp`) at the member's level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub species: String,

    #[serde(default = "default_level")]
    pub level: u8,

    pub types: Vec<Type>,

    #[serde(default)]
    pub max_hp: Option<u32>,

    #[serde(default)]
    pub base_hp: Option<u32>,

    #[serde(default)]
    pub current_hp: Option<u32>,

    #[serde(default)]
    pub moves: Vec<Move>,
}

fn default_level() -> u8 {
    50
}

impl TeamMember {
    pub fn to_slot(&self) -> Result<CombatantSlot, TeamError> {
        let max_hp = match (self.max_hp, self.base_hp) {
            (Some(hp), _) => hp,
            (None, Some(base)) => CombatantSlot::max_hp_for(base, self.level),
            (None, None) => return Err(TeamError::MissingHp(self.species.clone())),
        };
        let mut slot = CombatantSlot::new(&self.species, self.level, max_hp, self.types.clone())
            .with_moves(self.moves.clone());
        if let Some(current) = self.current_hp {
            slot.current_hp = current;
        }
        Ok(slot)
    }
}

/// Named teams loaded from JSON:
///
/// ```json
/// { "electric": [ { "species": "Pikachu", "types": ["electric"], "maxHp": 100, "moves": [] } ] }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CatalogTeams {
    teams: HashMap<String, Vec<TeamMember>>,
}

impl CatalogTeams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, TeamError> {
        let teams = serde_json::from_str(json)?;
        Ok(Self { teams })
    }

    /// Load a catalogue file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading team catalogue {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing team catalogue {}", path.display()))
    }

    pub fn insert(&mut self, team_ref: impl Into<String>, members: Vec<TeamMember>) {
        self.teams.insert(team_ref.into(), members);
    }

    pub fn team_refs(&self) -> impl Iterator<Item = &str> {
        self.teams.keys().map(String::as_str)
    }
}

impl TeamService for CatalogTeams {
    fn resolve_team(&self, team_ref: &str) -> Result<Vec<CombatantSlot>, TeamError> {
        let members = self
            .teams
            .get(team_ref)
            .ok_or_else(|| TeamError::UnknownTeam(team_ref.to_string()))?;
        let slots = members
            .iter()
            .map(TeamMember::to_slot)
            .collect::<Result<Vec<_>, _>>()?;
        validate_team(team_ref, &slots)?;
        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOGUE: &str = r#"{
        "electric": [
            {
                "species": "Pikachu",
                "types": ["electric"],
                "maxHp": 100,
                "moves": [
                    { "name": "Thunder Shock", "type": "electric", "power": 40, "pp": 30, "maxPp": 30 },
                    { "name": "Thunder Wave", "type": "electric", "power": 0, "pp": 20, "maxPp": 20, "inflicts": "par" }
                ]
            }
        ],
        "normal": [
            { "species": "Rattata", "level": 20, "types": ["normal"], "baseHp": 30 }
        ],
        "broken": [
            { "species": "Missingno", "types": ["normal"] }
        ],
        "empty": []
    }"#;

    #[test]
    fn test_resolve_team() {
        let catalog = CatalogTeams::from_json(CATALOGUE).unwrap();
        let team = catalog.resolve_team("electric").unwrap();
        assert_eq!(team.len(), 1);
        assert_eq!(team[0].current_hp, 100);
        assert_eq!(team[0].moves[1].inflicts, Some(duet_battle::Status::Paralysis));
    }

    #[test]
    fn test_base_hp_derivation() {
        let catalog = CatalogTeams::from_json(CATALOGUE).unwrap();
        let team = catalog.resolve_team("normal").unwrap();
        // ((60 + 31) * 20) / 100 + 20 + 10
        assert_eq!(team[0].max_hp, 48);
    }

    #[test]
    fn test_failures() {
        let catalog = CatalogTeams::from_json(CATALOGUE).unwrap();
        assert!(matches!(catalog.resolve_team("nope"), Err(TeamError::UnknownTeam(_))));
        assert!(matches!(catalog.resolve_team("broken"), Err(TeamError::MissingHp(_))));
        assert!(matches!(catalog.resolve_team("empty"), Err(TeamError::EmptyTeam(_))));
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(CatalogTeams::from_json("[1,2"), Err(TeamError::Json(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = CatalogTeams::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("reading team catalogue"));
    }
}
