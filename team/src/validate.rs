use duet_battle::CombatantSlot;

use crate::TeamError;

pub const MAX_TEAM_SIZE: usize = 6;
pub const MAX_MOVES: usize = 4;

/// Check a resolved roster before it enters a battle
pub fn validate_team(team_ref: &str, slots: &[CombatantSlot]) -> Result<(), TeamError> {
    if slots.is_empty() {
        return Err(TeamError::EmptyTeam(team_ref.to_string()));
    }
    if slots.len() > MAX_TEAM_SIZE {
        return Err(TeamError::TooManyMembers {
            team: team_ref.to_string(),
            count: slots.len(),
        });
    }

    for slot in slots {
        if slot.moves.len() > MAX_MOVES {
            return Err(TeamError::TooManyMoves {
                species: slot.species.clone(),
                count: slot.moves.len(),
            });
        }
        if slot.types.is_empty() {
            return Err(TeamError::MissingTypes(slot.species.clone()));
        }
        if slot.max_hp == 0 {
            return Err(TeamError::ZeroMaxHp(slot.species.clone()));
        }
        if slot.current_hp > slot.max_hp {
            return Err(TeamError::HpAboveMax {
                species: slot.species.clone(),
                current: slot.current_hp,
                max: slot.max_hp,
            });
        }
    }
    Ok(())
}
