//! Type matchup helpers for decision making

use crate::types::{CombatantSlot, Move, Type};

/// Check if defender is weak (>1x effectiveness) to any of the attacking types
pub fn is_weak_to_any(defender_types: &[Type], attacking_types: &[Type]) -> bool {
    attacking_types
        .iter()
        .any(|t| t.effectiveness_multi(defender_types) > 1.0)
}

/// Check if defender is immune (0x effectiveness) to a type
pub fn is_immune_to(defender_types: &[Type], attacking_type: Type) -> bool {
    attacking_type.effectiveness_multi(defender_types) == 0.0
}

/// Whether a move would do anything at all to `defender`
pub fn has_effect(mv: &Move, defender: &CombatantSlot) -> bool {
    if mv.is_damaging() {
        return !is_immune_to(&defender.types, mv.move_type);
    }
    match mv.inflicts {
        Some(status) => defender.status.is_none() && !status.is_blocked_by(&defender.types),
        None => mv.heal_percent > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;

    #[test]
    fn test_is_weak_to_any() {
        let water = vec![Type::Water];
        let attacking = vec![Type::Electric, Type::Grass];
        assert!(is_weak_to_any(&water, &attacking));

        let neutral = vec![Type::Fire, Type::Ice];
        assert!(!is_weak_to_any(&water, &neutral));
    }

    #[test]
    fn test_is_immune_to() {
        let ghost = vec![Type::Ghost];
        assert!(is_immune_to(&ghost, Type::Normal));
        assert!(is_immune_to(&ghost, Type::Fighting));
        assert!(!is_immune_to(&ghost, Type::Dark));

        let ground = vec![Type::Ground];
        assert!(is_immune_to(&ground, Type::Electric));
    }

    #[test]
    fn test_has_effect() {
        let gengar = CombatantSlot::new("Gengar", 50, 120, vec![Type::Ghost, Type::Poison]);
        assert!(!has_effect(&Move::new("Tackle", Type::Normal, 40, 35), &gengar));
        assert!(has_effect(&Move::new("Bite", Type::Dark, 60, 25), &gengar));

        let toxic = Move::new("Toxic", Type::Poison, 0, 10).with_inflicts(Status::BadPoison);
        assert!(!has_effect(&toxic, &gengar));
        let hypnosis = Move::new("Hypnosis", Type::Psychic, 0, 20).with_inflicts(Status::Sleep);
        assert!(has_effect(&hypnosis, &gengar));
    }
}
