//! Deterministic damage calculation

use crate::types::{CombatantSlot, Effectiveness, Move};

/// Same-type attack bonus
pub const STAB: f32 = 1.5;

/// Result of one hit before it is applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub amount: u32,
    pub multiplier: f32,
    pub effectiveness: Effectiveness,
}

/// `floor(power * effectiveness * stab)`, at least 1 unless the target is immune
pub fn calculate(mv: &Move, attacker: &CombatantSlot, defender: &CombatantSlot) -> Hit {
    let multiplier = mv.move_type.effectiveness_multi(&defender.types);
    let stab = if attacker.has_type(mv.move_type) { STAB } else { 1.0 };
    let amount = if multiplier == 0.0 || mv.power == 0 {
        0
    } else {
        ((mv.power as f32 * multiplier * stab).floor() as u32).max(1)
    };
    Hit {
        amount,
        multiplier,
        effectiveness: Effectiveness::from_multiplier(multiplier),
    }
}

/// Recoil taken for `dealt` damage, at least 1 when any applies
pub fn recoil(mv: &Move, dealt: u32) -> u32 {
    if mv.recoil_percent == 0 || dealt == 0 {
        return 0;
    }
    (dealt * mv.recoil_percent as u32 / 100).max(1)
}

/// HP restored by a healing move
pub fn healing(mv: &Move, user: &CombatantSlot) -> u32 {
    user.max_hp * mv.heal_percent as u32 / 100
}
