//! Deterministic move choice for computer-controlled sides

use crate::types::{BattleSnapshot, CombatantSlot, Move, SideLabel};

use super::matchup::{has_effect, is_weak_to_any};

/// Heuristic value of using `mv` from `user` against `target`
pub fn score_move(mv: &Move, user: &CombatantSlot, target: &CombatantSlot) -> f32 {
    if !has_effect(mv, target) {
        return 0.0;
    }

    let mut score = mv.power as f32 * 0.3;
    score += mv.move_type.effectiveness_multi(&target.types) * 50.0;
    if user.has_type(mv.move_type) {
        score += 20.0;
    }
    if !mv.is_damaging() && mv.inflicts.is_some() {
        score += 15.0;
    }
    if mv.power > 100 {
        score += 25.0;
    }
    if target.hp_percent() < 30 && mv.power > 80 {
        score += 30.0;
    }
    if user.hp_percent() < 30 {
        if mv.heal_percent > 0 {
            score += 40.0;
        } else if mv.power > 90 {
            score += 20.0;
        }
    }
    score
}

/// Best usable move index for `side`, ties going to the earlier slot.
/// `None` when the side cannot act or has no PP left.
pub fn best_move<S: SideLabel>(snapshot: &BattleSnapshot<S>, side: S) -> Option<usize> {
    let user = snapshot.roster(side).active()?;
    let target = snapshot.roster(side.other()).active()?;

    user.moves
        .iter()
        .enumerate()
        .filter(|(_, m)| m.has_pp())
        .map(|(i, m)| (i, score_move(m, user, target)))
        .fold(None, |best: Option<(usize, f32)>, (i, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((i, score)),
        })
        .map(|(i, _)| i)
}

/// First healthy bench slot not weak to the foe's move types, falling back
/// to the first healthy slot.
pub fn best_switch<S: SideLabel>(snapshot: &BattleSnapshot<S>, side: S) -> Option<usize> {
    let roster = snapshot.roster(side);
    let foe_types: Vec<_> = snapshot
        .roster(side.other())
        .active()
        .map(|c| c.moves.iter().map(|m| m.move_type).collect())
        .unwrap_or_default();

    roster
        .bench()
        .find(|(_, c)| !is_weak_to_any(&c.types, &foe_types))
        .or_else(|| roster.bench().next())
        .map(|(i, _)| i)
}
