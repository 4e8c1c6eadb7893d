//! One side's team of combatants

use serde::{Deserialize, Serialize};

use super::combatant::CombatantSlot;

/// Slots in party order plus the active index.
///
/// `fainted_count` always equals the number of slots at 0 HP; call
/// [`recount_fainted`](Self::recount_fainted) after changing HP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    pub slots: Vec<CombatantSlot>,
    pub active_index: usize,
    pub fainted_count: usize,
}

impl Roster {
    /// Build a roster with the first healthy slot active
    pub fn new(slots: Vec<CombatantSlot>) -> Self {
        let mut roster = Self {
            slots,
            active_index: 0,
            fainted_count: 0,
        };
        roster.recount_fainted();
        if let Some(first) = roster.first_available() {
            roster.active_index = first;
        }
        roster
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Get the active combatant
    pub fn active(&self) -> Option<&CombatantSlot> {
        self.slots.get(self.active_index)
    }

    /// Get the active combatant mutably
    pub fn active_mut(&mut self) -> Option<&mut CombatantSlot> {
        self.slots.get_mut(self.active_index)
    }

    /// Whether the active combatant is down
    pub fn active_fainted(&self) -> bool {
        self.active().is_none_or(CombatantSlot::is_fainted)
    }

    /// Iterate over non-active, non-fainted slots with their indices
    pub fn bench(&self) -> impl Iterator<Item = (usize, &CombatantSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(i, c)| *i != self.active_index && !c.is_fainted())
    }

    /// First non-fainted slot in roster order
    pub fn first_available(&self) -> Option<usize> {
        self.slots.iter().position(|c| !c.is_fainted())
    }

    /// First non-fainted slot that is not the active one
    pub fn first_replacement(&self) -> Option<usize> {
        self.bench().map(|(i, _)| i).next()
    }

    pub fn can_switch_to(&self, index: usize) -> bool {
        index != self.active_index && self.slots.get(index).is_some_and(|c| !c.is_fainted())
    }

    /// Make `index` the active slot. Caller validates with [`can_switch_to`](Self::can_switch_to).
    pub fn set_active(&mut self, index: usize) {
        self.active_index = index;
    }

    pub fn all_fainted(&self) -> bool {
        self.fainted_count == self.slots.len()
    }

    pub fn recount_fainted(&mut self) {
        self.fainted_count = self.slots.iter().filter(|c| c.is_fainted()).count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn mon(name: &str, hp: u32) -> CombatantSlot {
        CombatantSlot::new(name, 50, 100, vec![Type::Normal]).with_hp(hp)
    }

    #[test]
    fn test_new_skips_fainted_lead() {
        let roster = Roster::new(vec![mon("A", 0), mon("B", 50), mon("C", 100)]);
        assert_eq!(roster.active_index, 1);
        assert_eq!(roster.fainted_count, 1);
        assert!(!roster.all_fainted());
    }

    #[test]
    fn test_switch_targets() {
        let roster = Roster::new(vec![mon("A", 100), mon("B", 0), mon("C", 100)]);
        assert!(!roster.can_switch_to(0)); // already active
        assert!(!roster.can_switch_to(1)); // fainted
        assert!(roster.can_switch_to(2));
        assert!(!roster.can_switch_to(7));
        assert_eq!(roster.first_replacement(), Some(2));
        let bench: Vec<usize> = roster.bench().map(|(i, _)| i).collect();
        assert_eq!(bench, vec![2]);
    }

    #[test]
    fn test_all_fainted() {
        let mut roster = Roster::new(vec![mon("A", 10)]);
        roster.active_mut().unwrap().take_damage(10);
        roster.recount_fainted();
        assert!(roster.all_fainted());
        assert!(roster.active_fainted());
        assert_eq!(roster.first_replacement(), None);
    }
}
