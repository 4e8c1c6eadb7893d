//! Partial-record writes and the turn-number compare-and-swap.
//!
//! Every store adapter funnels writes through [`commit`], so the acceptance
//! rules are identical in memory and over HTTP.

use chrono::{DateTime, Utc};
use duet_battle::{BattleSnapshot, EndReason, Role, Winner};
use thiserror::Error;

use crate::record::{RecordStatus, RemoteBattleRecord};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("stale write: expected turn {expected}, record is at {found}")]
    StaleWrite { expected: u64, found: u64 },

    #[error("battle is already complete")]
    AlreadyComplete,

    #[error("battle record already exists")]
    AlreadyExists,

    #[error("battle record not found")]
    NotFound,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("status cannot go from {from:?} to {to:?}")]
    InvalidTransition { from: RecordStatus, to: RecordStatus },
}

/// A partial record.
///
/// `expected_turn: None` creates the record; `Some(n)` updates it only if
/// the stored turn number is still `n`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub expected_turn: Option<u64>,
    pub host_id: Option<String>,
    pub guest_id: Option<String>,
    pub host_team: Option<String>,
    pub guest_team: Option<String>,
    pub status: Option<RecordStatus>,
    pub current_turn: Option<Role>,
    pub battle_data: Option<BattleSnapshot<Role>>,
    pub winner: Option<Winner<Role>>,
    pub ended_reason: Option<EndReason>,
}

impl RecordPatch {
    /// Initial pending record
    pub fn create(
        host_id: impl Into<String>,
        guest_id: impl Into<String>,
        host_team: impl Into<String>,
        guest_team: impl Into<String>,
    ) -> Self {
        Self {
            host_id: Some(host_id.into()),
            guest_id: Some(guest_id.into()),
            host_team: Some(host_team.into()),
            guest_team: Some(guest_team.into()),
            status: Some(RecordStatus::Pending),
            ..Self::default()
        }
    }

    /// Publish the next snapshot on top of turn `expected`.
    ///
    /// Status, current turn and winner are derived from the snapshot.
    pub fn advance(expected: u64, data: BattleSnapshot<Role>) -> Self {
        let status = if data.is_complete {
            RecordStatus::Completed
        } else {
            RecordStatus::Active
        };
        Self {
            expected_turn: Some(expected),
            status: Some(status),
            current_turn: data.turn_owner.or(data.pending_switch),
            winner: data.winner,
            ended_reason: data.ended_reason,
            battle_data: Some(data),
            ..Self::default()
        }
    }
}

/// Apply `patch` to the stored record.
///
/// Creation starts at turn 1 with the host to move. Every accepted update
/// increments the turn number by exactly one.
pub fn commit(
    existing: Option<&RemoteBattleRecord>,
    battle_id: &str,
    patch: RecordPatch,
    now: DateTime<Utc>,
) -> Result<RemoteBattleRecord, CommitError> {
    let Some(expected) = patch.expected_turn else {
        if existing.is_some() {
            return Err(CommitError::AlreadyExists);
        }
        return Ok(RemoteBattleRecord {
            battle_id: battle_id.to_string(),
            host_id: patch.host_id.ok_or(CommitError::MissingField("hostId"))?,
            guest_id: patch.guest_id.ok_or(CommitError::MissingField("guestId"))?,
            host_team: patch.host_team,
            guest_team: patch.guest_team,
            status: patch.status.unwrap_or(RecordStatus::Pending),
            current_turn: patch.current_turn.unwrap_or(Role::Host),
            turn_number: 1,
            battle_data: patch.battle_data,
            winner: patch.winner,
            ended_reason: patch.ended_reason,
            updated_at: now,
        });
    };

    let current = existing.ok_or(CommitError::NotFound)?;
    if current.is_completed() {
        return Err(CommitError::AlreadyComplete);
    }
    if current.turn_number != expected {
        return Err(CommitError::StaleWrite {
            expected,
            found: current.turn_number,
        });
    }
    if let Some(to) = patch.status {
        if to < current.status {
            return Err(CommitError::InvalidTransition {
                from: current.status,
                to,
            });
        }
    }

    let mut next = current.clone();
    if let Some(id) = patch.host_id {
        next.host_id = id;
    }
    if let Some(id) = patch.guest_id {
        next.guest_id = id;
    }
    if patch.host_team.is_some() {
        next.host_team = patch.host_team;
    }
    if patch.guest_team.is_some() {
        next.guest_team = patch.guest_team;
    }
    if let Some(status) = patch.status {
        next.status = status;
    }
    if let Some(turn) = patch.current_turn {
        next.current_turn = turn;
    }
    if patch.battle_data.is_some() {
        next.battle_data = patch.battle_data;
    }
    if patch.winner.is_some() {
        next.winner = patch.winner;
    }
    if patch.ended_reason.is_some() {
        next.ended_reason = patch.ended_reason;
    }
    next.turn_number = expected + 1;
    next.updated_at = now;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_battle::{CombatantSlot, Roster, Type};

    fn created() -> RemoteBattleRecord {
        commit(None, "b1", RecordPatch::create("ash", "gary", "t1", "t2"), Utc::now()).unwrap()
    }

    fn data() -> BattleSnapshot<Role> {
        let mon = || Roster::new(vec![CombatantSlot::new("Eevee", 50, 100, vec![Type::Normal])]);
        BattleSnapshot::new(mon(), mon(), Role::Host)
    }

    #[test]
    fn test_create() {
        let record = created();
        assert_eq!(record.turn_number, 1);
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.current_turn, Role::Host);
        assert_eq!(
            commit(Some(&record), "b1", RecordPatch::create("a", "b", "c", "d"), Utc::now()),
            Err(CommitError::AlreadyExists)
        );
    }

    #[test]
    fn test_create_requires_ids() {
        let patch = RecordPatch { status: Some(RecordStatus::Pending), ..RecordPatch::default() };
        assert_eq!(
            commit(None, "b1", patch, Utc::now()),
            Err(CommitError::MissingField("hostId"))
        );
    }

    #[test]
    fn test_advance_increments_by_one() {
        let record = created();
        let active = commit(Some(&record), "b1", RecordPatch::advance(1, data()), Utc::now()).unwrap();
        assert_eq!(active.turn_number, 2);
        assert_eq!(active.status, RecordStatus::Active);
        assert_eq!(active.current_turn, Role::Host);
        assert_eq!(active.host_team.as_deref(), Some("t1"));
    }

    #[test]
    fn test_stale_write_rejected() {
        let record = created();
        let active = commit(Some(&record), "b1", RecordPatch::advance(1, data()), Utc::now()).unwrap();
        assert_eq!(
            commit(Some(&active), "b1", RecordPatch::advance(1, data()), Utc::now()),
            Err(CommitError::StaleWrite { expected: 1, found: 2 })
        );
    }

    #[test]
    fn test_completed_is_immutable() {
        let record = created();
        let mut end = data();
        end.is_complete = true;
        end.turn_owner = None;
        end.winner = Some(Winner::Won(Role::Guest));
        let done = commit(Some(&record), "b1", RecordPatch::advance(1, end), Utc::now()).unwrap();
        assert_eq!(done.status, RecordStatus::Completed);
        assert_eq!(done.winner, Some(Winner::Won(Role::Guest)));
        assert_eq!(
            commit(Some(&done), "b1", RecordPatch::advance(2, data()), Utc::now()),
            Err(CommitError::AlreadyComplete)
        );
    }

    #[test]
    fn test_forfeit_carries_reason() {
        let record = created();
        let active = commit(Some(&record), "b1", RecordPatch::advance(1, data()), Utc::now()).unwrap();
        assert_eq!(active.ended_reason, None);

        let mut end = data();
        end.is_complete = true;
        end.turn_owner = None;
        end.winner = Some(Winner::Won(Role::Host));
        end.ended_reason = Some(EndReason::Forfeit);
        let done = commit(Some(&active), "b1", RecordPatch::advance(2, end), Utc::now()).unwrap();
        assert_eq!(done.status, RecordStatus::Completed);
        assert_eq!(done.ended_reason, Some(EndReason::Forfeit));
        // turn is left where it was
        assert_eq!(done.current_turn, Role::Host);
    }

    #[test]
    fn test_status_cannot_regress() {
        let record = created();
        let active = commit(Some(&record), "b1", RecordPatch::advance(1, data()), Utc::now()).unwrap();
        let patch = RecordPatch {
            expected_turn: Some(2),
            status: Some(RecordStatus::Pending),
            ..RecordPatch::default()
        };
        assert!(matches!(
            commit(Some(&active), "b1", patch, Utc::now()),
            Err(CommitError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_missing_record() {
        assert_eq!(
            commit(None, "b1", RecordPatch::advance(3, data()), Utc::now()),
            Err(CommitError::NotFound)
        );
    }
}
