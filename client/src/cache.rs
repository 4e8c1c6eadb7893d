//! Reconciliation of remote records into the local view.
//!
//! The cache is versioned by the record's turn number. Anything older, or
//! equal with the same fingerprint, is dropped without touching local state.

use std::sync::Arc;

use duet_battle::{local_perspective, to_local, BattleSnapshot, Role};
use duet_protocol::{RecordFingerprint, RecordStatus, RemoteBattleRecord};

use crate::error::SyncError;

/// Outcome of offering a record to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Adopted,
    /// Older turn number than what is cached
    Stale,
    /// Same turn number and fingerprint
    Duplicate,
}

/// A local write that the store has not acknowledged yet
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    /// Turn number the write was computed from
    pub base_turn: u64,
    pub snapshot: Arc<BattleSnapshot>,
}

/// One client's view of a battle
#[derive(Debug, Clone, PartialEq)]
pub struct Cache {
    role: Role,
    turn_number: u64,
    fingerprint: Option<RecordFingerprint>,
    snapshot: Option<Arc<BattleSnapshot>>,
    record: Option<Arc<RemoteBattleRecord>>,
    pending: Option<PendingWrite>,
    frozen: bool,
    deleted: bool,
}

impl Cache {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            turn_number: 0,
            fingerprint: None,
            snapshot: None,
            record: None,
            pending: None,
            frozen: false,
            deleted: false,
        }
    }

    /// Merge `incoming` in place
    pub fn absorb(&mut self, incoming: &RemoteBattleRecord) -> Reconciled {
        if incoming.turn_number < self.turn_number {
            return Reconciled::Stale;
        }
        let fingerprint = incoming.fingerprint();
        if incoming.turn_number == self.turn_number && self.fingerprint == Some(fingerprint) {
            return Reconciled::Duplicate;
        }

        self.snapshot = incoming.battle_data.clone().map(|data| {
            let mut local = to_local(data, self.role);
            if local.turn_owner.is_some() {
                local.turn_owner = Some(local_perspective(incoming.current_turn, self.role));
            }
            Arc::new(local)
        });
        self.turn_number = incoming.turn_number;
        self.fingerprint = Some(fingerprint);
        self.record = Some(Arc::new(incoming.clone()));

        if self
            .pending
            .as_ref()
            .is_some_and(|p| incoming.turn_number > p.base_turn)
        {
            self.pending = None;
        }
        if incoming.is_completed() {
            self.frozen = true;
            self.pending = None;
        }
        Reconciled::Adopted
    }

    /// Reserve the single write slot for an optimistic snapshot computed
    /// from the record at turn `expected`.
    ///
    /// Fails with `StaleWrite` if a newer record was adopted since.
    pub fn begin_write(
        &mut self,
        expected: u64,
        optimistic: Arc<BattleSnapshot>,
    ) -> Result<(), SyncError> {
        if self.deleted {
            return Err(SyncError::RecordDeleted);
        }
        if self.frozen {
            return Err(SyncError::BattleAlreadyComplete);
        }
        if self.pending.is_some() {
            return Err(SyncError::WriteInFlight);
        }
        if self.turn_number != expected {
            return Err(SyncError::StaleWrite {
                expected,
                found: self.turn_number,
            });
        }
        self.pending = Some(PendingWrite {
            base_turn: expected,
            snapshot: optimistic,
        });
        Ok(())
    }

    /// The record disappeared after the battle started. Blocks all writes.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
        self.pending = None;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Drop the optimistic snapshot after a failed write
    pub fn abandon_write(&mut self) {
        self.pending = None;
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn turn_number(&self) -> u64 {
        self.turn_number
    }

    pub fn status(&self) -> Option<RecordStatus> {
        self.record.as_ref().map(|r| r.status)
    }

    /// Last adopted snapshot, in local perspective
    pub fn snapshot(&self) -> Option<&Arc<BattleSnapshot>> {
        self.snapshot.as_ref()
    }

    /// What the player should see: the optimistic snapshot while a write is
    /// pending, the adopted one otherwise
    pub fn visible_snapshot(&self) -> Option<&Arc<BattleSnapshot>> {
        self.pending
            .as_ref()
            .map(|p| &p.snapshot)
            .or(self.snapshot.as_ref())
    }

    pub fn record(&self) -> Option<&Arc<RemoteBattleRecord>> {
        self.record.as_ref()
    }

    pub fn pending(&self) -> Option<&PendingWrite> {
        self.pending.as_ref()
    }

    /// Set once a completed record is adopted; no further writes
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

/// Value-style reconcile: `local` comes back untouched when `incoming` is
/// stale or a duplicate.
pub fn reconcile(mut local: Cache, incoming: &RemoteBattleRecord) -> Cache {
    local.absorb(incoming);
    local
}
