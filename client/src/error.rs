use duet_battle::{Rejection, Role};
use duet_protocol::{CommitError, ParseError};
use duet_team::TeamError;
use thiserror::Error;

/// Failures talking to a [`BattleStore`](crate::BattleStore)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode store payload: {0}")]
    Parse(#[from] ParseError),

    #[error("change stream closed")]
    Closed,

    #[error("change stream revoked by the store: {0}")]
    Revoked(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// The record no longer exists; retrying cannot bring it back
    pub fn is_record_gone(&self) -> bool {
        matches!(self, StoreError::Commit(CommitError::NotFound))
    }
}

/// Errors surfaced by a [`BattleSession`](crate::BattleSession)
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("action rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("missing team data for {role}: {reason}")]
    MissingTeamData { role: Role, reason: String },

    #[error("subscription failed after {attempts} attempts: {last_error}")]
    SubscriptionFailed { attempts: u32, last_error: String },

    /// Another write landed first. The session has re-fetched; retry from the
    /// new state.
    #[error("stale write: expected turn {expected}, record is at {found}")]
    StaleWrite { expected: u64, found: u64 },

    #[error("battle record not found")]
    RecordNotFound,

    /// The record vanished after the battle had started. Fatal.
    #[error("battle record was deleted")]
    RecordDeleted,

    #[error("battle is already complete")]
    BattleAlreadyComplete,

    #[error("a write is already in flight")]
    WriteInFlight,

    #[error("battle has not started")]
    NotStarted,

    #[error("only the host can {0}")]
    NotHost(&'static str),

    #[error(transparent)]
    Store(StoreError),
}

impl SyncError {
    pub(crate) fn missing_team(role: Role, error: TeamError) -> Self {
        SyncError::MissingTeamData {
            role,
            reason: error.to_string(),
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Commit(CommitError::StaleWrite { expected, found }) => {
                SyncError::StaleWrite { expected, found }
            }
            StoreError::Commit(CommitError::NotFound) => SyncError::RecordNotFound,
            StoreError::Commit(CommitError::AlreadyComplete) => SyncError::BattleAlreadyComplete,
            other => SyncError::Store(other),
        }
    }
}
