//! Wire-level types shared by every store adapter.
//!
//! - [`record`] - the remote battle record and its fingerprint
//! - [`commit`] - partial-record patches and the turn-number compare-and-swap
//! - [`sse`] - decoding of server-sent change notifications

use thiserror::Error;

pub mod commit;
pub mod record;
pub mod sse;

pub use commit::{commit, CommitError, RecordPatch};
pub use record::{decode_record, RecordFingerprint, RecordStatus, RemoteBattleRecord};
pub use sse::{SseParser, StreamEvent};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Empty message")]
    EmptyMessage,

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}
