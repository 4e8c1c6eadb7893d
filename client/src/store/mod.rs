//! Remote store adapters

mod memory;
mod rtdb;

use async_trait::async_trait;
use duet_protocol::{RecordPatch, RemoteBattleRecord};
use futures_util::stream::BoxStream;

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use rtdb::{RtdbConfig, RtdbStore};

/// Records as the store pushes them. Ends when the underlying connection does.
pub type ChangeStream = BoxStream<'static, Result<RemoteBattleRecord, StoreError>>;

/// A document store holding battle records.
///
/// Implementations apply writes through [`duet_protocol::commit`] so the
/// turn-number compare-and-swap behaves the same everywhere.
#[async_trait]
pub trait BattleStore: Send + Sync {
    /// Create (`expected_turn: None`) or conditionally update a record
    async fn create_or_update(
        &self,
        battle_id: &str,
        patch: RecordPatch,
    ) -> Result<RemoteBattleRecord, StoreError>;

    async fn get(&self, battle_id: &str) -> Result<Option<RemoteBattleRecord>, StoreError>;

    /// Open a change stream. The current record, if any, is delivered first.
    async fn subscribe(&self, battle_id: &str) -> Result<ChangeStream, StoreError>;
}
