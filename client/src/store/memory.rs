//! In-process store for tests and local play

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use duet_protocol::{commit, RecordPatch, RemoteBattleRecord};
use futures_util::stream::{self, StreamExt};
use tokio::sync::broadcast;

use super::{BattleStore, ChangeStream};
use crate::error::StoreError;

const CHANNEL_CAPACITY: usize = 64;

struct Entry {
    record: Option<RemoteBattleRecord>,
    changes: broadcast::Sender<RemoteBattleRecord>,
}

impl Entry {
    fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            record: None,
            changes,
        }
    }
}

/// Battle records in a map, fanned out to subscribers over `broadcast`
#[derive(Default)]
pub struct MemoryStore {
    battles: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// End every open change stream for a battle, as a dropped connection would
    pub fn disconnect(&self, battle_id: &str) {
        if let Ok(mut battles) = self.battles.lock() {
            if let Some(entry) = battles.get_mut(battle_id) {
                entry.changes = broadcast::channel(CHANNEL_CAPACITY).0;
            }
        }
    }

    /// Remove a battle record and end its change streams
    pub fn delete(&self, battle_id: &str) {
        if let Ok(mut battles) = self.battles.lock() {
            if let Some(entry) = battles.get_mut(battle_id) {
                entry.record = None;
                entry.changes = broadcast::channel(CHANNEL_CAPACITY).0;
            }
        }
    }

    /// Number of live change streams for a battle
    pub fn subscriber_count(&self, battle_id: &str) -> usize {
        self.battles
            .lock()
            .ok()
            .and_then(|b| b.get(battle_id).map(|e| e.changes.receiver_count()))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, StoreError> {
        self.battles
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl BattleStore for MemoryStore {
    async fn create_or_update(
        &self,
        battle_id: &str,
        patch: RecordPatch,
    ) -> Result<RemoteBattleRecord, StoreError> {
        let mut battles = self.lock()?;
        let entry = battles
            .entry(battle_id.to_string())
            .or_insert_with(Entry::new);

        let next = commit(entry.record.as_ref(), battle_id, patch, Utc::now())?;
        entry.record = Some(next.clone());
        // no subscribers is fine
        let _ = entry.changes.send(next.clone());

        tracing::debug!(battle_id, turn_number = next.turn_number, "memory store write");
        Ok(next)
    }

    async fn get(&self, battle_id: &str) -> Result<Option<RemoteBattleRecord>, StoreError> {
        Ok(self
            .lock()?
            .get(battle_id)
            .and_then(|entry| entry.record.clone()))
    }

    async fn subscribe(&self, battle_id: &str) -> Result<ChangeStream, StoreError> {
        let (current, receiver) = {
            let mut battles = self.lock()?;
            let entry = battles
                .entry(battle_id.to_string())
                .or_insert_with(Entry::new);
            (entry.record.clone(), entry.changes.subscribe())
        };

        let battle_id = battle_id.to_string();
        let changes = stream::unfold(receiver, move |mut receiver| {
            let battle_id = battle_id.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(record) => return Some((Ok::<_, StoreError>(record), receiver)),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(battle_id = %battle_id, skipped, "subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(stream::iter(current.map(Ok)).chain(changes).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_protocol::CommitError;

    #[tokio::test]
    async fn test_create_get_update() {
        let store = MemoryStore::new();
        assert!(store.get("b1").await.unwrap().is_none());

        let created = store
            .create_or_update("b1", RecordPatch::create("ash", "gary", "t1", "t2"))
            .await
            .unwrap();
        assert_eq!(created.turn_number, 1);
        assert_eq!(store.get("b1").await.unwrap(), Some(created));

        let stale = RecordPatch {
            expected_turn: Some(4),
            ..RecordPatch::default()
        };
        assert!(matches!(
            store.create_or_update("b1", stale).await,
            Err(StoreError::Commit(CommitError::StaleWrite { expected: 4, found: 1 }))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_then_changes() {
        let store = MemoryStore::new();
        store
            .create_or_update("b1", RecordPatch::create("ash", "gary", "t1", "t2"))
            .await
            .unwrap();

        let mut changes = store.subscribe("b1").await.unwrap();
        assert_eq!(changes.next().await.unwrap().unwrap().turn_number, 1);

        let patch = RecordPatch {
            expected_turn: Some(1),
            ..RecordPatch::default()
        };
        store.create_or_update("b1", patch).await.unwrap();
        assert_eq!(changes.next().await.unwrap().unwrap().turn_number, 2);
    }

    #[tokio::test]
    async fn test_disconnect_ends_streams() {
        let store = MemoryStore::new();
        let mut changes = store.subscribe("b1").await.unwrap();
        assert_eq!(store.subscriber_count("b1"), 1);
        store.disconnect("b1");
        assert!(changes.next().await.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store
            .create_or_update("b1", RecordPatch::create("ash", "gary", "t1", "t2"))
            .await
            .unwrap();
        let mut changes = store.subscribe("b1").await.unwrap();
        assert!(changes.next().await.is_some());

        store.delete("b1");
        assert!(changes.next().await.is_none());
        assert!(store.get("b1").await.unwrap().is_none());
    }
}
