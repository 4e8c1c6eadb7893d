//! Two-client battle synchronization over a shared document store.
//!
//! Each client runs a [`BattleSession`] against the same [`BattleStore`].
//! Actions are resolved locally with `duet-battle`, written with an
//! optimistic-concurrency check on the turn number, and pushed to the other
//! client through a retried subscription.
//!
//! ```no_run
//! use std::sync::Arc;
//! use duet_battle::{Action, Role};
//! use duet_client::{BattleSession, MemoryStore, SyncConfig};
//!
//! # async fn run() -> Result<(), duet_client::SyncError> {
//! let store = Arc::new(MemoryStore::new());
//! let mut guest = BattleSession::new("battle-1", Role::Guest, store, SyncConfig::default());
//! guest.connect().await?;
//! guest.submit(Action::UseMove(0)).await?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod error;
mod session;
pub mod store;
mod subscription;

pub use cache::{reconcile, Cache, PendingWrite, Reconciled};
pub use config::{RetryPolicy, SyncConfig};
pub use error::{StoreError, SyncError};
pub use session::{BattleSession, View};
pub use store::{BattleStore, ChangeStream, MemoryStore, RtdbConfig, RtdbStore};
pub use subscription::{Cancel, SubscriptionEvent, SubscriptionManager, SubscriptionState};
