//! Push subscription with bounded linear backoff.
//!
//! ```text
//! Idle -> Attempting -> Subscribed -> (Failed -> Attempting)* -> Exhausted
//!                 \______________________________________/
//!                                 Cancelled
//! ```
//!
//! A stream reporting that the record was deleted ends in `Gone` at once.

use std::sync::Arc;

use duet_protocol::RemoteBattleRecord;
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::RetryPolicy;
use crate::error::{StoreError, SyncError};
use crate::store::BattleStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Idle,
    /// Opening the stream; `attempt` counts from 1 since the last success
    Attempting { attempt: u32 },
    Subscribed,
    /// Waiting out the backoff after failure number `attempt`
    Failed { attempt: u32 },
    Cancelled,
    /// Gave up after the maximum number of attempts
    Exhausted,
    /// The record was deleted
    Gone,
}

impl SubscriptionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubscriptionState::Cancelled | SubscriptionState::Exhausted | SubscriptionState::Gone
        )
    }
}

/// Delivered to the `on_change` callback
#[derive(Debug)]
pub enum SubscriptionEvent {
    /// One observed remote write. Duplicates are possible after a resubscribe.
    Record(RemoteBattleRecord),
    /// Terminal; nothing follows
    Failed(SyncError),
}

/// Opens and maintains subscriptions against one store
pub struct SubscriptionManager<St: ?Sized> {
    store: Arc<St>,
    policy: RetryPolicy,
}

impl<St: BattleStore + ?Sized + 'static> SubscriptionManager<St> {
    pub fn new(store: Arc<St>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Subscribe to `battle_id`. The returned handle owns the background
    /// task; dropping it cancels the subscription.
    pub fn subscribe<F>(&self, battle_id: impl Into<String>, on_change: F) -> Cancel
    where
        F: FnMut(SubscriptionEvent) + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, _) = watch::channel(SubscriptionState::Idle);
        let state = Arc::new(state_tx);

        let task = tokio::spawn(run(
            self.store.clone(),
            battle_id.into(),
            self.policy,
            on_change,
            state.clone(),
            cancel_rx,
        ));

        Cancel {
            cancel_tx,
            task,
            state,
        }
    }
}

/// Handle to a running subscription
pub struct Cancel {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    state: Arc<watch::Sender<SubscriptionState>>,
}

impl Cancel {
    /// Stop the subscription, including any pending retry
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
        self.task.abort();
        self.state.send_if_modified(|s| {
            if s.is_terminal() {
                return false;
            }
            *s = SubscriptionState::Cancelled;
            true
        });
    }

    pub fn state(&self) -> SubscriptionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SubscriptionState> {
        self.state.subscribe()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Cancel {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn set_state(state: &watch::Sender<SubscriptionState>, next: SubscriptionState) {
    state.send_if_modified(|s| {
        if s.is_terminal() || *s == next {
            return false;
        }
        *s = next;
        true
    });
}

async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            // handle dropped; the task is being aborted
            std::future::pending::<()>().await;
        }
    }
}

async fn run<St, F>(
    store: Arc<St>,
    battle_id: String,
    policy: RetryPolicy,
    mut on_change: F,
    state: Arc<watch::Sender<SubscriptionState>>,
    mut cancel: watch::Receiver<bool>,
) where
    St: BattleStore + ?Sized,
    F: FnMut(SubscriptionEvent) + Send,
{
    let mut failures: u32 = 0;

    loop {
        set_state(&state, SubscriptionState::Attempting { attempt: failures + 1 });

        let opened = tokio::select! {
            _ = cancelled(&mut cancel) => return,
            opened = store.subscribe(&battle_id) => opened,
        };

        let error = match opened {
            Ok(mut changes) => {
                set_state(&state, SubscriptionState::Subscribed);
                tracing::debug!(battle_id = %battle_id, "subscribed");
                failures = 0;

                loop {
                    let next = tokio::select! {
                        _ = cancelled(&mut cancel) => return,
                        next = changes.next() => next,
                    };
                    match next {
                        Some(Ok(record)) => {
                            if *cancel.borrow() {
                                return;
                            }
                            on_change(SubscriptionEvent::Record(record));
                        }
                        Some(Err(e)) => break e,
                        None => break StoreError::Closed,
                    }
                }
            }
            Err(e) => e,
        };

        if error.is_record_gone() {
            set_state(&state, SubscriptionState::Gone);
            tracing::error!(battle_id = %battle_id, "battle record deleted; stopping subscription");
            on_change(SubscriptionEvent::Failed(SyncError::RecordDeleted));
            return;
        }

        failures += 1;
        set_state(&state, SubscriptionState::Failed { attempt: failures });
        tracing::warn!(
            battle_id = %battle_id,
            attempt = failures,
            max_attempts = policy.max_attempts,
            error = %error,
            "Subscription attempt failed"
        );

        if failures >= policy.max_attempts {
            set_state(&state, SubscriptionState::Exhausted);
            tracing::error!(battle_id = %battle_id, attempts = failures, "Giving up on subscription");
            on_change(SubscriptionEvent::Failed(SyncError::SubscriptionFailed {
                attempts: failures,
                last_error: error.to_string(),
            }));
            return;
        }

        tokio::select! {
            _ = cancelled(&mut cancel) => return,
            _ = tokio::time::sleep(policy.delay_for(failures)) => {}
        }
    }
}
