//! One client's participation in a battle.
//!
//! The session owns the reconciliation cache, keeps the push subscription
//! alive, and is the only place that writes to the store. Writes are
//! serialized: while one is unacknowledged, further actions fail with
//! [`SyncError::WriteInFlight`].

use std::sync::{Arc, Mutex, MutexGuard};

use duet_battle::{
    apply_action, legal_actions, resolve_pending_switch, to_remote, Action, BattleSnapshot,
    Fingerprint, LegalAction, Rejection, Role, Roster, Side,
};
use duet_protocol::{RecordPatch, RecordStatus, RemoteBattleRecord};
use duet_team::TeamService;
use tokio::sync::watch;

use crate::cache::{Cache, Reconciled};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::store::BattleStore;
use crate::subscription::{Cancel, SubscriptionEvent, SubscriptionManager, SubscriptionState};

/// What the presentation layer renders
#[derive(Debug, Clone, Default)]
pub struct View {
    /// Local perspective; optimistic while a write is pending
    pub snapshot: Option<Arc<BattleSnapshot>>,
    pub legal_actions: Vec<LegalAction>,
    pub turn_number: u64,
    pub status: Option<RecordStatus>,
    pub fingerprint: Option<Fingerprint>,
    /// `snapshot` has not been acknowledged by the store yet
    pub optimistic: bool,
}

impl View {
    fn from_cache(cache: &Cache) -> Self {
        let snapshot = cache.visible_snapshot().cloned();
        let legal_actions = match (&snapshot, cache.pending()) {
            (Some(snap), None) => legal_actions(snap, Side::Player),
            _ => Vec::new(),
        };
        Self {
            fingerprint: snapshot.as_ref().map(|s| s.fingerprint()),
            snapshot,
            legal_actions,
            turn_number: cache.turn_number(),
            status: cache.status(),
            optimistic: cache.pending().is_some(),
        }
    }

    fn same_as(&self, other: &View) -> bool {
        self.fingerprint == other.fingerprint
            && self.turn_number == other.turn_number
            && self.status == other.status
            && self.optimistic == other.optimistic
    }
}

struct Shared {
    cache: Mutex<Cache>,
    view: watch::Sender<View>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Cache> {
        // a panic mid-update leaves the cache consistent; keep going
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, cache: &Cache) {
        let next = View::from_cache(cache);
        self.view.send_if_modified(|current| {
            if current.same_as(&next) {
                return false;
            }
            *current = next;
            true
        });
    }

    fn absorb(&self, record: &RemoteBattleRecord) -> Reconciled {
        let mut cache = self.lock();
        let outcome = cache.absorb(record);
        if outcome == Reconciled::Adopted {
            tracing::debug!(
                battle_id = %record.battle_id,
                turn_number = record.turn_number,
                status = ?record.status,
                "adopted remote record"
            );
            self.publish(&cache);
        }
        outcome
    }

    fn begin_write(&self, expected: u64, optimistic: Arc<BattleSnapshot>) -> Result<(), SyncError> {
        let mut cache = self.lock();
        cache.begin_write(expected, optimistic)?;
        self.publish(&cache);
        Ok(())
    }

    fn mark_deleted(&self) {
        let mut cache = self.lock();
        cache.mark_deleted();
        self.publish(&cache);
    }

    fn abandon_write(&self) {
        let mut cache = self.lock();
        cache.abandon_write();
        self.publish(&cache);
    }
}

pub struct BattleSession<St: ?Sized = dyn BattleStore> {
    battle_id: String,
    role: Role,
    store: Arc<St>,
    config: SyncConfig,
    shared: Arc<Shared>,
    subscription: Option<Cancel>,
}

impl<St: BattleStore + ?Sized + 'static> BattleSession<St> {
    pub fn new(battle_id: impl Into<String>, role: Role, store: Arc<St>, config: SyncConfig) -> Self {
        let cache = Cache::new(role);
        let (view, _) = watch::channel(View::from_cache(&cache));
        Self {
            battle_id: battle_id.into(),
            role,
            store,
            config,
            shared: Arc::new(Shared {
                cache: Mutex::new(cache),
                view,
            }),
            subscription: None,
        }
    }

    pub fn battle_id(&self) -> &str {
        &self.battle_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Create the pending record. Host only.
    pub async fn host_create(
        &self,
        host_id: &str,
        guest_id: &str,
        host_team: &str,
        guest_team: &str,
    ) -> Result<(), SyncError> {
        self.require_host("create the battle")?;
        let record = self
            .store
            .create_or_update(
                &self.battle_id,
                RecordPatch::create(host_id, guest_id, host_team, guest_team),
            )
            .await?;
        tracing::info!(battle_id = %self.battle_id, "battle created");
        self.shared.absorb(&record);
        Ok(())
    }

    /// Resolve both teams and activate the battle with the host to move.
    /// Host only. A battle that is already active is left alone.
    pub async fn host_start(&self, teams: &dyn TeamService) -> Result<(), SyncError> {
        self.require_host("start the battle")?;
        let record = self
            .store
            .get(&self.battle_id)
            .await?
            .ok_or(SyncError::RecordNotFound)?;
        self.shared.absorb(&record);

        match record.status {
            RecordStatus::Pending => {}
            RecordStatus::Active => return Ok(()),
            RecordStatus::Completed => return Err(SyncError::BattleAlreadyComplete),
        }

        let roster_for = |role: Role| -> Result<Roster, SyncError> {
            let team_ref = record.team_for(role).ok_or_else(|| SyncError::MissingTeamData {
                role,
                reason: "no team reference on the record".into(),
            })?;
            let slots = teams
                .resolve_team(team_ref)
                .map_err(|e| SyncError::missing_team(role, e))?;
            Ok(Roster::new(slots))
        };
        let host = roster_for(Role::Host)?;
        let guest = roster_for(Role::Guest)?;

        // Host is always the local player here
        let local = BattleSnapshot::new(host, guest, Side::Player);
        self.publish(local, record.turn_number).await?;
        tracing::info!(battle_id = %self.battle_id, "battle started");
        Ok(())
    }

    /// Load the current record and, if configured, start the push
    /// subscription. A record that does not exist yet is not an error here.
    pub async fn connect(&mut self) -> Result<(), SyncError> {
        match self.refresh().await {
            Ok(_) | Err(SyncError::RecordNotFound) => {}
            Err(e) => return Err(e),
        }

        if self.config.subscribe && self.subscription.is_none() {
            let manager = SubscriptionManager::new(self.store.clone(), self.config.retry);
            let shared = self.shared.clone();
            let battle_id = self.battle_id.clone();
            let handle = manager.subscribe(self.battle_id.clone(), move |event| match event {
                SubscriptionEvent::Record(record) => {
                    shared.absorb(&record);
                }
                SubscriptionEvent::Failed(error) => {
                    tracing::error!(battle_id = %battle_id, error = %error, "live updates stopped");
                    if matches!(error, SyncError::RecordDeleted) {
                        shared.mark_deleted();
                    }
                }
            });
            self.subscription = Some(handle);
        }
        Ok(())
    }

    /// Fetch the record and reconcile it.
    ///
    /// A missing record is `RecordNotFound` ("not created yet") until the
    /// battle has been seen active. After that it is `RecordDeleted` and the
    /// session refuses further writes.
    pub async fn refresh(&self) -> Result<Reconciled, SyncError> {
        match self.store.get(&self.battle_id).await? {
            Some(record) => Ok(self.shared.absorb(&record)),
            None => {
                let seen = self.shared.lock().status();
                if matches!(seen, Some(RecordStatus::Active | RecordStatus::Completed)) {
                    tracing::error!(battle_id = %self.battle_id, "battle record disappeared");
                    self.shared.mark_deleted();
                    return Err(SyncError::RecordDeleted);
                }
                Err(SyncError::RecordNotFound)
            }
        }
    }

    /// Take an action as the local player
    pub async fn submit(&self, action: Action) -> Result<(), SyncError> {
        let (snapshot, base) = self.current()?;
        let resolution = apply_action(&snapshot, Side::Player, action)?;
        self.publish(resolution.snapshot, base).await
    }

    /// Give up. Allowed whether or not it is our turn.
    pub async fn forfeit(&self) -> Result<(), SyncError> {
        self.submit(Action::Forfeit).await?;
        tracing::info!(battle_id = %self.battle_id, role = %self.role, "forfeited");
        Ok(())
    }

    /// Resolve the local side's pending switch.
    ///
    /// Returns `false` when nothing was written because the configured mode
    /// is waiting for an explicit choice.
    pub async fn resolve_switch(&self, choice: Option<usize>) -> Result<bool, SyncError> {
        let (snapshot, base) = self.current()?;
        match snapshot.pending_switch {
            Some(Side::Player) => {}
            Some(Side::Opponent) => return Err(Rejection::NotYourTurn.into()),
            None => return Err(Rejection::NoSwitchPending.into()),
        }

        let next = resolve_pending_switch(&snapshot, self.config.switch_mode, choice)?;
        if next == *snapshot {
            return Ok(false);
        }
        self.publish(next, base).await?;
        Ok(true)
    }

    /// Presentation updates; skips values with an unchanged fingerprint
    pub fn view(&self) -> watch::Receiver<View> {
        self.shared.view.subscribe()
    }

    pub fn legal_actions(&self) -> Vec<LegalAction> {
        self.shared.view.borrow().legal_actions.clone()
    }

    /// Last snapshot acknowledged by the store
    pub fn snapshot(&self) -> Option<Arc<BattleSnapshot>> {
        self.shared.lock().snapshot().cloned()
    }

    pub fn turn_number(&self) -> u64 {
        self.shared.lock().turn_number()
    }

    pub fn status(&self) -> Option<RecordStatus> {
        self.shared.lock().status()
    }

    pub fn subscription_state(&self) -> Option<watch::Receiver<SubscriptionState>> {
        self.subscription.as_ref().map(Cancel::watch_state)
    }

    /// Cancel the subscription. An in-flight write is dropped with the future
    /// that owns it.
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    fn require_host(&self, what: &'static str) -> Result<(), SyncError> {
        if self.role == Role::Host {
            Ok(())
        } else {
            Err(SyncError::NotHost(what))
        }
    }

    /// Snapshot to act on, with the turn number it belongs to. Both are read
    /// under one lock so the write is based on exactly this snapshot.
    fn current(&self) -> Result<(Arc<BattleSnapshot>, u64), SyncError> {
        let cache = self.shared.lock();
        if cache.is_deleted() {
            return Err(SyncError::RecordDeleted);
        }
        if cache.is_frozen() {
            return Err(SyncError::BattleAlreadyComplete);
        }
        if cache.pending().is_some() {
            return Err(SyncError::WriteInFlight);
        }
        let snapshot = cache.snapshot().cloned().ok_or(SyncError::NotStarted)?;
        Ok((snapshot, cache.turn_number()))
    }

    /// Push a snapshot computed from the record at turn `base`
    async fn publish(&self, local: BattleSnapshot, base: u64) -> Result<(), SyncError> {
        let optimistic = Arc::new(local);
        self.shared.begin_write(base, optimistic.clone())?;
        let data = to_remote((*optimistic).clone(), self.role);

        match self
            .store
            .create_or_update(&self.battle_id, RecordPatch::advance(base, data))
            .await
        {
            Ok(record) => {
                self.shared.absorb(&record);
                Ok(())
            }
            Err(e) => {
                self.shared.abandon_write();
                let error = SyncError::from(e);
                if let SyncError::RecordNotFound = error {
                    // it existed when this write was based on it
                    tracing::error!(battle_id = %self.battle_id, "battle record deleted mid-battle");
                    self.shared.mark_deleted();
                    return Err(SyncError::RecordDeleted);
                }
                if let SyncError::StaleWrite { expected, found } = error {
                    tracing::warn!(
                        battle_id = %self.battle_id,
                        expected,
                        found,
                        "write raced another client; re-fetching"
                    );
                    if let Err(refresh) = self.refresh().await {
                        tracing::warn!(battle_id = %self.battle_id, error = %refresh, "re-fetch failed");
                    }
                }
                Err(error)
            }
        }
    }
}

impl<St: ?Sized> Drop for BattleSession<St> {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use duet_battle::{Move, Type};
    use duet_team::{CatalogTeams, TeamMember};

    fn catalog() -> CatalogTeams {
        let mut teams = CatalogTeams::new();
        teams.insert(
            "electric",
            vec![TeamMember {
                species: "Pikachu".into(),
                level: 50,
                types: vec![Type::Electric],
                max_hp: Some(100),
                base_hp: None,
                current_hp: None,
                moves: vec![Move::new("Tackle", Type::Normal, 40, 35)],
            }],
        );
        teams.insert(
            "normal",
            vec![TeamMember {
                species: "Rattata".into(),
                level: 50,
                types: vec![Type::Normal],
                max_hp: Some(40),
                base_hp: None,
                current_hp: None,
                moves: vec![Move::new("Tackle", Type::Normal, 40, 35)],
            }],
        );
        teams
    }

    fn offline() -> SyncConfig {
        SyncConfig::default().with_subscribe(false)
    }

    #[tokio::test]
    async fn test_guest_cannot_bootstrap() {
        let store = Arc::new(MemoryStore::new());
        let guest = BattleSession::new("b1", Role::Guest, store, offline());
        assert!(matches!(
            guest.host_create("ash", "gary", "electric", "normal").await,
            Err(SyncError::NotHost(_))
        ));
    }

    #[tokio::test]
    async fn test_start_with_unknown_team_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        let host = BattleSession::new("b1", Role::Host, store, offline());
        host.host_create("ash", "gary", "electric", "ghost").await.unwrap();
        let err = host.host_start(&catalog()).await.unwrap_err();
        assert!(matches!(err, SyncError::MissingTeamData { role: Role::Guest, .. }));
        assert_eq!(host.status(), Some(RecordStatus::Pending));
    }

    #[tokio::test]
    async fn test_illegal_action_never_writes() {
        let store = Arc::new(MemoryStore::new());
        let host = BattleSession::new("b1", Role::Host, store.clone(), offline());
        host.host_create("ash", "gary", "electric", "normal").await.unwrap();
        host.host_start(&catalog()).await.unwrap();
        assert_eq!(host.turn_number(), 2);

        let mut guest = BattleSession::new("b1", Role::Guest, store.clone(), offline());
        guest.connect().await.unwrap();
        assert!(matches!(
            guest.submit(Action::Pass).await,
            Err(SyncError::Rejected(Rejection::NotYourTurn))
        ));
        assert!(matches!(
            host.submit(Action::UseMove(3)).await,
            Err(SyncError::Rejected(Rejection::InvalidMove(3)))
        ));
        assert_eq!(store.get("b1").await.unwrap().unwrap().turn_number, 2);
    }

    #[tokio::test]
    async fn test_view_tracks_turns() {
        let store = Arc::new(MemoryStore::new());
        let host = BattleSession::new("b1", Role::Host, store, offline());
        let view = host.view();
        assert!(view.borrow().snapshot.is_none());

        host.host_create("ash", "gary", "electric", "normal").await.unwrap();
        host.host_start(&catalog()).await.unwrap();

        let current = view.borrow().clone();
        assert_eq!(current.turn_number, 2);
        assert!(!current.optimistic);
        assert_eq!(current.legal_actions.last(), Some(&LegalAction::Pass));
        let snap = current.snapshot.unwrap();
        assert_eq!(snap.player().slots[0].species, "Pikachu");
        assert_eq!(host.legal_actions(), current.legal_actions);
    }

    #[tokio::test]
    async fn test_missing_record() {
        let store = Arc::new(MemoryStore::new());
        let guest = BattleSession::new("nope", Role::Guest, store, offline());
        assert!(matches!(guest.refresh().await, Err(SyncError::RecordNotFound)));
        assert!(matches!(guest.submit(Action::Pass).await, Err(SyncError::NotStarted)));
    }

    #[tokio::test]
    async fn test_guest_forfeits_out_of_turn() {
        let store = Arc::new(MemoryStore::new());
        let host = BattleSession::new("b1", Role::Host, store.clone(), offline());
        host.host_create("ash", "gary", "electric", "normal").await.unwrap();
        host.host_start(&catalog()).await.unwrap();

        let mut guest = BattleSession::new("b1", Role::Guest, store.clone(), offline());
        guest.connect().await.unwrap();
        guest.forfeit().await.unwrap();

        let record = store.get("b1").await.unwrap().unwrap();
        assert_eq!(record.turn_number, 3);
        assert_eq!(record.status, RecordStatus::Completed);
        assert_eq!(record.winner, Some(duet_battle::Winner::Won(Role::Host)));
        assert_eq!(record.ended_reason, Some(duet_battle::EndReason::Forfeit));

        host.refresh().await.unwrap();
        let snap = host.snapshot().unwrap();
        assert_eq!(snap.winner, Some(duet_battle::Winner::Won(Side::Player)));
        assert!(matches!(host.submit(Action::Pass).await, Err(SyncError::BattleAlreadyComplete)));
        assert!(matches!(guest.forfeit().await, Err(SyncError::BattleAlreadyComplete)));
    }

    #[tokio::test]
    async fn test_record_deleted_after_start() {
        let store = Arc::new(MemoryStore::new());
        let host = BattleSession::new("b1", Role::Host, store.clone(), offline());
        host.host_create("ash", "gary", "electric", "normal").await.unwrap();
        host.host_start(&catalog()).await.unwrap();

        store.delete("b1");
        assert!(matches!(host.refresh().await, Err(SyncError::RecordDeleted)));
        assert!(matches!(host.submit(Action::Pass).await, Err(SyncError::RecordDeleted)));
        assert!(matches!(host.refresh().await, Err(SyncError::RecordDeleted)));
    }

    #[tokio::test]
    async fn test_write_to_deleted_record() {
        let store = Arc::new(MemoryStore::new());
        let host = BattleSession::new("b1", Role::Host, store.clone(), offline());
        host.host_create("ash", "gary", "electric", "normal").await.unwrap();
        host.host_start(&catalog()).await.unwrap();

        store.delete("b1");
        // no refresh in between; the failed write itself notices
        assert!(matches!(host.submit(Action::Pass).await, Err(SyncError::RecordDeleted)));
        assert!(matches!(host.submit(Action::Pass).await, Err(SyncError::RecordDeleted)));
        assert!(!host.view().borrow().optimistic);
    }

    #[test]
    fn test_view_skips_unchanged() {
        let a = View {
            turn_number: 3,
            ..View::default()
        };
        let mut b = a.clone();
        assert!(a.same_as(&b));
        b.optimistic = true;
        assert!(!a.same_as(&b));
    }
}
