//! Host and guest sessions sharing one in-memory store

use std::sync::Arc;
use std::time::Duration;

use duet_battle::{Action, Event, LegalAction, Move, Rejection, Role, Side, Type, Winner};
use duet_client::{BattleSession, BattleStore, MemoryStore, SyncConfig, SyncError, View};
use duet_protocol::RecordStatus;
use duet_team::{CatalogTeams, TeamMember};
use tokio::sync::watch;

fn member(species: &str, types: Vec<Type>, max_hp: u32) -> TeamMember {
    TeamMember {
        species: species.into(),
        level: 50,
        types,
        max_hp: Some(max_hp),
        base_hp: None,
        current_hp: None,
        moves: vec![Move::new("Tackle", Type::Normal, 40, 35)],
    }
}

fn catalog() -> CatalogTeams {
    let mut teams = CatalogTeams::new();
    teams.insert("electric", vec![member("Pikachu", vec![Type::Electric], 100)]);
    teams.insert("normal", vec![member("Rattata", vec![Type::Normal], 40)]);
    teams.insert("sturdy", vec![member("Snorlax", vec![Type::Normal], 300)]);
    teams
}

async fn wait_until(view: &mut watch::Receiver<View>, f: impl FnMut(&View) -> bool) -> View {
    tokio::time::timeout(Duration::from_secs(5), view.wait_for(f))
        .await
        .expect("timed out waiting for view")
        .expect("session dropped")
        .clone()
}

#[tokio::test]
async fn test_single_knockout_ends_battle() {
    let store = Arc::new(MemoryStore::new());
    let mut host = BattleSession::new("b1", Role::Host, store.clone(), SyncConfig::default());
    let mut guest = BattleSession::new("b1", Role::Guest, store.clone(), SyncConfig::default());

    host.host_create("ash", "gary", "electric", "normal").await.unwrap();
    host.connect().await.unwrap();
    guest.connect().await.unwrap();
    host.host_start(&catalog()).await.unwrap();

    let mut guest_view = guest.view();
    let waiting = wait_until(&mut guest_view, |v| v.status == Some(RecordStatus::Active)).await;
    let snap = waiting.snapshot.unwrap();
    assert_eq!(snap.turn_owner, Some(Side::Opponent));
    assert!(waiting.legal_actions.is_empty());

    host.submit(Action::UseMove(0)).await.unwrap();

    let fainted = wait_until(&mut guest_view, |v| v.turn_number == 3).await;
    let snap = fainted.snapshot.unwrap();
    assert_eq!(snap.player().slots[0].current_hp, 0);
    assert_eq!(snap.pending_switch, Some(Side::Player));
    assert_eq!(fainted.legal_actions, vec![LegalAction::Concede]);

    assert!(guest.resolve_switch(None).await.unwrap());

    let mut host_view = host.view();
    let done = wait_until(&mut host_view, |v| v.status == Some(RecordStatus::Completed)).await;
    let snap = done.snapshot.unwrap();
    assert!(snap.is_complete);
    assert_eq!(snap.winner, Some(Winner::Won(Side::Player)));
    assert!(matches!(snap.log.last(), Some(Event::BattleEnded { .. })));

    let record = store.get("b1").await.unwrap().unwrap();
    assert_eq!(record.turn_number, 4);
    assert_eq!(record.winner, Some(Winner::Won(Role::Host)));

    assert!(matches!(
        host.submit(Action::Pass).await,
        Err(SyncError::BattleAlreadyComplete)
    ));
    host.close();
    guest.close();
}

#[tokio::test]
async fn test_racing_writes_one_loses() {
    let store = Arc::new(MemoryStore::new());
    let offline = SyncConfig::default().with_subscribe(false);
    let mut host = BattleSession::new("b2", Role::Host, store.clone(), offline.clone());
    let mut guest = BattleSession::new("b2", Role::Guest, store.clone(), offline.clone());

    host.host_create("ash", "gary", "sturdy", "sturdy").await.unwrap();
    host.host_start(&catalog()).await.unwrap();
    host.submit(Action::Pass).await.unwrap();
    guest.connect().await.unwrap();
    guest.submit(Action::Pass).await.unwrap();
    host.refresh().await.unwrap();
    host.submit(Action::Pass).await.unwrap();
    assert_eq!(host.turn_number(), 5);

    // the same player on two devices
    let mut first = BattleSession::new("b2", Role::Guest, store.clone(), offline.clone());
    let mut second = BattleSession::new("b2", Role::Guest, store.clone(), offline);
    first.connect().await.unwrap();
    second.connect().await.unwrap();
    assert_eq!(first.turn_number(), 5);
    assert_eq!(second.turn_number(), 5);

    let (a, b) = tokio::join!(first.submit(Action::UseMove(0)), second.submit(Action::Pass));
    let (winner, loser, lost) = match (a, b) {
        (Ok(()), Err(e)) => (&first, &second, e),
        (Err(e), Ok(())) => (&second, &first, e),
        other => panic!("expected exactly one write to land: {other:?}"),
    };
    assert!(matches!(lost, SyncError::StaleWrite { expected: 5, found: 6 }));
    assert_eq!(winner.turn_number(), 6);
    // loser has already re-fetched
    assert_eq!(loser.turn_number(), 6);
    assert!(matches!(
        loser.submit(Action::Pass).await,
        Err(SyncError::Rejected(Rejection::NotYourTurn))
    ));
    assert_eq!(store.get("b2").await.unwrap().unwrap().turn_number, 6);

    host.close();
    guest.close();
    first.close();
    second.close();
}

#[tokio::test]
async fn test_late_joiner_catches_up() {
    let store = Arc::new(MemoryStore::new());
    let host = BattleSession::new("b3", Role::Host, store.clone(), SyncConfig::default());
    host.host_create("ash", "gary", "sturdy", "electric").await.unwrap();
    host.host_start(&catalog()).await.unwrap();
    host.submit(Action::UseMove(0)).await.unwrap();

    let mut guest = BattleSession::new("b3", Role::Guest, store.clone(), SyncConfig::default());
    guest.connect().await.unwrap();
    let view = guest.view().borrow().clone();
    assert_eq!(view.turn_number, 3);
    let snap = view.snapshot.unwrap();
    assert_eq!(snap.turn_owner, Some(Side::Player));
    assert_eq!(snap.player().slots[0].species, "Pikachu");
    assert_eq!(snap.player().slots[0].current_hp, 40);
    guest.close();
}
