//! Hot-seat battle
//!
//! Runs a host and a guest in one process against an in-memory store. The
//! host picks the best-scoring move, the guest picks at random.
//!
//! ```text
//! RUST_LOG=debug cargo run --example hot_seat -- teams.json
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use duet_battle::{best_move, best_switch, Action, Event, LegalAction, Role, Side};
use duet_client::{BattleSession, MemoryStore, SyncConfig, SyncError};
use duet_protocol::RecordStatus;
use duet_team::CatalogTeams;
use rand::seq::SliceRandom;
use tracing_subscriber::EnvFilter;

const BATTLE_ID: &str = "hot-seat";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let teams = match std::env::args().nth(1) {
        Some(path) => CatalogTeams::load(&path)?,
        None => builtin_teams()?,
    };
    let mut refs: Vec<String> = teams.team_refs().map(str::to_owned).collect();
    refs.sort();
    let (host_team, guest_team) = match refs.as_slice() {
        [first, second, ..] => (first.clone(), second.clone()),
        _ => anyhow::bail!("need at least two teams, found {}", refs.len()),
    };

    let store = Arc::new(MemoryStore::new());
    let config = SyncConfig::default();
    let mut host = BattleSession::new(BATTLE_ID, Role::Host, store.clone(), config.clone());
    let mut guest = BattleSession::new(BATTLE_ID, Role::Guest, store.clone(), config);

    host.host_create("host", "guest", &host_team, &guest_team).await?;
    host.connect().await?;
    guest.connect().await?;
    host.host_start(&teams).await.context("starting battle")?;

    let mut printed = 0;
    for _ in 0..500 {
        let acted = play(&host, true).await? | play(&guest, false).await?;

        if let Some(snapshot) = host.snapshot() {
            for event in &snapshot.log[printed..] {
                print_event(event);
            }
            printed = snapshot.log.len();
        }
        if host.status() == Some(RecordStatus::Completed)
            && guest.status() == Some(RecordStatus::Completed)
        {
            break;
        }
        if !acted {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    println!("final turn number: {}", host.turn_number());
    host.close();
    guest.close();
    Ok(())
}

/// Take one action for `session` if it has any. Returns whether it wrote.
async fn play(session: &BattleSession<MemoryStore>, smart: bool) -> Result<bool> {
    let actions = session.legal_actions();
    if actions.is_empty() {
        return Ok(false);
    }

    let result = match &actions[0] {
        LegalAction::Switch { slot, .. } => {
            let slot = smart
                .then(|| session.snapshot().and_then(|s| best_switch(&s, Side::Player)))
                .flatten()
                .unwrap_or(*slot);
            session.resolve_switch(Some(slot)).await.map(|_| ())
        }
        LegalAction::Concede => session.resolve_switch(None).await.map(|_| ()),
        _ => session.submit(choose(session, &actions, smart)).await,
    };

    match result {
        Ok(()) => Ok(true),
        // the other side's write landed first; the session has re-fetched
        Err(SyncError::StaleWrite { .. } | SyncError::WriteInFlight) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn choose(session: &BattleSession<MemoryStore>, actions: &[LegalAction], smart: bool) -> Action {
    if smart {
        if let Some(index) = session.snapshot().and_then(|s| best_move(&s, Side::Player)) {
            return Action::UseMove(index);
        }
    }
    match actions.choose(&mut rand::thread_rng()) {
        Some(LegalAction::UseMove { index, .. }) => Action::UseMove(*index),
        _ => Action::Pass,
    }
}

fn print_event(event: &Event<Side>) {
    match event {
        Event::MoveUsed { side, species, move_name } => {
            println!("[{side}] {species} used {move_name}")
        }
        Event::DamageDealt { target, amount, remaining_hp, .. } => {
            println!("[{target}] took {amount} damage ({remaining_hp} left)")
        }
        Event::PokemonFainted { side, species } => println!("[{side}] {species} fainted"),
        Event::SwitchedIn { side, species, .. } => println!("[{side}] sent out {species}"),
        Event::Forfeited { side } => println!("[{side}] forfeited"),
        Event::BattleEnded { winner } => println!("battle over: {winner:?}"),
        other => println!("{other:?}"),
    }
}

fn builtin_teams() -> Result<CatalogTeams> {
    let json = r#"{
        "sparks": [
            { "species": "Pikachu", "types": ["electric"], "maxHp": 95,
              "moves": [{ "name": "Thunderbolt", "type": "electric", "power": 90, "pp": 15, "maxPp": 15 },
                        { "name": "Quick Attack", "type": "normal", "power": 40, "pp": 30, "maxPp": 30 }] },
            { "species": "Jolteon", "types": ["electric"], "maxHp": 115,
              "moves": [{ "name": "Thunder Shock", "type": "electric", "power": 40, "pp": 30, "maxPp": 30,
                          "inflicts": "par" }] }
        ],
        "tide": [
            { "species": "Squirtle", "types": ["water"], "maxHp": 104,
              "moves": [{ "name": "Water Gun", "type": "water", "power": 40, "pp": 25, "maxPp": 25 },
                        { "name": "Tackle", "type": "normal", "power": 40, "pp": 35, "maxPp": 35 }] },
            { "species": "Geodude", "types": ["rock", "ground"], "maxHp": 100,
              "moves": [{ "name": "Rock Throw", "type": "rock", "power": 50, "pp": 15, "maxPp": 15 }] }
        ]
    }"#;
    CatalogTeams::from_json(json).context("parsing built-in teams")
}
