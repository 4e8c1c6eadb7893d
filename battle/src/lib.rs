//! Combat rules, roster control and turn coordination for two-client battles.
//!
//! Everything in this crate is pure: snapshots go in, new snapshots and typed
//! rejections come out. Synchronization with the shared record lives in
//! `duet-protocol` and `duet-client`.
//!
//! # Overview
//!
//! ```text
//! duet-battle (rules + domain types) ← THIS CRATE
//!        │
//!        ├─> duet-protocol (shared record, commit)
//!        ├─> duet-team (team data)
//!        └─> duet-client (reconciliation, subscription, session)
//! ```
//!
//! # Main Types
//!
//! ## Domain Types
//! - [`Type`] - Pokemon types with effectiveness chart
//! - [`Status`] - Non-volatile status conditions (Burn, Sleep, etc.)
//! - [`CombatantSlot`], [`Move`] - One Pokemon and its moves
//! - [`Roster`] - One side's team with active index and faint count
//! - [`BattleSnapshot`] - Both rosters, turn owner, pending switch, log
//! - [`Side`] / [`Role`] - Local perspective vs absolute host/guest labels
//!
//! ## Operations
//! - [`apply_action`] - Execute a move or pass for the turn owner, or a forfeit for either side
//! - [`resolve_pending_switch`] - Replace a fainted combatant, detect the end
//! - [`local_perspective`], [`legal_actions`] - Turn ownership per client
//!
//! # Example Usage
//!
//! ```
//! use duet_battle::{
//!     apply_action, resolve_pending_switch, Action, BattleSnapshot, CombatantSlot, Move,
//!     Role, Roster, SwitchMode, Type, Winner,
//! };
//!
//! let pikachu = CombatantSlot::new("Pikachu", 50, 100, vec![Type::Electric])
//!     .with_moves(vec![Move::new("Tackle", Type::Normal, 40, 35)]);
//! let rattata = CombatantSlot::new("Rattata", 50, 40, vec![Type::Normal]);
//!
//! let start = BattleSnapshot::new(Roster::new(vec![pikachu]), Roster::new(vec![rattata]), Role::Host);
//! let hit = apply_action(&start, Role::Host, Action::UseMove(0)).unwrap();
//! assert_eq!(hit.snapshot.pending_switch, Some(Role::Guest));
//!
//! let end = resolve_pending_switch(&hit.snapshot, SwitchMode::PromptRequired, None).unwrap();
//! assert_eq!(end.winner, Some(Winner::Won(Role::Host)));
//! ```

pub mod error;
pub mod query;
pub mod rules;
pub mod switching;
pub mod turn;
pub mod types;

// Re-export main types at crate root for convenience
pub use error::Rejection;
pub use query::{best_move, best_switch, score_move};
pub use rules::{apply_action, Action, Resolution};
pub use switching::{check_completion, faint_check, resolve_pending_switch, SwitchMode};
pub use turn::{
    is_action_legal, legal_actions, local_perspective, remote_turn, to_local, to_remote,
    LegalAction,
};
pub use types::{
    BattleSnapshot, CombatantSlot, Effectiveness, EndReason, Event, Fingerprint, Move, Role, Roster, Side,
    SideLabel, Status, Type, Winner, TYPE_CHART,
};
