//! Authoritative game state for a multiplayer UNO-style card game.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Deck and hands** - The 108-card supply, dealt and drawn by unique card
//!   id, with a discard history that can be recycled when the pile runs dry.
//!
//! - **Turn engine** - Validates plays and draws, applies skip / reverse /
//!   draw2 / draw4 effects, runs the one-card declaration window and detects
//!   the winner.
//!
//! - **Session directory** - Join order, seat lookup, and seat compaction
//!   when someone leaves.
//!
//! - **Sessions and registry** - One single-writer aggregate per game,
//!   producing a strictly ordered stream of events for a gateway to deliver.
//!
//! # Design Principles
//!
//! 1. **Validate, then mutate** - A rejected action never leaves a session
//!    half-updated, and always produces a typed rejection for the actor.
//!
//! 2. **No networking** - Transport lives behind [`BroadcastGateway`].
//!
//! 3. **Serialization-ready** - Actions and events are tagged JSON objects.
//!
//! # Example
//!
//! ```rust
//! use uno_state::{RulesConfig, Session, Phase};
//!
//! let mut session = Session::new("table-1", RulesConfig::default().with_seed(7));
//! let ann = session.join("Ann").unwrap();
//! let bo = session.join("Bo").unwrap();
//!
//! session.start_game(ann).unwrap();
//! assert_eq!(session.phase(), Phase::InProgress);
//! assert_eq!(session.current(), Some(ann));
//! assert_eq!(session.engine().hand(bo).len(), 7);
//!
//! // Acting out of turn is rejected and reported to the actor only.
//! assert!(session.draw_card(bo).is_err());
//!
//! for envelope in session.drain_events() {
//!     println!("{} {}", envelope.seq, envelope.event.name());
//! }
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
