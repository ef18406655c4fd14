//! Session state for the card game.
//!
//! - `card` - Cards, colors, values and the legality rule
//! - `deck` - Building, shuffling and drawing the card supply
//! - `hand` - Per-participant hands
//! - `directory` - Who is seated where
//! - `phase` - Lobby / in progress / ended
//! - `engine` - The turn engine
//! - `session` - One session: directory + engine + outbox
//! - `outbox` - Sequenced outbound events and the gateway trait
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                         SessionRegistry                            │
//! │                                                                    │
//! │   session_id ──▶ Arc<Mutex<Session>>   (one writer per session)    │
//! │                                                                    │
//! │  ┌──────────────────────────── Session ─────────────────────────┐  │
//! │  │                                                              │  │
//! │  │  ┌───────────┐    seats    ┌──────────────────────────────┐  │  │
//! │  │  │ Directory │────────────▶│          TurnEngine          │  │  │
//! │  │  │ id ↔ seat │             │ Deck · HandStore · TopCard   │  │  │
//! │  │  └───────────┘             │ seat · direction · phase     │  │  │
//! │  │                            └──────────────┬───────────────┘  │  │
//! │  │                                           │ events           │  │
//! │  │                                           ▼                  │  │
//! │  │                                     ┌──────────┐             │  │
//! │  │                                     │  Outbox  │──▶ gateway  │  │
//! │  │                                     └──────────┘             │  │
//! │  └──────────────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────────┘
//! ```

pub mod card;
pub mod config;
pub mod deck;
pub mod directory;
pub mod engine;
pub mod error;
pub mod event;
pub mod hand;
pub mod outbox;
pub mod phase;
pub mod session;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

// Re-export commonly used types
pub use card::{check_play, Card, CardId, CardIds, Color, PlayRejection, Value};
pub use config::{ExhaustionPolicy, RulesConfig};
pub use deck::{Deck, DECK_SIZE};
pub use directory::{Directory, DirectoryError, Participant, ParticipantId};
pub use engine::{Direction, TurnEngine};
pub use error::{ActionError, ConfigError};
pub use event::{Action, Event};
pub use hand::HandStore;
pub use outbox::{BroadcastGateway, Envelope, Outbox, Recipient, REPLAY_CAPACITY};
pub use phase::{InvalidTransition, Phase, PhaseEvent, PhaseState};
pub use session::{Dispatched, Session};

/// A session behind its single-writer lock.
pub type SharedSession = Arc<Mutex<Session>>;

/// All live sessions, addressed by id.
///
/// Sessions share nothing. Each action locks exactly one session, applies
/// it, and hands the resulting envelopes to the gateway before the lock is
/// released, so every participant sees events in the order they were applied.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SharedSession>>,
    config: RulesConfig,
}

impl SessionRegistry {
    pub fn new(config: RulesConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Get a session, creating it with the registry's rules if needed.
    pub fn open(&self, session_id: &str) -> SharedSession {
        let mut sessions = self.sessions.lock();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                info!(session_id, "Session opened");
                let config = self.config.for_session(session_id);
                Arc::new(Mutex::new(Session::new(session_id, config)))
            })
            .clone()
    }

    pub fn get(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions.lock().get(session_id).cloned()
    }

    pub fn remove(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions.lock().remove(session_id)
    }

    /// Apply one action to one session and deliver what it produced.
    ///
    /// A session whose last participant leaves is discarded.
    pub fn dispatch(
        &self,
        session_id: &str,
        actor: Option<ParticipantId>,
        action: Action,
        gateway: &dyn BroadcastGateway,
    ) -> Result<Dispatched, ActionError> {
        let shared = self
            .get(session_id)
            .ok_or_else(|| ActionError::invalid_action(format!("No session {}", session_id)))?;

        let mut session = shared.lock();
        let was_populated = !session.is_empty();
        let result = session.dispatch(actor, action);

        for envelope in session.drain_events() {
            gateway.deliver(session_id, &envelope);
        }
        let emptied = was_populated && session.is_empty();
        drop(session);

        if emptied {
            self.discard_if_empty(session_id, &shared);
        }
        result
    }

    /// Remove `shared` if it is still registered under `session_id` and
    /// still has nobody seated. Someone may have joined, or the id may have
    /// been reopened, since its lock was last held.
    fn discard_if_empty(&self, session_id: &str, shared: &SharedSession) -> bool {
        let mut sessions = self.sessions.lock();
        let discard = sessions
            .get(session_id)
            .is_some_and(|s| Arc::ptr_eq(s, shared) && s.lock().is_empty());
        if discard {
            sessions.remove(session_id);
            info!(session_id, "Session discarded, everyone left");
        }
        discard
    }

    /// Drop sessions nobody is seated in.
    pub fn cleanup(&self) -> CleanupResult {
        let mut sessions = self.sessions.lock();
        let empty: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.lock().is_empty())
            .map(|(id, _)| id.clone())
            .collect();

        for id in &empty {
            sessions.remove(id);
            debug!(session_id = %id, "Empty session removed");
        }

        CleanupResult {
            removed_sessions: empty,
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Sessions with a game in progress.
    pub fn active_count(&self) -> usize {
        self.sessions
            .lock()
            .values()
            .filter(|s| s.lock().phase().is_active())
            .count()
    }
}

/// Result of cleanup operation.
#[derive(Debug, Default)]
pub struct CleanupResult {
    pub removed_sessions: Vec<String>,
}

impl CleanupResult {
    pub fn is_empty(&self) -> bool {
        self.removed_sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recording(Mutex<Vec<(String, u64)>>);

    impl BroadcastGateway for Recording {
        fn deliver(&self, session_id: &str, envelope: &Envelope) {
            self.0.lock().push((session_id.to_string(), envelope.seq));
        }
    }

    #[test]
    fn test_registry_basic() {
        let registry = SessionRegistry::new(RulesConfig::default().with_seed(1));
        let gateway = Recording::default();

        registry.open("a");
        registry.open("b");
        assert_eq!(registry.count(), 2);

        let joined = registry
            .dispatch(
                "a",
                None,
                Action::Join {
                    display_name: "Ann".into(),
                },
                &gateway,
            )
            .unwrap();
        assert!(matches!(joined, Dispatched::Joined(_)));
        assert_eq!(gateway.0.lock().as_slice(), &[("a".to_string(), 1)]);

        // "b" never had anyone in it.
        let cleaned = registry.cleanup();
        assert_eq!(cleaned.removed_sessions, vec!["b".to_string()]);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_unknown_session() {
        let registry = SessionRegistry::default();
        let gateway = Recording::default();
        let result = registry.dispatch("nope", None, Action::DrawCard, &gateway);
        assert!(result.is_err());
        assert!(gateway.0.lock().is_empty());
    }

    #[test]
    fn test_session_discarded_when_last_leaves() {
        let registry = SessionRegistry::new(RulesConfig::default().with_seed(1));
        let gateway = Recording::default();
        registry.open("room");

        let Dispatched::Joined(ann) = registry
            .dispatch(
                "room",
                None,
                Action::Join {
                    display_name: "Ann".into(),
                },
                &gateway,
            )
            .unwrap()
        else {
            panic!("expected a join");
        };

        registry
            .dispatch("room", Some(ann), Action::Leave, &gateway)
            .unwrap();
        assert!(registry.get("room").is_none());
    }

    fn join(registry: &SessionRegistry, id: &str, name: &str, gw: &Recording) -> ParticipantId {
        match registry.dispatch(
            id,
            None,
            Action::Join {
                display_name: name.into(),
            },
            gw,
        ) {
            Ok(Dispatched::Joined(pid)) => pid,
            other => panic!("join failed: {:?}", other),
        }
    }

    #[test]
    fn test_discard_skips_repopulated_session() {
        let registry = SessionRegistry::new(RulesConfig::default().with_seed(1));
        let gateway = Recording::default();
        let room = registry.open("room");
        join(&registry, "room", "Ann", &gateway);

        assert!(!registry.discard_if_empty("room", &room));
        assert!(registry.get("room").is_some());
    }

    #[test]
    fn test_discard_skips_reopened_session() {
        let registry = SessionRegistry::new(RulesConfig::default().with_seed(1));
        let stale = registry.open("room");
        registry.remove("room");
        let fresh = registry.open("room");

        // Both are empty, but only the registered one may be removed.
        assert!(!registry.discard_if_empty("room", &stale));
        let current = registry.get("room").unwrap();
        assert!(Arc::ptr_eq(&current, &fresh));

        assert!(registry.discard_if_empty("room", &fresh));
        assert!(registry.get("room").is_none());
    }

    #[test]
    fn test_sessions_get_distinct_seeds() {
        let registry = SessionRegistry::new(RulesConfig::default().with_seed(21));
        let a = registry.open("table-0");
        let b = registry.open("table-1");

        let seed_a = a.lock().engine().config().seed;
        let seed_b = b.lock().engine().config().seed;
        assert_ne!(seed_a, seed_b);
        assert_eq!(seed_a, RulesConfig::default().with_seed(21).for_session("table-0").seed);
    }
}
