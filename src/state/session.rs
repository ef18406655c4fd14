//! One game session: who is seated, the game they are playing, and the
//! events produced for them.
//!
//! A `Session` is the unit of single-writer access. Every method runs to
//! completion synchronously, so wrapping it in a mutex (see
//! [`SessionRegistry`](super::SessionRegistry)) is enough to serialize
//! actions.

use tracing::{info, info_span, warn};

use super::card::{Card, CardId, CardIds, Color};
use super::config::RulesConfig;
use super::directory::{Directory, Participant, ParticipantId};
use super::engine::TurnEngine;
use super::error::ActionError;
use super::event::{Action, Event};
use super::outbox::{Envelope, Outbox};
use super::phase::Phase;

/// What a dispatched action produced for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// A join succeeded; the gateway should bind this id to the connection.
    Joined(ParticipantId),
    Applied,
}

/// Session aggregate.
#[derive(Debug)]
pub struct Session {
    id: String,
    directory: Directory,
    engine: TurnEngine,
    outbox: Outbox,
    card_ids: CardIds,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl Session {
    /// Rules that fail [`RulesConfig::validate`] are logged here; `start`
    /// refuses a deal that cannot be made.
    pub fn new(id: impl Into<String>, config: RulesConfig) -> Self {
        let id = id.into();
        if let Err(e) = config.validate() {
            warn!(session_id = %id, error = %e, "Session rules are invalid");
        }
        Self {
            id,
            directory: Directory::new(config.max_players, config.max_name_len),
            engine: TurnEngine::new(config),
            outbox: Outbox::new(),
            card_ids: CardIds::new(),
            created_at: chrono::Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn engine(&self) -> &TurnEngine {
        &self.engine
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    /// Participant whose turn it is.
    pub fn current(&self) -> Option<ParticipantId> {
        self.engine.current(&self.directory)
    }

    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    /// Take all queued events in emission order.
    pub fn drain_events(&mut self) -> Vec<Envelope> {
        self.outbox.drain()
    }

    /// Envelopes after `seq` addressed to `pid`, for replay on reconnect.
    pub fn replay(&self, pid: ParticipantId, seq: u64) -> Vec<&Envelope> {
        self.outbox
            .messages_since(seq)
            .into_iter()
            .filter(|e| e.recipient.includes(pid))
            .collect()
    }

    // Inbound operations

    /// Seat a new participant. Lobby only.
    ///
    /// There is no participant id to address a rejection to yet, so errors
    /// are only returned.
    pub fn join(&mut self, display_name: &str) -> Result<ParticipantId, ActionError> {
        let _span = info_span!("session", session_id = %self.id).entered();

        let pid = self
            .directory
            .join(display_name, self.engine.phase())
            .map_err(|e| {
                warn!(error = %e, "Join rejected");
                ActionError::from(e)
            })?;
        info!(participant = %pid, seat = self.directory.len() - 1, "Participant joined");
        self.broadcast_players();
        Ok(pid)
    }

    /// Deal a shuffled game.
    pub fn start_game(&mut self, actor: ParticipantId) -> Result<(), ActionError> {
        self.start(actor, None)
    }

    /// Deal from an explicit card order instead of a shuffled deck. The first
    /// card is dealt first; hands are dealt in seat order, then the top card
    /// is flipped.
    pub fn start_with_deck(
        &mut self,
        actor: ParticipantId,
        cards: Vec<Card>,
    ) -> Result<(), ActionError> {
        self.start(actor, Some(cards))
    }

    fn start(
        &mut self,
        actor: ParticipantId,
        stacked: Option<Vec<Card>>,
    ) -> Result<(), ActionError> {
        let _span = info_span!("session", session_id = %self.id).entered();

        let result = self.ensure_seated(actor).and_then(|_| {
            self.engine
                .start(&self.directory, &mut self.card_ids, stacked, &mut self.outbox)
        });
        self.checked(actor, result)
    }

    pub fn play_card(
        &mut self,
        actor: ParticipantId,
        card_id: CardId,
        chosen_color: Option<Color>,
        declare: bool,
    ) -> Result<(), ActionError> {
        let _span = info_span!("session", session_id = %self.id).entered();

        let result = self.engine.play(
            &self.directory,
            actor,
            card_id,
            chosen_color,
            declare,
            &mut self.outbox,
        );
        self.checked(actor, result)
    }

    pub fn draw_card(&mut self, actor: ParticipantId) -> Result<(), ActionError> {
        let _span = info_span!("session", session_id = %self.id).entered();

        let result = self.engine.draw(&self.directory, actor, &mut self.outbox);
        self.checked(actor, result)
    }

    pub fn declare(&mut self, actor: ParticipantId) -> Result<(), ActionError> {
        let _span = info_span!("session", session_id = %self.id).entered();

        let result = self.engine.declare(actor, &mut self.outbox);
        self.checked(actor, result)
    }

    /// Remove a participant, on request or on connection loss.
    pub fn leave(&mut self, actor: ParticipantId) -> Result<Participant, ActionError> {
        let _span = info_span!("session", session_id = %self.id).entered();

        let (seat, gone) = match self.directory.remove(actor) {
            Ok(removed) => removed,
            Err(e) => return self.checked(actor, Err(e.into())),
        };
        info!(participant = %actor, seat, "Participant left");

        let result = self
            .engine
            .on_seat_removed(&self.directory, seat, actor, &mut self.outbox);
        self.broadcast_players();
        if self.engine.phase() != Phase::Lobby {
            self.outbox.broadcast(Event::HandsSnapshot {
                hands: self.engine.hands().snapshot(),
            });
        }
        result.map(|_| gone)
    }

    /// Return a finished session to the lobby with the same participants.
    pub fn rematch(&mut self, actor: ParticipantId) -> Result<(), ActionError> {
        let _span = info_span!("session", session_id = %self.id).entered();

        let result = self
            .ensure_seated(actor)
            .and_then(|_| self.engine.rematch());
        self.checked(actor, result)?;
        self.broadcast_players();
        Ok(())
    }

    /// Route a decoded action. `actor` is `None` only for joins.
    pub fn dispatch(
        &mut self,
        actor: Option<ParticipantId>,
        action: Action,
    ) -> Result<Dispatched, ActionError> {
        let applied = |r: Result<(), ActionError>| r.map(|()| Dispatched::Applied);

        match (actor, action) {
            (_, Action::Join { display_name }) => {
                self.join(&display_name).map(Dispatched::Joined)
            }
            (None, action) => Err(ActionError::invalid_action(format!(
                "Join before sending {}",
                action.name()
            ))),
            (Some(pid), Action::StartGame) => applied(self.start_game(pid)),
            (Some(pid), Action::PlayCard {
                card_id,
                chosen_color,
                declare,
            }) => applied(self.play_card(pid, card_id, chosen_color, declare)),
            (Some(pid), Action::DrawCard) => applied(self.draw_card(pid)),
            (Some(pid), Action::Declare) => applied(self.declare(pid)),
            (Some(pid), Action::Leave) => applied(self.leave(pid).map(|_| ())),
            (Some(pid), Action::Rematch) => applied(self.rematch(pid)),
        }
    }

    // Helpers

    fn ensure_seated(&self, actor: ParticipantId) -> Result<(), ActionError> {
        if self.directory.contains(actor) {
            Ok(())
        } else {
            Err(ActionError::invalid_action("Not a participant in this session"))
        }
    }

    /// Report a rejection to the actor, then hand the result back.
    fn checked<T>(
        &mut self,
        actor: ParticipantId,
        result: Result<T, ActionError>,
    ) -> Result<T, ActionError> {
        if let Err(e) = &result {
            warn!(participant = %actor, kind = e.kind(), error = %e, "Action rejected");
            self.outbox.send_to(
                actor,
                Event::InvalidAction {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                },
            );
        }
        result
    }

    fn broadcast_players(&mut self) {
        self.outbox.broadcast(Event::PlayersUpdated {
            players: self.directory.participants().to_vec(),
        });
    }

    /// Public snapshot of the whole session.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "session_id": self.id,
            "created_at": self.created_at,
            "players": self.directory.to_json(),
            "game": self.engine.to_json(&self.directory),
            "last_seq": self.outbox.last_seq()
        })
    }
}
