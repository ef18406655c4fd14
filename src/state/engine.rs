//! Turn engine.
//!
//! Owns everything about a running game except who is seated: the deck,
//! the hands, the top card, the turn pointer and direction, the pending
//! declaration and the winner. Seat order comes from the session
//! [`Directory`], passed into every operation.
//!
//! Every operation validates fully before it mutates, except that a pending
//! declaration is settled (and penalized) as soon as any play or draw
//! arrives, before that action is itself validated.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, error, info};

use super::card::{check_play, Card, CardId, CardIds, Color, Value};
use super::config::RulesConfig;
use super::deck::{Deck, DECK_SIZE};
use super::directory::{Directory, ParticipantId};
use super::error::ActionError;
use super::event::Event;
use super::hand::HandStore;
use super::outbox::Outbox;
use super::phase::{Phase, PhaseEvent, PhaseState};

/// Turn order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Reversed,
}

impl Direction {
    pub fn flip(self) -> Self {
        match self {
            Self::Forward => Self::Reversed,
            Self::Reversed => Self::Forward,
        }
    }

    /// +1 or -1.
    pub fn sign(self) -> isize {
        match self {
            Self::Forward => 1,
            Self::Reversed => -1,
        }
    }
}

/// Game state for one session.
#[derive(Debug, Clone)]
pub struct TurnEngine {
    config: RulesConfig,
    phase: PhaseState,
    rng: ChaCha8Rng,
    deck: Deck,
    hands: HandStore,
    top_card: Option<Card>,
    seat_index: usize,
    direction: Direction,
    pending_declaration: Option<ParticipantId>,
    winner: Option<ParticipantId>,
}

impl TurnEngine {
    pub fn new(config: RulesConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let deck = Deck::new(Vec::new(), config.exhaustion, ChaCha8Rng::seed_from_u64(rng.gen()));
        Self {
            config,
            phase: PhaseState::new(),
            rng,
            deck,
            hands: HandStore::new(),
            top_card: None,
            seat_index: 0,
            direction: Direction::Forward,
            pending_declaration: None,
            winner: None,
        }
    }

    // Accessors

    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }

    pub fn phase_changed_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.phase.changed_at()
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn hands(&self) -> &HandStore {
        &self.hands
    }

    pub fn hand(&self, pid: ParticipantId) -> &[Card] {
        self.hands.get(pid)
    }

    pub fn top_card(&self) -> Option<Card> {
        self.top_card
    }

    pub fn seat_index(&self) -> usize {
        self.seat_index
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pending_declaration(&self) -> Option<ParticipantId> {
        self.pending_declaration
    }

    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner
    }

    /// Participant whose turn it is, while a game is running.
    pub fn current(&self, seats: &Directory) -> Option<ParticipantId> {
        if !self.phase().is_active() {
            return None;
        }
        seats.participant_at(self.seat_index).map(|p| p.id)
    }

    /// Cards accounted for: draw pile, discard history, hands and top card.
    pub fn card_count(&self) -> usize {
        self.deck.len()
            + self.deck.discard_len()
            + self.hands.total()
            + usize::from(self.top_card.is_some())
    }

    // Lifecycle

    /// Deal a new game. `stacked` replaces the shuffled deck with an explicit
    /// card order (first card drawn first).
    pub fn start(
        &mut self,
        seats: &Directory,
        ids: &mut CardIds,
        stacked: Option<Vec<Card>>,
        out: &mut Outbox,
    ) -> Result<(), ActionError> {
        self.phase.check(PhaseEvent::Start)?;
        if seats.len() < self.config.min_players {
            return Err(ActionError::invalid_action(format!(
                "Need at least {} players to start",
                self.config.min_players
            )));
        }

        let available = stacked.as_ref().map_or(DECK_SIZE, Vec::len);
        if seats.len() * self.config.hand_size >= available {
            return Err(ActionError::invalid_action(format!(
                "{} cards each for {} players does not leave a top card",
                self.config.hand_size,
                seats.len()
            )));
        }

        // Built aside and committed only once the top card is flipped.
        let deck_rng = ChaCha8Rng::seed_from_u64(self.rng.gen());
        let mut deck = match stacked {
            Some(cards) => Deck::new(cards, self.config.exhaustion, deck_rng),
            None => Deck::shuffled(ids, self.config.exhaustion, deck_rng),
        };
        let mut hands = HandStore::new();
        for (pid, cards) in deck.deal_initial_hands(&seats.ids(), self.config.hand_size) {
            hands.give(pid, cards);
        }
        let top = deck
            .flip_top()
            .ok_or_else(|| fault("deck ran out before the top card was flipped"))?;

        self.deck = deck;
        self.hands = hands;
        self.top_card = Some(top);
        self.seat_index = 0;
        self.direction = Direction::Forward;
        self.pending_declaration = None;
        self.winner = None;
        self.phase.apply_mut(PhaseEvent::Start)?;

        let current = seats
            .participant_at(0)
            .map(|p| p.id)
            .ok_or_else(|| fault("no participant in seat 0"))?;
        info!(players = seats.len(), top = %top, %current, "Game started");

        out.broadcast(Event::GameStarted {
            hands: self.hands.snapshot(),
            top_card: top,
            current,
        });
        Ok(())
    }

    /// Back to the lobby after a finished game.
    pub fn rematch(&mut self) -> Result<(), ActionError> {
        self.phase.apply_mut(PhaseEvent::Rematch)?;

        let deck_rng = ChaCha8Rng::seed_from_u64(self.rng.gen());
        self.deck = Deck::new(Vec::new(), self.config.exhaustion, deck_rng);
        self.hands.clear();
        self.top_card = None;
        self.seat_index = 0;
        self.direction = Direction::Forward;
        self.pending_declaration = None;
        self.winner = None;

        info!("Session back in lobby");
        Ok(())
    }

    // Turn actions

    /// Play a card from the actor's hand.
    ///
    /// `chosen_color` is only read for wild and draw4 cards. `declare` asserts
    /// that this play leaves the actor with one card.
    pub fn play(
        &mut self,
        seats: &Directory,
        actor: ParticipantId,
        card_id: CardId,
        chosen_color: Option<Color>,
        declare: bool,
        out: &mut Outbox,
    ) -> Result<(), ActionError> {
        self.ensure_active()?;
        self.settle_pending(out);
        self.ensure_turn(seats, actor)?;

        let top = self.require_top()?;
        let held = *self
            .hands
            .find(actor, card_id)
            .ok_or_else(|| ActionError::InvalidPlay("You do not hold that card".into()))?;
        let played = self.resolve_color(held, chosen_color)?;
        check_play(self.hands.get(actor), &played, &top)?;

        // Validated: mutate from here on.
        self.hands
            .remove(actor, card_id)
            .ok_or_else(|| fault(format!("card {} vanished from {}'s hand", card_id, actor)))?;
        self.deck.discard(top);
        self.top_card = Some(played);

        debug!(%actor, card = %played, "Card played");

        let remaining = self.hands.len(actor);
        if remaining == 0 {
            return self.finish(seats, actor, played, out);
        }

        if remaining == 1 {
            if declare {
                if self.pending_declaration == Some(actor) {
                    self.pending_declaration = None;
                }
                debug!(%actor, "Declared with the play");
                out.broadcast(Event::DeclarationResult {
                    participant: actor,
                    ok: true,
                    penalty: 0,
                });
            } else if self.pending_declaration != Some(actor) {
                self.pending_declaration = Some(actor);
                debug!(%actor, "Declaration window opened");
                out.broadcast(Event::DeclarationWindowOpened { participant: actor });
            }
        } else if self.pending_declaration == Some(actor) {
            self.pending_declaration = None;
        }

        self.apply_effect(seats, played.value, out)?;

        out.broadcast(Event::CardPlayed {
            card: played,
            participant: actor,
            next: self.current(seats),
            top_card: played,
        });
        out.broadcast(Event::HandsSnapshot {
            hands: self.hands.snapshot(),
        });
        Ok(())
    }

    /// Draw one card. The turn passes unless the drawn card can be played.
    ///
    /// With nothing left to draw the turn still passes and the actor gets
    /// [`ActionError::DeckExhausted`].
    pub fn draw(
        &mut self,
        seats: &Directory,
        actor: ParticipantId,
        out: &mut Outbox,
    ) -> Result<(), ActionError> {
        self.ensure_active()?;
        self.settle_pending(out);
        self.ensure_turn(seats, actor)?;

        let top = self.require_top()?;
        let Some(card) = self.deck.draw_one() else {
            self.advance(seats.len(), 1);
            info!(%actor, "Deck exhausted, turn passed");
            out.broadcast(Event::TurnChanged {
                participant: self.current(seats),
            });
            return Err(ActionError::DeckExhausted);
        };
        self.hands.give(actor, [card]);
        out.send_to(actor, Event::CardDrawn { card });

        let playable = check_play(self.hands.get(actor), &card, &top).is_ok();
        debug!(%actor, card = %card, playable, "Card drawn");

        if !playable {
            self.advance(seats.len(), 1);
            out.broadcast(Event::TurnChanged {
                participant: self.current(seats),
            });
        }
        out.broadcast(Event::HandsSnapshot {
            hands: self.hands.snapshot(),
        });
        Ok(())
    }

    /// Explicit declaration while holding one card inside an open window.
    pub fn declare(&mut self, actor: ParticipantId, out: &mut Outbox) -> Result<(), ActionError> {
        self.ensure_active()?;

        if self.pending_declaration != Some(actor) || self.hands.len(actor) != 1 {
            return Err(ActionError::invalid_action(
                "Nothing to declare right now",
            ));
        }

        self.pending_declaration = None;
        debug!(%actor, "Declared");
        out.broadcast(Event::DeclarationResult {
            participant: actor,
            ok: true,
            penalty: 0,
        });
        Ok(())
    }

    /// React to a participant leaving. `seats` is the directory after their
    /// removal and `seat` the index they held.
    pub fn on_seat_removed(
        &mut self,
        seats: &Directory,
        seat: usize,
        pid: ParticipantId,
        out: &mut Outbox,
    ) -> Result<(), ActionError> {
        self.deck.discard_all(self.hands.take_hand(pid));
        if self.pending_declaration == Some(pid) {
            self.pending_declaration = None;
        }
        if !self.phase().is_active() {
            return Ok(());
        }

        let remaining = seats.len();
        if remaining < 2 {
            return self.abandon(seats, out);
        }

        let was_current = seat == self.seat_index;
        if seat < self.seat_index {
            self.seat_index -= 1;
        } else if was_current {
            // Turn goes to whoever was next in line.
            self.seat_index = match self.direction {
                Direction::Forward => self.seat_index % remaining,
                Direction::Reversed => (self.seat_index + remaining - 1) % remaining,
            };
        }

        if was_current {
            out.broadcast(Event::TurnChanged {
                participant: self.current(seats),
            });
        }
        Ok(())
    }

    // Internals

    fn ensure_active(&self) -> Result<(), ActionError> {
        if self.phase().is_active() {
            Ok(())
        } else {
            Err(ActionError::invalid_action("Game is not in progress"))
        }
    }

    fn ensure_turn(&self, seats: &Directory, actor: ParticipantId) -> Result<(), ActionError> {
        if self.current(seats) == Some(actor) {
            Ok(())
        } else {
            Err(ActionError::InvalidTurn)
        }
    }

    fn require_top(&self) -> Result<Card, ActionError> {
        self.top_card
            .ok_or_else(|| fault("game in progress without a top card"))
    }

    fn resolve_color(&self, held: Card, chosen: Option<Color>) -> Result<Card, ActionError> {
        if !held.value.takes_color() {
            return Ok(held);
        }
        match chosen {
            Some(color) if !color.is_wild() => Ok(held.recolored(color)),
            _ if self.config.require_wild_color => Err(ActionError::InvalidPlay(
                "Choose red, green, blue or yellow for a wild card".into(),
            )),
            Some(color) => Ok(held.recolored(color)),
            None => Ok(held),
        }
    }

    /// Close an open declaration window as a failure.
    fn settle_pending(&mut self, out: &mut Outbox) {
        let Some(offender) = self.pending_declaration.take() else {
            return;
        };
        let penalty = self.give_cards(offender, self.config.declaration_penalty, out);
        info!(%offender, penalty, "Declaration missed");
        out.broadcast(Event::DeclarationResult {
            participant: offender,
            ok: false,
            penalty,
        });
    }

    /// Draw up to `n` cards into a hand. Returns how many arrived.
    fn give_cards(&mut self, pid: ParticipantId, n: usize, out: &mut Outbox) -> usize {
        let cards = self.deck.draw(n);
        let given = cards.len();
        for card in &cards {
            out.send_to(pid, Event::CardDrawn { card: *card });
        }
        self.hands.give(pid, cards);
        given
    }

    fn seat_after(&self, players: usize, steps: usize) -> usize {
        let n = players as isize;
        let offset = steps as isize * self.direction.sign();
        (self.seat_index as isize + offset).rem_euclid(n) as usize
    }

    fn advance(&mut self, players: usize, steps: usize) {
        if players > 0 {
            self.seat_index = self.seat_after(players, steps);
        }
    }

    fn apply_effect(
        &mut self,
        seats: &Directory,
        value: Value,
        out: &mut Outbox,
    ) -> Result<(), ActionError> {
        let players = seats.len();
        match value {
            Value::Skip => self.advance(players, 2),
            Value::Reverse => {
                self.direction = self.direction.flip();
                // Two players: reverse acts as skip.
                if players != 2 {
                    self.advance(players, 1);
                }
            }
            Value::Draw2 | Value::Draw4 => {
                let victim_seat = self.seat_after(players, 1);
                let victim = seats
                    .participant_at(victim_seat)
                    .map(|p| p.id)
                    .ok_or_else(|| fault(format!("no participant in seat {}", victim_seat)))?;
                let given = self.give_cards(victim, value.penalty(), out);
                debug!(%victim, given, "Penalty cards dealt");
                self.advance(players, 2);
            }
            Value::Number(_) | Value::Wild => self.advance(players, 1),
        }
        Ok(())
    }

    fn finish(
        &mut self,
        seats: &Directory,
        winner: ParticipantId,
        played: Card,
        out: &mut Outbox,
    ) -> Result<(), ActionError> {
        self.phase.apply_mut(PhaseEvent::Win)?;
        self.winner = Some(winner);
        self.pending_declaration = None;

        let display_name = seats
            .get(winner)
            .map(|p| p.display_name.clone())
            .unwrap_or_default();
        info!(%winner, %display_name, "Game won");

        out.broadcast(Event::CardPlayed {
            card: played,
            participant: winner,
            next: None,
            top_card: played,
        });
        out.broadcast(Event::GameWon {
            participant: winner,
            display_name,
        });
        out.broadcast(Event::HandsSnapshot {
            hands: self.hands.snapshot(),
        });
        Ok(())
    }

    /// Fewer than two participants left. A lone survivor wins by forfeit.
    fn abandon(&mut self, seats: &Directory, out: &mut Outbox) -> Result<(), ActionError> {
        self.pending_declaration = None;
        match seats.participant_at(0) {
            Some(last) => {
                self.phase.apply_mut(PhaseEvent::Win)?;
                self.winner = Some(last.id);
                info!(winner = %last.id, "Game won by forfeit");
                out.broadcast(Event::GameWon {
                    participant: last.id,
                    display_name: last.display_name.clone(),
                });
            }
            None => {
                self.phase.apply_mut(PhaseEvent::Abandon)?;
                info!("Game abandoned");
            }
        }
        Ok(())
    }

    pub fn to_json(&self, seats: &Directory) -> serde_json::Value {
        serde_json::json!({
            "phase": self.phase().as_str(),
            "phase_changed_at": self.phase_changed_at(),
            "top_card": self.top_card,
            "current": self.current(seats),
            "seat_index": self.seat_index,
            "direction": self.direction,
            "hand_sizes": self.hands.sizes(),
            "pending_declaration": self.pending_declaration,
            "winner": self.winner,
            "draw_pile": self.deck.len(),
            "discard_pile": self.deck.discard_len()
        })
    }
}

fn fault(msg: impl Into<String>) -> ActionError {
    let msg = msg.into();
    error!(%msg, "Turn engine invariant violated");
    ActionError::Fault(msg)
}
