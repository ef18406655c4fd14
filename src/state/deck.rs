//! The card supply.
//!
//! The deck owns every card that is not in a hand and not the top card: the
//! draw pile (drawn from the front) and the discard history (cards that were
//! played over or abandoned by a leaving participant).

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::card::{Card, CardIds, Color, Value};
use super::config::ExhaustionPolicy;
use super::directory::ParticipantId;

/// Cards in a standard deck.
pub const DECK_SIZE: usize = 108;

/// Build the 108 standard cards in a fixed order, minting a fresh id for each.
///
/// Per color: one 0, two each of 1-9, skip, reverse and draw2. Plus four wild
/// and four draw4.
pub fn build(ids: &mut CardIds) -> Vec<Card> {
    let mut out = Vec::with_capacity(DECK_SIZE);

    for color in Color::PLAYABLE {
        out.push(Card::new(ids.mint(), color, Value::Number(0)));
        let faces = (1..=9).map(Value::Number).chain(Value::ACTIONS);
        for value in faces {
            out.push(Card::new(ids.mint(), color, value));
            out.push(Card::new(ids.mint(), color, value));
        }
    }

    for _ in 0..4 {
        out.push(Card::new(ids.mint(), Color::Wild, Value::Wild));
        out.push(Card::new(ids.mint(), Color::Wild, Value::Draw4));
    }

    out
}

/// Uniform in-place permutation.
pub fn shuffle<R: Rng + ?Sized>(cards: &mut [Card], rng: &mut R) {
    cards.shuffle(rng);
}

/// Draw pile plus discard history.
#[derive(Debug, Clone)]
pub struct Deck {
    draw_pile: VecDeque<Card>,
    discard: Vec<Card>,
    policy: ExhaustionPolicy,
    rng: ChaCha8Rng,
    reshuffles: u32,
}

impl Deck {
    /// Wrap an already-ordered card list. The first card is the next drawn.
    pub fn new(cards: Vec<Card>, policy: ExhaustionPolicy, rng: ChaCha8Rng) -> Self {
        Self {
            draw_pile: cards.into(),
            discard: Vec::new(),
            policy,
            rng,
            reshuffles: 0,
        }
    }

    /// Build and shuffle a fresh standard deck.
    pub fn shuffled(ids: &mut CardIds, policy: ExhaustionPolicy, mut rng: ChaCha8Rng) -> Self {
        let mut cards = build(ids);
        shuffle(&mut cards, &mut rng);
        Self::new(cards, policy, rng)
    }

    /// Draw up to `n` cards from the front.
    ///
    /// Under [`ExhaustionPolicy::Reshuffle`] the discard history is shuffled
    /// into the draw pile when it runs short. Returns fewer than `n` cards only
    /// when nothing else is available.
    pub fn draw(&mut self, n: usize) -> Vec<Card> {
        if self.draw_pile.len() < n {
            self.recycle();
        }
        let take = n.min(self.draw_pile.len());
        self.draw_pile.drain(..take).collect()
    }

    pub fn draw_one(&mut self) -> Option<Card> {
        self.draw(1).pop()
    }

    /// Deal `hand_size` cards to each participant in seat order.
    pub fn deal_initial_hands(
        &mut self,
        participants: &[ParticipantId],
        hand_size: usize,
    ) -> Vec<(ParticipantId, Vec<Card>)> {
        participants
            .iter()
            .map(|&pid| (pid, self.draw(hand_size)))
            .collect()
    }

    /// Flip the opening top card. Wild and draw4 faces are sent to the bottom
    /// and the next card is tried.
    pub fn flip_top(&mut self) -> Option<Card> {
        for _ in 0..self.draw_pile.len() {
            let card = self.draw_pile.pop_front()?;
            if !card.value.takes_color() {
                return Some(card);
            }
            self.draw_pile.push_back(card);
        }
        self.draw_pile.pop_front()
    }

    /// Return a card to the discard history.
    pub fn discard(&mut self, card: Card) {
        self.discard.push(card);
    }

    pub fn discard_all(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.discard.extend(cards);
    }

    fn recycle(&mut self) {
        if self.policy != ExhaustionPolicy::Reshuffle || self.discard.is_empty() {
            return;
        }
        let mut recycled = std::mem::take(&mut self.discard);
        // Cards keep their ids, wilds go back to being wild.
        for card in &mut recycled {
            if card.value.takes_color() {
                card.color = Color::Wild;
            }
        }
        shuffle(&mut recycled, &mut self.rng);
        self.draw_pile.extend(recycled);
        self.reshuffles += 1;
    }

    /// Cards left in the draw pile.
    pub fn len(&self) -> usize {
        self.draw_pile.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draw_pile.is_empty()
    }

    pub fn discard_len(&self) -> usize {
        self.discard.len()
    }

    /// How many times the discard history was recycled.
    pub fn reshuffles(&self) -> u32 {
        self.reshuffles
    }

    /// Every card the deck owns, draw pile first.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.draw_pile.iter().chain(self.discard.iter())
    }
}
