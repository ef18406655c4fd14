//! Per-participant hands.

use std::collections::HashMap;

use super::card::{Card, CardId};
use super::directory::ParticipantId;

/// Cards held by each participant.
#[derive(Debug, Clone, Default)]
pub struct HandStore {
    hands: HashMap<ParticipantId, Vec<Card>>,
}

impl HandStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add cards to a hand, creating it if needed.
    pub fn give(&mut self, pid: ParticipantId, cards: impl IntoIterator<Item = Card>) {
        self.hands.entry(pid).or_default().extend(cards);
    }

    /// Hand contents, empty for unknown participants.
    pub fn get(&self, pid: ParticipantId) -> &[Card] {
        self.hands.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self, pid: ParticipantId) -> usize {
        self.get(pid).len()
    }

    /// Find a held card by id.
    pub fn find(&self, pid: ParticipantId, card_id: CardId) -> Option<&Card> {
        self.get(pid).iter().find(|c| c.id == card_id)
    }

    /// Remove exactly the card with this id.
    pub fn remove(&mut self, pid: ParticipantId, card_id: CardId) -> Option<Card> {
        let hand = self.hands.get_mut(&pid)?;
        let idx = hand.iter().position(|c| c.id == card_id)?;
        Some(hand.remove(idx))
    }

    /// Drop a whole hand, returning its cards.
    pub fn take_hand(&mut self, pid: ParticipantId) -> Vec<Card> {
        self.hands.remove(&pid).unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.hands.clear();
    }

    /// Cards across all hands.
    pub fn total(&self) -> usize {
        self.hands.values().map(Vec::len).sum()
    }

    /// Hand sizes by participant.
    pub fn sizes(&self) -> HashMap<ParticipantId, usize> {
        self.hands.iter().map(|(pid, h)| (*pid, h.len())).collect()
    }

    pub fn snapshot(&self) -> HashMap<ParticipantId, Vec<Card>> {
        self.hands.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &Vec<Card>)> {
        self.hands.iter()
    }
}
