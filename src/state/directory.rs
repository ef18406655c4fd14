//! Session directory.
//!
//! Tracks who is seated in a session. Seats are assigned in join order and
//! compacted when someone leaves, so seat `i` is always `participants[i]`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::phase::Phase;

/// Opaque participant identifier issued at join time.
///
/// Independent of any transport connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A seated participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,

    /// Display name (trimmed)
    pub display_name: String,

    /// Position in turn order
    pub seat: usize,

    /// False only on the record handed back after removal
    pub connected: bool,

    /// When the participant joined
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

/// Directory errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("Session is full")]
    Full,
    #[error("Display name must not be empty")]
    EmptyName,
    #[error("Display name is longer than {0} characters")]
    NameTooLong(usize),
    #[error("Not a participant in this session")]
    NotParticipant,
    #[error("A game is in progress")]
    GameInProgress,
}

/// Seat-ordered participant list.
#[derive(Debug, Clone)]
pub struct Directory {
    participants: Vec<Participant>,
    next_id: u64,
    max_participants: usize,
    max_name_len: usize,
}

impl Directory {
    pub fn new(max_participants: usize, max_name_len: usize) -> Self {
        Self {
            participants: Vec::new(),
            next_id: 1,
            max_participants,
            max_name_len,
        }
    }

    /// Seat a new participant. Only allowed in the lobby.
    pub fn join(
        &mut self,
        display_name: &str,
        phase: Phase,
    ) -> Result<ParticipantId, DirectoryError> {
        if phase != Phase::Lobby {
            return Err(DirectoryError::GameInProgress);
        }
        if self.is_full() {
            return Err(DirectoryError::Full);
        }

        let name = display_name.trim();
        if name.is_empty() {
            return Err(DirectoryError::EmptyName);
        }
        if name.chars().count() > self.max_name_len {
            return Err(DirectoryError::NameTooLong(self.max_name_len));
        }

        let id = ParticipantId(self.next_id);
        self.next_id += 1;
        self.participants.push(Participant {
            id,
            display_name: name.to_string(),
            seat: self.participants.len(),
            connected: true,
            joined_at: chrono::Utc::now(),
        });
        Ok(id)
    }

    /// Remove a participant and compact the remaining seats.
    ///
    /// Returns the seat they held and their final record.
    pub fn remove(&mut self, id: ParticipantId) -> Result<(usize, Participant), DirectoryError> {
        let seat = self.seat_of(id).ok_or(DirectoryError::NotParticipant)?;
        let mut gone = self.participants.remove(seat);
        gone.connected = false;

        for (i, p) in self.participants.iter_mut().enumerate().skip(seat) {
            p.seat = i;
        }
        Ok((seat, gone))
    }

    pub fn seat_of(&self, id: ParticipantId) -> Option<usize> {
        self.participants.iter().position(|p| p.id == id)
    }

    pub fn participant_at(&self, seat: usize) -> Option<&Participant> {
        self.participants.get(seat)
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.seat_of(id).is_some()
    }

    /// Participant ids in seat order.
    pub fn ids(&self) -> Vec<ParticipantId> {
        self.participants.iter().map(|p| p.id).collect()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants
    }

    pub fn to_json(&self) -> serde_json::Value {
        let players: Vec<serde_json::Value> = self
            .participants
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id,
                    "display_name": p.display_name,
                    "seat": p.seat,
                    "connected": p.connected
                })
            })
            .collect();
        serde_json::Value::Array(players)
    }
}
