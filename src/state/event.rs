//! Inbound actions and outbound events.
//!
//! Both are tagged JSON objects (`{"type": "play-card", ...}`) so a gateway
//! can pass them straight through its transport.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::card::{Card, CardId, Color};
use super::directory::{Participant, ParticipantId};

/// An action a participant asks the session to perform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Join {
        display_name: String,
    },
    StartGame,
    PlayCard {
        card_id: CardId,
        #[serde(default)]
        chosen_color: Option<Color>,
        #[serde(default)]
        declare: bool,
    },
    DrawCard,
    Declare,
    Leave,
    Rematch,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::StartGame => "start-game",
            Self::PlayCard { .. } => "play-card",
            Self::DrawCard => "draw-card",
            Self::Declare => "declare",
            Self::Leave => "leave",
            Self::Rematch => "rematch",
        }
    }
}

/// Something that happened, in the order the engine applied it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    PlayersUpdated {
        players: Vec<Participant>,
    },
    GameStarted {
        hands: HashMap<ParticipantId, Vec<Card>>,
        top_card: Card,
        current: ParticipantId,
    },
    CardPlayed {
        card: Card,
        participant: ParticipantId,
        next: Option<ParticipantId>,
        top_card: Card,
    },
    /// Sent to the drawing participant only.
    CardDrawn {
        card: Card,
    },
    TurnChanged {
        participant: Option<ParticipantId>,
    },
    DeclarationWindowOpened {
        participant: ParticipantId,
    },
    DeclarationResult {
        participant: ParticipantId,
        ok: bool,
        penalty: usize,
    },
    GameWon {
        participant: ParticipantId,
        display_name: String,
    },
    /// Sent to the acting participant only.
    InvalidAction {
        kind: String,
        message: String,
    },
    HandsSnapshot {
        hands: HashMap<ParticipantId, Vec<Card>>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayersUpdated { .. } => "players-updated",
            Self::GameStarted { .. } => "game-started",
            Self::CardPlayed { .. } => "card-played",
            Self::CardDrawn { .. } => "card-drawn",
            Self::TurnChanged { .. } => "turn-changed",
            Self::DeclarationWindowOpened { .. } => "declaration-window-opened",
            Self::DeclarationResult { .. } => "declaration-result",
            Self::GameWon { .. } => "game-won",
            Self::InvalidAction { .. } => "invalid-action",
            Self::HandsSnapshot { .. } => "hands-snapshot",
        }
    }
}
