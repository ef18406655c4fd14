//! Error types.

use thiserror::Error;

use super::card::PlayRejection;
use super::directory::DirectoryError;
use super::phase::InvalidTransition;

/// Why an inbound action was rejected.
///
/// Everything except `Fault` is local to the actor and leaves the session
/// untouched beyond any pending declaration settled before validation.
/// `DeckExhausted` is the exception: the turn has already passed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("It's not your turn")]
    InvalidTurn,

    #[error("{0}")]
    InvalidPlay(String),

    #[error("{0}")]
    InvalidAction(String),

    #[error("No cards left to draw")]
    DeckExhausted,

    /// Internal invariant violation.
    #[error("internal fault: {0}")]
    Fault(String),
}

impl ActionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTurn => "invalid-turn",
            Self::InvalidPlay(_) => "invalid-play",
            Self::InvalidAction(_) => "invalid-action",
            Self::DeckExhausted => "deck-exhausted",
            Self::Fault(_) => "fault",
        }
    }

    pub fn invalid_action(msg: impl Into<String>) -> Self {
        Self::InvalidAction(msg.into())
    }
}

impl From<PlayRejection> for ActionError {
    fn from(r: PlayRejection) -> Self {
        Self::InvalidPlay(r.to_string())
    }
}

impl From<DirectoryError> for ActionError {
    fn from(e: DirectoryError) -> Self {
        Self::InvalidAction(e.to_string())
    }
}

impl From<InvalidTransition> for ActionError {
    fn from(e: InvalidTransition) -> Self {
        Self::InvalidAction(e.reason.to_string())
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Invalid(String),
}
