//! Session phase machine.
//!
//! # State Diagram
//!
//! ```text
//! ┌───────────┐   start    ┌──────────────┐   win / abandon   ┌─────────┐
//! │   Lobby   │───────────▶│  InProgress  │──────────────────▶│  Ended  │
//! └───────────┘            └──────────────┘                   └────┬────┘
//!       ▲                                                          │
//!       └──────────────────────────── rematch ─────────────────────┘
//! ```

use std::fmt;

use serde::Serialize;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Accepting joins
    #[default]
    Lobby,
    /// Cards dealt, turns running
    InProgress,
    /// Terminal until a rematch
    Ended,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::InProgress => "in_progress",
            Self::Ended => "ended",
        }
    }

    /// Check if turn actions are accepted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase transition events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    Start,
    Win,
    /// Too few participants left to continue.
    Abandon,
    Rematch,
}

/// Error when a phase transition is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: Phase,
    pub event: PhaseEvent,
    pub reason: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid transition from {} via {:?}: {}",
            self.from, self.event, self.reason
        )
    }
}

impl std::error::Error for InvalidTransition {}

/// Phase state machine.
#[derive(Debug, Clone, Default)]
pub struct PhaseState {
    phase: Phase,
    changed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl PhaseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// When the last transition happened.
    pub fn changed_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.changed_at
    }

    /// Apply an event in place, returning error if invalid.
    pub fn apply_mut(&mut self, event: PhaseEvent) -> Result<(), InvalidTransition> {
        self.phase = self.check(event)?;
        self.changed_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// The phase `event` would lead to, without applying it.
    pub fn check(&self, event: PhaseEvent) -> Result<Phase, InvalidTransition> {
        use Phase::*;
        use PhaseEvent::*;

        let invalid = |reason: &'static str| InvalidTransition {
            from: self.phase,
            event,
            reason,
        };

        match (self.phase, event) {
            (Lobby, PhaseEvent::Start) => Ok(InProgress),
            (InProgress, PhaseEvent::Start) => Err(invalid("Game has already started")),
            (Ended, PhaseEvent::Start) => Err(invalid("Game is over, ask for a rematch")),

            (InProgress, Win) | (InProgress, Abandon) => Ok(Ended),
            (_, Win) | (_, Abandon) => Err(invalid("Game is not in progress")),

            (Ended, Rematch) => Ok(Lobby),
            (_, Rematch) => Err(invalid("Game is not over")),
        }
    }
}
