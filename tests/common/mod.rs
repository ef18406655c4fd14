//! Shared helpers for integration tests.
#![allow(dead_code)]

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use uno_state::{
    deck, Card, CardId, CardIds, Color, Envelope, Event, ParticipantId, RulesConfig, Session,
    Value,
};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install a test subscriber once. Level from `TEST_LOG`, then `RUST_LOG`,
/// then `warn`.
pub fn init_logging() {
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}

pub type Face = (Color, Value);

pub const R: Color = Color::Red;
pub const G: Color = Color::Green;
pub const B: Color = Color::Blue;
pub const Y: Color = Color::Yellow;

pub fn n(v: u8) -> Value {
    Value::Number(v)
}

/// A full standard deck ordered so that dealing in seat order produces
/// `hands`, followed by `top` as the flipped card. Everything else follows
/// in build order.
pub fn stacked_deck(hands: &[Vec<Face>], top: Face) -> Vec<Card> {
    let mut pool = deck::build(&mut CardIds::new());
    let mut take = |face: Face| {
        let idx = pool
            .iter()
            .position(|c| (c.color, c.value) == face)
            .unwrap_or_else(|| panic!("no {:?} left in the deck", face));
        pool.remove(idx)
    };

    let mut out = Vec::new();
    for hand in hands {
        for &face in hand {
            out.push(take(face));
        }
    }
    out.push(take(top));
    out.extend(pool);
    out
}

pub struct Table {
    pub session: Session,
    pub players: Vec<ParticipantId>,
}

impl Table {
    /// Seat one participant per hand and start from a stacked deck.
    pub fn new(hands: &[Vec<Face>], top: Face) -> Self {
        Self::with_config(hands, top, RulesConfig::default())
    }

    pub fn with_config(hands: &[Vec<Face>], top: Face, config: RulesConfig) -> Self {
        init_logging();

        let config = RulesConfig {
            hand_size: hands[0].len(),
            ..config.with_seed(3)
        };
        let mut session = Session::new("test-table", config);
        let players: Vec<_> = (0..hands.len())
            .map(|i| session.join(&format!("P{}", i)).unwrap())
            .collect();
        session
            .start_with_deck(players[0], stacked_deck(hands, top))
            .unwrap();
        session.drain_events();

        Self { session, players }
    }

    pub fn p(&self, seat: usize) -> ParticipantId {
        self.players[seat]
    }

    /// Id of the first card with this face in a player's hand.
    pub fn card(&self, seat: usize, face: Face) -> CardId {
        self.session
            .engine()
            .hand(self.p(seat))
            .iter()
            .find(|c| (c.color, c.value) == face)
            .map(|c| c.id)
            .unwrap_or_else(|| panic!("P{} does not hold {:?}", seat, face))
    }

    pub fn hand_len(&self, seat: usize) -> usize {
        self.session.engine().hand(self.p(seat)).len()
    }

    pub fn play(&mut self, seat: usize, face: Face) {
        let id = self.card(seat, face);
        self.session
            .play_card(self.p(seat), id, None, false)
            .unwrap();
    }

    pub fn events(&mut self) -> Vec<Envelope> {
        self.session.drain_events()
    }
}

pub fn names(envelopes: &[Envelope]) -> Vec<&'static str> {
    envelopes.iter().map(|e| e.event.name()).collect()
}

pub fn find<'a>(envelopes: &'a [Envelope], name: &str) -> Option<&'a Event> {
    envelopes
        .iter()
        .map(|e| &e.event)
        .find(|ev| ev.name() == name)
}

/// Case count from `PROPTEST_CASES`, default 64.
pub fn proptest_config() -> proptest::prelude::ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(64)
        .max(1);
    proptest::prelude::ProptestConfig {
        cases,
        ..proptest::prelude::ProptestConfig::default()
    }
}
