//! Property tests: card accounting and rejection behavior under random play.

mod common;

use std::collections::HashSet;

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uno_state::{
    deck, ActionError, Card, CardId, CardIds, Color, Deck, ExhaustionPolicy, ParticipantId, Phase,
    RulesConfig, Session, DECK_SIZE,
};

#[derive(Debug, Clone)]
enum Step {
    /// Current player plays the n-th card of their hand.
    Play {
        pick: usize,
        color: Option<Color>,
        declare: bool,
    },
    /// Someone (maybe not the current player) plays the n-th card.
    PlayAs {
        seat: usize,
        pick: usize,
    },
    Draw,
    DrawAs {
        seat: usize,
    },
    Declare {
        seat: usize,
    },
    Leave {
        seat: usize,
    },
}

fn color() -> impl Strategy<Value = Option<Color>> {
    prop_oneof![
        Just(None),
        Just(Some(Color::Red)),
        Just(Some(Color::Green)),
        Just(Some(Color::Blue)),
        Just(Some(Color::Yellow)),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        10 => (0usize..20, color(), any::<bool>())
            .prop_map(|(pick, color, declare)| Step::Play { pick, color, declare }),
        2 => (0usize..6, 0usize..20).prop_map(|(seat, pick)| Step::PlayAs { seat, pick }),
        6 => Just(Step::Draw),
        1 => (0usize..6).prop_map(|seat| Step::DrawAs { seat }),
        2 => (0usize..6).prop_map(|seat| Step::Declare { seat }),
        1 => (0usize..6).prop_map(|seat| Step::Leave { seat }),
    ]
}

fn seated(session: &Session, seat: usize) -> Option<ParticipantId> {
    let ids = session.directory().ids();
    if ids.is_empty() {
        None
    } else {
        Some(ids[seat % ids.len()])
    }
}

fn nth_card(session: &Session, pid: ParticipantId, pick: usize) -> Option<CardId> {
    let hand = session.engine().hand(pid);
    if hand.is_empty() {
        None
    } else {
        Some(hand[pick % hand.len()].id)
    }
}

fn apply(session: &mut Session, step: &Step) -> Option<Result<(), ActionError>> {
    let result = match *step {
        Step::Play {
            pick,
            color,
            declare,
        } => {
            let pid = session.current()?;
            let card = nth_card(session, pid, pick)?;
            session.play_card(pid, card, color, declare)
        }
        Step::PlayAs { seat, pick } => {
            let pid = seated(session, seat)?;
            let card = nth_card(session, pid, pick)?;
            session.play_card(pid, card, None, false)
        }
        Step::Draw => {
            let pid = session.current()?;
            session.draw_card(pid)
        }
        Step::DrawAs { seat } => {
            let pid = seated(session, seat)?;
            session.draw_card(pid)
        }
        Step::Declare { seat } => {
            let pid = seated(session, seat)?;
            session.declare(pid)
        }
        Step::Leave { seat } => {
            let pid = seated(session, seat)?;
            session.leave(pid).map(|_| ())
        }
    };
    Some(result)
}

/// Every card id the game owns, with duplicates kept.
fn all_ids(session: &Session) -> Vec<CardId> {
    let engine = session.engine();
    let mut ids: Vec<CardId> = engine.deck().cards().map(|c| c.id).collect();
    for (_, hand) in engine.hands().iter() {
        ids.extend(hand.iter().map(|c| c.id));
    }
    ids.extend(engine.top_card().map(|c| c.id));
    ids
}

/// Observable table state that a rejected action must not change.
fn table_view(session: &Session) -> (Vec<(ParticipantId, usize)>, Option<CardId>, usize, usize) {
    let engine = session.engine();
    let sizes = session
        .directory()
        .ids()
        .into_iter()
        .map(|pid| (pid, engine.hand(pid).len()))
        .collect();
    (
        sizes,
        engine.top_card().map(|c| c.id),
        engine.seat_index(),
        engine.deck().len(),
    )
}

fn started(players: usize, seed: u64, exhaustion: ExhaustionPolicy) -> Session {
    common::init_logging();
    let config = RulesConfig {
        exhaustion,
        ..RulesConfig::default().with_seed(seed)
    };
    let mut session = Session::new("prop", config);
    let ids: Vec<_> = (0..players)
        .map(|i| session.join(&format!("P{}", i)).unwrap())
        .collect();
    session.start_game(ids[0]).unwrap();
    session
}

fn exhaustion() -> impl Strategy<Value = ExhaustionPolicy> {
    prop_oneof![Just(ExhaustionPolicy::Reshuffle), Just(ExhaustionPolicy::Report)]
}

proptest! {
    #![proptest_config(common::proptest_config())]

    /// A shuffled deck is always the full 108-card multiset with unique ids.
    #[test]
    fn prop_shuffled_deck_is_complete(seed in any::<u64>()) {
        let shuffled = Deck::shuffled(
            &mut CardIds::new(),
            ExhaustionPolicy::Reshuffle,
            ChaCha8Rng::seed_from_u64(seed),
        );
        let face = |c: &Card| format!("{} {}", c.color, c.value);
        let mut faces: Vec<String> = shuffled.cards().map(face).collect();
        let mut reference: Vec<String> = deck::build(&mut CardIds::new())
            .iter()
            .map(face)
            .collect();
        faces.sort();
        reference.sort();
        prop_assert_eq!(faces, reference);

        let ids: HashSet<CardId> = shuffled.cards().map(|c| c.id).collect();
        prop_assert_eq!(ids.len(), DECK_SIZE);
    }

    /// Dealing gives every seat the configured hand and leaves the rest in
    /// the deck.
    #[test]
    fn prop_deal_accounts_for_every_card(players in 2usize..=10, seed in any::<u64>()) {
        let session = started(players, seed, ExhaustionPolicy::Reshuffle);
        let engine = session.engine();

        for pid in session.directory().ids() {
            prop_assert_eq!(engine.hand(pid).len(), 7);
        }
        prop_assert_eq!(engine.deck().len(), DECK_SIZE - players * 7 - 1);
        prop_assert_eq!(engine.card_count(), DECK_SIZE);
    }

    /// No card is created, lost or duplicated by any sequence of actions,
    /// and a rejected turn or play changes nothing at the table.
    #[test]
    fn prop_random_play_conserves_cards(
        players in 2usize..=5,
        seed in any::<u64>(),
        policy in exhaustion(),
        steps in prop::collection::vec(step(), 1..200),
    ) {
        let mut session = started(players, seed, policy);

        for step in &steps {
            let pending_before = session.engine().pending_declaration();
            let before = table_view(&session);

            let Some(result) = apply(&mut session, step) else {
                continue;
            };

            if session.phase() != Phase::Lobby {
                prop_assert_eq!(session.engine().card_count(), DECK_SIZE);
                let ids = all_ids(&session);
                let unique: HashSet<CardId> = ids.iter().copied().collect();
                prop_assert_eq!(unique.len(), ids.len(), "duplicate card id after {:?}", step);
            }

            if let Err(e) = &result {
                let local = matches!(e, ActionError::InvalidTurn | ActionError::InvalidPlay(_));
                if local && pending_before.is_none() {
                    prop_assert_eq!(&table_view(&session), &before, "{:?} mutated state", step);
                }
            }

            if session.phase() == Phase::Ended {
                break;
            }
        }
    }

    /// Play only ever lands on a card that matches the previous top.
    #[test]
    fn prop_accepted_plays_match_previous_top(
        seed in any::<u64>(),
        steps in prop::collection::vec(step(), 1..150),
    ) {
        let mut session = started(3, seed, ExhaustionPolicy::Reshuffle);

        for step in &steps {
            let Some(top) = session.engine().top_card() else {
                break;
            };
            let top_id = top.id;
            let Some(Ok(())) = apply(&mut session, step) else {
                continue;
            };

            if let Some(now) = session.engine().top_card() {
                if now.id != top_id {
                    prop_assert!(
                        now.color == top.color || now.value == top.value || now.value.takes_color(),
                        "{} does not follow {}",
                        now,
                        top
                    );
                }
            }
            if session.phase() == Phase::Ended {
                break;
            }
        }
    }
}
