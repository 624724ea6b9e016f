use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use pestel_sim::{
    EngineError, GameState, Narrator, NarratorError, OptionId, TurnContext, TurnEngine,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Narrator replaying a fixed script; falls back to a valid zero-delta turn.
struct Script {
    replies: RefCell<VecDeque<Reply>>,
    calls: Cell<usize>,
}

#[derive(Debug, Clone)]
enum Reply {
    Turn { money: i64, share: i64 },
    Prose,
    Down,
}

impl Script {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            calls: Cell::new(0),
        }
    }
}

fn turn_json(money: i64, share: i64) -> String {
    format!(
        r#"Result:
{{"story":"The ministry reacts.","money_change":{money},"market_share_change":{share},"analysis":"","next_pestel":"Social","options":[{{"id":"A","text":"expand"}},{{"id":"B","text":"hold"}},{{"id":"C","text":"retreat"}}]}}"#
    )
}

impl Narrator for Script {
    fn generate(&self, _context: &TurnContext) -> Result<String, NarratorError> {
        self.calls.set(self.calls.get() + 1);
        match self.replies.borrow_mut().pop_front() {
            Some(Reply::Turn { money, share }) => Ok(turn_json(money, share)),
            Some(Reply::Prose) => Ok("I think option B sounds great!".to_string()),
            Some(Reply::Down) => Err(NarratorError::Request("connection refused".into())),
            None => Ok(turn_json(0, 0)),
        }
    }
}

fn assert_options_invariant(state: &GameState) {
    let ids: Vec<OptionId> = state.current_options().iter().map(|o| o.id).collect();
    assert!(
        ids.is_empty() || ids == OptionId::ALL.to_vec(),
        "unexpected option ids {:?}",
        ids
    );
}

#[test]
fn full_game_until_bankruptcy() {
    let engine = TurnEngine::new(Script::new(vec![
        Reply::Turn { money: 0, share: 0 },
        Reply::Turn { money: -500, share: 6 },
        Reply::Turn { money: -460, share: -1 },
        Reply::Turn { money: -50, share: 0 },
    ]));
    let mut state = GameState::new();

    engine.advance(&mut state, None).unwrap();
    assert_eq!(state.capital(), 1000);
    assert_eq!(state.history().len(), 1);

    engine.advance(&mut state, Some("A")).unwrap();
    engine.advance(&mut state, Some("C")).unwrap();
    assert_eq!(state.capital(), 40);
    assert_eq!(state.market_share(), 5);

    engine.advance(&mut state, Some("B")).unwrap();
    assert_eq!(state.capital(), -10);
    assert!(state.is_game_over());
    assert!(state.current_options().is_empty());

    let chosen: Vec<_> = state.history().iter().map(|e| e.chosen_option).collect();
    assert_eq!(
        chosen,
        vec![Some(OptionId::A), Some(OptionId::C), Some(OptionId::B), None]
    );

    let snapshot = state.clone();
    assert!(matches!(engine.advance(&mut state, Some("A")), Err(EngineError::GameOver)));
    assert!(matches!(engine.advance(&mut state, None), Err(EngineError::GameOver)));
    assert_eq!(state, snapshot);
    assert_eq!(engine.narrator().calls.get(), 4);

    state.reset();
    assert_eq!(state.capital(), 1000);
    assert_eq!(state.market_share(), 0);
    assert!(!state.is_game_over());
    assert!(state.history().is_empty());
}

#[test]
fn prose_twice_fails_after_two_calls() {
    let engine = TurnEngine::new(Script::new(vec![Reply::Prose, Reply::Prose]));
    let mut state = GameState::new();

    let err = engine.advance(&mut state, None).unwrap_err();

    assert!(matches!(err, EngineError::MalformedResponse { .. }));
    assert_eq!(engine.narrator().calls.get(), 2);
    assert_eq!(state, GameState::new());
}

fn reply_strategy() -> impl Strategy<Value = Reply> {
    prop_oneof![
        6 => (-400i64..300, -10i64..10).prop_map(|(money, share)| Reply::Turn { money, share }),
        1 => Just(Reply::Prose),
        1 => Just(Reply::Down),
    ]
}

fn choice_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("A".to_string())),
        Just(Some("b".to_string())),
        Just(Some("C".to_string())),
        Just(Some("Z".to_string())),
    ]
}

proptest! {
    #[test]
    fn every_reachable_state_keeps_its_invariants(
        replies in proptest::collection::vec(reply_strategy(), 0..30),
        choices in proptest::collection::vec(choice_strategy(), 1..20),
    ) {
        let engine = TurnEngine::new(Script::new(replies));
        let mut state = GameState::new();

        for choice in choices {
            let before = state.clone();
            let result = engine.advance(&mut state, choice.as_deref());

            assert_options_invariant(&state);
            prop_assert_eq!(state.is_game_over(), state.capital() <= 0);

            match result {
                Ok(record) => {
                    prop_assert_eq!(state.history().len(), before.history().len() + 1);
                    prop_assert_eq!(state.capital(), before.capital() + record.money_delta);
                    prop_assert_eq!(
                        state.market_share(),
                        before.market_share() + record.market_share_delta
                    );
                }
                Err(_) => {
                    prop_assert_eq!(&state, &before);
                }
            }

            if before.is_game_over() {
                prop_assert_eq!(&state, &before);
            }
        }

        state.reset();
        prop_assert_eq!(state, GameState::default());
    }
}
