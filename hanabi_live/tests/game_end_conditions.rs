//! Integration tests for end-of-game evaluation.
//!
//! Every game here is dealt from a hand-built deck so that the exact sequence
//! of strikes, clue tokens and reachable cards is known in advance.

use hanabi_live::game::{
    CardIdentity, Clue, EndCondition, Game, GameAction, GameOptions, GameStatus, RuleViolation,
    VariantRegistry, card::build_identities,
};

const RED: usize = 0;
const YELLOW: usize = 1;
const GREEN: usize = 2;
const BLUE: usize = 3;

fn names() -> Vec<String> {
    vec!["alice".to_string(), "bob".to_string()]
}

/// A No Variant deck that starts with `front` and continues with the rest of
/// the cards in suit-major order.
fn deck_with_front(front: &[(usize, u8)]) -> Vec<CardIdentity> {
    let variant = VariantRegistry::builtin().get("No Variant").unwrap();
    let mut rest = build_identities(&variant);
    let mut deck = Vec::new();
    for (suit, rank) in front {
        let card = CardIdentity::new(*suit, *rank);
        let position = rest.iter().position(|c| *c == card).unwrap();
        deck.push(rest.remove(position));
    }
    deck.extend(rest);
    deck
}

fn started_game(options: GameOptions, deck: Vec<CardIdentity>) -> Game {
    let variant = VariantRegistry::builtin().get("No Variant").unwrap();
    let mut game = Game::with_deck(variant, options, names(), "fixed", deck).unwrap();
    game.start().unwrap();
    game
}

#[test]
fn test_strikeout_takes_precedence_over_speedrun_fail() {
    // Alice holds R2 Y3 G5 B1 B1, Bob holds R1 R1 R1 Y1 Y1
    let deck = deck_with_front(&[
        (RED, 2),
        (YELLOW, 3),
        (GREEN, 5),
        (BLUE, 1),
        (BLUE, 1),
        (RED, 1),
        (RED, 1),
        (RED, 1),
        (YELLOW, 1),
        (YELLOW, 1),
    ]);
    let options = GameOptions {
        speedrun: true,
        ..Default::default()
    };
    let mut game = started_game(options, deck);
    let rank_one = Clue::Rank(1);

    assert_eq!(game.apply(GameAction::Play { player: 0, order: 0 }), Ok(false));
    assert_eq!(game.strikes(), 1);
    assert_eq!(game.max_score(), 25);

    game.apply(GameAction::Clue {
        player: 1,
        target: 0,
        clue: rank_one,
    })
    .unwrap();
    assert_eq!(game.apply(GameAction::Play { player: 0, order: 1 }), Ok(false));
    assert_eq!(game.strikes(), 2);

    game.apply(GameAction::Clue {
        player: 1,
        target: 0,
        clue: rank_one,
    })
    .unwrap();
    assert_eq!(game.clue_tokens(), 6);

    // Losing the only G5 makes a perfect score impossible on the same action
    // that draws the third strike
    assert_eq!(game.apply(GameAction::Play { player: 0, order: 2 }), Ok(true));
    assert_eq!(game.strikes(), 3);
    assert_eq!(game.max_score(), 24);
    assert_eq!(game.end_condition(), EndCondition::Strikeout);
    assert_eq!(game.status(), GameStatus::Ended(EndCondition::Strikeout));
    assert!(game.datetime_finished().is_some());
}

#[test]
fn test_speedrun_ends_when_perfect_score_is_lost() {
    let deck = deck_with_front(&[
        (GREEN, 5),
        (RED, 1),
        (RED, 1),
        (RED, 1),
        (YELLOW, 1),
        (BLUE, 1),
        (BLUE, 1),
        (BLUE, 1),
        (YELLOW, 1),
        (YELLOW, 1),
    ]);
    let options = GameOptions {
        speedrun: true,
        ..Default::default()
    };
    let mut game = started_game(options, deck);

    assert_eq!(game.apply(GameAction::Play { player: 0, order: 0 }), Ok(true));
    assert_eq!(game.strikes(), 1);
    assert_eq!(game.end_condition(), EndCondition::SpeedrunFail);
    assert_eq!(game.end_player(), None);
}

#[test]
fn test_all_or_nothing_fail_and_normal_game_keeps_going() {
    let front = [
        (GREEN, 5),
        (RED, 1),
        (RED, 1),
        (RED, 1),
        (YELLOW, 1),
        (BLUE, 1),
        (BLUE, 1),
        (BLUE, 1),
        (YELLOW, 1),
        (YELLOW, 1),
    ];

    let options = GameOptions {
        all_or_nothing: true,
        ..Default::default()
    };
    let mut game = started_game(options, deck_with_front(&front));
    game.apply(GameAction::Play { player: 0, order: 0 }).unwrap();
    assert_eq!(game.end_condition(), EndCondition::AllOrNothingFail);

    // Without either option, losing the G5 only lowers the ceiling
    let mut game = started_game(GameOptions::default(), deck_with_front(&front));
    assert_eq!(game.apply(GameAction::Play { player: 0, order: 0 }), Ok(false));
    assert_eq!(game.max_score(), 24);
    assert_eq!(game.status(), GameStatus::Running);
}

#[test]
fn test_all_or_nothing_softlock_on_restored_state() {
    let variant = VariantRegistry::builtin().get("No Variant").unwrap();
    let options = GameOptions {
        all_or_nothing: true,
        ..Default::default()
    };
    let game = started_game(options, deck_with_front(&[]));

    // Seat 0 to act with nothing in hand and no clue tokens
    let mut snapshot = game.snapshot();
    snapshot.players[0].hand.clear();
    snapshot.clue_tokens = 0;
    snapshot.active_player = 0;

    let mut restored = Game::restore(snapshot, variant).unwrap();
    assert_eq!(restored.status(), GameStatus::Running);
    assert!(restored.check_end());
    assert_eq!(restored.end_condition(), EndCondition::AllOrNothingSoftlock);
    assert_eq!(restored.end_player(), Some(0));
}

/// Put the game one draw away from an empty deck, then clue and discard.
fn draw_last_card(options: GameOptions) -> Game {
    let variant = VariantRegistry::builtin().get("No Variant").unwrap();
    let game = started_game(options, deck_with_front(&[]));
    let mut snapshot = game.snapshot();
    snapshot.deck_index = snapshot.deck.len() - 1;
    let mut game = Game::restore(snapshot, variant).unwrap();

    game.apply(GameAction::Clue {
        player: 0,
        target: 1,
        clue: Clue::Rank(3),
    })
    .unwrap();
    let order = game.hand(1)[0];
    game.apply(GameAction::Discard { player: 1, order }).unwrap();
    assert_eq!(game.cards_left(), 0);
    game
}

#[test]
fn test_final_round_only_outside_all_or_nothing() {
    let game = draw_last_card(GameOptions::default());
    // Drawn on turn 1, so every seat gets one more turn
    assert_eq!(game.end_turn(), Some(4));
    assert_eq!(game.status(), GameStatus::Running);

    let options = GameOptions {
        all_or_nothing: true,
        ..Default::default()
    };
    let game = draw_last_card(options);
    assert_eq!(game.end_turn(), None);
    assert_eq!(game.status(), GameStatus::Running);
}

#[test]
fn test_check_end_is_idempotent() {
    let mut game = started_game(GameOptions::default(), deck_with_front(&[]));
    assert!(!game.check_end());
    assert!(!game.check_end());

    game.apply(GameAction::Terminate { player: 1 }).unwrap();
    let finished = game.datetime_finished();
    let generation = game.generation();

    for _ in 0..3 {
        assert!(game.check_end());
        assert_eq!(game.end_condition(), EndCondition::Terminated);
        assert_eq!(game.end_player(), Some(1));
    }
    assert_eq!(game.datetime_finished(), finished);
    assert_eq!(game.generation(), generation);
    assert_eq!(game.score(), 0);

    assert_eq!(
        game.apply(GameAction::Timeout { player: 0 }),
        Err(RuleViolation::GameEnded)
    );
    assert_eq!(game.end_condition(), EndCondition::Terminated);
}

#[test]
fn test_deck_exhaustion_gives_one_more_round() {
    let mut game = started_game(GameOptions::default(), deck_with_front(&[]));

    let mut final_turn = None;
    while !game.is_ended() {
        let seat = game.active_player();
        if game.cards_left() == 0 && final_turn.is_none() {
            final_turn = game.end_turn();
        }
        let action = if game.clue_tokens() == 8 {
            let target = 1 - seat;
            let rank = game.card(game.hand(target)[0]).unwrap().rank;
            GameAction::Clue {
                player: seat,
                target,
                clue: Clue::Rank(rank),
            }
        } else {
            GameAction::Discard {
                player: seat,
                order: game.hand(seat)[0],
            }
        };
        game.apply(action).unwrap();
    }

    // Nothing was ever played, so neither strikes nor a perfect score
    assert_eq!(game.end_condition(), EndCondition::Normal);
    // Purple is dealt last and still in hand when the deck runs out
    let final_turn = final_turn.expect("the deck ran out before the game ended");
    assert_eq!(game.cards_left(), 0);
    assert!(game.turn() <= final_turn);
}
