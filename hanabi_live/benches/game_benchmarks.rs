use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use hanabi_live::game::{Clue, Game, GameAction, GameOptions, VariantRegistry, card::random_seed};
use std::hint::black_box;

/// A started game with N players on a fixed seed
fn setup_game(n_players: usize, variant: &str) -> Game {
    let variant = VariantRegistry::builtin().get(variant).unwrap();
    let names = (0..n_players).map(|i| format!("player{i}")).collect();
    let mut game = Game::new(variant, GameOptions::default(), names, "bench").unwrap();
    game.start().unwrap();
    game
}

/// Play the game out with a fixed policy: clue at max tokens, otherwise
/// play the newest card.
fn play_out(mut game: Game) -> Game {
    while !game.is_ended() {
        let seat = game.active_player();
        let target = (seat + 1) % game.players().len();
        let action = if game.clue_tokens() >= game.variant().max_clue_tokens() {
            let order = game.hand(target)[0];
            let rank = game.card(order).map_or(1, |card| card.rank);
            GameAction::Clue {
                player: seat,
                target,
                clue: Clue::Rank(rank),
            }
        } else {
            let hand = game.hand(seat);
            GameAction::Play {
                player: seat,
                order: hand[hand.len() - 1],
            }
        };
        if game.apply(action).is_err() {
            game.apply(GameAction::Terminate { player: seat }).unwrap();
        }
    }
    game
}

/// Benchmark end-condition evaluation on a running game
fn bench_check_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_end");

    for variant in ["No Variant", "Up or Down (5 Suits)", "Black (6 Suits)"] {
        let game = setup_game(4, variant);
        group.bench_with_input(BenchmarkId::from_parameter(variant), &game, |b, game| {
            b.iter_batched(
                || game.clone(),
                |mut game| black_box(game.check_end()),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark a whole game from deal to end
fn bench_full_playout(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_playout");

    for n_players in [2, 4, 6] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{n_players}_players")),
            &n_players,
            |b, &n_players| {
                b.iter(|| play_out(setup_game(n_players, "No Variant")));
            },
        );
    }

    group.finish();
}

/// Benchmark view generation for every seat
fn bench_view_generation(c: &mut Criterion) {
    let game = setup_game(5, "No Variant");

    c.bench_function("view_for_all_seats", |b| {
        b.iter(|| {
            for seat in 0..5 {
                black_box(game.view_for(Some(seat)));
            }
            black_box(game.view_for(None));
        });
    });
}

/// Benchmark snapshot and restore of a finished game
fn bench_snapshot_restore(c: &mut Criterion) {
    let game = play_out(setup_game(3, "No Variant"));
    let variant = game.variant().clone();

    c.bench_function("snapshot_restore", |b| {
        b.iter(|| Game::restore(black_box(game.snapshot()), variant.clone()).unwrap());
    });
}

/// Benchmark seed generation
fn bench_random_seed(c: &mut Criterion) {
    let variant = VariantRegistry::builtin().get("No Variant").unwrap();
    c.bench_function("random_seed", |b| {
        b.iter(|| random_seed(black_box(4), &variant));
    });
}

criterion_group!(rules, bench_check_end, bench_full_playout);

criterion_group!(
    exports,
    bench_view_generation,
    bench_snapshot_restore,
    bench_random_seed
);

criterion_main!(rules, exports);
