use core::time::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;
use squares_bot::bot::{greedy, rollout};
use squares_bot::{
    MonteCarloPlayer, PlacementResolver, Player, SearchController, SearchParams, SearchSession,
    TickClock, TimePolicy,
};
use squares_core::model::card::Card;
use squares_core::model::grid::CELLS;
use squares_core::scoring::PointSystem;

fn card(code: &str) -> Card {
    code.parse().unwrap()
}

fn tick_controller(depth: usize, seed: u64) -> SearchController<TickClock> {
    let params = SearchParams {
        depth_limit: depth,
        seed: Some(seed),
        ..SearchParams::default()
    };
    SearchController::new(
        PointSystem::american(),
        params,
        TickClock::new(Duration::from_millis(1)),
    )
    .unwrap()
}

#[test]
fn ace_of_spades_depth_one_rollouts_unwind_from_every_cell() {
    let system = PointSystem::american();
    let resolver = PlacementResolver::global();
    let mut rng = StdRng::seed_from_u64(2024);
    let mut session = SearchSession::new();
    let ace = card("AS");
    session.stage(ace).unwrap();
    let pristine = session.clone();

    for cell in 0..CELLS {
        session.place_index(ace, cell).unwrap();
        for _ in 0..4 {
            rollout::simulate(&mut session, 1, &system, &resolver, &mut rng).unwrap();
        }
        assert_eq!(session.num_plays(), 1);
        assert_eq!(session.undo().unwrap(), ace);
        assert_eq!(session.grid(), pristine.grid());
        assert_eq!(session.played(), pristine.played());
        assert_eq!(session.undealt(), pristine.undealt());
    }
}

#[test]
fn ace_of_spades_decision_on_empty_grid_searches_all_cells() {
    let mut session = SearchSession::new();
    let mut search = tick_controller(1, 99);
    let stats = search.decide(&mut session, card("AS"), 30_000).unwrap();
    assert_eq!(stats.candidates.len(), 25);
    assert!(stats.candidates.iter().all(|candidate| candidate.rollouts > 0));
    assert_eq!(session.num_plays(), 1);
    assert!(session.check_invariants());
}

#[test]
fn symmetric_first_move_ties_are_broken_uniformly() {
    const TRIALS: usize = 1_000;
    let mut counts = [0usize; CELLS];
    let mut search = tick_controller(0, 31);
    for _ in 0..TRIALS {
        let mut session = SearchSession::new();
        let stats = search.decide(&mut session, card("7D"), 1_250).unwrap();
        assert_eq!(stats.tied, CELLS);
        counts[stats.placement.index()] += 1;
    }
    let expected = TRIALS / CELLS;
    for (cell, count) in counts.iter().enumerate() {
        assert!(
            *count > expected / 4 && *count < expected * 3,
            "cell {cell} chosen {count} times, expected about {expected}"
        );
    }
}

#[test]
fn rollouts_per_candidate_grow_with_budget() {
    let mut base = SearchSession::new();
    for cell in 0..8 {
        base.place_index(Card::from_index(cell * 3).unwrap(), cell).unwrap();
    }
    let mut previous = 0u64;
    for millis in [0u64, 300, 3_000, 30_000] {
        let mut session = base.clone();
        let mut search = tick_controller(1, 4);
        let stats = search.decide(&mut session, card("AH"), millis).unwrap();
        let minimum = stats
            .candidates
            .iter()
            .map(|candidate| candidate.rollouts)
            .min()
            .unwrap();
        assert!(minimum >= previous, "{millis} ms gave {minimum} < {previous}");
        previous = minimum;
    }
    assert!(previous > 0);
}

#[test]
fn future_weighted_policy_gives_more_time_per_candidate() {
    let even = TimePolicy::EvenSplit.per_candidate(10_000, 4, 4);
    let future = TimePolicy::FutureWeighted.per_candidate(10_000, 4, 4);
    assert!(future > even);
}

#[test]
fn isolated_cells_score_zero_for_every_card() {
    let system = PointSystem::random(12);
    let mut session = SearchSession::new();
    session.place(card("JC"), 0, 0).unwrap();
    session.place(card("JD"), 1, 1).unwrap();
    for index in 0..Card::DECK_SIZE {
        let candidate = Card::from_index(index).unwrap();
        for cell in [17usize, 23, 19] {
            assert!(greedy::is_isolated(session.grid(), cell));
            assert_eq!(greedy::marginal_value(&system, *session.grid(), candidate, cell), 0);
        }
    }
}

#[test]
fn dedicated_pool_player_completes_a_game() {
    let params = SearchParams {
        depth_limit: 3,
        threads: Some(2),
        seed: Some(8),
        ..SearchParams::default()
    };
    let mut player = MonteCarloPlayer::with_clock(
        PointSystem::british(),
        params,
        TickClock::new(Duration::from_millis(1)),
    )
    .unwrap();
    player.init();
    let mut rng = StdRng::seed_from_u64(8);
    for _ in 0..CELLS {
        let next = player.session().draw_random(&mut rng).unwrap();
        player.get_play(next, 1_000).unwrap();
    }
    assert!(player.session().grid().is_full());
    assert!(player.session().check_invariants());
    assert_eq!(player.session().undealt().len(), Card::DECK_SIZE - CELLS);
}
