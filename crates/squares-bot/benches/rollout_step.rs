use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use squares_bot::bot::rollout;
use squares_bot::{PlacementResolver, SearchSession};
use squares_core::model::card::Card;
use squares_core::scoring::PointSystem;

fn session_after(plays: usize, seed: u64) -> SearchSession {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut session = SearchSession::new();
    for cell in 0..plays {
        if let Some(card) = session.draw_random(&mut rng) {
            let _ = session.place_index(card, cell);
        }
    }
    session
}

fn resolver_bench(c: &mut Criterion) {
    let system = PointSystem::american();
    let resolver = PlacementResolver::global();
    let mut group = c.benchmark_group("resolve_step");
    for plays in [3usize, 12, 20] {
        let session = session_after(plays, 41);
        let legal = session.legal_plays();
        let card = session.undealt()[0];
        let mut rng = StdRng::seed_from_u64(7);
        group.bench_function(format!("filled_{plays}"), |b| {
            b.iter(|| {
                black_box(resolver.resolve(&system, session.grid(), card, legal.as_slice(), &mut rng))
            })
        });
    }
    group.finish();
}

fn rollout_bench(c: &mut Criterion) {
    let system = PointSystem::american();
    let resolver = PlacementResolver::global();
    let mut group = c.benchmark_group("rollout");
    for depth in [1usize, 5, 20] {
        let mut session = session_after(1, 3);
        let mut rng = StdRng::seed_from_u64(depth as u64);
        group.bench_function(format!("depth_{depth}"), |b| {
            b.iter(|| black_box(rollout::simulate(&mut session, depth, &system, &resolver, &mut rng)))
        });
    }
    group.finish();
}

fn staged_card_bench(c: &mut Criterion) {
    let card: Card = "AS".parse().expect("valid card code");
    c.bench_function("stage_place_undo", |b| {
        let mut session = SearchSession::new();
        b.iter(|| {
            let _ = session.stage(card);
            let _ = session.place_index(card, 12);
            black_box(session.undo())
        })
    });
}

criterion_group!(benches, resolver_bench, rollout_bench, staged_card_bench);
criterion_main!(benches);
