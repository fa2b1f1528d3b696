// Pattern mining throughput on synthetic session data
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sequence_miner::{Constraint, MinFrequency, Miner, MiningConfig, SequenceDatabase};

const EVENTS: [&str; 8] = ["view", "cart", "buy", "search", "rate", "share", "wish", "return"];

fn generate_database(n_sequences: usize, seed: u64) -> SequenceDatabase {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sequences = Vec::with_capacity(n_sequences);
    let mut prices = Vec::with_capacity(n_sequences);
    for _ in 0..n_sequences {
        let len = rng.random_range(3..15);
        sequences.push((0..len).map(|_| EVENTS[rng.random_range(0..EVENTS.len())]).collect::<Vec<_>>());
        prices.push((0..len).map(|_| rng.random_range(1.0..50.0)).collect::<Vec<f64>>());
    }
    SequenceDatabase::new(sequences)
        .with_attribute("price", prices)
        .unwrap()
}

fn benchmark_unconstrained(c: &mut Criterion) {
    let mut group = c.benchmark_group("mine_unconstrained");
    group.sample_size(20);

    for size in [100, 1000].iter() {
        let db = generate_database(*size, 7);
        let config = MiningConfig::short_range().with_min_frequency(MinFrequency::Fraction(0.05));
        group.bench_with_input(BenchmarkId::new("sequences", size), &db, |b, db| {
            let miner = Miner::new(db, vec![], config.clone()).unwrap();
            b.iter(|| black_box(miner.mine().unwrap()));
        });
    }

    group.finish();
}

fn benchmark_constrained(c: &mut Criterion) {
    let mut group = c.benchmark_group("mine_constrained");
    group.sample_size(20);

    let db = generate_database(1000, 11);
    let constraints = vec![
        Constraint::average("price").between(10.0, 30.0),
        Constraint::span("price").at_most(25.0),
    ];

    for parallel in [false, true] {
        let config = MiningConfig {
            parallel,
            ..MiningConfig::short_range().with_min_frequency(MinFrequency::Fraction(0.05))
        };
        let miner = Miner::new(&db, constraints.clone(), config).unwrap();
        group.bench_function(BenchmarkId::new("parallel", parallel), |b| {
            b.iter(|| black_box(miner.mine().unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_unconstrained, benchmark_constrained);
criterion_main!(benches);
