use proptest::prelude::*;
use sequence_miner::{Aggregate, Constraint, MinFrequency, Miner, MiningConfig, SequenceDatabase};
use std::collections::{BTreeMap, BTreeSet};

const EVENTS: [&str; 3] = ["a", "b", "c"];

fn database_strategy() -> impl Strategy<Value = (Vec<Vec<String>>, Vec<Vec<f64>>)> {
    prop::collection::vec(prop::collection::vec((0usize..3, 0u8..10), 1..6), 2..6).prop_map(|seqs| {
        let events = seqs
            .iter()
            .map(|s| s.iter().map(|(e, _)| EVENTS[*e].to_string()).collect())
            .collect();
        let values = seqs
            .iter()
            .map(|s| s.iter().map(|(_, v)| *v as f64).collect())
            .collect();
        (events, values)
    })
}

fn aggregate_strategy() -> impl Strategy<Value = Aggregate> {
    prop_oneof![
        Just(Aggregate::Average),
        Just(Aggregate::Sum),
        Just(Aggregate::Min),
        Just(Aggregate::Max),
        Just(Aggregate::Median),
        Just(Aggregate::Span),
        Just(Aggregate::Gap),
    ]
}

fn satisfies(aggregate: Aggregate, lower: f64, upper: f64, values: &[f64]) -> bool {
    let within = |v: f64| v >= lower && v <= upper;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    match aggregate {
        Aggregate::Average => within(values.iter().sum::<f64>() / values.len() as f64),
        Aggregate::Sum => within(values.iter().sum::<f64>()),
        Aggregate::Min => within(min),
        Aggregate::Max => within(max),
        Aggregate::Median => {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                within((sorted[mid - 1] + sorted[mid]) / 2.0)
            } else {
                within(sorted[mid])
            }
        }
        Aggregate::Span => within(max - min),
        Aggregate::Gap => values.windows(2).all(|w| within(w[1] - w[0])),
    }
}

/// Enumerate every index subset of every sequence
fn brute_force(
    events: &[Vec<String>],
    values: &[Vec<f64>],
    constraint: Option<(Aggregate, f64, f64)>,
    max_span: Option<usize>,
    min_support: usize,
) -> BTreeSet<(Vec<String>, usize)> {
    let mut holders: BTreeMap<Vec<String>, BTreeSet<usize>> = BTreeMap::new();
    for (s, (seq, vals)) in events.iter().zip(values).enumerate() {
        let n = seq.len();
        for mask in 1u32..(1 << n) {
            let idx: Vec<usize> = (0..n).filter(|i| mask & (1 << i) != 0).collect();
            let first = idx[0];
            let last = idx[idx.len() - 1];
            if max_span.is_some_and(|w| last - first + 1 > w) {
                continue;
            }
            let matched: Vec<f64> = idx.iter().map(|&i| vals[i]).collect();
            if let Some((aggregate, lower, upper)) = constraint {
                if !satisfies(aggregate, lower, upper, &matched) {
                    continue;
                }
            }
            let items = idx.iter().map(|&i| seq[i].clone()).collect();
            holders.entry(items).or_default().insert(s);
        }
    }
    holders
        .into_iter()
        .filter(|(_, seqs)| seqs.len() >= min_support)
        .map(|(items, seqs)| (items, seqs.len()))
        .collect()
}

fn config(min_support: usize, max_span: Option<usize>) -> MiningConfig {
    MiningConfig {
        min_frequency: MinFrequency::Count(min_support),
        min_length: 1,
        max_length: None,
        max_span,
        parallel: true,
    }
}

proptest! {
    #[test]
    fn constrained_mining_is_sound_and_complete(
        (events, values) in database_strategy(),
        aggregate in aggregate_strategy(),
        lower in -5i32..10,
        width in 0i32..8,
        max_span in prop::option::of(1usize..6),
        min_support in 1usize..3,
    ) {
        let (lower, upper) = (lower as f64, (lower + width) as f64);
        let db = SequenceDatabase::new(events.clone())
            .with_attribute("v", values.clone())
            .unwrap();
        let constraint = Constraint::new("v", aggregate).between(lower, upper);
        let miner = Miner::new(&db, vec![constraint], config(min_support, max_span)).unwrap();

        let mined: BTreeSet<(Vec<String>, usize)> = miner
            .mine()
            .unwrap()
            .into_iter()
            .map(|p| (p.items, p.support))
            .collect();
        let expected = brute_force(&events, &values, Some((aggregate, lower, upper)), max_span, min_support);
        prop_assert_eq!(mined, expected);
    }

    #[test]
    fn unconstrained_mining_is_sound_and_complete(
        (events, values) in database_strategy(),
        max_span in prop::option::of(1usize..6),
        min_support in 1usize..3,
    ) {
        let db = SequenceDatabase::new(events.clone());
        let miner = Miner::new(&db, vec![], config(min_support, max_span)).unwrap();

        let mined: BTreeSet<(Vec<String>, usize)> = miner
            .mine()
            .unwrap()
            .into_iter()
            .map(|p| (p.items, p.support))
            .collect();
        prop_assert_eq!(mined, brute_force(&events, &values, None, max_span, min_support));
    }

    #[test]
    fn output_is_ordered_and_one_hot_agrees(
        (events, values) in database_strategy(),
        upper in 0i32..20,
    ) {
        let db = SequenceDatabase::new(events)
            .with_attribute("v", values)
            .unwrap();
        let constraints = vec![Constraint::sum("v").at_most(upper as f64)];
        let miner = Miner::new(&db, constraints, MiningConfig::default()).unwrap();
        let patterns = miner.mine().unwrap();

        for pair in patterns.windows(2) {
            prop_assert!(
                pair[0].support > pair[1].support
                    || (pair[0].support == pair[1].support && pair[0].items < pair[1].items)
            );
        }

        let flags = miner.one_hot(&patterns);
        prop_assert_eq!(flags.len(), db.len());
        for (j, pattern) in patterns.iter().enumerate() {
            prop_assert!(pattern.support >= miner.min_support());
            prop_assert_eq!(flags.iter().filter(|row| row[j]).count(), pattern.support);
        }
    }
}
