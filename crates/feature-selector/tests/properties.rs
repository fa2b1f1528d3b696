use feature_selector::{
    CorrelationMethod, Dataset, Label, SelectionMethod, StatisticalMethod,
};
use proptest::prelude::*;

fn dataset_strategy() -> impl Strategy<Value = (Dataset, Vec<f64>)> {
    (2usize..8, 3usize..20).prop_flat_map(|(cols, rows)| {
        (
            prop::collection::vec(prop::collection::vec(-100.0f64..100.0, rows), cols),
            prop::collection::vec(-10.0f64..10.0, rows),
        )
            .prop_map(|(columns, label)| {
                let ds = Dataset::from_pairs(
                    columns
                        .into_iter()
                        .enumerate()
                        .map(|(i, values)| (format!("c{}", i), values)),
                )
                .unwrap();
                (ds, label)
            })
    })
}

proptest! {
    #[test]
    fn variance_filter_is_monotone((ds, _) in dataset_strategy(), a in 0.0f64..3000.0, b in 0.0f64..3000.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let kept_low = SelectionMethod::Variance { threshold: low }.select(&ds, None).unwrap();
        let kept_high = SelectionMethod::Variance { threshold: high }.select(&ds, None).unwrap();
        prop_assert!(kept_high.dataset.n_columns() <= kept_low.dataset.n_columns());
    }

    #[test]
    fn top_k_keeps_highest_scores((ds, label) in dataset_strategy(), k_seed in 0usize..100) {
        let k = 1 + k_seed % ds.n_columns();
        let method = SelectionMethod::Statistical {
            num_features: k,
            test: StatisticalMethod::FRegression,
        };
        let sel = method.select(&ds, Some(&Label::Numeric(label))).unwrap();
        prop_assert_eq!(sel.dataset.n_columns(), k);

        let kept: Vec<&str> = sel.selected();
        let min_kept = kept
            .iter()
            .map(|n| sel.score(n).unwrap())
            .fold(f64::INFINITY, f64::min);
        for (name, score) in &sel.scores {
            if !kept.contains(&name.as_str()) {
                prop_assert!(*score <= min_kept);
            }
        }
    }

    #[test]
    fn correlation_filter_keeps_first_column((ds, _) in dataset_strategy(), t in 0.05f64..1.0) {
        let method = SelectionMethod::Correlation { threshold: t, correlation: CorrelationMethod::Spearman };
        let sel = method.select(&ds, None).unwrap();
        prop_assert_eq!(sel.selected()[0], "c0");
        prop_assert_eq!(sel.scores.len(), ds.n_columns());
    }
}
