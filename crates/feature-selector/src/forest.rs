//! Random Forest Impurity Importances
//!
//! Trees are grown only far enough to accumulate the impurity decrease of
//! every split; no tree structure is retained since only the per-column
//! importances are consumed.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tree ensemble parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees
    pub n_trees: usize,
    /// Maximum tree depth (None = grow until pure or too small)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Columns considered per split (None = ceil(sqrt(columns)))
    pub max_features: Option<usize>,
    /// RNG seed for bootstrap and column sampling
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: Some(8),
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

impl ForestParams {
    /// Small forest for quick exploratory runs
    pub fn fast() -> Self {
        Self {
            n_trees: 10,
            max_depth: Some(4),
            ..Default::default()
        }
    }
}

/// Target of the fitted trees
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// Variance impurity
    Regression(&'a [f64]),
    /// Gini impurity over class indices
    Classification(&'a [usize], usize),
}

struct Split {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

struct TreeGrower<'a> {
    columns: &'a [&'a [f64]],
    target: Target<'a>,
    params: &'a ForestParams,
    max_features: usize,
    rng: StdRng,
    importances: Vec<f64>,
}

impl<'a> TreeGrower<'a> {
    fn impurity(&self, rows: &[usize]) -> f64 {
        match self.target {
            Target::Regression(y) => {
                let n = rows.len() as f64;
                let sum: f64 = rows.iter().map(|&r| y[r]).sum();
                let sum_sq: f64 = rows.iter().map(|&r| y[r] * y[r]).sum();
                (sum_sq / n - (sum / n) * (sum / n)).max(0.0)
            }
            Target::Classification(y, k) => {
                let mut counts = vec![0usize; k];
                for &r in rows {
                    counts[y[r]] += 1;
                }
                gini(&counts, rows.len())
            }
        }
    }

    fn best_split(&mut self, rows: &[usize], impurity: f64) -> Option<Split> {
        let mut features: Vec<usize> = (0..self.columns.len()).collect();
        features.shuffle(&mut self.rng);
        features.truncate(self.max_features);
        // Deterministic evaluation order for ties
        features.sort_unstable();

        let n = rows.len();
        let mut best: Option<Split> = None;

        for &feature in &features {
            let column = self.columns[feature];
            let mut sorted = rows.to_vec();
            sorted.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

            let mut sweep = SplitSweep::new(self.target, &sorted);
            for i in 0..n - 1 {
                sweep.move_left(sorted[i]);
                if column[sorted[i]] == column[sorted[i + 1]] {
                    continue;
                }

                let (left_imp, right_imp) = sweep.impurities();
                let n_left = (i + 1) as f64;
                let n_right = (n - i - 1) as f64;
                let decrease = n as f64 * impurity - n_left * left_imp - n_right * right_imp;

                if decrease > best.as_ref().map(|b| b.decrease).unwrap_or(1e-12) {
                    best = Some(Split {
                        feature,
                        threshold: (column[sorted[i]] + column[sorted[i + 1]]) / 2.0,
                        decrease,
                    });
                }
            }
        }

        best
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize) {
        if rows.len() < self.params.min_samples_split.max(2) {
            return;
        }
        if self.params.max_depth.map(|max| depth >= max).unwrap_or(false) {
            return;
        }

        let impurity = self.impurity(&rows);
        if impurity <= 0.0 {
            return;
        }

        let Some(split) = self.best_split(&rows, impurity) else {
            return;
        };
        self.importances[split.feature] += split.decrease;

        let column = self.columns[split.feature];
        let (left, right): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| column[r] <= split.threshold);

        self.grow(left, depth + 1);
        self.grow(right, depth + 1);
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / n) * (c as f64 / n)).sum::<f64>()
}

/// Running left/right statistics while sweeping a sorted column
enum SplitSweep<'a> {
    Regression {
        y: &'a [f64],
        left: (f64, f64, usize),
        right: (f64, f64, usize),
    },
    Classification {
        y: &'a [usize],
        left: Vec<usize>,
        right: Vec<usize>,
        n_left: usize,
        n_right: usize,
    },
}

impl<'a> SplitSweep<'a> {
    fn new(target: Target<'a>, rows: &[usize]) -> Self {
        match target {
            Target::Regression(y) => {
                let sum: f64 = rows.iter().map(|&r| y[r]).sum();
                let sum_sq: f64 = rows.iter().map(|&r| y[r] * y[r]).sum();
                SplitSweep::Regression {
                    y,
                    left: (0.0, 0.0, 0),
                    right: (sum, sum_sq, rows.len()),
                }
            }
            Target::Classification(y, k) => {
                let mut right = vec![0usize; k];
                for &r in rows {
                    right[y[r]] += 1;
                }
                SplitSweep::Classification {
                    y,
                    left: vec![0; k],
                    right,
                    n_left: 0,
                    n_right: rows.len(),
                }
            }
        }
    }

    fn move_left(&mut self, row: usize) {
        match self {
            SplitSweep::Regression { y, left, right } => {
                let v = y[row];
                left.0 += v;
                left.1 += v * v;
                left.2 += 1;
                right.0 -= v;
                right.1 -= v * v;
                right.2 -= 1;
            }
            SplitSweep::Classification {
                y,
                left,
                right,
                n_left,
                n_right,
            } => {
                left[y[row]] += 1;
                right[y[row]] -= 1;
                *n_left += 1;
                *n_right -= 1;
            }
        }
    }

    fn impurities(&self) -> (f64, f64) {
        match self {
            SplitSweep::Regression { left, right, .. } => {
                let var = |(sum, sum_sq, n): (f64, f64, usize)| {
                    if n == 0 {
                        0.0
                    } else {
                        let n = n as f64;
                        (sum_sq / n - (sum / n) * (sum / n)).max(0.0)
                    }
                };
                (var(*left), var(*right))
            }
            SplitSweep::Classification {
                left,
                right,
                n_left,
                n_right,
                ..
            } => (gini(left, *n_left), gini(right, *n_right)),
        }
    }
}

/// Mean impurity-decrease importance per column, normalized to sum to 1.
///
/// Columns never chosen for a split score 0. If no tree finds any split
/// (for example a constant target) every importance is 0.
pub fn impurity_importances(columns: &[&[f64]], target: Target<'_>, params: &ForestParams) -> Vec<f64> {
    let p = columns.len();
    let n = match target {
        Target::Regression(y) => y.len(),
        Target::Classification(y, _) => y.len(),
    };
    if p == 0 || n == 0 || params.n_trees == 0 {
        return vec![0.0; p];
    }

    let max_features = params
        .max_features
        .unwrap_or_else(|| (p as f64).sqrt().ceil() as usize)
        .clamp(1, p);

    let mut totals = vec![0.0; p];
    for tree in 0..params.n_trees {
        let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(tree as u64));
        let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();

        let mut grower = TreeGrower {
            columns,
            target,
            params,
            max_features,
            rng,
            importances: vec![0.0; p],
        };
        grower.grow(bootstrap, 0);

        let tree_total: f64 = grower.importances.iter().sum();
        if tree_total > 0.0 {
            for (t, imp) in totals.iter_mut().zip(&grower.importances) {
                *t += imp / tree_total;
            }
        }
    }

    let total: f64 = totals.iter().sum();
    debug!("Grew {} trees over {} columns", params.n_trees, p);
    if total > 0.0 {
        totals.iter().map(|t| t / total).collect()
    } else {
        totals
    }
}
