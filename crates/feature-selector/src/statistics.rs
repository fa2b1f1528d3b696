//! Column Statistics and Univariate Scores

use serde::{Deserialize, Serialize};

/// Distance of r² from 1 treated as a perfect linear fit
const PERFECT_FIT_TOLERANCE: f64 = 1e-12;

/// Summary statistics for a single column
#[derive(Debug, Clone, Default)]
pub struct ColumnStats {
    /// Mean value
    pub mean: f64,
    /// Population variance
    pub variance: f64,
    /// Standard deviation
    pub std_dev: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
}

impl ColumnStats {
    /// Compute summary statistics from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);

        let m2: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        let variance = m2 / n;

        Self {
            mean,
            variance,
            std_dev: variance.sqrt(),
            min,
            max,
        }
    }
}

/// Correlation coefficient family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Linear (Pearson) correlation
    #[default]
    Pearson,
    /// Rank (Spearman) correlation
    Spearman,
    /// Kendall tau-b rank correlation
    Kendall,
}

impl CorrelationMethod {
    /// Correlation between two equal-length columns
    pub fn correlate(&self, x: &[f64], y: &[f64]) -> f64 {
        match self {
            CorrelationMethod::Pearson => pearson(x, y),
            CorrelationMethod::Spearman => pearson(&average_ranks(x), &average_ranks(y)),
            CorrelationMethod::Kendall => kendall_tau_b(x, y),
        }
    }
}

/// Pearson correlation; zero when either column is constant
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }

    let mx = x.iter().take(n).sum::<f64>() / n as f64;
    let my = y.iter().take(n).sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (a, b) in x.iter().zip(y).take(n) {
        let dx = a - mx;
        let dy = b - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }

    if vx <= 0.0 || vy <= 0.0 {
        return 0.0;
    }
    (cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0)
}

/// 1-based ranks with ties assigned their average rank
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // Positions i..j share the average of ranks i+1..=j
        let rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = rank;
        }
        i = j;
    }
    ranks
}

/// Kendall tau-b, which corrects for ties in either column
pub fn kendall_tau_b(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    let mut concordant = 0i64;
    let mut discordant = 0i64;
    let mut ties_x = 0i64;
    let mut ties_y = 0i64;

    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            if dx == 0.0 && dy == 0.0 {
                continue;
            } else if dx == 0.0 {
                ties_x += 1;
            } else if dy == 0.0 {
                ties_y += 1;
            } else if (dx > 0.0) == (dy > 0.0) {
                concordant += 1;
            } else {
                discordant += 1;
            }
        }
    }

    let denom = (((concordant + discordant + ties_x) * (concordant + discordant + ties_y)) as f64).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        (concordant - discordant) as f64 / denom
    }
}

/// One-way ANOVA F statistic of a column grouped by class index
pub fn anova_f(values: &[f64], classes: &[usize], n_classes: usize) -> f64 {
    let n = values.len();
    if n_classes < 2 || n <= n_classes {
        return 0.0;
    }

    let mut sums = vec![0.0; n_classes];
    let mut counts = vec![0usize; n_classes];
    for (&v, &c) in values.iter().zip(classes) {
        sums[c] += v;
        counts[c] += 1;
    }

    let grand_mean = values.iter().sum::<f64>() / n as f64;
    let means: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();

    let between: f64 = means
        .iter()
        .zip(&counts)
        .map(|(m, &c)| c as f64 * (m - grand_mean) * (m - grand_mean))
        .sum();
    let within: f64 = values
        .iter()
        .zip(classes)
        .map(|(v, &c)| (v - means[c]) * (v - means[c]))
        .sum();

    let df_between = (n_classes - 1) as f64;
    let df_within = (n - n_classes) as f64;

    if within <= 0.0 {
        return if between > 0.0 { f64::INFINITY } else { 0.0 };
    }
    (between / df_between) / (within / df_within)
}

/// Chi-square statistic treating a non-negative column as per-row counts
pub fn chi_square(values: &[f64], classes: &[usize], n_classes: usize) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }

    let mut observed = vec![0.0; n_classes];
    let mut class_counts = vec![0usize; n_classes];
    for (&v, &c) in values.iter().zip(classes) {
        observed[c] += v;
        class_counts[c] += 1;
    }

    let total: f64 = observed.iter().sum();
    observed
        .iter()
        .zip(&class_counts)
        .map(|(&obs, &count)| {
            let expected = total * count as f64 / n as f64;
            if expected > 0.0 {
                (obs - expected) * (obs - expected) / expected
            } else {
                0.0
            }
        })
        .sum()
}

/// Univariate linear regression F statistic against a numeric target
pub fn f_regression(values: &[f64], target: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return 0.0;
    }
    let r = pearson(values, target);
    let r2 = r * r;
    // Perfect fits land a few ulps short of 1
    if 1.0 - r2 <= PERFECT_FIT_TOLERANCE {
        return f64::INFINITY;
    }
    r2 / (1.0 - r2) * (n - 2) as f64
}

/// Equal-width bin index per value
pub fn equal_width_bins(values: &[f64], bins: usize) -> Vec<usize> {
    let stats = ColumnStats::compute(values);
    let range = stats.max - stats.min;
    values
        .iter()
        .map(|v| {
            if range <= 0.0 || bins <= 1 {
                0
            } else {
                (((v - stats.min) / range) * bins as f64).floor().min((bins - 1) as f64) as usize
            }
        })
        .collect()
}

/// Mutual information (nats) between two discrete codings of the rows
pub fn mutual_information(x: &[usize], y: &[usize]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    let nx = x.iter().max().map(|m| m + 1).unwrap_or(0);
    let ny = y.iter().max().map(|m| m + 1).unwrap_or(0);

    let mut joint = vec![0usize; nx * ny];
    let mut px = vec![0usize; nx];
    let mut py = vec![0usize; ny];
    for (&a, &b) in x.iter().zip(y).take(n) {
        joint[a * ny + b] += 1;
        px[a] += 1;
        py[b] += 1;
    }

    let total = n as f64;
    let mut mi = 0.0;
    for a in 0..nx {
        for b in 0..ny {
            let count = joint[a * ny + b];
            if count == 0 {
                continue;
            }
            let pxy = count as f64 / total;
            let marginal = (px[a] as f64 / total) * (py[b] as f64 / total);
            mi += pxy * (pxy / marginal).ln();
        }
    }
    mi.max(0.0)
}
