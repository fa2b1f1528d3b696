//! Linear Model Coefficients via Coordinate Descent

use serde::{Deserialize, Serialize};
use tracing::debug;

const MAX_ITER: usize = 1000;
const TOLERANCE: f64 = 1e-8;

/// Penalty applied to the linear fit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regularization {
    /// Ordinary least squares
    #[default]
    None,
    /// L1 penalty
    Lasso { alpha: f64 },
    /// L2 penalty
    Ridge { alpha: f64 },
}

impl Regularization {
    pub(crate) fn alpha(&self) -> Option<f64> {
        match self {
            Regularization::None => None,
            Regularization::Lasso { alpha } | Regularization::Ridge { alpha } => Some(*alpha),
        }
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

/// Fit a linear model on standardized columns and return one coefficient
/// per column. Constant columns always get a zero coefficient.
pub fn fit_coefficients(columns: &[&[f64]], target: &[f64], regularization: Regularization) -> Vec<f64> {
    let n = target.len();
    let p = columns.len();
    if n == 0 || p == 0 {
        return vec![0.0; p];
    }

    let standardized: Vec<Vec<f64>> = columns
        .iter()
        .map(|col| {
            let mean = col.iter().sum::<f64>() / n as f64;
            let var = col.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
            let std = var.sqrt();
            if std > 0.0 {
                col.iter().map(|v| (v - mean) / std).collect()
            } else {
                vec![0.0; n]
            }
        })
        .collect();

    let y_mean = target.iter().sum::<f64>() / n as f64;
    let mut residual: Vec<f64> = target.iter().map(|y| y - y_mean).collect();
    let mut coef = vec![0.0; p];

    // Squared norm / n of each standardized column: 1.0, or 0.0 when constant
    let norms: Vec<f64> = standardized
        .iter()
        .map(|x| x.iter().map(|v| v * v).sum::<f64>() / n as f64)
        .collect();

    for iter in 0..MAX_ITER {
        let mut max_delta: f64 = 0.0;

        for j in 0..p {
            if norms[j] == 0.0 {
                continue;
            }
            let x = &standardized[j];
            let old = coef[j];

            let rho = x
                .iter()
                .zip(&residual)
                .map(|(xi, ri)| xi * (ri + xi * old))
                .sum::<f64>()
                / n as f64;

            let new = match regularization {
                Regularization::None => rho / norms[j],
                Regularization::Lasso { alpha } => soft_threshold(rho, alpha) / norms[j],
                Regularization::Ridge { alpha } => rho / (norms[j] + alpha),
            };

            if new != old {
                let delta = new - old;
                for (ri, xi) in residual.iter_mut().zip(x) {
                    *ri -= xi * delta;
                }
                coef[j] = new;
                max_delta = max_delta.max(delta.abs());
            }
        }

        if max_delta < TOLERANCE {
            debug!("Coordinate descent converged after {} iterations", iter + 1);
            break;
        }
    }

    coef
}
