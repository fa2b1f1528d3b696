//! Matrix Factorizations for Dimensionality Reduction

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

const POWER_ITERATIONS: usize = 300;
const POWER_TOLERANCE: f64 = 1e-12;
const EPSILON: f64 = 1e-10;
const FACTOR_SEED: u64 = 0x5eed;

/// Truncated SVD basis learned by power iteration with deflation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvdModel {
    /// Right singular vectors as rows, `n_components x width`
    components: Array2<f64>,
    /// Singular values in descending order
    singular_values: Vec<f64>,
}

impl SvdModel {
    /// Fit `n_components` right singular vectors of `x` (not centered)
    pub fn fit(x: &Array2<f64>, n_components: usize) -> Self {
        let width = x.ncols();
        let gram = x.t().dot(x);
        let mut rng = StdRng::seed_from_u64(FACTOR_SEED);
        let mut components = Array2::<f64>::zeros((n_components, width));
        let mut singular_values = Vec::with_capacity(n_components);

        for k in 0..n_components {
            let mut v: Array1<f64> = (0..width).map(|_| rng.random_range(0.1..1.0)).collect();
            orthogonalize(&mut v, &components, k);
            normalize(&mut v);

            let mut eigenvalue = 0.0;
            for _ in 0..POWER_ITERATIONS {
                let mut next = gram.dot(&v);
                orthogonalize(&mut next, &components, k);
                let norm = next.dot(&next).sqrt();
                if norm <= EPSILON {
                    // Remaining rank exhausted
                    v.fill(0.0);
                    eigenvalue = 0.0;
                    break;
                }
                next /= norm;
                let delta = (&next - &v).mapv(f64::abs).sum();
                v = next;
                eigenvalue = norm;
                if delta < POWER_TOLERANCE {
                    break;
                }
            }

            // Sign convention: largest-magnitude entry is positive
            if let Some(max) = v.iter().cloned().max_by(|a, b| a.abs().total_cmp(&b.abs())) {
                if max < 0.0 {
                    v.mapv_inplace(|e| -e);
                }
            }

            components.row_mut(k).assign(&v);
            singular_values.push(eigenvalue.sqrt());
        }

        debug!("Fitted SVD: width={}, components={}", width, n_components);
        Self {
            components,
            singular_values,
        }
    }

    /// Project rows of `x` onto the learned basis
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.components.t())
    }

    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }
}

fn orthogonalize(v: &mut Array1<f64>, basis: &Array2<f64>, count: usize) {
    for row in basis.axis_iter(Axis(0)).take(count) {
        let projection = v.dot(&row);
        v.scaled_add(-projection, &row);
    }
}

fn normalize(v: &mut Array1<f64>) {
    let norm = v.dot(v).sqrt();
    if norm > 0.0 {
        *v /= norm;
    }
}

/// Non-negative factorization `X ~ W H` with a fixed learned `H`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NmfModel {
    /// Basis `H`, `n_components x width`
    components: Array2<f64>,
    max_iter: usize,
}

impl NmfModel {
    /// Fit by multiplicative updates; `x` must be non-negative
    pub fn fit(x: &Array2<f64>, n_components: usize, max_iter: usize) -> Self {
        let (n, width) = x.dim();
        let scale = (x.mean().unwrap_or(0.0).max(EPSILON) / n_components as f64).sqrt();
        let mut rng = StdRng::seed_from_u64(FACTOR_SEED);

        let mut w = Array2::from_shape_fn((n, n_components), |_| scale * rng.random_range(0.1..1.0));
        let mut h = Array2::from_shape_fn((n_components, width), |_| scale * rng.random_range(0.1..1.0));

        for _ in 0..max_iter {
            let numerator = w.t().dot(x);
            let denominator = w.t().dot(&w).dot(&h) + EPSILON;
            h = h * numerator / denominator;

            let numerator = x.dot(&h.t());
            let denominator = w.dot(&h).dot(&h.t()) + EPSILON;
            w = w * numerator / denominator;
        }

        debug!(
            "Fitted NMF: width={}, components={}, iterations={}",
            width, n_components, max_iter
        );
        Self {
            components: h,
            max_iter,
        }
    }

    /// Solve for non-negative document weights against the fixed basis
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let k = self.components.nrows();
        let h = &self.components;
        let hht = h.dot(&h.t());
        let xht = x.dot(&h.t());

        let mut w = Array2::from_elem((n, k), 1.0 / k as f64);
        for _ in 0..self.max_iter {
            let denominator = w.dot(&hht) + EPSILON;
            w = w * &xht / denominator;
        }
        w
    }

    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_svd_recovers_dominant_direction() {
        let x = array![[3.0, 0.0], [4.0, 0.0], [0.0, 1.0]];
        let model = SvdModel::fit(&x, 2);
        let sv = model.singular_values();
        assert!((sv[0] - 5.0).abs() < 1e-6);
        assert!((sv[1] - 1.0).abs() < 1e-6);
        assert!((model.components()[[0, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_svd_components_orthonormal() {
        let x = array![[1.0, 2.0, 0.5], [0.0, 1.0, 3.0], [2.0, 0.0, 1.0], [1.0, 1.0, 1.0]];
        let model = SvdModel::fit(&x, 3);
        let c = model.components();
        let product = c.dot(&c.t());
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((product[[i, j]] - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_svd_rank_deficient() {
        let x = array![[1.0, 1.0], [2.0, 2.0]];
        let model = SvdModel::fit(&x, 2);
        assert!(model.singular_values()[1] < 1e-6);
        assert_eq!(model.transform(&x).dim(), (2, 2));
    }

    #[test]
    fn test_nmf_non_negative_and_reconstructs() {
        let x = array![[1.0, 0.0, 2.0], [2.0, 0.0, 4.0], [0.0, 3.0, 0.0]];
        let model = NmfModel::fit(&x, 2, 500);
        let w = model.transform(&x);
        assert!(w.iter().all(|v| *v >= 0.0));
        assert!(model.components().iter().all(|v| *v >= 0.0));

        let reconstructed = w.dot(model.components());
        let error: f64 = (&reconstructed - &x).mapv(|v| v * v).sum();
        assert!(error < 0.5, "reconstruction error {}", error);
    }
}
