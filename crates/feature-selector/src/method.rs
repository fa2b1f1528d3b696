//! Selection Methods

use crate::dataset::{Dataset, Label};
use crate::error::SelectionError;
use crate::forest::{impurity_importances, ForestParams, Target};
use crate::linear::{fit_coefficients, Regularization};
use crate::statistics::{self, ColumnStats, CorrelationMethod};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Univariate test used by [`SelectionMethod::Statistical`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatisticalMethod {
    /// One-way ANOVA F statistic against class labels
    AnovaF,
    /// Chi-square statistic of non-negative columns against class labels
    ChiSquare,
    /// Univariate regression F statistic against a numeric label
    FRegression,
    /// Mutual information with equal-width binning
    MutualInfo { bins: usize },
}

/// Column selection method, each variant carrying its own parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Keep columns whose variance is above the threshold
    Variance { threshold: f64 },
    /// Greedily drop columns correlated with an already-kept column
    Correlation {
        threshold: f64,
        #[serde(default)]
        correlation: CorrelationMethod,
    },
    /// Keep the top columns by a univariate test statistic
    Statistical {
        num_features: usize,
        test: StatisticalMethod,
    },
    /// Keep the top columns by absolute linear coefficient
    Linear {
        num_features: usize,
        #[serde(default)]
        regularization: Regularization,
    },
    /// Keep the top columns by forest impurity importance
    TreeBased {
        num_features: usize,
        #[serde(default)]
        forest: ForestParams,
    },
}

impl SelectionMethod {
    /// Short name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMethod::Variance { .. } => "variance",
            SelectionMethod::Correlation { .. } => "correlation",
            SelectionMethod::Statistical { .. } => "statistical",
            SelectionMethod::Linear { .. } => "linear",
            SelectionMethod::TreeBased { .. } => "tree_based",
        }
    }

    /// Whether the method needs a label
    pub fn is_supervised(&self) -> bool {
        !matches!(
            self,
            SelectionMethod::Variance { .. } | SelectionMethod::Correlation { .. }
        )
    }

    fn num_features(&self) -> Option<usize> {
        match self {
            SelectionMethod::Statistical { num_features, .. }
            | SelectionMethod::Linear { num_features, .. }
            | SelectionMethod::TreeBased { num_features, .. } => Some(*num_features),
            _ => None,
        }
    }

    /// Check parameters and input shapes before any scoring happens
    fn validate(&self, dataset: &Dataset, label: Option<&Label>) -> Result<(), SelectionError> {
        if dataset.n_columns() == 0 {
            return Err(SelectionError::EmptyInput("dataset has no columns"));
        }
        if dataset.n_rows() == 0 {
            return Err(SelectionError::EmptyInput("dataset has no rows"));
        }

        if let Some(label) = label {
            if label.len() != dataset.n_rows() {
                return Err(SelectionError::DataShape {
                    field: "label".to_string(),
                    expected: dataset.n_rows(),
                    actual: label.len(),
                });
            }
        }

        if let Some(k) = self.num_features() {
            if k == 0 {
                return Err(SelectionError::config("num_features must be at least 1"));
            }
            if k > dataset.n_columns() {
                return Err(SelectionError::config(format!(
                    "num_features {} exceeds the {} available columns",
                    k,
                    dataset.n_columns()
                )));
            }
        }

        match self {
            SelectionMethod::Variance { threshold } => {
                if !threshold.is_finite() || *threshold < 0.0 {
                    return Err(SelectionError::config(format!(
                        "variance threshold must be a non-negative number, got {}",
                        threshold
                    )));
                }
            }
            SelectionMethod::Correlation { threshold, .. } => {
                if !(*threshold > 0.0 && *threshold <= 1.0) {
                    return Err(SelectionError::config(format!(
                        "correlation threshold must be in (0, 1], got {}",
                        threshold
                    )));
                }
            }
            SelectionMethod::Statistical { test, .. } => {
                let label = require_label(self, label)?;
                match test {
                    StatisticalMethod::FRegression => {
                        if !matches!(label, Label::Numeric(_)) {
                            return Err(SelectionError::config(
                                "f_regression requires a numeric label",
                            ));
                        }
                    }
                    StatisticalMethod::ChiSquare => {
                        if let Some(column) = dataset
                            .columns()
                            .iter()
                            .find(|c| c.values.iter().any(|v| *v < 0.0))
                        {
                            return Err(SelectionError::config(format!(
                                "chi_square requires non-negative values, column '{}' has negatives",
                                column.name
                            )));
                        }
                    }
                    StatisticalMethod::MutualInfo { bins } => {
                        if *bins < 2 {
                            return Err(SelectionError::config("mutual_info needs at least 2 bins"));
                        }
                    }
                    StatisticalMethod::AnovaF => {}
                }
            }
            SelectionMethod::Linear { regularization, .. } => {
                let label = require_label(self, label)?;
                if label.as_numeric().is_none() {
                    return Err(SelectionError::config(
                        "linear selection requires a numeric or binary label",
                    ));
                }
                if let Some(alpha) = regularization.alpha() {
                    if !alpha.is_finite() || alpha < 0.0 {
                        return Err(SelectionError::config(format!(
                            "regularization alpha must be non-negative, got {}",
                            alpha
                        )));
                    }
                }
            }
            SelectionMethod::TreeBased { forest, .. } => {
                require_label(self, label)?;
                if forest.n_trees == 0 {
                    return Err(SelectionError::config("forest needs at least one tree"));
                }
                if forest.max_features == Some(0) {
                    return Err(SelectionError::config("max_features must be at least 1"));
                }
            }
        }

        Ok(())
    }

    /// Score every column and keep the selected subset
    pub fn select(&self, dataset: &Dataset, label: Option<&Label>) -> Result<Selection, SelectionError> {
        self.validate(dataset, label)?;

        info!(
            "Selecting columns: method={}, columns={}, rows={}",
            self.as_str(),
            dataset.n_columns(),
            dataset.n_rows()
        );

        let columns: Vec<&[f64]> = dataset.columns().iter().map(|c| c.values.as_slice()).collect();

        let (scores, keep) = match self {
            SelectionMethod::Variance { threshold } => {
                let scores: Vec<f64> = columns.iter().map(|c| ColumnStats::compute(c).variance).collect();
                let keep = scores
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| **s > *threshold)
                    .map(|(i, _)| i)
                    .collect();
                (scores, keep)
            }
            SelectionMethod::Correlation { threshold, correlation } => {
                correlation_filter(&columns, *threshold, *correlation)
            }
            SelectionMethod::Statistical { num_features, test } => {
                // validate() guarantees the label is present
                let label = require_label(self, label)?;
                let scores = statistical_scores(&columns, label, *test);
                let keep = top_k(&scores, *num_features);
                (scores, keep)
            }
            SelectionMethod::Linear {
                num_features,
                regularization,
            } => {
                let target = require_label(self, label)?
                    .as_numeric()
                    .ok_or_else(|| SelectionError::config("label is not numeric"))?;
                let scores: Vec<f64> = fit_coefficients(&columns, &target, *regularization)
                    .into_iter()
                    .map(f64::abs)
                    .collect();
                let keep = top_k(&scores, *num_features);
                (scores, keep)
            }
            SelectionMethod::TreeBased { num_features, forest } => {
                let label = require_label(self, label)?;
                let scores = match label {
                    Label::Numeric(y) => impurity_importances(&columns, Target::Regression(y), forest),
                    Label::Categorical(_) => {
                        let (classes, n_classes) = label.class_indices();
                        impurity_importances(&columns, Target::Classification(&classes, n_classes), forest)
                    }
                };
                let keep = top_k(&scores, *num_features);
                (scores, keep)
            }
        };

        debug!("Kept {} of {} columns", keep.len(), dataset.n_columns());

        let scores = dataset
            .columns()
            .iter()
            .zip(scores)
            .map(|(c, s)| (c.name.clone(), s))
            .collect();

        Ok(Selection {
            dataset: dataset.retain_indices(&keep),
            scores,
        })
    }
}

fn require_label<'l>(method: &SelectionMethod, label: Option<&'l Label>) -> Result<&'l Label, SelectionError> {
    label.ok_or_else(|| {
        SelectionError::config(format!("{} selection requires a label", method.as_str()))
    })
}

fn statistical_scores(columns: &[&[f64]], label: &Label, test: StatisticalMethod) -> Vec<f64> {
    match test {
        StatisticalMethod::AnovaF => {
            let (classes, k) = label.class_indices();
            columns.iter().map(|c| statistics::anova_f(c, &classes, k)).collect()
        }
        StatisticalMethod::ChiSquare => {
            let (classes, k) = label.class_indices();
            columns.iter().map(|c| statistics::chi_square(c, &classes, k)).collect()
        }
        StatisticalMethod::FRegression => {
            let target = label.as_numeric().unwrap_or_default();
            columns.iter().map(|c| statistics::f_regression(c, &target)).collect()
        }
        StatisticalMethod::MutualInfo { bins } => {
            let target = match label {
                Label::Categorical(_) => label.class_indices().0,
                Label::Numeric(y) => statistics::equal_width_bins(y, bins),
            };
            columns
                .iter()
                .map(|c| statistics::mutual_information(&statistics::equal_width_bins(c, bins), &target))
                .collect()
        }
    }
}

/// Greedy redundancy elimination in column order.
///
/// Scores are the maximum absolute correlation of each column with any other
/// column.
fn correlation_filter(columns: &[&[f64]], threshold: f64, method: CorrelationMethod) -> (Vec<f64>, Vec<usize>) {
    let p = columns.len();
    let mut matrix = vec![0.0; p * p];
    for i in 0..p {
        for j in (i + 1)..p {
            let r = method.correlate(columns[i], columns[j]).abs();
            matrix[i * p + j] = r;
            matrix[j * p + i] = r;
        }
    }

    let scores = (0..p)
        .map(|i| (0..p).filter(|&j| j != i).map(|j| matrix[i * p + j]).fold(0.0, f64::max))
        .collect();

    let mut keep: Vec<usize> = Vec::with_capacity(p);
    for i in 0..p {
        if keep.iter().all(|&k| matrix[i * p + k] < threshold) {
            keep.push(i);
        }
    }

    (scores, keep)
}

/// Indices of the `k` highest scores; ties keep input order, NaN sorts last
pub fn top_k(scores: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| compare_desc(scores[a], scores[b]));
    order.truncate(k);
    order.sort_unstable();
    order
}

fn compare_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

/// Reduced dataset plus importance score of every original column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Retained columns in their original order
    pub dataset: Dataset,
    /// Score per original column name
    pub scores: BTreeMap<String, f64>,
}

impl Selection {
    /// Names of the retained columns
    pub fn selected(&self) -> Vec<&str> {
        self.dataset.column_names()
    }

    pub fn score(&self, column: &str) -> Option<f64> {
        self.scores.get(column).copied()
    }
}

/// Score and reduce `dataset` with `method`
pub fn select(dataset: &Dataset, label: Option<&Label>, method: &SelectionMethod) -> Result<Selection, SelectionError> {
    method.select(dataset, label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Dataset, Label) {
        let n = 40;
        let signal: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let copy: Vec<f64> = signal.iter().map(|v| v * 2.0 + 1.0).collect();
        let noise: Vec<f64> = (0..n).map(|i| ((i * 17) % 7) as f64).collect();
        let constant = vec![3.0; n];
        let ds = Dataset::from_pairs(vec![
            ("signal", signal.clone()),
            ("copy", copy),
            ("noise", noise),
            ("constant", constant),
        ])
        .unwrap();
        let label = Label::Numeric(signal.iter().map(|v| v * 0.5 + 2.0).collect());
        (ds, label)
    }

    #[test]
    fn test_variance_drops_constant() {
        let (ds, _) = sample();
        let sel = SelectionMethod::Variance { threshold: 0.0 }.select(&ds, None).unwrap();
        assert_eq!(sel.selected(), vec!["signal", "copy", "noise"]);
        assert_eq!(sel.score("constant"), Some(0.0));
        assert_eq!(sel.scores.len(), 4);
    }

    #[test]
    fn test_correlation_greedy_keeps_first() {
        let (ds, _) = sample();
        let method = SelectionMethod::Correlation {
            threshold: 0.9,
            correlation: CorrelationMethod::Pearson,
        };
        let sel = method.select(&ds, None).unwrap();
        assert_eq!(sel.selected(), vec!["signal", "noise", "constant"]);
        assert!((sel.score("copy").unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_statistical_top_k() {
        let (ds, label) = sample();
        let method = SelectionMethod::Statistical {
            num_features: 2,
            test: StatisticalMethod::FRegression,
        };
        let sel = method.select(&ds, Some(&label)).unwrap();
        assert_eq!(sel.selected(), vec!["signal", "copy"]);
    }

    #[test]
    fn test_perfect_fits_tie_in_input_order() {
        let (ds, label) = sample();
        let method = SelectionMethod::Statistical {
            num_features: 1,
            test: StatisticalMethod::FRegression,
        };
        let sel = method.select(&ds, Some(&label)).unwrap();
        assert_eq!(sel.score("signal"), Some(f64::INFINITY));
        assert_eq!(sel.score("copy"), Some(f64::INFINITY));
        assert_eq!(sel.selected(), vec!["signal"]);
    }

    #[test]
    fn test_linear_top_k() {
        let (ds, label) = sample();
        let method = SelectionMethod::Linear {
            num_features: 1,
            regularization: Regularization::Lasso { alpha: 0.1 },
        };
        let sel = method.select(&ds, Some(&label)).unwrap();
        assert_eq!(sel.dataset.n_columns(), 1);
        assert_eq!(sel.score("constant"), Some(0.0));
    }

    #[test]
    fn test_tree_based_categorical() {
        let (ds, _) = sample();
        let classes: Vec<String> = (0..40).map(|i| if i < 20 { "low" } else { "high" }.to_string()).collect();
        let method = SelectionMethod::TreeBased {
            num_features: 2,
            forest: ForestParams::fast(),
        };
        let sel = method.select(&ds, Some(&Label::Categorical(classes))).unwrap();
        assert_eq!(sel.dataset.n_columns(), 2);
        assert!(!sel.selected().contains(&"constant"));
    }

    #[test]
    fn test_k_exceeds_columns() {
        let (ds, label) = sample();
        let method = SelectionMethod::Statistical {
            num_features: 5,
            test: StatisticalMethod::FRegression,
        };
        assert!(matches!(
            method.select(&ds, Some(&label)),
            Err(SelectionError::Configuration(_))
        ));
    }

    #[test]
    fn test_label_length_mismatch() {
        let (ds, _) = sample();
        let method = SelectionMethod::Statistical {
            num_features: 1,
            test: StatisticalMethod::AnovaF,
        };
        let short = Label::Numeric(vec![1.0; 3]);
        assert!(matches!(
            method.select(&ds, Some(&short)),
            Err(SelectionError::DataShape { expected: 40, actual: 3, .. })
        ));
    }

    #[test]
    fn test_incompatible_label() {
        let (ds, _) = sample();
        let label = Label::Categorical((0..40).map(|i| (i % 3).to_string()).collect());
        let method = SelectionMethod::Statistical {
            num_features: 1,
            test: StatisticalMethod::FRegression,
        };
        assert!(matches!(
            method.select(&ds, Some(&label)),
            Err(SelectionError::Configuration(_))
        ));

        let linear = SelectionMethod::Linear {
            num_features: 1,
            regularization: Regularization::None,
        };
        assert!(matches!(
            linear.select(&ds, Some(&label)),
            Err(SelectionError::Configuration(_))
        ));
    }

    #[test]
    fn test_supervised_without_label() {
        let (ds, _) = sample();
        let method = SelectionMethod::TreeBased {
            num_features: 1,
            forest: ForestParams::default(),
        };
        assert!(matches!(method.select(&ds, None), Err(SelectionError::Configuration(_))));
    }

    #[test]
    fn test_chi_square_rejects_negative() {
        let ds = Dataset::from_pairs(vec![("a", vec![-1.0, 2.0])]).unwrap();
        let label = Label::Categorical(vec!["x".into(), "y".into()]);
        let method = SelectionMethod::Statistical {
            num_features: 1,
            test: StatisticalMethod::ChiSquare,
        };
        assert!(matches!(
            method.select(&ds, Some(&label)),
            Err(SelectionError::Configuration(_))
        ));
    }

    #[test]
    fn test_top_k_ties_keep_input_order() {
        assert_eq!(top_k(&[1.0, 3.0, 3.0, 3.0], 2), vec![1, 2]);
        assert_eq!(top_k(&[f64::NAN, 0.5, 0.1], 2), vec![1, 2]);
    }

    #[test]
    fn test_method_from_json() {
        let method: SelectionMethod =
            serde_json::from_str(r#"{"method":"correlation","threshold":0.5,"correlation":"kendall"}"#).unwrap();
        assert_eq!(
            method,
            SelectionMethod::Correlation {
                threshold: 0.5,
                correlation: CorrelationMethod::Kendall
            }
        );
    }
}
