//! Structured Feature Selection
//!
//! Scores the columns of a tabular dataset and keeps a reduced subset, using
//! unsupervised filters (variance, correlation) or supervised scores
//! (univariate tests, linear coefficients, forest importances).

mod dataset;
mod error;
mod forest;
mod linear;
mod method;
pub mod statistics;

pub use dataset::{Column, Dataset, Label};
pub use error::SelectionError;
pub use forest::ForestParams;
pub use linear::Regularization;
pub use method::{select, top_k, Selection, SelectionMethod, StatisticalMethod};
pub use statistics::CorrelationMethod;
