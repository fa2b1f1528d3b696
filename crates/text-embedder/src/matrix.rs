//! Embedding Matrix

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// One fixed-width vector per document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMatrix {
    values: Array2<f64>,
}

impl EmbeddingMatrix {
    pub(crate) fn new(values: Array2<f64>) -> Self {
        Self { values }
    }

    /// Number of documents
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Vector width
    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_array(self) -> Array2<f64> {
        self.values
    }

    /// Row-major copy of the values
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values.rows().into_iter().map(|r| r.to_vec()).collect()
    }
}
