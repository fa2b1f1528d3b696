//! Tabular Dataset and Label

use crate::error::SelectionError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A named numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl Column {
    /// Create a new column
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Ordered collection of equal-length named columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    /// Build a dataset, checking that names are unique and lengths agree
    pub fn new(columns: Vec<Column>) -> Result<Self, SelectionError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(SelectionError::DuplicateColumn(column.name.clone()));
            }
        }

        if let Some(first) = columns.first() {
            let expected = first.values.len();
            for column in &columns[1..] {
                if column.values.len() != expected {
                    return Err(SelectionError::DataShape {
                        field: format!("column '{}'", column.name),
                        expected,
                        actual: column.values.len(),
                    });
                }
            }
        }

        Ok(Self { columns })
    }

    /// Build a dataset from `(name, values)` pairs
    pub fn from_pairs<N, I>(pairs: I) -> Result<Self, SelectionError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Vec<f64>)>,
    {
        Self::new(pairs.into_iter().map(|(n, v)| Column::new(n, v)).collect())
    }

    /// Build a dataset from row-major values and column names
    pub fn from_rows(names: &[&str], rows: &[Vec<f64>]) -> Result<Self, SelectionError> {
        let mut columns: Vec<Column> = names
            .iter()
            .map(|n| Column::new(*n, Vec::with_capacity(rows.len())))
            .collect();

        for (i, row) in rows.iter().enumerate() {
            if row.len() != names.len() {
                return Err(SelectionError::DataShape {
                    field: format!("row {}", i),
                    expected: names.len(),
                    actual: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(*value);
            }
        }

        Self::new(columns)
    }

    /// Number of rows (observations)
    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    /// Number of columns
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Values of row `index` in column order
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.n_rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| c.values[index]).collect())
    }

    /// Keep only the columns at the given indices, preserving input order
    pub(crate) fn retain_indices(&self, keep: &[usize]) -> Dataset {
        let mut keep = keep.to_vec();
        keep.sort_unstable();
        Dataset {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
        }
    }
}

/// Target column used by supervised methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum Label {
    /// Continuous target
    Numeric(Vec<f64>),
    /// Class labels
    Categorical(Vec<String>),
}

impl Label {
    pub fn len(&self) -> usize {
        match self {
            Label::Numeric(v) => v.len(),
            Label::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Class index per row, with classes numbered in sorted order.
    ///
    /// Numeric labels are treated as classes keyed by their exact value.
    pub fn class_indices(&self) -> (Vec<usize>, usize) {
        let keys: Vec<String> = match self {
            Label::Categorical(v) => v.clone(),
            Label::Numeric(v) => v.iter().map(|x| format!("{:?}", x)).collect(),
        };

        let mut classes: BTreeMap<&str, usize> = BTreeMap::new();
        for key in &keys {
            classes.entry(key.as_str()).or_insert(0);
        }
        for (i, value) in classes.values_mut().enumerate() {
            *value = i;
        }

        let indices = keys.iter().map(|k| classes[k.as_str()]).collect();
        (indices, classes.len())
    }

    /// Numeric view of the label.
    ///
    /// Categorical labels are only convertible when they hold exactly two
    /// classes, which encode as 0.0 and 1.0 in sorted order.
    pub fn as_numeric(&self) -> Option<Vec<f64>> {
        match self {
            Label::Numeric(v) => Some(v.clone()),
            Label::Categorical(_) => {
                let (indices, n_classes) = self.class_indices();
                if n_classes == 2 {
                    Some(indices.into_iter().map(|i| i as f64).collect())
                } else {
                    None
                }
            }
        }
    }
}
