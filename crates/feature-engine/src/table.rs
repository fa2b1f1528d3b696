//! Feature Table Assembly
//!
//! The table is assembled once from column blocks that each carry one row per
//! entity. After `build` it only hands out read access.

use crate::error::PipelineError;
use ndarray::{s, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use tracing::debug;

/// Immutable per-entity feature matrix with named columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    entity_ids: Vec<String>,
    columns: Vec<String>,
    /// Row-major values, `entities x columns`
    values: Array2<f64>,
}

impl FeatureTable {
    pub fn entity_ids(&self) -> &[String] {
        &self.entity_ids
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.entity_ids.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Feature values of one entity
    pub fn row(&self, entity: &str) -> Option<ArrayView1<'_, f64>> {
        let i = self.entity_ids.iter().position(|e| e == entity)?;
        Some(self.values.row(i))
    }

    /// Values of one feature across all entities
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        let j = self.columns.iter().position(|c| c == name)?;
        Some(self.values.column(j))
    }

    pub fn value(&self, entity: &str, column: &str) -> Option<f64> {
        let j = self.columns.iter().position(|c| c == column)?;
        self.row(entity).map(|row| row[j])
    }

    /// Write as CSV with an `entity_id` leading column
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PipelineError> {
        let mut csv = csv::Writer::from_writer(writer);

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push("entity_id");
        header.extend(self.columns.iter().map(String::as_str));
        csv.write_record(&header)?;

        for (entity, row) in self.entity_ids.iter().zip(self.values.axis_iter(Axis(0))) {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(entity.clone());
            record.extend(row.iter().map(|v| v.to_string()));
            csv.write_record(&record)?;
        }

        csv.flush()?;
        Ok(())
    }
}

/// Collects column blocks for a fixed list of entities
#[derive(Debug, Clone)]
pub struct FeatureTableBuilder {
    entity_ids: Vec<String>,
    columns: Vec<String>,
    seen: HashSet<String>,
    blocks: Vec<Array2<f64>>,
}

impl FeatureTableBuilder {
    pub fn new(entity_ids: Vec<String>) -> Self {
        Self {
            entity_ids,
            columns: Vec::new(),
            seen: HashSet::new(),
            blocks: Vec::new(),
        }
    }

    pub fn n_entities(&self) -> usize {
        self.entity_ids.len()
    }

    /// Add named columns from row-major values; names are prefixed as
    /// `{prefix}_{name}` unless the prefix is empty
    pub fn add_block<N: AsRef<str>>(&mut self, prefix: &str, names: &[N], rows: &[Vec<f64>]) -> Result<&mut Self, PipelineError> {
        self.check_rows(prefix, rows.len())?;
        let mut block = Array2::zeros((rows.len(), names.len()));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != names.len() {
                return Err(PipelineError::DataShape {
                    stage: format!("{} row {}", block_label(prefix), i),
                    expected: names.len(),
                    actual: row.len(),
                });
            }
            for (j, v) in row.iter().enumerate() {
                block[[i, j]] = *v;
            }
        }
        let names: Vec<String> = names.iter().map(|n| column_name(prefix, n.as_ref())).collect();
        self.push(names, block)
    }

    /// Add a dense matrix as columns `{prefix}_0 .. {prefix}_{width-1}`
    pub fn add_dense(&mut self, prefix: &str, matrix: &Array2<f64>) -> Result<&mut Self, PipelineError> {
        self.check_rows(prefix, matrix.nrows())?;
        let names = (0..matrix.ncols()).map(|j| column_name(prefix, &j.to_string())).collect();
        self.push(names, matrix.clone())
    }

    /// Add boolean indicator columns encoded as 0.0 / 1.0
    pub fn add_flags<N: AsRef<str>>(&mut self, prefix: &str, names: &[N], flags: &[Vec<bool>]) -> Result<&mut Self, PipelineError> {
        let rows: Vec<Vec<f64>> = flags
            .iter()
            .map(|row| row.iter().map(|&f| if f { 1.0 } else { 0.0 }).collect())
            .collect();
        self.add_block(prefix, names, &rows)
    }

    /// Concatenate the blocks in insertion order
    pub fn build(self) -> Result<FeatureTable, PipelineError> {
        if self.entity_ids.is_empty() {
            return Err(PipelineError::EmptyInput("no entities"));
        }
        let mut ids = HashSet::with_capacity(self.entity_ids.len());
        for id in &self.entity_ids {
            if !ids.insert(id.as_str()) {
                return Err(PipelineError::DuplicateEntity(id.clone()));
            }
        }

        let mut values = Array2::<f64>::zeros((self.entity_ids.len(), self.columns.len()));
        let mut offset = 0;
        for block in &self.blocks {
            let width = block.ncols();
            values.slice_mut(s![.., offset..offset + width]).assign(block);
            offset += width;
        }

        debug!(
            "Built feature table: entities={}, columns={}",
            self.entity_ids.len(),
            self.columns.len()
        );
        Ok(FeatureTable {
            entity_ids: self.entity_ids,
            columns: self.columns,
            values,
        })
    }

    fn check_rows(&self, prefix: &str, rows: usize) -> Result<(), PipelineError> {
        if rows != self.entity_ids.len() {
            return Err(PipelineError::DataShape {
                stage: block_label(prefix),
                expected: self.entity_ids.len(),
                actual: rows,
            });
        }
        Ok(())
    }

    fn push(&mut self, names: Vec<String>, block: Array2<f64>) -> Result<&mut Self, PipelineError> {
        for name in &names {
            if self.seen.contains(name) || names.iter().filter(|n| *n == name).count() > 1 {
                return Err(PipelineError::DuplicateColumn(name.clone()));
            }
        }
        self.seen.extend(names.iter().cloned());
        self.columns.extend(names);
        self.blocks.push(block);
        Ok(self)
    }
}

fn column_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", prefix, name)
    }
}

fn block_label(prefix: &str) -> String {
    if prefix.is_empty() {
        "structured block".to_string()
    } else {
        format!("'{}' block", prefix)
    }
}
