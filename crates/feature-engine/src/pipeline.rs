//! Feature Pipeline
//!
//! Runs the structured, text and sequence stages over one set of entities and
//! assembles their outputs into a [`FeatureTable`]. Every stage is optional;
//! the first stage error aborts the run.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::table::{FeatureTable, FeatureTableBuilder};
use feature_selector::{Column, Dataset, Label, Selection};
use sequence_miner::{CancellationToken, Miner, Pattern, SequenceDatabase};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{debug, info};

/// Column prefix of embedding dimensions
pub const TEXT_PREFIX: &str = "text";
/// Column prefix of pattern indicators
pub const SEQUENCE_PREFIX: &str = "seq";

/// Structured columns plus an optional supervision target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredInput {
    pub columns: Vec<Column>,
    #[serde(default)]
    pub label: Option<Label>,
}

/// Event sequences with optional per-event numeric attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceInput {
    pub events: Vec<Vec<String>>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<Vec<f64>>>,
}

/// Raw inputs of one run, each stage aligned with `entity_ids`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineInput {
    pub entity_ids: Vec<String>,
    #[serde(default)]
    pub structured: Option<StructuredInput>,
    #[serde(default)]
    pub documents: Option<Vec<String>>,
    #[serde(default)]
    pub sequences: Option<SequenceInput>,
}

/// Result of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub table: FeatureTable,
    /// Column scores when a selection method ran
    pub selection: Option<Selection>,
    /// Mined patterns in table column order
    pub patterns: Vec<Pattern>,
}

/// Three-stage feature pipeline
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    config: PipelineConfig,
}

impl FeaturePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage that has input
    pub fn run(&self, input: &PipelineInput) -> Result<PipelineOutput, PipelineError> {
        self.run_with(input, &CancellationToken::new())
    }

    /// Run with a cancellation token passed down to the miner
    pub fn run_with(&self, input: &PipelineInput, token: &CancellationToken) -> Result<PipelineOutput, PipelineError> {
        self.check_input(input)?;
        metrics::counter!("feature_pipeline_runs_total").increment(1);
        info!(
            "Running feature pipeline: entities={}, structured={}, documents={}, sequences={}",
            input.entity_ids.len(),
            input.structured.is_some(),
            input.documents.is_some(),
            input.sequences.is_some()
        );

        let mut builder = FeatureTableBuilder::new(input.entity_ids.clone());

        let selection = match &input.structured {
            Some(structured) => {
                let started = Instant::now();
                let selection = self.run_structured(structured, &mut builder)?;
                record_stage("selection", started);
                selection
            }
            None => None,
        };

        if let Some(documents) = &input.documents {
            let started = Instant::now();
            let matrix = self.config.embedding.fit_transform(documents)?;
            builder.add_dense(TEXT_PREFIX, matrix.as_array())?;
            record_stage("embedding", started);
        }

        let patterns = match &input.sequences {
            Some(sequences) => {
                let started = Instant::now();
                let patterns = self.run_sequences(sequences, token, &mut builder)?;
                record_stage("mining", started);
                patterns
            }
            None => Vec::new(),
        };

        let table = builder.build()?;
        info!(
            "Feature table ready: entities={}, columns={}",
            table.n_rows(),
            table.n_columns()
        );
        Ok(PipelineOutput {
            table,
            selection,
            patterns,
        })
    }

    /// Shape checks for every stage before any stage runs
    fn check_input(&self, input: &PipelineInput) -> Result<(), PipelineError> {
        let n = input.entity_ids.len();
        if n == 0 {
            return Err(PipelineError::EmptyInput("no entities"));
        }
        if input.structured.is_none() && input.documents.is_none() && input.sequences.is_none() {
            return Err(PipelineError::EmptyInput("no stage has input"));
        }
        let mut ids = HashSet::with_capacity(n);
        for id in &input.entity_ids {
            if !ids.insert(id.as_str()) {
                return Err(PipelineError::DuplicateEntity(id.clone()));
            }
        }

        let check = |stage: &str, actual: usize| {
            if actual == n {
                Ok(())
            } else {
                Err(PipelineError::DataShape {
                    stage: stage.to_string(),
                    expected: n,
                    actual,
                })
            }
        };

        if let Some(structured) = &input.structured {
            for column in &structured.columns {
                check(&format!("column '{}'", column.name), column.values.len())?;
            }
            if let Some(label) = &structured.label {
                check("label", label.len())?;
            }
        }
        if let Some(documents) = &input.documents {
            check("documents", documents.len())?;
        }
        if let Some(sequences) = &input.sequences {
            check("sequences", sequences.events.len())?;
            for (name, values) in &sequences.attributes {
                check(&format!("attribute '{}'", name), values.len())?;
            }
        }
        Ok(())
    }

    fn run_structured(
        &self,
        input: &StructuredInput,
        builder: &mut FeatureTableBuilder,
    ) -> Result<Option<Selection>, PipelineError> {
        let dataset = Dataset::new(input.columns.clone())?;

        let (kept, selection) = match &self.config.selection {
            Some(method) => {
                let selection = method.select(&dataset, input.label.as_ref())?;
                (selection.dataset.clone(), Some(selection))
            }
            None => {
                debug!("No selection method configured, keeping {} columns", dataset.n_columns());
                (dataset, None)
            }
        };

        // One row per entity even when selection drops every column
        let rows: Vec<Vec<f64>> = (0..builder.n_entities())
            .map(|i| kept.columns().iter().map(|c| c.values[i]).collect())
            .collect();
        builder.add_block("", &kept.column_names(), &rows)?;
        Ok(selection)
    }

    fn run_sequences(
        &self,
        input: &SequenceInput,
        token: &CancellationToken,
        builder: &mut FeatureTableBuilder,
    ) -> Result<Vec<Pattern>, PipelineError> {
        let mut db = SequenceDatabase::new(&input.events);
        for (name, values) in &input.attributes {
            db.add_attribute(name.clone(), values.clone())?;
        }

        let mining = &self.config.mining;
        let miner = Miner::new(&db, mining.constraints.clone(), mining.search.clone())?;
        let patterns = miner.mine_with(token)?;
        let flags = miner.one_hot(&patterns);

        let names: Vec<String> = patterns.iter().map(|p| p.items.join("_")).collect();
        builder.add_flags(SEQUENCE_PREFIX, &names, &flags)?;
        Ok(patterns)
    }
}

fn record_stage(stage: &'static str, started: Instant) {
    let elapsed = started.elapsed();
    metrics::histogram!("feature_pipeline_stage_seconds", "stage" => stage).record(elapsed.as_secs_f64());
    debug!("Stage {} finished in {:?}", stage, elapsed);
}
