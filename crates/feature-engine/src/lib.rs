//! Feature Engineering Pipeline
//!
//! Orchestrates structured column reduction, text embedding and sequential
//! pattern mining over one set of entities, and assembles the results into a
//! single feature table for a downstream recommender.

mod config;
mod error;
mod pipeline;
mod table;

pub use config::{MiningStageConfig, PipelineConfig, ENV_PREFIX};
pub use error::PipelineError;
pub use pipeline::{
    FeaturePipeline, PipelineInput, PipelineOutput, SequenceInput, StructuredInput, SEQUENCE_PREFIX, TEXT_PREFIX,
};
pub use table::{FeatureTable, FeatureTableBuilder};

use tracing::level_filters::LevelFilter;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging; `RUST_LOG` directives take precedence over `default_level`
pub fn init_logging(default_level: Level) -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from_level(default_level).into()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
