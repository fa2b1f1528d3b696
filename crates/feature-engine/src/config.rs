//! Pipeline Configuration

use crate::error::PipelineError;
use feature_selector::{SelectionMethod, StatisticalMethod};
use sequence_miner::{Constraint, MinFrequency, MiningConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use text_embedder::EmbeddingRecipe;
use tracing::info;

/// Environment variable prefix for overrides, e.g. `FEATURES__MINING__SEARCH__MAX_SPAN=5`
pub const ENV_PREFIX: &str = "FEATURES";

/// Settings for all three stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Structured column reduction; `None` keeps every column
    pub selection: Option<SelectionMethod>,

    /// Document embedding chain
    pub embedding: EmbeddingRecipe,

    /// Pattern mining
    pub mining: MiningStageConfig,
}

/// Constraints and search limits for the miner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningStageConfig {
    pub constraints: Vec<Constraint>,
    pub search: MiningConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            selection: None,
            embedding: EmbeddingRecipe::default(),
            mining: MiningStageConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Small tables: F-test reduction, 16 text dimensions, short patterns
    pub fn compact() -> Self {
        Self {
            selection: Some(SelectionMethod::Statistical {
                num_features: 8,
                test: StatisticalMethod::FRegression,
            }),
            embedding: EmbeddingRecipe::tfidf_svd(16),
            mining: MiningStageConfig {
                constraints: Vec::new(),
                search: MiningConfig::short_range().with_min_frequency(MinFrequency::Fraction(0.05)),
            },
        }
    }

    /// Keep every structured column and mine without a span limit
    pub fn exhaustive() -> Self {
        Self {
            mining: MiningStageConfig {
                constraints: Vec::new(),
                search: MiningConfig::exhaustive(),
            },
            ..Default::default()
        }
    }

    /// Load a TOML file, then apply `FEATURES__`-prefixed environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let config: PipelineConfig = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        info!("Loaded pipeline configuration from {}", path.display());
        Ok(config)
    }

    /// Checks that need no data; data-dependent checks run with the stages
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.embedding.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequence_miner::Aggregate;
    use std::io::Write;
    use text_embedder::{BaseEmbedding, Transformation};

    #[test]
    fn test_presets_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
        assert!(PipelineConfig::compact().validate().is_ok());
        assert!(PipelineConfig::exhaustive().validate().is_ok());
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[selection]
method = "variance"
threshold = 0.5

[embedding]
base = {{ technique = "hashed_word", dim = 8, seed = 3 }}
transforms = [{{ transform = "pool", mode = "mean" }}]

[mining.search]
min_frequency = 2
max_span = 4

[[mining.constraints]]
attribute = "price"
aggregate = "average"
lower = 3.0
upper = 4.0
"#
        )
        .unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.selection, Some(SelectionMethod::Variance { threshold: 0.5 }));
        assert_eq!(config.embedding.base, BaseEmbedding::HashedWord { dim: 8, seed: 3 });
        assert_eq!(config.embedding.transforms.len(), 1);
        assert_eq!(config.mining.search.max_span, Some(4));
        assert_eq!(config.mining.search.min_length, 2);
        assert_eq!(config.mining.constraints[0].aggregate, Aggregate::Average);
    }

    #[test]
    fn test_load_rejects_invalid_recipe() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[embedding]
base = {{ technique = "hashed_word", dim = 8, seed = 0 }}
transforms = [{{ transform = "svd", n_components = 2 }}]
"#
        )
        .unwrap();
        assert!(PipelineConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_json_recipe_shape() {
        let config = PipelineConfig {
            embedding: EmbeddingRecipe::tfidf_svd(4),
            ..Default::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["embedding"]["transforms"][0]["transform"], "svd");
        let back: PipelineConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.embedding.transforms, vec![Transformation::Svd { n_components: 4 }]);
    }
}
