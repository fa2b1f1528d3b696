//! Embedding Recipes and Fitted Embedders
//!
//! A recipe is plain data: a base technique followed by an ordered chain of
//! transformations. Fitting walks the chain once over the corpus, learning
//! whatever state each step needs, and yields a [`FittedEmbedder`] that can
//! transform new documents or be persisted.

use crate::error::EmbedError;
use crate::factorize::{NmfModel, SvdModel};
use crate::matrix::EmbeddingMatrix;
use crate::vocabulary::{Vocabulary, Weighting};
use crate::word::{hashed_token_matrix, WordVectors};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Base technique turning raw text into vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "technique", rename_all = "snake_case")]
pub enum BaseEmbedding {
    /// Term frequency times inverse document frequency
    TfIdf {
        #[serde(default = "default_min_df")]
        min_df: usize,
        #[serde(default)]
        max_features: Option<usize>,
        #[serde(default)]
        sublinear_tf: bool,
        #[serde(default = "default_true")]
        norm: bool,
    },
    /// Raw term counts
    BagOfWords {
        #[serde(default = "default_min_df")]
        min_df: usize,
        #[serde(default)]
        max_features: Option<usize>,
        #[serde(default)]
        binary: bool,
    },
    /// Stateless hashed word vectors, one per token
    HashedWord { dim: usize, seed: u64 },
    /// Caller-supplied word vector table, one vector per known token
    Pretrained { vectors: WordVectors },
    /// Word vectors learned from the fitted corpus, one per known token
    Trained {
        dim: usize,
        #[serde(default = "default_window")]
        window: usize,
        #[serde(default = "default_min_df")]
        min_count: usize,
    },
}

fn default_min_df() -> usize {
    1
}

fn default_window() -> usize {
    2
}

fn default_true() -> bool {
    true
}

impl BaseEmbedding {
    /// Default TF-IDF configuration
    pub fn tfidf() -> Self {
        BaseEmbedding::TfIdf {
            min_df: 1,
            max_features: None,
            sublinear_tf: false,
            norm: true,
        }
    }

    fn level(&self) -> Level {
        match self {
            BaseEmbedding::TfIdf { .. } | BaseEmbedding::BagOfWords { .. } => Level::Document,
            BaseEmbedding::HashedWord { .. } | BaseEmbedding::Pretrained { .. } | BaseEmbedding::Trained { .. } => {
                Level::Token
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            BaseEmbedding::TfIdf { .. } => "tfidf",
            BaseEmbedding::BagOfWords { .. } => "bag_of_words",
            BaseEmbedding::HashedWord { .. } => "hashed_word",
            BaseEmbedding::Pretrained { .. } => "pretrained",
            BaseEmbedding::Trained { .. } => "trained",
        }
    }
}

/// Token-to-document pooling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    Min,
    Max,
    Mean,
    First,
}

/// Step applied after the base technique
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transform", rename_all = "snake_case")]
pub enum Transformation {
    /// Truncated singular value decomposition
    Svd { n_components: usize },
    /// Non-negative matrix factorization
    Nmf {
        n_components: usize,
        #[serde(default = "default_nmf_iter")]
        max_iter: usize,
    },
    /// Pool token vectors into one document vector
    Pool { mode: PoolMode },
}

fn default_nmf_iter() -> usize {
    200
}

impl Transformation {
    fn name(&self) -> &'static str {
        match self {
            Transformation::Svd { .. } => "svd",
            Transformation::Nmf { .. } => "nmf",
            Transformation::Pool { .. } => "pool",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Token,
    Document,
}

/// Intermediate vectors flowing through the chain
enum Representation {
    /// One matrix row per document
    Documents(Array2<f64>),
    /// One matrix per document, one row per token
    Tokens { dim: usize, docs: Vec<Array2<f64>> },
}

impl Representation {
    fn width(&self) -> usize {
        match self {
            Representation::Documents(m) => m.ncols(),
            Representation::Tokens { dim, .. } => *dim,
        }
    }

    fn into_documents(self, step: &str) -> Result<Array2<f64>, EmbedError> {
        match self {
            Representation::Documents(m) => Ok(m),
            Representation::Tokens { .. } => Err(EmbedError::config(format!(
                "{} needs document-level vectors; add a pool step first",
                step
            ))),
        }
    }
}

/// Declarative embedding configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecipe {
    pub base: BaseEmbedding,
    #[serde(default)]
    pub transforms: Vec<Transformation>,
}

impl Default for EmbeddingRecipe {
    fn default() -> Self {
        Self::new(BaseEmbedding::tfidf())
    }
}

impl EmbeddingRecipe {
    /// Recipe with no transformations
    pub fn new(base: BaseEmbedding) -> Self {
        Self {
            base,
            transforms: Vec::new(),
        }
    }

    /// Append a transformation to the chain
    pub fn then(mut self, transform: Transformation) -> Self {
        self.transforms.push(transform);
        self
    }

    /// TF-IDF reduced to `n_components` dimensions with SVD
    pub fn tfidf_svd(n_components: usize) -> Self {
        Self::new(BaseEmbedding::tfidf()).then(Transformation::Svd { n_components })
    }

    /// Hashed word vectors mean-pooled per document
    pub fn hashed_mean(dim: usize) -> Self {
        Self::new(BaseEmbedding::HashedWord { dim, seed: 0 }).then(Transformation::Pool { mode: PoolMode::Mean })
    }

    /// Check parameters and vector levels through the whole chain
    pub fn validate(&self) -> Result<(), EmbedError> {
        match &self.base {
            BaseEmbedding::TfIdf { max_features, .. } | BaseEmbedding::BagOfWords { max_features, .. } => {
                if *max_features == Some(0) {
                    return Err(EmbedError::config("max_features must be at least 1"));
                }
            }
            BaseEmbedding::HashedWord { dim, .. } => {
                if *dim == 0 {
                    return Err(EmbedError::config("hashed word dim must be at least 1"));
                }
            }
            BaseEmbedding::Pretrained { vectors } => {
                if vectors.is_empty() {
                    return Err(EmbedError::config("pretrained word vector table is empty"));
                }
            }
            BaseEmbedding::Trained { dim, window, .. } => {
                if *dim == 0 {
                    return Err(EmbedError::config("trained word dim must be at least 1"));
                }
                if *window == 0 {
                    return Err(EmbedError::config("trained word window must be at least 1"));
                }
            }
        }

        let mut level = self.base.level();
        for (i, step) in self.transforms.iter().enumerate() {
            match step {
                Transformation::Svd { n_components } | Transformation::Nmf { n_components, .. } => {
                    if *n_components == 0 {
                        return Err(EmbedError::config(format!(
                            "step {} ({}): n_components must be at least 1",
                            i,
                            step.name()
                        )));
                    }
                    if level != Level::Document {
                        return Err(EmbedError::config(format!(
                            "step {} ({}) needs document-level vectors; add a pool step first",
                            i,
                            step.name()
                        )));
                    }
                    if let Transformation::Nmf { max_iter: 0, .. } = step {
                        return Err(EmbedError::config("nmf max_iter must be at least 1"));
                    }
                }
                Transformation::Pool { .. } => {
                    if level != Level::Token {
                        return Err(EmbedError::config(format!(
                            "step {} (pool) needs token-level vectors",
                            i
                        )));
                    }
                    level = Level::Document;
                }
            }
        }

        if level != Level::Document {
            return Err(EmbedError::config(format!(
                "{} produces token-level vectors; end the recipe with a pool step",
                self.base.name()
            )));
        }
        Ok(())
    }

    /// Learn corpus state for every step
    pub fn fit<S: AsRef<str>>(&self, docs: &[S]) -> Result<FittedEmbedder, EmbedError> {
        self.fit_with_output(docs).map(|(fitted, _)| fitted)
    }

    /// Fit on `docs` and return their embeddings
    pub fn fit_transform<S: AsRef<str>>(&self, docs: &[S]) -> Result<EmbeddingMatrix, EmbedError> {
        self.fit_with_output(docs).map(|(_, matrix)| matrix)
    }

    fn fit_with_output<S: AsRef<str>>(&self, docs: &[S]) -> Result<(FittedEmbedder, EmbeddingMatrix), EmbedError> {
        if docs.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        self.validate()?;

        info!(
            "Fitting embedder: base={}, transforms={}, documents={}",
            self.base.name(),
            self.transforms.len(),
            docs.len()
        );

        let base = FittedBase::fit(&self.base, docs)?;
        let mut representation = base.apply(docs);
        let mut transforms = Vec::with_capacity(self.transforms.len());

        for step in &self.transforms {
            let fitted = FittedTransform::fit(step, &representation)?;
            representation = fitted.apply(representation)?;
            transforms.push(fitted);
        }

        let matrix = EmbeddingMatrix::new(representation.into_documents("output")?);
        debug!("Embedding width {}", matrix.width());

        Ok((FittedEmbedder { base, transforms }, matrix))
    }
}

/// Base technique with its learned state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum FittedBase {
    Frequency(Vocabulary),
    HashedWord { dim: usize, seed: u64 },
    Pretrained(WordVectors),
}

impl FittedBase {
    fn fit<S: AsRef<str>>(base: &BaseEmbedding, docs: &[S]) -> Result<Self, EmbedError> {
        Ok(match base {
            BaseEmbedding::TfIdf {
                min_df,
                max_features,
                sublinear_tf,
                norm,
            } => FittedBase::Frequency(Vocabulary::fit(
                docs,
                *min_df,
                *max_features,
                Weighting::TfIdf {
                    sublinear_tf: *sublinear_tf,
                    norm: *norm,
                },
            )?),
            BaseEmbedding::BagOfWords {
                min_df,
                max_features,
                binary,
            } => FittedBase::Frequency(Vocabulary::fit(
                docs,
                *min_df,
                *max_features,
                Weighting::Counts { binary: *binary },
            )?),
            BaseEmbedding::HashedWord { dim, seed } => FittedBase::HashedWord { dim: *dim, seed: *seed },
            BaseEmbedding::Pretrained { vectors } => FittedBase::Pretrained(vectors.clone()),
            BaseEmbedding::Trained { dim, window, min_count } => {
                FittedBase::Pretrained(WordVectors::train(docs, *dim, *window, *min_count)?)
            }
        })
    }

    fn apply<S: AsRef<str>>(&self, docs: &[S]) -> Representation {
        match self {
            FittedBase::Frequency(vocabulary) => Representation::Documents(vocabulary.transform(docs)),
            FittedBase::HashedWord { dim, seed } => Representation::Tokens {
                dim: *dim,
                docs: docs.iter().map(|d| hashed_token_matrix(d.as_ref(), *dim, *seed)).collect(),
            },
            FittedBase::Pretrained(vectors) => Representation::Tokens {
                dim: vectors.dim(),
                docs: docs.iter().map(|d| vectors.token_matrix(d.as_ref())).collect(),
            },
        }
    }
}

/// Transformation with its learned state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum FittedTransform {
    Svd(SvdModel),
    Nmf(NmfModel),
    Pool(PoolMode),
}

impl FittedTransform {
    fn fit(step: &Transformation, input: &Representation) -> Result<Self, EmbedError> {
        let width = input.width();
        match step {
            Transformation::Svd { n_components } | Transformation::Nmf { n_components, .. } => {
                if *n_components > width {
                    return Err(EmbedError::config(format!(
                        "{} n_components {} exceeds incoming width {}",
                        step.name(),
                        n_components,
                        width
                    )));
                }
            }
            Transformation::Pool { .. } => {}
        }

        Ok(match step {
            Transformation::Svd { n_components } => {
                let Representation::Documents(x) = input else {
                    return Err(EmbedError::config("svd needs document-level vectors"));
                };
                FittedTransform::Svd(SvdModel::fit(x, *n_components))
            }
            Transformation::Nmf { n_components, max_iter } => {
                let Representation::Documents(x) = input else {
                    return Err(EmbedError::config("nmf needs document-level vectors"));
                };
                if x.iter().any(|v| *v < 0.0) {
                    return Err(EmbedError::config("nmf requires non-negative input"));
                }
                FittedTransform::Nmf(NmfModel::fit(x, *n_components, *max_iter))
            }
            Transformation::Pool { mode } => FittedTransform::Pool(*mode),
        })
    }

    fn apply(&self, input: Representation) -> Result<Representation, EmbedError> {
        match self {
            FittedTransform::Svd(model) => {
                let x = input.into_documents("svd")?;
                check_width(x.ncols(), model.components().ncols(), "svd")?;
                Ok(Representation::Documents(model.transform(&x)))
            }
            FittedTransform::Nmf(model) => {
                let x = input.into_documents("nmf")?;
                check_width(x.ncols(), model.components().ncols(), "nmf")?;
                if x.iter().any(|v| *v < 0.0) {
                    return Err(EmbedError::config("nmf requires non-negative input"));
                }
                Ok(Representation::Documents(model.transform(&x)))
            }
            FittedTransform::Pool(mode) => match input {
                Representation::Tokens { dim, docs } => {
                    let mut out = Array2::zeros((docs.len(), dim));
                    for (i, tokens) in docs.iter().enumerate() {
                        out.row_mut(i).assign(&pool(tokens, *mode, dim));
                    }
                    Ok(Representation::Documents(out))
                }
                Representation::Documents(_) => Err(EmbedError::config("pool needs token-level vectors")),
            },
        }
    }
}

fn check_width(actual: usize, expected: usize, step: &str) -> Result<(), EmbedError> {
    if actual != expected {
        return Err(EmbedError::config(format!(
            "{} was fitted on width {}, got {}",
            step, expected, actual
        )));
    }
    Ok(())
}

fn pool(tokens: &Array2<f64>, mode: PoolMode, dim: usize) -> Array1<f64> {
    if tokens.nrows() == 0 {
        return Array1::zeros(dim);
    }
    match mode {
        PoolMode::Min => tokens.fold_axis(Axis(0), f64::INFINITY, |acc, v| acc.min(*v)),
        PoolMode::Max => tokens.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, v| acc.max(*v)),
        PoolMode::Mean => tokens.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(dim)),
        PoolMode::First => tokens.row(0).to_owned(),
    }
}

/// Embedder whose corpus state has been learned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedEmbedder {
    base: FittedBase,
    transforms: Vec<FittedTransform>,
}

impl FittedEmbedder {
    /// Embed documents with the learned state
    pub fn transform<S: AsRef<str>>(&self, docs: &[S]) -> Result<EmbeddingMatrix, EmbedError> {
        if docs.is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let mut representation = self.base.apply(docs);
        for step in &self.transforms {
            representation = step.apply(representation)?;
        }
        Ok(EmbeddingMatrix::new(representation.into_documents("output")?))
    }

    /// Serialize the fitted state
    pub fn to_bytes(&self) -> Result<Vec<u8>, EmbedError> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// Restore a fitted state written by [`FittedEmbedder::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EmbedError> {
        Ok(postcard::from_bytes(bytes)?)
    }
}
