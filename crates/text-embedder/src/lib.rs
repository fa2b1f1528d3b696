//! Text Embedding
//!
//! Turns document collections into fixed-width numeric matrices. Recipes are
//! declarative (serde) values: a base technique (TF-IDF, bag of words, hashed,
//! pretrained or corpus-trained word vectors) followed by an ordered chain of
//! transformations (SVD, NMF, pooling). Fitting is separate from transformation so a fitted embedder can
//! be stored and reused on new documents.

mod error;
mod factorize;
mod matrix;
mod recipe;
mod tokenize;
mod vocabulary;
mod word;

pub use error::EmbedError;
pub use factorize::{NmfModel, SvdModel};
pub use matrix::EmbeddingMatrix;
pub use recipe::{BaseEmbedding, EmbeddingRecipe, FittedEmbedder, PoolMode, Transformation};
pub use tokenize::tokenize;
pub use vocabulary::{Vocabulary, Weighting};
pub use word::{hashed_word_vector, WordVectors};
