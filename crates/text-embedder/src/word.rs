//! Token-level Word Vectors

use crate::error::EmbedError;
use crate::factorize::SvdModel;
use crate::tokenize::tokenize;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::io::BufRead;
use tracing::debug;

/// Pretrained word vector table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordVectors {
    dim: usize,
    vectors: BTreeMap<String, Vec<f64>>,
}

impl WordVectors {
    /// Build a table from `(word, vector)` pairs; all vectors must share a width
    pub fn from_pairs<W, I>(pairs: I) -> Result<Self, EmbedError>
    where
        W: Into<String>,
        I: IntoIterator<Item = (W, Vec<f64>)>,
    {
        Self::build(
            pairs
                .into_iter()
                .enumerate()
                .map(|(i, (word, vector))| (i + 1, word.into(), vector)),
        )
    }

    /// Read a whitespace-separated table (`word v1 v2 ... vd` per line), as
    /// distributed with GloVe
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, EmbedError> {
        let mut entries = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let vector = fields
                .map(|f| f.parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|e| EmbedError::WordVectorFormat {
                    line: i + 1,
                    reason: e.to_string(),
                })?;
            entries.push((i + 1, word.to_string(), vector));
        }
        Self::build(entries)
    }

    /// Learn a table from the corpus: distance-weighted co-occurrence counts
    /// within `window` tokens, positive PMI, then a `dim`-wide truncated SVD
    /// of the word-by-word matrix. Words seen fewer than `min_count` times
    /// are left out.
    pub fn train<S: AsRef<str>>(docs: &[S], dim: usize, window: usize, min_count: usize) -> Result<Self, EmbedError> {
        let tokenized: Vec<Vec<String>> = docs.iter().map(|d| tokenize(d.as_ref())).collect();

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for token in tokenized.iter().flatten() {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }
        let words: Vec<&str> = counts
            .iter()
            .filter(|(_, &count)| count >= min_count)
            .map(|(word, _)| *word)
            .collect();
        if words.is_empty() {
            return Err(EmbedError::EmptyVocabulary { min_df: min_count });
        }
        if dim > words.len() {
            return Err(EmbedError::config(format!(
                "trained dim {} exceeds vocabulary size {}",
                dim,
                words.len()
            )));
        }
        let index: HashMap<&str, usize> = words.iter().enumerate().map(|(i, w)| (*w, i)).collect();

        let n = words.len();
        let mut cooccurrence = Array2::<f64>::zeros((n, n));
        for tokens in &tokenized {
            for (i, left) in tokens.iter().enumerate() {
                let Some(&a) = index.get(left.as_str()) else {
                    continue;
                };
                for (offset, right) in tokens.iter().skip(i + 1).take(window).enumerate() {
                    if let Some(&b) = index.get(right.as_str()) {
                        let weight = 1.0 / (offset + 1) as f64;
                        cooccurrence[[a, b]] += weight;
                        cooccurrence[[b, a]] += weight;
                    }
                }
            }
        }

        let ppmi = positive_pmi(&cooccurrence);
        let embedded = SvdModel::fit(&ppmi, dim).transform(&ppmi);
        debug!("Trained word vectors: words={}, dim={}, window={}", n, dim, window);

        Self::from_pairs(
            words
                .iter()
                .zip(embedded.rows())
                .map(|(word, row)| (word.to_string(), row.to_vec())),
        )
    }

    fn build(entries: impl IntoIterator<Item = (usize, String, Vec<f64>)>) -> Result<Self, EmbedError> {
        let mut dim = None;
        let mut vectors = BTreeMap::new();

        for (line, word, vector) in entries {
            let expected = *dim.get_or_insert(vector.len());
            if vector.len() != expected || expected == 0 {
                return Err(EmbedError::WordVectorFormat {
                    line,
                    reason: format!("expected {} values, got {}", expected, vector.len()),
                });
            }
            vectors.insert(word.to_lowercase(), vector);
        }

        let dim = dim.ok_or_else(|| EmbedError::config("word vector table is empty"))?;
        Ok(Self { dim, vectors })
    }

    /// Vector width
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, word: &str) -> Option<&[f64]> {
        self.vectors.get(word).map(Vec::as_slice)
    }

    /// One row per in-vocabulary token of the document
    pub fn token_matrix(&self, doc: &str) -> Array2<f64> {
        let rows: Vec<&[f64]> = tokenize(doc).iter().filter_map(|t| self.get(t)).collect();
        let mut matrix = Array2::zeros((rows.len(), self.dim));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                matrix[[i, j]] = *v;
            }
        }
        matrix
    }
}

/// max(0, ln(p(a, b) / (p(a) p(b)))) over a symmetric count matrix
fn positive_pmi(counts: &Array2<f64>) -> Array2<f64> {
    let total = counts.sum();
    let marginals = counts.sum_axis(Axis(1));
    let mut out = Array2::<f64>::zeros(counts.raw_dim());
    if total <= 0.0 {
        return out;
    }
    for ((i, j), &count) in counts.indexed_iter() {
        if count > 0.0 {
            let pmi = (count * total / (marginals[i] * marginals[j])).ln();
            out[[i, j]] = pmi.max(0.0);
        }
    }
    out
}

/// Deterministic pseudo-random vector for a token, in [-1, 1)
pub fn hashed_word_vector(token: &str, dim: usize, seed: u64) -> Vec<f64> {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    token.hash(&mut hasher);
    let mut rng = StdRng::seed_from_u64(hasher.finish());
    (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// One hashed vector row per token of the document
pub fn hashed_token_matrix(doc: &str, dim: usize, seed: u64) -> Array2<f64> {
    let tokens = tokenize(doc);
    let mut matrix = Array2::zeros((tokens.len(), dim));
    for (i, token) in tokens.iter().enumerate() {
        for (j, v) in hashed_word_vector(token, dim, seed).into_iter().enumerate() {
            matrix[[i, j]] = v;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_glove_format() {
        let data = "king 0.1 0.2 0.3\nqueen 0.4 0.5 0.6\n\n";
        let table = WordVectors::from_reader(data.as_bytes()).unwrap();
        assert_eq!(table.dim(), 3);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("queen"), Some(&[0.4, 0.5, 0.6][..]));
    }

    #[test]
    fn test_ragged_table_rejected() {
        let data = "a 1 2\nb 1\n";
        assert!(matches!(
            WordVectors::from_reader(data.as_bytes()),
            Err(EmbedError::WordVectorFormat { line: 2, .. })
        ));
    }

    #[test]
    fn test_bad_number_rejected() {
        assert!(matches!(
            WordVectors::from_reader("a 1 x\n".as_bytes()),
            Err(EmbedError::WordVectorFormat { line: 1, .. })
        ));
    }

    #[test]
    fn test_token_matrix_skips_unknown() {
        let table = WordVectors::from_pairs(vec![("cat", vec![1.0, 0.0]), ("dog", vec![0.0, 1.0])]).unwrap();
        let m = table.token_matrix("Cat and DOG");
        assert_eq!(m.dim(), (2, 2));
        assert_eq!(m.row(1).to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_hashed_vectors_deterministic() {
        let a = hashed_word_vector("token", 8, 7);
        assert_eq!(a, hashed_word_vector("token", 8, 7));
        assert_ne!(a, hashed_word_vector("token", 8, 8));
        assert!(a.iter().all(|v| (-1.0..1.0).contains(v)));
    }

    #[test]
    fn test_train_groups_shared_contexts() {
        let docs = [
            "red shoes for running",
            "blue shoes for running",
            "red shirt for office",
            "blue shirt for office",
        ];
        let table = WordVectors::train(&docs, 3, 2, 1).unwrap();
        assert_eq!(table.dim(), 3);
        assert_eq!(table.len(), 7);

        let cosine = |a: &str, b: &str| {
            let (x, y) = (table.get(a).unwrap(), table.get(b).unwrap());
            let dot: f64 = x.iter().zip(y).map(|(p, q)| p * q).sum();
            let norm = |v: &[f64]| v.iter().map(|e| e * e).sum::<f64>().sqrt();
            dot / (norm(x) * norm(y))
        };
        // red and blue occur in identical contexts
        assert!((cosine("red", "blue") - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_train_min_count_and_dim() {
        let docs = ["a b a", "a c"];
        let table = WordVectors::train(&docs, 1, 1, 2).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get("b").is_none());

        assert!(matches!(
            WordVectors::train(&docs, 1, 1, 5),
            Err(EmbedError::EmptyVocabulary { min_df: 5 })
        ));
        assert!(matches!(
            WordVectors::train(&docs, 4, 1, 1),
            Err(EmbedError::Configuration(_))
        ));
    }
}
