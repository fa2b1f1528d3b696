//! Frequency-based Document Vectors (TF-IDF and bag of words)

use crate::error::EmbedError;
use crate::tokenize::tokenize;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// How term counts become vector entries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Weighting {
    /// Raw (or log-scaled) term frequency times inverse document frequency
    TfIdf { sublinear_tf: bool, norm: bool },
    /// Raw counts, or presence flags when `binary`
    Counts { binary: bool },
}

/// Vocabulary learned from a corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Term to column index, in lexicographic term order
    terms: BTreeMap<String, usize>,
    /// Smoothed inverse document frequency per column
    idf: Vec<f64>,
    weighting: Weighting,
}

impl Vocabulary {
    /// Learn terms and document frequencies.
    ///
    /// Terms must appear in at least `min_df` documents. With `max_features`
    /// only the most frequent terms over the corpus are kept, ties broken by
    /// term order.
    pub fn fit<S: AsRef<str>>(
        docs: &[S],
        min_df: usize,
        max_features: Option<usize>,
        weighting: Weighting,
    ) -> Result<Self, EmbedError> {
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        let mut term_freq: BTreeMap<String, usize> = BTreeMap::new();

        for doc in docs {
            let tokens = tokenize(doc.as_ref());
            let mut seen = HashSet::new();
            for token in tokens {
                *term_freq.entry(token.clone()).or_insert(0) += 1;
                if seen.insert(token.clone()) {
                    *doc_freq.entry(token).or_insert(0) += 1;
                }
            }
        }

        let mut kept: Vec<(String, usize)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= min_df)
            .collect();

        if let Some(max) = max_features {
            if kept.len() > max {
                // Stable sort keeps lexicographic order among equal counts
                kept.sort_by(|a, b| term_freq[&b.0].cmp(&term_freq[&a.0]));
                kept.truncate(max);
                kept.sort_by(|a, b| a.0.cmp(&b.0));
            }
        }

        if kept.is_empty() {
            return Err(EmbedError::EmptyVocabulary { min_df });
        }

        let n_docs = docs.len() as f64;
        let idf = kept
            .iter()
            .map(|(_, df)| ((1.0 + n_docs) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();
        let terms = kept
            .into_iter()
            .enumerate()
            .map(|(i, (term, _))| (term, i))
            .collect();

        debug!("Fitted vocabulary over {} documents", docs.len());
        Ok(Self { terms, idf, weighting })
    }

    /// Number of terms (vector width)
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Column index of a term
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms.get(term).copied()
    }

    /// Document-term matrix; unknown terms are ignored
    pub fn transform<S: AsRef<str>>(&self, docs: &[S]) -> Array2<f64> {
        let mut matrix = Array2::<f64>::zeros((docs.len(), self.len()));

        for (row, doc) in docs.iter().enumerate() {
            for token in tokenize(doc.as_ref()) {
                if let Some(&col) = self.terms.get(&token) {
                    matrix[[row, col]] += 1.0;
                }
            }

            let mut values = matrix.row_mut(row);
            match self.weighting {
                Weighting::Counts { binary } => {
                    if binary {
                        values.mapv_inplace(|v| if v > 0.0 { 1.0 } else { 0.0 });
                    }
                }
                Weighting::TfIdf { sublinear_tf, norm } => {
                    for (v, idf) in values.iter_mut().zip(&self.idf) {
                        if *v > 0.0 {
                            let tf = if sublinear_tf { 1.0 + v.ln() } else { *v };
                            *v = tf * idf;
                        }
                    }
                    if norm {
                        let magnitude = values.iter().map(|v| v * v).sum::<f64>().sqrt();
                        if magnitude > 0.0 {
                            values.mapv_inplace(|v| v / magnitude);
                        }
                    }
                }
            }
        }

        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TFIDF: Weighting = Weighting::TfIdf {
        sublinear_tf: false,
        norm: true,
    };

    #[test]
    fn test_vocabulary_sorted() {
        let docs = ["b a", "c a"];
        let vocab = Vocabulary::fit(&docs, 1, None, TFIDF).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.index_of("a"), Some(0));
        assert_eq!(vocab.index_of("c"), Some(2));
    }

    #[test]
    fn test_min_df_filters() {
        let docs = ["apple banana", "apple cherry", "apple"];
        let vocab = Vocabulary::fit(&docs, 2, None, TFIDF).unwrap();
        assert_eq!(vocab.len(), 1);
        assert!(vocab.index_of("banana").is_none());
    }

    #[test]
    fn test_empty_vocabulary() {
        let docs = ["", "!!"];
        assert!(matches!(
            Vocabulary::fit(&docs, 1, None, TFIDF),
            Err(EmbedError::EmptyVocabulary { .. })
        ));
    }

    #[test]
    fn test_max_features_keeps_frequent() {
        let docs = ["x x x y", "y z"];
        let vocab = Vocabulary::fit(&docs, 1, Some(2), TFIDF).unwrap();
        assert_eq!(vocab.len(), 2);
        assert!(vocab.index_of("x").is_some());
        assert!(vocab.index_of("y").is_some());
        assert!(vocab.index_of("z").is_none());
    }

    #[test]
    fn test_tfidf_rows_normalized() {
        let docs = ["the cat sat", "the dog sat", "the end"];
        let vocab = Vocabulary::fit(&docs, 1, None, TFIDF).unwrap();
        let m = vocab.transform(&docs);
        for row in m.rows() {
            let norm: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
        }
        // "the" appears everywhere so it weighs less than "cat" in doc 0
        let the = vocab.index_of("the").unwrap();
        let cat = vocab.index_of("cat").unwrap();
        assert!(m[[0, cat]] > m[[0, the]]);
    }

    #[test]
    fn test_binary_counts() {
        let docs = ["a a b"];
        let vocab = Vocabulary::fit(&docs, 1, None, Weighting::Counts { binary: true }).unwrap();
        let m = vocab.transform(&docs);
        assert_eq!(m.row(0).to_vec(), vec![1.0, 1.0]);

        let counts = Vocabulary::fit(&docs, 1, None, Weighting::Counts { binary: false }).unwrap();
        assert_eq!(counts.transform(&docs).row(0).to_vec(), vec![2.0, 1.0]);
    }

    #[test]
    fn test_sublinear_tf() {
        let docs = ["a a a a b"];
        let weighting = Weighting::TfIdf {
            sublinear_tf: true,
            norm: false,
        };
        let vocab = Vocabulary::fit(&docs, 1, None, weighting).unwrap();
        let m = vocab.transform(&docs);
        // single document: idf is 1 for every term
        assert!((m[[0, 0]] - (1.0 + 4f64.ln())).abs() < 1e-12);
        assert!((m[[0, 1]] - 1.0).abs() < 1e-12);
    }
}
