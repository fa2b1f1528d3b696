//! Mining Configuration

use crate::error::MiningError;
use serde::{Deserialize, Serialize};

/// Minimum support, absolute or as a share of the database
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MinFrequency {
    /// Number of sequences
    Count(usize),
    /// Fraction of sequences in (0, 1], rounded up
    Fraction(f64),
}

impl Default for MinFrequency {
    fn default() -> Self {
        MinFrequency::Count(2)
    }
}

impl MinFrequency {
    /// Absolute support threshold for a database of `n` sequences
    pub fn resolve(&self, n: usize) -> Result<usize, MiningError> {
        let count = match *self {
            MinFrequency::Count(c) => c,
            MinFrequency::Fraction(f) => {
                if !(f > 0.0 && f <= 1.0) {
                    return Err(MiningError::Configuration(format!(
                        "min_frequency fraction must be in (0, 1], got {}",
                        f
                    )));
                }
                // Tolerate representation error such as 0.1 * 30
                (f * n as f64 - 1e-9).ceil() as usize
            }
        };

        if count == 0 || count > n {
            return Err(MiningError::Configuration(format!(
                "min_frequency resolves to {} for a database of {} sequences",
                count, n
            )));
        }
        Ok(count)
    }
}

/// Search limits for the pattern miner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub min_frequency: MinFrequency,
    /// Shortest reported pattern
    pub min_length: usize,
    /// Longest reported pattern
    pub max_length: Option<usize>,
    /// Widest occurrence in positions, `last - first + 1`
    pub max_span: Option<usize>,
    /// Spread root subtrees over the rayon pool
    pub parallel: bool,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_frequency: MinFrequency::default(),
            min_length: 2,
            max_length: None,
            max_span: Some(10),
            parallel: true,
        }
    }
}

impl MiningConfig {
    /// Unbounded span and length, single items included
    pub fn exhaustive() -> Self {
        Self {
            min_length: 1,
            max_span: None,
            ..Default::default()
        }
    }

    /// Short patterns within a tight window
    pub fn short_range() -> Self {
        Self {
            max_length: Some(3),
            max_span: Some(5),
            ..Default::default()
        }
    }

    pub fn with_min_frequency(mut self, min_frequency: MinFrequency) -> Self {
        self.min_frequency = min_frequency;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), MiningError> {
        if self.min_length == 0 {
            return Err(MiningError::Configuration("min_length must be at least 1".into()));
        }
        if let Some(max) = self.max_length {
            if self.min_length > max {
                return Err(MiningError::Configuration(format!(
                    "min_length {} exceeds max_length {}",
                    self.min_length, max
                )));
            }
        }
        if self.max_span == Some(0) {
            return Err(MiningError::Configuration("max_span must be at least 1".into()));
        }
        Ok(())
    }
}
