//! Mined Patterns

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frequent subsequence with its constrained support
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    /// Events in order of occurrence
    pub items: Vec<String>,
    /// Number of sequences holding at least one valid occurrence
    pub support: usize,
}

impl Pattern {
    pub fn new<T: Into<String>>(items: impl IntoIterator<Item = T>, support: usize) -> Self {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            support,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (support {})", self.items.join(" -> "), self.support)
    }
}
