//! Attribute Constraints
//!
//! A constraint bounds an aggregate of one attribute's values at the matched
//! positions of an occurrence. Besides the exact check on a finished
//! occurrence, each aggregate provides an optimistic range of values it could
//! still reach if the occurrence were extended with any subset of the
//! remaining in-span positions; the search prunes an occurrence once that
//! range misses the bounds.

use crate::database::SequenceDatabase;
use crate::error::MiningError;
use serde::{Deserialize, Serialize};

/// Aggregate over the matched attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Average,
    Sum,
    Min,
    Max,
    Median,
    /// Difference between the largest and smallest value
    Span,
    /// Difference between each pair of consecutive values
    Gap,
}

/// Inclusive bounds on an aggregate of one attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub attribute: String,
    pub aggregate: Aggregate,
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
}

impl Constraint {
    /// Unbounded constraint; add bounds with `between`, `at_least` or `at_most`
    pub fn new(attribute: impl Into<String>, aggregate: Aggregate) -> Self {
        Self {
            attribute: attribute.into(),
            aggregate,
            lower: None,
            upper: None,
        }
    }

    pub fn average(attribute: impl Into<String>) -> Self {
        Self::new(attribute, Aggregate::Average)
    }

    pub fn sum(attribute: impl Into<String>) -> Self {
        Self::new(attribute, Aggregate::Sum)
    }

    pub fn min(attribute: impl Into<String>) -> Self {
        Self::new(attribute, Aggregate::Min)
    }

    pub fn max(attribute: impl Into<String>) -> Self {
        Self::new(attribute, Aggregate::Max)
    }

    pub fn median(attribute: impl Into<String>) -> Self {
        Self::new(attribute, Aggregate::Median)
    }

    pub fn span(attribute: impl Into<String>) -> Self {
        Self::new(attribute, Aggregate::Span)
    }

    pub fn gap(attribute: impl Into<String>) -> Self {
        Self::new(attribute, Aggregate::Gap)
    }

    pub fn between(mut self, lower: f64, upper: f64) -> Self {
        self.lower = Some(lower);
        self.upper = Some(upper);
        self
    }

    pub fn at_least(mut self, lower: f64) -> Self {
        self.lower = Some(lower);
        self
    }

    pub fn at_most(mut self, upper: f64) -> Self {
        self.upper = Some(upper);
        self
    }

    /// Validate against the database and resolve the attribute reference
    pub(crate) fn bind(&self, db: &SequenceDatabase) -> Result<BoundConstraint, MiningError> {
        let attribute = db.attribute_index(&self.attribute).ok_or_else(|| {
            MiningError::Constraint(format!(
                "constraint references undeclared attribute '{}'",
                self.attribute
            ))
        })?;

        if self.lower.is_none() && self.upper.is_none() {
            return Err(MiningError::Constraint(format!(
                "{:?} constraint on '{}' has no bounds",
                self.aggregate, self.attribute
            )));
        }

        let lower = self.lower.unwrap_or(f64::NEG_INFINITY);
        let upper = self.upper.unwrap_or(f64::INFINITY);
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(MiningError::Constraint(format!(
                "{:?} constraint on '{}' has invalid bounds [{}, {}]",
                self.aggregate, self.attribute, lower, upper
            )));
        }

        Ok(BoundConstraint {
            attribute,
            aggregate: self.aggregate,
            lower,
            upper,
        })
    }
}

/// Constraint resolved to an attribute index with finite-or-infinite bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BoundConstraint {
    pub attribute: usize,
    pub aggregate: Aggregate,
    pub lower: f64,
    pub upper: f64,
}

/// Running aggregate of one attribute over an occurrence's matched values
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttrState {
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub last: f64,
    /// Sorted matched values, kept only when a median is constrained
    pub values: Option<Vec<f64>>,
}

impl AttrState {
    pub fn start(value: f64, keep_values: bool) -> Self {
        Self {
            count: 1,
            sum: value,
            min: value,
            max: value,
            last: value,
            values: keep_values.then(|| vec![value]),
        }
    }

    pub fn push(&self, value: f64) -> Self {
        let values = self.values.as_ref().map(|v| {
            let mut v = v.clone();
            let at = v.partition_point(|x| *x < value);
            v.insert(at, value);
            v
        });
        Self {
            count: self.count + 1,
            sum: self.sum + value,
            min: self.min.min(value),
            max: self.max.max(value),
            last: value,
            values,
        }
    }

    fn median(&self) -> f64 {
        match &self.values {
            Some(v) if !v.is_empty() => {
                let mid = v.len() / 2;
                if v.len() % 2 == 0 {
                    (v[mid - 1] + v[mid]) / 2.0
                } else {
                    v[mid]
                }
            }
            _ => (self.min + self.max) / 2.0,
        }
    }
}

/// Extremes and signed sums of the values an occurrence could still add
#[derive(Debug, Clone, Copy)]
pub(crate) struct Remaining {
    pub min: f64,
    pub max: f64,
    pub negative_sum: f64,
    pub positive_sum: f64,
    pub empty: bool,
}

impl Remaining {
    pub fn over(values: &[f64]) -> Self {
        let mut rem = Remaining {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            negative_sum: 0.0,
            positive_sum: 0.0,
            empty: values.is_empty(),
        };
        for &v in values {
            rem.min = rem.min.min(v);
            rem.max = rem.max.max(v);
            if v < 0.0 {
                rem.negative_sum += v;
            } else {
                rem.positive_sum += v;
            }
        }
        rem
    }
}

impl BoundConstraint {
    fn within(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    fn overlaps(&self, low: f64, high: f64) -> bool {
        high >= self.lower && low <= self.upper
    }

    /// Whether a consecutive step from `previous` to `next` respects a gap bound
    pub fn allows_step(&self, previous: f64, next: f64) -> bool {
        self.aggregate != Aggregate::Gap || self.within(next - previous)
    }

    /// Exact check on a finished occurrence
    pub fn holds(&self, state: &AttrState) -> bool {
        match self.aggregate {
            Aggregate::Average => self.within(state.sum / state.count as f64),
            Aggregate::Sum => self.within(state.sum),
            Aggregate::Min => self.within(state.min),
            Aggregate::Max => self.within(state.max),
            Aggregate::Median => self.within(state.median()),
            Aggregate::Span => self.within(state.max - state.min),
            // Checked step by step as the occurrence grows
            Aggregate::Gap => true,
        }
    }

    /// Whether the occurrence or some extension of it could satisfy the bound
    pub fn reachable(&self, state: &AttrState, rem: &Remaining) -> bool {
        if rem.empty {
            return self.holds(state);
        }
        let low_all = state.min.min(rem.min);
        let high_all = state.max.max(rem.max);

        match self.aggregate {
            Aggregate::Average => {
                let avg = state.sum / state.count as f64;
                self.overlaps(avg.min(rem.min), avg.max(rem.max))
            }
            Aggregate::Sum => self.overlaps(state.sum + rem.negative_sum, state.sum + rem.positive_sum),
            Aggregate::Min => self.overlaps(low_all, state.min),
            Aggregate::Max => self.overlaps(state.max, high_all),
            Aggregate::Median => self.overlaps(low_all, high_all),
            Aggregate::Span => self.overlaps(state.max - state.min, high_all - low_all),
            Aggregate::Gap => true,
        }
    }
}
