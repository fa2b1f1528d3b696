//! Sequence Database and Attributes

use crate::error::MiningError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Item identifier; ids follow the lexicographic order of the event names
pub type ItemId = u32;

/// Numeric values aligned position by position with the event sequences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<Vec<f64>>,
}

/// Event sequences with an interned alphabet and optional attributes
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceDatabase {
    alphabet: Vec<String>,
    index: HashMap<String, ItemId>,
    sequences: Vec<Vec<ItemId>>,
    attributes: Vec<Attribute>,
}

impl SequenceDatabase {
    /// Intern the events of every sequence
    pub fn new<I, S, T>(sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let raw: Vec<Vec<String>> = sequences
            .into_iter()
            .map(|s| s.into_iter().map(|e| e.as_ref().to_string()).collect())
            .collect();

        let alphabet: Vec<String> = raw
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: HashMap<String, ItemId> = alphabet
            .iter()
            .enumerate()
            .map(|(i, e)| (e.clone(), i as ItemId))
            .collect();

        let sequences = raw
            .iter()
            .map(|s| s.iter().map(|e| index[e]).collect())
            .collect();

        Self {
            alphabet,
            index,
            sequences,
            attributes: Vec::new(),
        }
    }

    /// Declare a named attribute whose values align with the events
    pub fn add_attribute(&mut self, name: impl Into<String>, values: Vec<Vec<f64>>) -> Result<(), MiningError> {
        let name = name.into();

        if self.attribute_index(&name).is_some() {
            return Err(MiningError::Configuration(format!(
                "attribute '{}' is already declared",
                name
            )));
        }

        if values.len() != self.sequences.len() {
            return Err(MiningError::ShapeMismatch {
                attribute: name,
                detail: format!(
                    "{} value lists for {} sequences",
                    values.len(),
                    self.sequences.len()
                ),
            });
        }

        for (i, (events, attr)) in self.sequences.iter().zip(&values).enumerate() {
            if events.len() != attr.len() {
                return Err(MiningError::ShapeMismatch {
                    attribute: name,
                    detail: format!(
                        "sequence {} has {} events but {} values",
                        i,
                        events.len(),
                        attr.len()
                    ),
                });
            }
        }

        self.attributes.push(Attribute { name, values });
        Ok(())
    }

    /// Builder form of [`SequenceDatabase::add_attribute`]
    pub fn with_attribute(mut self, name: impl Into<String>, values: Vec<Vec<f64>>) -> Result<Self, MiningError> {
        self.add_attribute(name, values)?;
        Ok(self)
    }

    /// Number of sequences
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Distinct events in id order
    pub fn alphabet(&self) -> &[String] {
        &self.alphabet
    }

    pub fn sequence(&self, index: usize) -> &[ItemId] {
        &self.sequences[index]
    }

    pub(crate) fn sequences(&self) -> &[Vec<ItemId>] {
        &self.sequences
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub(crate) fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Id of an event, if it occurs anywhere in the database
    pub fn item_id(&self, event: &str) -> Option<ItemId> {
        self.index.get(event).copied()
    }

    /// Map events to ids; `None` if any event is unknown
    pub fn encode<T: AsRef<str>>(&self, events: &[T]) -> Option<Vec<ItemId>> {
        events.iter().map(|e| self.item_id(e.as_ref())).collect()
    }

    /// Map ids back to event names
    pub fn decode(&self, items: &[ItemId]) -> Vec<String> {
        items.iter().map(|&i| self.alphabet[i as usize].clone()).collect()
    }
}
