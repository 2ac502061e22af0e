//! Labeled examples grouped into named splits

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TRAIN: &str = "train";
pub const VALID: &str = "valid";
pub const TEST: &str = "test";

/// One (question, answer label) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub input: String,
    pub label: String,
}

impl Example {
    pub fn new(input: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            label: label.into(),
        }
    }
}

/// Examples partitioned into named splits; read-only once built
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    splits: BTreeMap<String, Vec<Example>>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Dataset with a single train split
    pub fn from_train(examples: Vec<Example>) -> Self {
        Self::new().with_split(TRAIN, examples)
    }

    /// Add or replace a split
    pub fn with_split(mut self, name: impl Into<String>, examples: Vec<Example>) -> Self {
        self.splits.insert(name.into(), examples);
        self
    }

    /// Examples of a split; unknown splits are empty
    pub fn split(&self, name: &str) -> &[Example] {
        self.splits.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn train(&self) -> &[Example] {
        self.split(TRAIN)
    }

    pub fn has_split(&self, name: &str) -> bool {
        self.splits.contains_key(name)
    }

    pub fn split_names(&self) -> Vec<&str> {
        self.splits.keys().map(String::as_str).collect()
    }

    /// Total examples across all splits
    pub fn len(&self) -> usize {
        self.splits.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
