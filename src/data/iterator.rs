//! Batch iteration over dataset splits

use crate::data::dataset::{Dataset, Example};
use crate::types::Value;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// `dataset_iterator` section of a pipeline description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IteratorConfig {
    #[serde(default = "default_iterator_class")]
    pub class_name: String,

    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub shuffle: bool,

    #[serde(default)]
    pub batch_size: Option<usize>,
}

fn default_iterator_class() -> String {
    "data_learning_iterator".to_string()
}

impl Default for IteratorConfig {
    fn default() -> Self {
        Self {
            class_name: default_iterator_class(),
            seed: None,
            shuffle: false,
            batch_size: None,
        }
    }
}

/// Parallel inputs and labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub x: Vec<String>,
    pub y: Vec<String>,
}

impl Batch {
    pub fn from_examples(examples: &[Example]) -> Self {
        Self {
            x: examples.iter().map(|e| e.input.clone()).collect(),
            y: examples.iter().map(|e| e.label.clone()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Values for the chainer's `in` and `in_y` variables
    pub fn into_values(self) -> (Vec<Value>, Vec<Value>) {
        (vec![Value::Texts(self.x)], vec![Value::Texts(self.y)])
    }
}

/// Produces batches from a dataset
///
/// Each call to `batches` restarts from the beginning of the split. With
/// shuffling on, every call draws a fresh order from the seeded generator,
/// so a given seed always yields the same sequence of epochs.
pub struct DataIterator<'a> {
    dataset: &'a Dataset,
    rng: StdRng,
    config: IteratorConfig,
}

impl<'a> DataIterator<'a> {
    pub fn new(dataset: &'a Dataset, config: IteratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            dataset,
            rng,
            config,
        }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Iterate `split` in batches
    ///
    /// `batch_size` and `shuffle` override the iterator configuration. With
    /// no batch size anywhere the whole split comes back as one batch.
    pub fn batches(
        &mut self,
        split: &str,
        batch_size: Option<usize>,
        shuffle: Option<bool>,
    ) -> Batches<'a> {
        let examples = self.dataset.split(split);
        let mut order: Vec<usize> = (0..examples.len()).collect();
        if shuffle.unwrap_or(self.config.shuffle) {
            order.shuffle(&mut self.rng);
        }
        let batch_size = batch_size
            .or(self.config.batch_size)
            .unwrap_or(examples.len())
            .max(1);

        Batches {
            examples,
            order,
            position: 0,
            batch_size,
        }
    }

    /// Whole split as one batch, in stored order
    pub fn all(&self, split: &str) -> Batch {
        Batch::from_examples(self.dataset.split(split))
    }

    pub fn config(&self) -> &IteratorConfig {
        &self.config
    }
}

/// Iterator returned by `DataIterator::batches`
pub struct Batches<'a> {
    examples: &'a [Example],
    order: Vec<usize>,
    position: usize,
    batch_size: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.position >= self.order.len() {
            return None;
        }
        let end = (self.position + self.batch_size).min(self.order.len());
        let mut batch = Batch::default();
        for &i in &self.order[self.position..end] {
            batch.x.push(self.examples[i].input.clone());
            batch.y.push(self.examples[i].label.clone());
        }
        self.position = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.order.len() - self.position + self.batch_size - 1) / self.batch_size;
        (remaining, Some(remaining))
    }
}
