//! Pipeline components
//!
//! Every stage of a pipeline wraps one `Component`. The variant set is
//! closed; the registry maps textual identifiers onto constructors for
//! these variants. Capabilities per variant:
//!
//! | variant                   | in         | out        | fit_on           | persist |
//! |---------------------------|------------|------------|------------------|---------|
//! | Tokenizer                 | texts      | tokens     | -                | -       |
//! | WordEmbedder              | tokens     | embeddings | -                | -       |
//! | VectorAggregator          | embeddings | vectors    | -                | -       |
//! | NearestNeighborClassifier | vectors    | ranked     | vectors, labels  | yes     |

pub mod params;
pub mod tokenizer;
pub mod embedder;
pub mod aggregator;
pub mod classifier;
pub mod registry;

// Re-export commonly used types
pub use params::ComponentParams;
pub use registry::{ComponentFactory, ComponentRegistry};
pub use tokenizer::Tokenizer;
pub use embedder::WordEmbedder;
pub use aggregator::VectorAggregator;
pub use classifier::{DegeneratePolicy, NearestNeighborClassifier, TrainedIndex};

use crate::errors::{PipelineError, Result};
use crate::types::Value;
use std::path::Path;

/// Number of variables a component reads, writes and fits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub inputs: usize,
    pub outputs: usize,
    /// 0 for components that cannot be fitted
    pub fit_on: usize,
}

/// A constructed pipeline component
#[derive(Debug)]
pub enum Component {
    Tokenizer(Tokenizer),
    WordEmbedder(WordEmbedder),
    VectorAggregator(VectorAggregator),
    NearestNeighborClassifier(NearestNeighborClassifier),
}

impl Component {
    /// Identifier the default registry builds this variant under
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Tokenizer(_) => "tokenizer",
            Component::WordEmbedder(_) => "word_embedder",
            Component::VectorAggregator(_) => "mean_aggregator",
            Component::NearestNeighborClassifier(_) => "cos_classifier",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Component::NearestNeighborClassifier(_) => Arity {
                inputs: 1,
                outputs: 1,
                fit_on: 2,
            },
            _ => Arity {
                inputs: 1,
                outputs: 1,
                fit_on: 0,
            },
        }
    }

    pub fn is_trainable(&self) -> bool {
        self.arity().fit_on > 0
    }

    pub fn is_persistable(&self) -> bool {
        matches!(self, Component::NearestNeighborClassifier(_))
    }

    /// Whether a stage `load_path` has any effect
    pub fn reads_load_path(&self) -> bool {
        matches!(
            self,
            Component::WordEmbedder(_) | Component::NearestNeighborClassifier(_)
        )
    }

    /// Classifier access for callers that need per-query `top_n`
    pub fn as_classifier(&self) -> Option<&NearestNeighborClassifier> {
        match self {
            Component::NearestNeighborClassifier(c) => Some(c),
            _ => None,
        }
    }

    /// Transform one batch of inputs into outputs
    pub fn infer(&self, inputs: Vec<Value>) -> Result<Vec<Value>> {
        let input = single(inputs)?;
        let output = match self {
            Component::Tokenizer(t) => Value::Tokens(t.tokenize_batch(&input.into_texts()?)),
            Component::WordEmbedder(e) => Value::Embeddings(
                input
                    .into_tokens()?
                    .iter()
                    .map(|tokens| e.embed(tokens))
                    .collect(),
            ),
            Component::VectorAggregator(a) => {
                Value::Vectors(a.aggregate_batch(&input.into_embeddings()?)?)
            }
            Component::NearestNeighborClassifier(c) => {
                let queries = input.into_vectors()?;
                Value::Ranked(c.infer_batch(&queries, None)?)
            }
        };
        Ok(vec![output])
    }

    /// Fit on accumulated data, one value per fit-on variable
    pub fn fit(&mut self, data: Vec<Value>) -> Result<()> {
        match self {
            Component::NearestNeighborClassifier(c) => {
                let mut data = data.into_iter();
                let (vectors, labels) = match (data.next(), data.next(), data.next()) {
                    (Some(vectors), Some(labels), None) => (vectors, labels),
                    _ => {
                        return Err(PipelineError::InvalidArgument(
                            "classifier fits on exactly (vectors, labels)".to_string(),
                        ))
                    }
                };
                c.fit(vectors.into_vectors()?, labels.into_texts()?)
            }
            other => Err(PipelineError::InvalidArgument(format!(
                "{} is not trainable",
                other.kind()
            ))),
        }
    }

    /// Persist fitted state
    pub fn save(&self, path: &Path) -> Result<()> {
        match self {
            Component::NearestNeighborClassifier(c) => c.save(path),
            other => Err(PipelineError::InvalidArgument(format!(
                "{} has no state to save",
                other.kind()
            ))),
        }
    }

    /// Restore fitted state
    pub fn load(&mut self, path: &Path) -> Result<()> {
        match self {
            Component::NearestNeighborClassifier(c) => c.load(path),
            other => Err(PipelineError::InvalidArgument(format!(
                "{} has no state to load",
                other.kind()
            ))),
        }
    }
}

fn single(inputs: Vec<Value>) -> Result<Value> {
    let count = inputs.len();
    let mut inputs = inputs.into_iter();
    match (inputs.next(), inputs.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(PipelineError::InvalidArgument(format!(
            "expected exactly one input, got {}",
            count
        ))),
    }
}
