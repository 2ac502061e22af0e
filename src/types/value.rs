//! Values carried through the variable namespace
//!
//! Every value is batch-shaped: one entry per example in the current pass.
//! Components agree on kinds, not on Rust types, so a stage receiving the
//! wrong kind reports `TypeMismatch` instead of panicking.

use crate::errors::{PipelineError, Result};
use crate::types::ScoredAnswer;

/// A batch-level artifact produced or consumed by a component
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Raw strings (questions, labels)
    Texts(Vec<String>),

    /// Token sequences, one per example
    Tokens(Vec<Vec<String>>),

    /// Per-token embedding sequences, one per example
    Embeddings(Vec<Vec<Vec<f32>>>),

    /// Fixed-size vectors, one per example
    Vectors(Vec<Vec<f32>>),

    /// Ranked retrieval results, one list per example
    Ranked(Vec<Vec<ScoredAnswer>>),
}

impl Value {
    /// Short name of the value kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Texts(_) => "texts",
            Value::Tokens(_) => "tokens",
            Value::Embeddings(_) => "embeddings",
            Value::Vectors(_) => "vectors",
            Value::Ranked(_) => "ranked",
        }
    }

    /// Number of examples in the batch
    pub fn len(&self) -> usize {
        match self {
            Value::Texts(v) => v.len(),
            Value::Tokens(v) => v.len(),
            Value::Embeddings(v) => v.len(),
            Value::Vectors(v) => v.len(),
            Value::Ranked(v) => v.len(),
        }
    }

    /// Check if the batch is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append another batch of the same kind
    pub fn extend(&mut self, other: Value) -> Result<()> {
        match (self, other) {
            (Value::Texts(a), Value::Texts(b)) => a.extend(b),
            (Value::Tokens(a), Value::Tokens(b)) => a.extend(b),
            (Value::Embeddings(a), Value::Embeddings(b)) => a.extend(b),
            (Value::Vectors(a), Value::Vectors(b)) => a.extend(b),
            (Value::Ranked(a), Value::Ranked(b)) => a.extend(b),
            (this, other) => {
                return Err(PipelineError::TypeMismatch {
                    expected: this.kind(),
                    found: other.kind(),
                })
            }
        }
        Ok(())
    }

    pub fn into_texts(self) -> Result<Vec<String>> {
        match self {
            Value::Texts(v) => Ok(v),
            other => Err(mismatch("texts", &other)),
        }
    }

    pub fn into_tokens(self) -> Result<Vec<Vec<String>>> {
        match self {
            Value::Tokens(v) => Ok(v),
            other => Err(mismatch("tokens", &other)),
        }
    }

    pub fn into_embeddings(self) -> Result<Vec<Vec<Vec<f32>>>> {
        match self {
            Value::Embeddings(v) => Ok(v),
            other => Err(mismatch("embeddings", &other)),
        }
    }

    pub fn into_vectors(self) -> Result<Vec<Vec<f32>>> {
        match self {
            Value::Vectors(v) => Ok(v),
            other => Err(mismatch("vectors", &other)),
        }
    }

    pub fn into_ranked(self) -> Result<Vec<Vec<ScoredAnswer>>> {
        match self {
            Value::Ranked(v) => Ok(v),
            other => Err(mismatch("ranked", &other)),
        }
    }

    /// Top-1 label per example, for ranked results or plain texts
    pub fn top_labels(&self) -> Result<Vec<Option<String>>> {
        match self {
            Value::Ranked(v) => Ok(v
                .iter()
                .map(|answers| answers.first().map(|a| a.label.clone()))
                .collect()),
            Value::Texts(v) => Ok(v.iter().cloned().map(Some).collect()),
            other => Err(mismatch("ranked", other)),
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> PipelineError {
    PipelineError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}
