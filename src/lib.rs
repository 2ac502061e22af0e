//! qachain - declarative question-answering pipelines
//!
//! Loads a pipeline description at runtime, wires named components together
//! through a shared variable namespace, trains the trainable ones and
//! answers questions by nearest-neighbor retrieval.
//!
//! # Architecture
//!
//! - **components**: tokenizer, word embedder, aggregator, classifier and
//!   the registry that constructs them by name
//! - **pipeline**: description loading, variable substitution, graph build
//!   and execution
//! - **data** / **training**: dataset reading, batching, fitting, evaluation
//! - **model**: question-answering facade used by the CLI

pub mod errors;
pub mod types;

// Re-export commonly used types
pub use errors::{PipelineError, Result};
pub use types::{ScoredAnswer, Value};

pub mod components;
pub mod data;
pub mod pipeline;
pub mod training;
pub mod resources;
pub mod model;

pub use components::{Component, ComponentRegistry};
pub use model::{build_model, train_model, QaModel};
pub use pipeline::{PipelineDescription, PipelineGraph};

pub mod cli;
pub mod config;
