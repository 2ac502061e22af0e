//! Dataset reading and batching

pub mod dataset;
pub mod iterator;
pub mod reader;

pub use dataset::{Dataset, Example, TEST, TRAIN, VALID};
pub use iterator::{Batch, Batches, DataIterator, IteratorConfig};
pub use reader::{DatasetReader, ReaderConfig, SourceFormat};
