//! Declarative pipeline execution
//!
//! A pipeline description names components and wires them together through
//! variables. `PipelineDescription` loads and substitutes the document,
//! `PipelineGraph` validates and executes it.

pub mod description;
pub mod graph;
pub mod namespace;
pub mod variables;

pub use description::{ChainerDescription, ComponentSpec, Metadata, PipelineDescription};
pub use graph::{FitReport, FittedStage, PipelineGraph, Stage};
pub use namespace::VariableNamespace;
pub use variables::{expand_home, expand_path, VariableTable};
