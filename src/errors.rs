//! Error types for qachain
//!
//! One error enum covers graph construction, execution, training and
//! persistence so that callers can match on the failure kind regardless of
//! which stage produced it.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pipeline construction and execution
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No factory registered under the requested identifier
    #[error("Unknown component '{name}'")]
    UnknownComponent { name: String },

    /// A stage reads a variable that no earlier stage or graph input produces
    #[error("Stage {stage} ({component}) reads unresolved variable '{variable}'")]
    UnresolvedVariable {
        stage: usize,
        component: String,
        variable: String,
    },

    /// A declared input was absent from the namespace at execution time
    #[error("Stage {stage} ({component}) is missing variable '{variable}' at execution time")]
    MissingVariable {
        stage: usize,
        component: String,
        variable: String,
    },

    /// Vector/label counts or vector dimensionality disagree
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Inference requested before any fit or load
    #[error("Index is empty: fit or load the classifier before inference")]
    EmptyIndex,

    /// Caller supplied an argument outside the accepted domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Persisted artifact failed validation on read
    #[error("Corrupt artifact at {path:?}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    /// Dataset source is empty, unreadable or lacks configured columns
    #[error("Malformed source: {0}")]
    MalformedSource(String),

    /// A value of the wrong kind reached a component
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A path the pipeline depends on does not exist
    #[error("Missing resource: {path:?}")]
    MissingResource { path: PathBuf },

    /// Pipeline description or settings errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Component failure annotated with the stage that raised it
    #[error("Stage {stage} ({component}) failed: {source}")]
    Stage {
        stage: usize,
        component: String,
        #[source]
        source: Box<PipelineError>,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl PipelineError {
    /// Wrap an error with the stage that produced it
    pub fn at_stage(self, stage: usize, component: impl Into<String>) -> Self {
        PipelineError::Stage {
            stage,
            component: component.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through stage annotations
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Convert anyhow errors to PipelineError
impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::ConfigError(format!("{:#}", err))
    }
}
