//! Mean pooling of token embeddings into one sentence vector

use crate::components::params::ComponentParams;
use crate::errors::{PipelineError, Result};

/// Averages token vectors component-wise
///
/// An empty sequence yields the zero vector of the configured dimension.
/// Downstream cosine scoring treats that vector as degenerate (score 0).
#[derive(Debug, Clone)]
pub struct VectorAggregator {
    dim: usize,
}

impl VectorAggregator {
    /// Create an aggregator producing vectors of size `dim`
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(PipelineError::InvalidArgument(
                "aggregator dimension must be greater than 0".to_string(),
            ));
        }
        Ok(Self { dim })
    }

    /// Build from stage parameters; `dim` is required
    pub fn from_params(params: &ComponentParams) -> Result<Self> {
        let dim = params.get_positive("dim")?.ok_or_else(|| {
            PipelineError::InvalidArgument("mean aggregator requires 'dim'".to_string())
        })?;
        Self::new(dim)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Component-wise arithmetic mean
    pub fn aggregate(&self, embeddings: &[Vec<f32>]) -> Result<Vec<f32>> {
        let mut sums = vec![0.0f64; self.dim];
        for (position, vector) in embeddings.iter().enumerate() {
            if vector.len() != self.dim {
                return Err(PipelineError::DimensionMismatch(format!(
                    "token {} has {} components, aggregator expects {}",
                    position,
                    vector.len(),
                    self.dim
                )));
            }
            for (sum, x) in sums.iter_mut().zip(vector) {
                *sum += f64::from(*x);
            }
        }

        if embeddings.is_empty() {
            return Ok(vec![0.0; self.dim]);
        }

        let count = embeddings.len() as f64;
        Ok(sums.into_iter().map(|sum| (sum / count) as f32).collect())
    }

    /// Aggregate every sequence in a batch
    pub fn aggregate_batch(&self, batch: &[Vec<Vec<f32>>]) -> Result<Vec<Vec<f32>>> {
        batch.iter().map(|seq| self.aggregate(seq)).collect()
    }
}
