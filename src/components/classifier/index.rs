//! Fitted vectors and labels, plus their on-disk artifact
//!
//! The artifact is JSON and self-describing: it records its own
//! dimensionality so `load` can check every invariant without the pipeline
//! description.

use crate::components::classifier::similarity::{cosine_with_norms, norm, DegeneratePolicy};
use crate::errors::{PipelineError, Result};
use crate::types::ScoredAnswer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Artifact layout version written by `save`
pub const FORMAT_VERSION: u32 = 1;

/// Parallel arrays of fitted vectors and labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedIndex {
    format_version: u32,
    dim: usize,
    top_n: usize,
    fitted_at: DateTime<Utc>,
    vectors: Vec<Vec<f32>>,
    labels: Vec<String>,
    #[serde(skip)]
    norms: Vec<f64>,
}

impl TrainedIndex {
    /// Validate and build an index from fit data
    pub fn build(vectors: Vec<Vec<f32>>, labels: Vec<String>, top_n: usize) -> Result<Self> {
        if vectors.len() != labels.len() {
            return Err(PipelineError::DimensionMismatch(format!(
                "{} vectors but {} labels",
                vectors.len(),
                labels.len()
            )));
        }
        if vectors.is_empty() {
            return Err(PipelineError::DimensionMismatch(
                "cannot fit on zero examples".to_string(),
            ));
        }
        let dim = vectors[0].len();
        if dim == 0 {
            return Err(PipelineError::DimensionMismatch(
                "vectors must have at least one component".to_string(),
            ));
        }
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
            return Err(PipelineError::DimensionMismatch(format!(
                "vector {} has {} components, expected {}",
                i,
                v.len(),
                dim
            )));
        }
        if let Some(i) = vectors.iter().position(|v| !all_finite(v)) {
            return Err(PipelineError::InvalidArgument(format!(
                "vector {} has a non-finite component",
                i
            )));
        }

        let norms = vectors.iter().map(|v| norm(v)).collect();
        Ok(Self {
            format_version: FORMAT_VERSION,
            dim,
            top_n: top_n.max(1),
            fitted_at: Utc::now(),
            vectors,
            labels,
            norms,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// `top_n` in effect when the index was fitted
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn fitted_at(&self) -> DateTime<Utc> {
        self.fitted_at
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Rank every entry against `query`, keeping the best `top_n`
    ///
    /// Sorting is stable, so equal scores keep fit order.
    pub fn search(
        &self,
        query: &[f32],
        top_n: usize,
        policy: DegeneratePolicy,
    ) -> Result<Vec<ScoredAnswer>> {
        if top_n == 0 {
            return Err(PipelineError::InvalidArgument(
                "top_n must be greater than 0".to_string(),
            ));
        }
        if query.len() != self.dim {
            return Err(PipelineError::DimensionMismatch(format!(
                "query has {} components, index holds {}",
                query.len(),
                self.dim
            )));
        }
        if !all_finite(query) {
            return Err(PipelineError::InvalidArgument(
                "query vector has a non-finite component".to_string(),
            ));
        }

        let query_norm = norm(query);
        if query_norm == 0.0 && policy == DegeneratePolicy::Reject {
            return Err(PipelineError::InvalidArgument(
                "query vector has zero norm".to_string(),
            ));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .zip(&self.norms)
            .map(|(v, n)| cosine_with_norms(query, query_norm, v, *n))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_n);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredAnswer::new(self.labels[i].clone(), score))
            .collect())
    }

    /// Write the artifact, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        tracing::info!(
            path = %path.display(),
            entries = self.len(),
            dim = self.dim,
            "Saved classifier index"
        );
        Ok(())
    }

    /// Read and validate an artifact
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::MissingResource {
                path: path.to_path_buf(),
            });
        }
        let json = fs::read_to_string(path)?;
        let corrupt = |reason: String| PipelineError::CorruptArtifact {
            path: path.to_path_buf(),
            reason,
        };

        let mut index: TrainedIndex =
            serde_json::from_str(&json).map_err(|e| corrupt(e.to_string()))?;
        index.validate().map_err(corrupt)?;
        index.norms = index.vectors.iter().map(|v| norm(v)).collect();

        tracing::info!(
            path = %path.display(),
            entries = index.len(),
            dim = index.dim,
            "Loaded classifier index"
        );
        Ok(index)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.format_version != FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            ));
        }
        if self.vectors.len() != self.labels.len() {
            return Err(format!(
                "{} vectors but {} labels",
                self.vectors.len(),
                self.labels.len()
            ));
        }
        if self.vectors.is_empty() {
            return Err("index holds no entries".to_string());
        }
        if self.dim == 0 {
            return Err("dimensionality tag is 0".to_string());
        }
        if let Some(i) = self.vectors.iter().position(|v| v.len() != self.dim) {
            return Err(format!(
                "vector {} has {} components, tag says {}",
                i,
                self.vectors[i].len(),
                self.dim
            ));
        }
        if let Some(i) = self.vectors.iter().position(|v| !all_finite(v)) {
            return Err(format!("vector {} has a non-finite component", i));
        }
        if self.top_n == 0 {
            return Err("top_n is 0".to_string());
        }
        Ok(())
    }
}

fn all_finite(vector: &[f32]) -> bool {
    vector.iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_rejects_count_mismatch() {
        let err = TrainedIndex::build(vec![vec![1.0]], labels(&["a", "b"]), 1).unwrap_err();
        assert!(matches!(err, PipelineError::DimensionMismatch(_)));
    }

    #[test]
    fn test_build_rejects_ragged_vectors() {
        let err = TrainedIndex::build(vec![vec![1.0, 0.0], vec![1.0]], labels(&["a", "b"]), 1)
            .unwrap_err();
        assert!(matches!(err, PipelineError::DimensionMismatch(_)));
    }

    #[test]
    fn test_build_rejects_non_finite() {
        let err = TrainedIndex::build(
            vec![vec![1.0, 0.0], vec![f32::NAN, 1.0]],
            labels(&["a", "b"]),
            1,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArgument(_)));
        assert!(TrainedIndex::build(vec![vec![f32::INFINITY]], labels(&["a"]), 1).is_err());
    }

    #[test]
    fn test_search_rejects_non_finite_query() {
        let index = TrainedIndex::build(
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            labels(&["a", "b"]),
            1,
        )
        .unwrap();
        assert!(matches!(
            index.search(&[f32::NAN, 1.0], 2, DegeneratePolicy::Zero),
            Err(PipelineError::InvalidArgument(_))
        ));
        assert!(matches!(
            index.search(&[f32::NEG_INFINITY, 1.0], 2, DegeneratePolicy::Zero),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_build_rejects_empty() {
        assert!(TrainedIndex::build(Vec::new(), Vec::new(), 1).is_err());
    }

    #[test]
    fn test_search_orders_and_truncates() {
        let index = TrainedIndex::build(
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
            labels(&["up", "right", "diagonal"]),
            1,
        )
        .unwrap();
        let results = index.search(&[1.0, 0.1], 2, DegeneratePolicy::Zero).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].label, "right");
        assert_eq!(results[1].label, "diagonal");
    }

    #[test]
    fn test_ties_keep_fit_order() {
        let index = TrainedIndex::build(
            vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![0.0, 1.0]],
            labels(&["first", "second", "other"]),
            1,
        )
        .unwrap();
        let results = index.search(&[3.0, 0.0], 3, DegeneratePolicy::Zero).unwrap();
        assert_eq!(results[0].label, "first");
        assert_eq!(results[1].label, "second");
    }

    #[test]
    fn test_zero_query_policy() {
        let index = TrainedIndex::build(vec![vec![1.0, 0.0]], labels(&["a"]), 1).unwrap();
        let results = index.search(&[0.0, 0.0], 1, DegeneratePolicy::Zero).unwrap();
        assert_eq!(results[0].score, 0.0);
        assert!(matches!(
            index.search(&[0.0, 0.0], 1, DegeneratePolicy::Reject),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_search_dimension_and_top_n_checks() {
        let index = TrainedIndex::build(vec![vec![1.0, 0.0]], labels(&["a"]), 1).unwrap();
        assert!(matches!(
            index.search(&[1.0], 1, DegeneratePolicy::Zero),
            Err(PipelineError::DimensionMismatch(_))
        ));
        assert!(matches!(
            index.search(&[1.0, 0.0], 0, DegeneratePolicy::Zero),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("models").join("index.json");
        let index =
            TrainedIndex::build(vec![vec![0.5, 0.5], vec![-1.0, 0.0]], labels(&["a", "b"]), 2)
                .unwrap();
        index.save(&path).unwrap();

        let loaded = TrainedIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dim(), 2);
        assert_eq!(loaded.top_n(), 2);
        assert_eq!(
            loaded.search(&[1.0, 1.0], 2, DegeneratePolicy::Zero).unwrap(),
            index.search(&[1.0, 1.0], 2, DegeneratePolicy::Zero).unwrap()
        );
    }

    #[test]
    fn test_load_rejects_violated_invariants() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        let artifact = json!({
            "format_version": FORMAT_VERSION,
            "dim": 2,
            "top_n": 1,
            "fitted_at": "2024-01-01T00:00:00Z",
            "vectors": [[1.0, 0.0], [1.0]],
            "labels": ["a", "b"]
        });
        fs::write(&path, artifact.to_string()).unwrap();
        assert!(matches!(
            TrainedIndex::load(&path),
            Err(PipelineError::CorruptArtifact { .. })
        ));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            TrainedIndex::load(&path),
            Err(PipelineError::CorruptArtifact { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_non_finite_vector() {
        let mut index =
            TrainedIndex::build(vec![vec![1.0, 0.0], vec![0.0, 1.0]], labels(&["a", "b"]), 1)
                .unwrap();
        assert!(index.validate().is_ok());
        index.vectors[1][0] = f32::NAN;
        assert!(index.validate().unwrap_err().contains("non-finite"));
    }

    #[test]
    fn test_load_rejects_label_count_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        let artifact = json!({
            "format_version": FORMAT_VERSION,
            "dim": 1,
            "top_n": 1,
            "fitted_at": "2024-01-01T00:00:00Z",
            "vectors": [[1.0]],
            "labels": ["a", "b"]
        });
        fs::write(&path, artifact.to_string()).unwrap();
        assert!(matches!(
            TrainedIndex::load(&path),
            Err(PipelineError::CorruptArtifact { .. })
        ));
    }
}
