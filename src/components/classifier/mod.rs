//! Nearest-neighbor classifier over cosine similarity
//!
//! Fits on (vector, label) pairs and answers queries with the most similar
//! stored labels. The fitted index sits behind a read-write lock: `fit` and
//! `load` swap it as a whole under the write side, inference reads it under
//! the read side, so a query never observes a half-replaced index.

pub mod index;
pub mod similarity;

pub use index::TrainedIndex;
pub use similarity::{cosine_similarity, DegeneratePolicy};

use crate::components::params::ComponentParams;
use crate::errors::{PipelineError, Result};
use crate::types::ScoredAnswer;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

/// Retrieval-based answer selection
#[derive(Debug, Default)]
pub struct NearestNeighborClassifier {
    index: RwLock<Option<TrainedIndex>>,
    top_n: Option<usize>,
    policy: DegeneratePolicy,
    load_path: Option<PathBuf>,
}

impl NearestNeighborClassifier {
    /// Create an unfitted classifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stage parameters (`top_n`, `degenerate`, `load_path`)
    pub fn from_params(params: &ComponentParams) -> Result<Self> {
        let policy = match params.get_str("degenerate")? {
            Some(name) => name.parse()?,
            None => DegeneratePolicy::default(),
        };
        Ok(Self {
            index: RwLock::new(None),
            top_n: params.get_positive("top_n")?,
            policy,
            load_path: params.load_path().map(Path::to_path_buf),
        })
    }

    /// Default number of answers per query
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    pub fn with_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Artifact loaded lazily before the first query when nothing was fitted
    pub fn with_load_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.load_path = Some(path.into());
        self
    }

    /// Configured `top_n`, else the one stored with the index, else 1
    ///
    /// Loads the artifact at `load_path` first so the stored value is seen
    /// before the first query.
    pub fn default_top_n(&self) -> Result<usize> {
        if let Some(top_n) = self.top_n {
            return Ok(top_n);
        }
        self.ensure_loaded()?;
        Ok(self.read_index().as_ref().map_or(1, TrainedIndex::top_n))
    }

    /// Whether an index is held in memory
    pub fn is_fitted(&self) -> bool {
        self.read_index().is_some()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.read_index().as_ref().map_or(0, TrainedIndex::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the index with one built from `vectors` and `labels`
    ///
    /// On error the previous index is left untouched.
    pub fn fit(&self, vectors: Vec<Vec<f32>>, labels: Vec<String>) -> Result<()> {
        let index = TrainedIndex::build(vectors, labels, self.top_n.unwrap_or(1))?;
        tracing::info!(
            entries = index.len(),
            dim = index.dim(),
            "Fitted nearest-neighbor index"
        );
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = Some(index);
        Ok(())
    }

    /// Best `top_n` labels for one query vector
    pub fn infer(&self, query: &[f32], top_n: usize) -> Result<Vec<ScoredAnswer>> {
        if top_n == 0 {
            return Err(PipelineError::InvalidArgument(
                "top_n must be greater than 0".to_string(),
            ));
        }
        self.ensure_loaded()?;
        let guard = self.read_index();
        let index = guard.as_ref().ok_or(PipelineError::EmptyIndex)?;
        index.search(query, top_n, self.policy)
    }

    /// Answer a batch of queries against one consistent index snapshot
    ///
    /// With no explicit `top_n` the configured one applies, else the one
    /// stored with the index.
    pub fn infer_batch(
        &self,
        queries: &[Vec<f32>],
        top_n: Option<usize>,
    ) -> Result<Vec<Vec<ScoredAnswer>>> {
        if top_n == Some(0) {
            return Err(PipelineError::InvalidArgument(
                "top_n must be greater than 0".to_string(),
            ));
        }
        self.ensure_loaded()?;
        let guard = self.read_index();
        let index = guard.as_ref().ok_or(PipelineError::EmptyIndex)?;
        let top_n = top_n.or(self.top_n).unwrap_or_else(|| index.top_n());
        queries
            .iter()
            .map(|query| index.search(query, top_n, self.policy))
            .collect()
    }

    /// Persist the current index
    pub fn save(&self, path: &Path) -> Result<()> {
        let guard = self.read_index();
        let index = guard.as_ref().ok_or(PipelineError::EmptyIndex)?;
        index.save(path)
    }

    /// Replace the in-memory index with the artifact at `path`
    pub fn load(&self, path: &Path) -> Result<()> {
        let index = TrainedIndex::load(path)?;
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = Some(index);
        Ok(())
    }

    fn read_index(&self) -> RwLockReadGuard<'_, Option<TrainedIndex>> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load from `load_path` if nothing is in memory and the artifact exists
    fn ensure_loaded(&self) -> Result<()> {
        if self.is_fitted() {
            return Ok(());
        }
        let path = match &self.load_path {
            Some(path) if path.exists() => path,
            _ => return Ok(()),
        };

        let mut guard = self.index.write().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            *guard = Some(TrainedIndex::load(path)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fitted() -> NearestNeighborClassifier {
        let classifier = NearestNeighborClassifier::new();
        classifier
            .fit(
                vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                vec!["9am".to_string(), "June 5".to_string()],
            )
            .unwrap();
        classifier
    }

    #[test]
    fn test_infer_before_fit() {
        let classifier = NearestNeighborClassifier::new();
        assert!(matches!(
            classifier.infer(&[1.0, 0.0], 1),
            Err(PipelineError::EmptyIndex)
        ));
    }

    #[test]
    fn test_infer_top_1() {
        let classifier = fitted();
        let answers = classifier.infer(&[0.9, 0.1], 1).unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].label, "9am");
    }

    #[test]
    fn test_top_n_larger_than_index() {
        let classifier = fitted();
        assert_eq!(classifier.infer(&[0.9, 0.1], 10).unwrap().len(), 2);
    }

    #[test]
    fn test_zero_top_n() {
        let classifier = fitted();
        assert!(matches!(
            classifier.infer(&[0.9, 0.1], 0),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_failed_fit_keeps_previous_index() {
        let classifier = fitted();
        let err = classifier
            .fit(vec![vec![1.0, 1.0]], vec!["a".to_string(), "b".to_string()])
            .unwrap_err();
        assert!(matches!(err, PipelineError::DimensionMismatch(_)));
        assert_eq!(classifier.len(), 2);
        assert_eq!(classifier.infer(&[0.0, 1.0], 1).unwrap()[0].label, "June 5");
    }

    #[test]
    fn test_refit_replaces_index() {
        let classifier = fitted();
        classifier
            .fit(vec![vec![1.0, 1.0, 1.0]], vec!["only".to_string()])
            .unwrap();
        assert_eq!(classifier.len(), 1);
        assert_eq!(classifier.infer(&[1.0, 0.0, 0.0], 5).unwrap().len(), 1);
    }

    #[test]
    fn test_lazy_load_from_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.json");
        fitted().save(&path).unwrap();

        let restored = NearestNeighborClassifier::new().with_load_path(&path);
        assert!(!restored.is_fitted());
        let answers = restored.infer(&[0.0, 1.0], 1).unwrap();
        assert_eq!(answers[0].label, "June 5");
        assert!(restored.is_fitted());
    }

    #[test]
    fn test_missing_load_path_is_empty_index() {
        let classifier = NearestNeighborClassifier::new().with_load_path("/nonexistent/index.json");
        assert!(matches!(
            classifier.infer(&[1.0, 0.0], 1),
            Err(PipelineError::EmptyIndex)
        ));
    }

    #[test]
    fn test_save_unfitted_fails() {
        let temp = TempDir::new().unwrap();
        let classifier = NearestNeighborClassifier::new();
        assert!(matches!(
            classifier.save(&temp.path().join("index.json")),
            Err(PipelineError::EmptyIndex)
        ));
    }

    #[test]
    fn test_default_top_n_from_params() {
        let params = ComponentParams::new().with("top_n", 3);
        let classifier = NearestNeighborClassifier::from_params(&params).unwrap();
        assert_eq!(classifier.default_top_n().unwrap(), 3);
        assert_eq!(NearestNeighborClassifier::new().default_top_n().unwrap(), 1);
    }

    #[test]
    fn test_negative_top_n_param_rejected() {
        let params = ComponentParams::new().with("top_n", -1);
        assert!(matches!(
            NearestNeighborClassifier::from_params(&params),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_infer_batch() {
        let classifier = fitted();
        let results = classifier
            .infer_batch(&[vec![1.0, 0.0], vec![0.0, 1.0]], Some(1))
            .unwrap();
        assert_eq!(results[0][0].label, "9am");
        assert_eq!(results[1][0].label, "June 5");
    }

    #[test]
    fn test_lazy_load_uses_stored_top_n() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.json");
        let original = NearestNeighborClassifier::new().with_top_n(3);
        original
            .fit(
                vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.0, 1.0]],
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
            )
            .unwrap();
        original.save(&path).unwrap();

        let restored = NearestNeighborClassifier::new().with_load_path(&path);
        assert_eq!(restored.default_top_n().unwrap(), 3);

        let restored = NearestNeighborClassifier::new().with_load_path(&path);
        let first = restored.infer_batch(&[vec![1.0, 0.0]], None).unwrap();
        let second = restored.infer_batch(&[vec![1.0, 0.0]], None).unwrap();
        assert_eq!(first[0].len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_explicit_top_n_overrides_stored() {
        let classifier = fitted();
        assert_eq!(classifier.infer_batch(&[vec![1.0, 0.0]], None).unwrap()[0].len(), 1);
        assert_eq!(classifier.infer_batch(&[vec![1.0, 0.0]], Some(2)).unwrap()[0].len(), 2);
        assert!(matches!(
            classifier.infer_batch(&[vec![1.0, 0.0]], Some(0)),
            Err(PipelineError::InvalidArgument(_))
        ));
    }
}
