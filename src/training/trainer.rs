//! Trainer: fits a pipeline graph on a dataset and evaluates it

use crate::data::{DataIterator, Dataset, IteratorConfig, TRAIN};
use crate::errors::{PipelineError, Result};
use crate::pipeline::{FitReport, PipelineGraph};
use crate::training::metrics::Metric;
use crate::types::Value;
use serde::{Deserialize, Serialize};

/// `train` section of a pipeline description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainConfig {
    #[serde(default)]
    pub metrics: Vec<String>,

    /// Splits evaluated after fitting
    #[serde(default)]
    pub evaluation_targets: Vec<String>,

    /// Overrides `dataset_iterator.batch_size` during fitting
    #[serde(default)]
    pub batch_size: Option<usize>,

    #[serde(default)]
    pub shuffle: Option<bool>,
}

/// One metric value on one split
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitScore {
    pub split: String,
    pub metric: String,
    pub value: f64,
    pub examples: usize,
}

/// Outcome of `Trainer::fit`
#[derive(Debug, Clone, Default)]
pub struct TrainReport {
    pub fit: FitReport,
    pub train_examples: usize,
    /// Empty when evaluation was skipped
    pub evaluation: Vec<SplitScore>,
}

impl TrainReport {
    pub fn score(&self, split: &str, metric: &str) -> Option<f64> {
        self.evaluation
            .iter()
            .find(|s| s.split == split && s.metric == metric)
            .map(|s| s.value)
    }
}

/// Drives `PipelineGraph::fit` and evaluation
#[derive(Debug, Clone)]
pub struct Trainer {
    metrics: Vec<Metric>,
    evaluation_targets: Vec<String>,
    batch_size: Option<usize>,
    shuffle: Option<bool>,
    iterator: IteratorConfig,
}

impl Trainer {
    /// Validate the train section; unknown metrics fail here
    pub fn new(config: &TrainConfig, iterator: IteratorConfig) -> Result<Self> {
        let metrics = config
            .metrics
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<Metric>>>()?;
        if config.batch_size == Some(0) || iterator.batch_size == Some(0) {
            return Err(PipelineError::InvalidArgument(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            metrics,
            evaluation_targets: config.evaluation_targets.clone(),
            batch_size: config.batch_size,
            shuffle: config.shuffle,
            iterator,
        })
    }

    /// Whether `evaluate` has anything to do
    pub fn evaluates(&self) -> bool {
        !self.metrics.is_empty() && !self.evaluation_targets.is_empty()
    }

    /// Fit every trainable stage on the train split, then evaluate
    pub fn fit(&self, graph: &mut PipelineGraph, dataset: &Dataset) -> Result<TrainReport> {
        let train_examples = dataset.train().len();
        if train_examples == 0 {
            return Err(PipelineError::MalformedSource(
                "train split has no examples".to_string(),
            ));
        }
        tracing::info!(examples = train_examples, "Training pipeline");

        let mut iterator = DataIterator::new(dataset, self.iterator.clone());
        let (batch_size, shuffle) = (self.batch_size, self.shuffle);
        let fit = graph.fit(|| iterator.batches(TRAIN, batch_size, shuffle))?;

        let evaluation = self.evaluate(graph, dataset)?;
        Ok(TrainReport {
            fit,
            train_examples,
            evaluation,
        })
    }

    /// Score the graph's top-1 predictions on each evaluation target split
    pub fn evaluate(&self, graph: &PipelineGraph, dataset: &Dataset) -> Result<Vec<SplitScore>> {
        if !self.evaluates() {
            tracing::debug!("Evaluation skipped: no metrics or targets configured");
            return Ok(Vec::new());
        }

        let mut iterator = DataIterator::new(dataset, self.iterator.clone());
        let mut scores = Vec::new();
        for split in &self.evaluation_targets {
            if dataset.split(split).is_empty() {
                tracing::debug!(split = %split, "Evaluation split absent or empty");
                continue;
            }

            let mut predictions = Vec::new();
            let mut targets = Vec::new();
            for batch in iterator.batches(split, self.batch_size, Some(false)) {
                let outputs = graph.run(vec![Value::Texts(batch.x)])?;
                let first = outputs.first().ok_or_else(|| {
                    PipelineError::ConfigError("chainer declares no outputs".to_string())
                })?;
                predictions.extend(first.top_labels()?);
                targets.extend(batch.y);
            }

            for metric in &self.metrics {
                let value = metric.compute(&predictions, &targets)?;
                tracing::info!(split = %split, metric = %metric, value, "Evaluated");
                scores.push(SplitScore {
                    split: split.clone(),
                    metric: metric.name().to_string(),
                    value,
                    examples: targets.len(),
                });
            }
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ComponentRegistry;
    use crate::data::{Example, VALID};
    use crate::pipeline::{ChainerDescription, ComponentSpec};

    fn graph() -> PipelineGraph {
        let description = ChainerDescription {
            inputs: vec!["q".to_string()],
            targets: vec!["y".to_string()],
            outputs: vec!["answers".to_string()],
            pipe: vec![
                ComponentSpec::new("tokenizer")
                    .with_inputs(["q"])
                    .with_outputs(["tok"]),
                ComponentSpec::new("word_embedder")
                    .with_inputs(["tok"])
                    .with_outputs(["emb"])
                    .with_param("dim", 32),
                ComponentSpec::new("mean_aggregator")
                    .with_inputs(["emb"])
                    .with_outputs(["vec"])
                    .with_param("dim", 32),
                ComponentSpec::new("cos_classifier")
                    .with_inputs(["vec"])
                    .with_outputs(["answers"])
                    .with_fit_on(["vec", "y"]),
            ],
        };
        PipelineGraph::build(&description, &ComponentRegistry::new()).unwrap()
    }

    fn dataset() -> Dataset {
        Dataset::from_train(vec![
            Example::new("library opening hours", "9am"),
            Example::new("exam date", "June 5"),
        ])
        .with_split(VALID, vec![Example::new("exam date", "June 5")])
    }

    fn config(metrics: &[&str], targets: &[&str]) -> TrainConfig {
        TrainConfig {
            metrics: metrics.iter().map(|s| s.to_string()).collect(),
            evaluation_targets: targets.iter().map(|s| s.to_string()).collect(),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_fit_and_evaluate() {
        let trainer = Trainer::new(&config(&["accuracy"], &["valid", "test"]), IteratorConfig::default())
            .unwrap();
        let mut graph = graph();
        let report = trainer.fit(&mut graph, &dataset()).unwrap();
        assert_eq!(report.train_examples, 2);
        assert_eq!(report.fit.stages.len(), 1);
        assert_eq!(report.evaluation.len(), 1);
        assert_eq!(report.score("valid", "accuracy"), Some(1.0));
    }

    #[test]
    fn test_evaluation_skipped_without_metrics() {
        let trainer = Trainer::new(&config(&[], &["valid"]), IteratorConfig::default()).unwrap();
        assert!(!trainer.evaluates());
        let report = trainer.fit(&mut graph(), &dataset()).unwrap();
        assert!(report.evaluation.is_empty());
    }

    #[test]
    fn test_empty_dataset_is_malformed() {
        let trainer = Trainer::new(&TrainConfig::default(), IteratorConfig::default()).unwrap();
        let err = trainer.fit(&mut graph(), &Dataset::new()).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedSource(_)));
    }

    #[test]
    fn test_unknown_metric() {
        assert!(matches!(
            Trainer::new(&config(&["bleu"], &["valid"]), IteratorConfig::default()),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_batch_size() {
        let train = TrainConfig {
            batch_size: Some(0),
            ..TrainConfig::default()
        };
        assert!(Trainer::new(&train, IteratorConfig::default()).is_err());
    }

    #[test]
    fn test_small_batches_fit_everything() {
        let train = TrainConfig {
            batch_size: Some(1),
            ..TrainConfig::default()
        };
        let trainer = Trainer::new(&train, IteratorConfig::default()).unwrap();
        let report = trainer.fit(&mut graph(), &dataset()).unwrap();
        assert_eq!(report.fit.stages[0].batches, 2);
        assert_eq!(report.fit.stages[0].examples, 2);
    }
}
