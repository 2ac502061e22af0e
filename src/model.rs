//! Question-answering facade over a pipeline graph
//!
//! `build_model` prepares a description for inference, `train_model` also
//! reads the dataset and fits the trainable stages. Either way the result
//! is a `QaModel` that answers raw questions.

use crate::components::ComponentRegistry;
use crate::config::Settings;
use crate::data::{Dataset, DatasetReader};
use crate::errors::{PipelineError, Result};
use crate::pipeline::{PipelineDescription, PipelineGraph};
use crate::training::{TrainReport, Trainer};
use crate::types::{ScoredAnswer, Value};
use std::path::Path;

/// A built pipeline that maps questions to scored answers
#[derive(Debug)]
pub struct QaModel {
    description: PipelineDescription,
    graph: PipelineGraph,
    /// Last classifier stage, used for per-call `top_n`
    classifier_stage: Option<usize>,
}

impl QaModel {
    /// Build the graph described by `description`
    pub fn from_description(
        description: PipelineDescription,
        registry: &ComponentRegistry,
    ) -> Result<Self> {
        let graph = PipelineGraph::build(&description.chainer, registry)?;
        let classifier_stage = graph
            .stages()
            .iter()
            .rev()
            .find(|stage| stage.component().as_classifier().is_some())
            .map(|stage| stage.index());

        Ok(Self {
            description,
            graph,
            classifier_stage,
        })
    }

    pub fn description(&self) -> &PipelineDescription {
        &self.description
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// Read the described dataset and train on it
    pub fn train(&mut self) -> Result<TrainReport> {
        let reader = self.description.dataset_reader.as_ref().ok_or_else(|| {
            PipelineError::ConfigError("description has no dataset_reader section".to_string())
        })?;
        let dataset = DatasetReader::load(reader)?;
        self.train_on(&dataset)
    }

    /// Train on an already loaded dataset
    pub fn train_on(&mut self, dataset: &Dataset) -> Result<TrainReport> {
        let trainer = Trainer::new(
            &self.description.train,
            self.description.dataset_iterator.clone(),
        )?;
        trainer.fit(&mut self.graph, dataset)
    }

    /// Best answer for one question
    pub fn ask(&self, question: &str) -> Result<ScoredAnswer> {
        self.ask_top_n(question, 1)?
            .into_iter()
            .next()
            .ok_or(PipelineError::EmptyIndex)
    }

    /// Up to `top_n` answers for one question, best first
    pub fn ask_top_n(&self, question: &str, top_n: usize) -> Result<Vec<ScoredAnswer>> {
        let mut ranked = self.rank(vec![question.to_string()], top_n)?;
        Ok(ranked.pop().unwrap_or_default())
    }

    /// Best answer for each question
    pub fn ask_batch(&self, questions: &[String]) -> Result<Vec<ScoredAnswer>> {
        self.rank(questions.to_vec(), 1)?
            .into_iter()
            .map(|answers| answers.into_iter().next().ok_or(PipelineError::EmptyIndex))
            .collect()
    }

    fn rank(&self, questions: Vec<String>, top_n: usize) -> Result<Vec<Vec<ScoredAnswer>>> {
        if top_n == 0 {
            return Err(PipelineError::InvalidArgument(
                "top_n must be greater than 0".to_string(),
            ));
        }
        if let Some(question) = questions.iter().find(|q| q.trim().is_empty()) {
            return Err(PipelineError::InvalidArgument(format!(
                "empty question {:?}",
                question
            )));
        }

        let index = match self.classifier_stage {
            Some(index) => index,
            None => {
                let outputs = self.graph.run(vec![Value::Texts(questions)])?;
                let first = outputs.into_iter().next().ok_or_else(|| {
                    PipelineError::ConfigError("chainer declares no outputs".to_string())
                })?;
                return Ok(first
                    .into_ranked()?
                    .into_iter()
                    .map(|mut answers| {
                        answers.truncate(top_n);
                        answers
                    })
                    .collect());
            }
        };

        // Run everything up to the classifier, then query it directly so the
        // caller's top_n applies instead of the configured one.
        let namespace = self
            .graph
            .run_prefix(index, vec![Value::Texts(questions)])?;
        let stage = &self.graph.stages()[index];
        let input = stage.spec().inputs.first().ok_or_else(|| {
            PipelineError::ConfigError(format!("stage {} declares no inputs", index))
        })?;
        let queries = namespace
            .read(index, stage.label(), input)?
            .into_vectors()
            .map_err(|e| e.at_stage(index, stage.label()))?;

        match stage.component().as_classifier() {
            Some(classifier) => classifier
                .infer_batch(&queries, Some(top_n))
                .map_err(|e| e.at_stage(index, stage.label())),
            None => Err(PipelineError::ConfigError(format!(
                "stage {} is not a classifier",
                index
            ))),
        }
    }
}

/// Load a description file, substituting settings-level variables
pub fn load_description(config_path: &Path, settings: &Settings) -> Result<PipelineDescription> {
    PipelineDescription::from_file(config_path, &settings.variables())
}

/// Build a model for inference only
pub fn build_model(config_path: &Path, settings: &Settings) -> Result<QaModel> {
    let description = load_description(config_path, settings)?;
    QaModel::from_description(description, &ComponentRegistry::new())
}

/// Build a model and train it on its dataset
pub fn train_model(config_path: &Path, settings: &Settings) -> Result<(QaModel, TrainReport)> {
    let mut model = build_model(config_path, settings)?;
    let report = model.train()?;
    tracing::info!(
        stages = report.fit.stages.len(),
        examples = report.train_examples,
        "Training complete"
    );
    Ok((model, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Example;
    use crate::pipeline::{ChainerDescription, ComponentSpec};

    fn model() -> QaModel {
        let chainer = ChainerDescription {
            inputs: vec!["q".to_string()],
            targets: vec!["y".to_string()],
            outputs: vec!["answers".to_string()],
            pipe: vec![
                ComponentSpec::new("tokenizer")
                    .with_inputs(["q"])
                    .with_outputs(["tok"])
                    .with_param("lemmatize", true),
                ComponentSpec::new("word_embedder")
                    .with_inputs(["tok"])
                    .with_outputs(["emb"]),
                ComponentSpec::new("mean_aggregator")
                    .with_inputs(["emb"])
                    .with_outputs(["vec"])
                    .with_param("dim", 300),
                ComponentSpec::new("cos_classifier")
                    .with_inputs(["vec"])
                    .with_outputs(["answers"])
                    .with_fit_on(["vec", "y"]),
            ],
        };
        let mut model = QaModel::from_description(
            PipelineDescription::from_chainer(chainer),
            &ComponentRegistry::new(),
        )
        .unwrap();
        model
            .train_on(&Dataset::from_train(vec![
                Example::new("What time does the library open?", "9am"),
                Example::new("When is the exam?", "June 5"),
            ]))
            .unwrap();
        model
    }

    #[test]
    fn test_ask() {
        let answer = model().ask("What time is the library open").unwrap();
        assert_eq!(answer.label, "9am");
    }

    #[test]
    fn test_ask_top_n() {
        let model = model();
        let answers = model.ask_top_n("When is the exam?", 5).unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].label, "June 5");
        assert!(answers[0].score >= answers[1].score);
    }

    #[test]
    fn test_ask_batch() {
        let answers = model()
            .ask_batch(&["When is the exam".to_string(), "library open time".to_string()])
            .unwrap();
        assert_eq!(answers[0].label, "June 5");
        assert_eq!(answers[1].label, "9am");
    }

    #[test]
    fn test_empty_question() {
        assert!(matches!(
            model().ask("   "),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_top_n() {
        assert!(matches!(
            model().ask_top_n("exam", 0),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_train_without_reader() {
        let mut model = model();
        assert!(matches!(model.train(), Err(PipelineError::ConfigError(_))));
    }
}
