//! Pipeline graph (chainer)
//!
//! An ordered list of stages wired together by variable names. `build`
//! validates the wiring once; `run` executes every stage in order for one
//! batch; `fit` trains each trainable stage on the accumulated output of the
//! stages before it.

use crate::components::{Component, ComponentRegistry};
use crate::data::Batch;
use crate::errors::{PipelineError, Result};
use crate::pipeline::description::{ChainerDescription, ComponentSpec};
use crate::pipeline::namespace::VariableNamespace;
use crate::types::Value;
use std::collections::HashSet;
use std::path::PathBuf;

/// A component together with its declared wiring
#[derive(Debug)]
pub struct Stage {
    index: usize,
    spec: ComponentSpec,
    component: Component,
}

impl Stage {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn spec(&self) -> &ComponentSpec {
        &self.spec
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn label(&self) -> &str {
        self.spec.label()
    }

    /// Whether `fit` will train this stage
    pub fn is_fit_target(&self) -> bool {
        !self.spec.fit_on.is_empty()
    }
}

/// Summary of one trained stage
#[derive(Debug, Clone, PartialEq)]
pub struct FittedStage {
    pub index: usize,
    pub component: String,
    pub examples: usize,
    pub batches: usize,
    pub saved_to: Option<PathBuf>,
}

/// Result of `PipelineGraph::fit`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitReport {
    pub stages: Vec<FittedStage>,
}

impl FitReport {
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Validated, executable pipeline
#[derive(Debug)]
pub struct PipelineGraph {
    inputs: Vec<String>,
    targets: Vec<String>,
    outputs: Vec<String>,
    stages: Vec<Stage>,
}

impl PipelineGraph {
    /// Construct every stage and check the wiring
    pub fn build(description: &ChainerDescription, registry: &ComponentRegistry) -> Result<Self> {
        if description.inputs.is_empty() {
            return Err(PipelineError::ConfigError(
                "chainer declares no inputs".to_string(),
            ));
        }
        if description.pipe.is_empty() {
            return Err(PipelineError::ConfigError(
                "chainer declares no stages".to_string(),
            ));
        }

        let targets: HashSet<&str> = description.targets.iter().map(String::as_str).collect();
        let mut available: HashSet<&str> = description.inputs.iter().map(String::as_str).collect();
        let mut stages = Vec::with_capacity(description.pipe.len());

        for (index, spec) in description.pipe.iter().enumerate() {
            let component = registry
                .create(&spec.class_name, &spec.component_params())
                .map_err(|e| e.at_stage(index, spec.label()))?;
            check_arity(index, spec, &component)?;

            for variable in &spec.inputs {
                if !available.contains(variable.as_str()) {
                    return Err(unresolved(index, spec, variable));
                }
            }
            for variable in &spec.fit_on {
                if !available.contains(variable.as_str()) && !targets.contains(variable.as_str()) {
                    return Err(unresolved(index, spec, variable));
                }
            }
            if spec.save_path.is_some() && !component.is_persistable() {
                tracing::warn!(
                    stage = index,
                    component = spec.label(),
                    "save_path ignored: component has no persistent state"
                );
            }
            if spec.load_path.is_some() && !component.reads_load_path() {
                tracing::warn!(
                    stage = index,
                    component = spec.label(),
                    "load_path ignored: component reads no stored state"
                );
            }

            available.extend(spec.outputs.iter().map(String::as_str));
            stages.push(Stage {
                index,
                spec: spec.clone(),
                component,
            });
        }

        for variable in &description.outputs {
            if !available.contains(variable.as_str()) {
                return Err(PipelineError::UnresolvedVariable {
                    stage: stages.len(),
                    component: "chainer".to_string(),
                    variable: variable.clone(),
                });
            }
        }

        tracing::info!(
            stages = stages.len(),
            trainable = stages.iter().filter(|s| s.is_fit_target()).count(),
            "Built pipeline graph"
        );

        Ok(Self {
            inputs: description.inputs.clone(),
            targets: description.targets.clone(),
            outputs: description.outputs.clone(),
            stages,
        })
    }

    /// Execute all stages for one batch and return the `out` values
    pub fn run(&self, inputs: Vec<Value>) -> Result<Vec<Value>> {
        let namespace = self.run_prefix(self.stages.len(), inputs)?;
        self.outputs
            .iter()
            .map(|name| {
                namespace
                    .get(name)
                    .cloned()
                    .ok_or_else(|| PipelineError::MissingVariable {
                        stage: self.stages.len(),
                        component: "chainer".to_string(),
                        variable: name.clone(),
                    })
            })
            .collect()
    }

    /// Execute stages `0..end` and return the resulting namespace
    pub fn run_prefix(&self, end: usize, inputs: Vec<Value>) -> Result<VariableNamespace> {
        let mut namespace = self.seed(inputs, Vec::new())?;
        self.execute_range(end, &mut namespace)?;
        Ok(namespace)
    }

    /// Train every stage that declares `fit_on`, in declared order
    ///
    /// `batches` is called once per trainable stage and must yield the full
    /// batch sequence each time.
    pub fn fit<F, I>(&mut self, mut batches: F) -> Result<FitReport>
    where
        F: FnMut() -> I,
        I: IntoIterator<Item = Batch>,
    {
        let mut report = FitReport::default();
        for index in self.trainable_stages() {
            report.stages.push(self.fit_stage(index, &mut batches)?);
        }
        Ok(report)
    }

    /// Train a single stage on the accumulated output of its prefix
    pub fn fit_stage<F, I>(&mut self, index: usize, batches: &mut F) -> Result<FittedStage>
    where
        F: FnMut() -> I,
        I: IntoIterator<Item = Batch>,
    {
        let stage = self.stages.get(index).ok_or_else(|| {
            PipelineError::InvalidArgument(format!("no stage at index {}", index))
        })?;
        if !stage.is_fit_target() {
            return Err(PipelineError::InvalidArgument(format!(
                "stage {} ({}) declares no fit_on variables",
                index,
                stage.label()
            )));
        }

        let mut accumulated: Option<Vec<Value>> = None;
        let mut batch_count = 0;
        for batch in batches() {
            let (x, y) = batch.into_values();
            let mut namespace = self.seed(x, y)?;
            self.execute_range(index, &mut namespace)?;

            let stage = &self.stages[index];
            let data = stage
                .spec
                .fit_on
                .iter()
                .map(|name| namespace.read(index, stage.label(), name))
                .collect::<Result<Vec<_>>>()?;

            accumulated = Some(match accumulated.take() {
                None => data,
                Some(mut so_far) => {
                    for (total, part) in so_far.iter_mut().zip(data) {
                        total
                            .extend(part)
                            .map_err(|e| e.at_stage(index, stage.label()))?;
                    }
                    so_far
                }
            });
            batch_count += 1;
        }

        let stage = &mut self.stages[index];
        let label = stage.label().to_string();
        let data = accumulated.ok_or_else(|| {
            PipelineError::MalformedSource(format!(
                "no training batches for stage {} ({})",
                index, label
            ))
        })?;
        let examples = data.first().map_or(0, Value::len);

        stage
            .component
            .fit(data)
            .map_err(|e| e.at_stage(index, &label))?;
        tracing::info!(stage = index, component = %label, examples, batches = batch_count, "Fitted stage");

        let saved_to = match &stage.spec.save_path {
            Some(path) if stage.component.is_persistable() => {
                stage
                    .component
                    .save(path)
                    .map_err(|e| e.at_stage(index, &label))?;
                tracing::info!(stage = index, path = %path.display(), "Saved fitted state");
                Some(path.clone())
            }
            _ => None,
        };

        Ok(FittedStage {
            index,
            component: label,
            examples,
            batches: batch_count,
            saved_to,
        })
    }

    /// Indices of stages trained by `fit`
    pub fn trainable_stages(&self) -> Vec<usize> {
        self.stages
            .iter()
            .filter(|s| s.is_fit_target())
            .map(Stage::index)
            .collect()
    }

    /// Stage with the given id or class name
    pub fn find_stage(&self, label: &str) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|s| s.label() == label || s.spec.class_name == label)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Fresh namespace bound to graph inputs and, when given, targets
    fn seed(&self, inputs: Vec<Value>, targets: Vec<Value>) -> Result<VariableNamespace> {
        if inputs.len() != self.inputs.len() {
            return Err(PipelineError::InvalidArgument(format!(
                "graph takes {} inputs, got {}",
                self.inputs.len(),
                inputs.len()
            )));
        }
        if !targets.is_empty() && !self.targets.is_empty() && targets.len() != self.targets.len() {
            return Err(PipelineError::InvalidArgument(format!(
                "graph takes {} targets, got {}",
                self.targets.len(),
                targets.len()
            )));
        }

        let mut namespace = VariableNamespace::new();
        for (name, value) in self.inputs.iter().zip(inputs) {
            namespace.insert(name.clone(), value);
        }
        for (name, value) in self.targets.iter().zip(targets) {
            namespace.insert(name.clone(), value);
        }
        Ok(namespace)
    }

    fn execute_range(&self, end: usize, namespace: &mut VariableNamespace) -> Result<()> {
        for stage in &self.stages[..end.min(self.stages.len())] {
            execute_stage(stage, namespace)?;
        }
        Ok(())
    }
}

fn execute_stage(stage: &Stage, namespace: &mut VariableNamespace) -> Result<()> {
    let inputs = stage
        .spec
        .inputs
        .iter()
        .map(|name| namespace.read(stage.index, stage.label(), name))
        .collect::<Result<Vec<_>>>()?;

    let outputs = stage
        .component
        .infer(inputs)
        .map_err(|e| e.at_stage(stage.index, stage.label()))?;
    if outputs.len() != stage.spec.outputs.len() {
        return Err(PipelineError::InvalidArgument(format!(
            "produced {} outputs, {} declared",
            outputs.len(),
            stage.spec.outputs.len()
        ))
        .at_stage(stage.index, stage.label()));
    }

    for (name, value) in stage.spec.outputs.iter().zip(outputs) {
        namespace.insert(name.clone(), value);
    }
    tracing::debug!(
        pass = %namespace.pass_id(),
        stage = stage.index,
        component = stage.label(),
        "Executed stage"
    );
    Ok(())
}

fn check_arity(index: usize, spec: &ComponentSpec, component: &Component) -> Result<()> {
    let arity = component.arity();
    let mismatch = |what: &str, declared: usize, expected: usize| {
        PipelineError::ConfigError(format!(
            "stage {} ({}) declares {} {} variables, {} takes {}",
            index,
            spec.label(),
            declared,
            what,
            component.kind(),
            expected
        ))
    };

    if spec.inputs.len() != arity.inputs {
        return Err(mismatch("in", spec.inputs.len(), arity.inputs));
    }
    if spec.outputs.len() != arity.outputs {
        return Err(mismatch("out", spec.outputs.len(), arity.outputs));
    }
    if !spec.fit_on.is_empty() {
        if !component.is_trainable() {
            return Err(PipelineError::ConfigError(format!(
                "stage {} ({}) declares fit_on but {} is not trainable",
                index,
                spec.label(),
                component.kind()
            )));
        }
        if spec.fit_on.len() != arity.fit_on {
            return Err(mismatch("fit_on", spec.fit_on.len(), arity.fit_on));
        }
    }
    Ok(())
}

fn unresolved(index: usize, spec: &ComponentSpec, variable: &str) -> PipelineError {
    PipelineError::UnresolvedVariable {
        stage: index,
        component: spec.label().to_string(),
        variable: variable.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chainer(pipe: Vec<ComponentSpec>) -> ChainerDescription {
        ChainerDescription {
            inputs: vec!["q".to_string()],
            targets: vec!["y".to_string()],
            outputs: vec!["answers".to_string()],
            pipe,
        }
    }

    fn qa_pipe() -> Vec<ComponentSpec> {
        vec![
            ComponentSpec::new("tokenizer")
                .with_inputs(["q"])
                .with_outputs(["q_tok"])
                .with_param("lemmatize", true),
            ComponentSpec::new("word_embedder")
                .with_inputs(["q_tok"])
                .with_outputs(["q_emb"])
                .with_param("dim", 16),
            ComponentSpec::new("mean_aggregator")
                .with_inputs(["q_emb"])
                .with_outputs(["q_vect"])
                .with_param("dim", 16),
            ComponentSpec::new("cos_classifier")
                .with_inputs(["q_vect"])
                .with_outputs(["answers"])
                .with_fit_on(["q_vect", "y"]),
        ]
    }

    fn batch(pairs: &[(&str, &str)]) -> Batch {
        Batch {
            x: pairs.iter().map(|(x, _)| x.to_string()).collect(),
            y: pairs.iter().map(|(_, y)| y.to_string()).collect(),
        }
    }

    fn texts(items: &[&str]) -> Value {
        Value::Texts(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_build_valid_graph() {
        let graph = PipelineGraph::build(&chainer(qa_pipe()), &ComponentRegistry::new()).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.trainable_stages(), vec![3]);
        assert!(graph.find_stage("cos_classifier").is_some());
    }

    #[test]
    fn test_unresolved_input() {
        let mut pipe = qa_pipe();
        pipe[2].inputs = vec!["q_embeddings".to_string()];
        let err = PipelineGraph::build(&chainer(pipe), &ComponentRegistry::new()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnresolvedVariable { stage: 2, ref variable, .. } if variable == "q_embeddings"
        ));
    }

    #[test]
    fn test_input_produced_later_is_unresolved() {
        let mut pipe = qa_pipe();
        pipe.swap(1, 2);
        let err = PipelineGraph::build(&chainer(pipe), &ComponentRegistry::new()).unwrap_err();
        assert!(matches!(err, PipelineError::UnresolvedVariable { stage: 1, .. }));
    }

    #[test]
    fn test_unresolved_fit_on() {
        let mut pipe = qa_pipe();
        pipe[3].fit_on = vec!["q_vect".to_string(), "labels".to_string()];
        let err = PipelineGraph::build(&chainer(pipe), &ComponentRegistry::new()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnresolvedVariable { stage: 3, ref variable, .. } if variable == "labels"
        ));
    }

    #[test]
    fn test_unproduced_output() {
        let mut description = chainer(qa_pipe());
        description.outputs = vec!["scores".to_string()];
        let err = PipelineGraph::build(&description, &ComponentRegistry::new()).unwrap_err();
        assert!(matches!(err, PipelineError::UnresolvedVariable { stage: 4, .. }));
    }

    #[test]
    fn test_fit_on_non_trainable() {
        let mut pipe = qa_pipe();
        pipe[0].fit_on = vec!["q".to_string()];
        let err = PipelineGraph::build(&chainer(pipe), &ComponentRegistry::new()).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(ref m) if m.contains("not trainable")));
    }

    #[test]
    fn test_arity_mismatch() {
        let mut pipe = qa_pipe();
        pipe[0].outputs = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            PipelineGraph::build(&chainer(pipe), &ComponentRegistry::new()),
            Err(PipelineError::ConfigError(_))
        ));
    }

    #[test]
    fn test_unknown_component_is_stage_error() {
        let mut pipe = qa_pipe();
        pipe[1].class_name = "glove".to_string();
        let err = PipelineGraph::build(&chainer(pipe), &ComponentRegistry::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Stage { stage: 1, .. }));
        assert!(matches!(err.root(), PipelineError::UnknownComponent { .. }));
    }

    #[test]
    fn test_run_before_fit_reports_stage() {
        let graph = PipelineGraph::build(&chainer(qa_pipe()), &ComponentRegistry::new()).unwrap();
        let err = graph.run(vec![texts(&["hello"])]).unwrap_err();
        assert!(matches!(err, PipelineError::Stage { stage: 3, .. }));
        assert!(matches!(err.root(), PipelineError::EmptyIndex));
    }

    #[test]
    fn test_run_wrong_input_count() {
        let graph = PipelineGraph::build(&chainer(qa_pipe()), &ComponentRegistry::new()).unwrap();
        assert!(matches!(
            graph.run(vec![]),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_fit_accumulates_batches_and_saves() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("models").join("index.json");
        let mut pipe = qa_pipe();
        pipe[3].save_path = Some(path.clone());

        let mut graph = PipelineGraph::build(&chainer(pipe), &ComponentRegistry::new()).unwrap();
        let mut calls = 0;
        let report = graph
            .fit(|| {
                calls += 1;
                vec![
                    batch(&[("library hours", "9am")]),
                    batch(&[("exam date", "June 5"), ("parking", "Lot B")]),
                ]
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(report.stages.len(), 1);
        assert_eq!(report.stages[0].examples, 3);
        assert_eq!(report.stages[0].batches, 2);
        assert_eq!(report.stages[0].saved_to.as_deref(), Some(path.as_path()));
        assert!(path.exists());

        let classifier = graph.stages()[3].component().as_classifier().unwrap();
        assert_eq!(classifier.len(), 3);

        let outputs = graph.run(vec![texts(&["exam date"])]).unwrap();
        assert_eq!(
            outputs[0].top_labels().unwrap(),
            vec![Some("June 5".to_string())]
        );
    }

    #[test]
    fn test_fit_save_failure_is_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("models");
        std::fs::write(&blocker, "not a directory").unwrap();
        let mut pipe = qa_pipe();
        pipe[3].save_path = Some(blocker.join("index.json"));

        let mut graph = PipelineGraph::build(&chainer(pipe), &ComponentRegistry::new()).unwrap();
        let result = graph.fit(|| vec![batch(&[("library hours", "9am")])]);
        let err = result.unwrap_err();
        assert!(matches!(err, PipelineError::Stage { stage: 3, .. }));
        assert!(matches!(err.root(), PipelineError::IoError(_)));
        assert!(!blocker.join("index.json").exists());
    }

    #[test]
    fn test_repeated_output_name() {
        let mut description = chainer(qa_pipe());
        description.outputs = vec!["answers".to_string(), "answers".to_string()];
        let mut graph = PipelineGraph::build(&description, &ComponentRegistry::new()).unwrap();
        graph
            .fit(|| vec![batch(&[("library hours", "9am"), ("exam date", "June 5")])])
            .unwrap();
        let outputs = graph.run(vec![texts(&["exam date"])]).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn test_ignored_load_path_still_builds() {
        let mut pipe = qa_pipe();
        pipe[0].load_path = Some(PathBuf::from("/nonexistent/tokenizer.json"));
        pipe[2].load_path = Some(PathBuf::from("/nonexistent/aggregator.json"));
        assert!(PipelineGraph::build(&chainer(pipe), &ComponentRegistry::new()).is_ok());
    }

    #[test]
    fn test_fit_without_batches() {
        let mut graph =
            PipelineGraph::build(&chainer(qa_pipe()), &ComponentRegistry::new()).unwrap();
        let err = graph.fit(Vec::<Batch>::new).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedSource(_)));
    }

    #[test]
    fn test_run_is_deterministic() {
        let mut graph =
            PipelineGraph::build(&chainer(qa_pipe()), &ComponentRegistry::new()).unwrap();
        graph
            .fit(|| vec![batch(&[("library hours", "9am"), ("exam date", "June 5")])])
            .unwrap();
        let first = graph.run(vec![texts(&["when is the exam"])]).unwrap();
        let second = graph.run(vec![texts(&["when is the exam"])]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fit_stage_rejects_non_trainable() {
        let mut graph =
            PipelineGraph::build(&chainer(qa_pipe()), &ComponentRegistry::new()).unwrap();
        let mut batches = || vec![batch(&[("q", "a")])];
        assert!(matches!(
            graph.fit_stage(0, &mut batches),
            Err(PipelineError::InvalidArgument(_))
        ));
    }
}
