//! Pipeline description documents
//!
//! A description is a JSON object with `dataset_reader`, `dataset_iterator`,
//! `chainer`, `train` and `metadata` sections. Loading runs variable
//! substitution over the raw JSON tree first, then deserializes the result.

use crate::components::ComponentParams;
use crate::data::{IteratorConfig, ReaderConfig};
use crate::errors::{PipelineError, Result};
use crate::pipeline::variables::VariableTable;
use crate::resources::ResourceDeclaration;
use crate::training::TrainConfig;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Whole pipeline description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDescription {
    #[serde(default)]
    pub dataset_reader: Option<ReaderConfig>,

    #[serde(default)]
    pub dataset_iterator: IteratorConfig,

    pub chainer: ChainerDescription,

    #[serde(default)]
    pub train: TrainConfig,

    #[serde(default)]
    pub metadata: Metadata,
}

/// Stage list plus graph inputs and outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainerDescription {
    #[serde(rename = "in", deserialize_with = "one_or_many")]
    pub inputs: Vec<String>,

    #[serde(rename = "in_y", default, deserialize_with = "one_or_many")]
    pub targets: Vec<String>,

    #[serde(rename = "out", deserialize_with = "one_or_many")]
    pub outputs: Vec<String>,

    pub pipe: Vec<ComponentSpec>,
}

/// One stage entry of `chainer.pipe`
///
/// Keys other than the wiring fields are passed to the component factory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub class_name: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(rename = "in", default, deserialize_with = "one_or_many")]
    pub inputs: Vec<String>,

    #[serde(rename = "out", default, deserialize_with = "one_or_many")]
    pub outputs: Vec<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub fit_on: Vec<String>,

    #[serde(default)]
    pub load_path: Option<PathBuf>,

    #[serde(default)]
    pub save_path: Option<PathBuf>,

    #[serde(flatten)]
    pub params: Map<String, JsonValue>,
}

impl ComponentSpec {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            id: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            fit_on: Vec::new(),
            load_path: None,
            save_path: None,
            params: Map::new(),
        }
    }

    pub fn with_inputs<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.inputs = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outputs<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.outputs = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fit_on<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.fit_on = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_load_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.load_path = Some(path.into());
        self
    }

    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    /// Name used in logs and errors: the stage id if set, else the class
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.class_name)
    }

    /// Parameters handed to the component factory
    pub fn component_params(&self) -> ComponentParams {
        ComponentParams::from_map(self.params.clone())
            .with_load_path(self.load_path.clone())
            .with_save_path(self.save_path.clone())
    }
}

/// `metadata` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub variables: Map<String, JsonValue>,

    #[serde(default)]
    pub download: Vec<ResourceDeclaration>,
}

impl PipelineDescription {
    /// Read and substitute a description file
    pub fn from_file(path: &Path, overrides: &BTreeMap<String, String>) -> Result<Self> {
        if !path.is_file() {
            return Err(PipelineError::MissingResource {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path)?;
        let description = Self::from_str(&contents, overrides).map_err(|e| match e {
            PipelineError::ConfigError(reason) => {
                PipelineError::ConfigError(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })?;
        tracing::info!(
            path = %path.display(),
            stages = description.chainer.pipe.len(),
            "Loaded pipeline description"
        );
        Ok(description)
    }

    /// Parse and substitute a description held in memory
    pub fn from_str(contents: &str, overrides: &BTreeMap<String, String>) -> Result<Self> {
        let document: JsonValue = serde_json::from_str(contents)
            .map_err(|e| PipelineError::ConfigError(format!("invalid JSON: {}", e)))?;
        Self::from_value(document, overrides)
    }

    /// Substitute variables in a JSON tree and deserialize it
    pub fn from_value(mut document: JsonValue, overrides: &BTreeMap<String, String>) -> Result<Self> {
        let declared = document
            .pointer("/metadata/variables")
            .and_then(JsonValue::as_object)
            .cloned()
            .unwrap_or_default();
        let table = VariableTable::resolve(&declared, overrides)?;
        table.apply(&mut document);

        serde_json::from_value(document)
            .map_err(|e| PipelineError::ConfigError(format!("invalid pipeline description: {}", e)))
    }

    /// Description with only a chainer section
    pub fn from_chainer(chainer: ChainerDescription) -> Self {
        Self {
            dataset_reader: None,
            dataset_iterator: IteratorConfig::default(),
            chainer,
            train: TrainConfig::default(),
            metadata: Metadata::default(),
        }
    }
}

/// Accept either `"name"` or `["a", "b"]`
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(name) => vec![name],
        OneOrMany::Many(names) => names,
    })
}
