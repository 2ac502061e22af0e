//! External resource declarations and existence checks
//!
//! Resources listed under `metadata.download` are never fetched here; the
//! check only reports which destinations are present on disk so that a
//! caller can fetch them by other means.

use crate::pipeline::PipelineDescription;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One `metadata.download` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDeclaration {
    pub url: String,

    /// Destination directory
    pub subdir: PathBuf,

    /// Remove the destination before unpacking
    #[serde(default)]
    pub clear: bool,

    /// Remove the downloaded archive after unpacking
    #[serde(default = "default_cleanup")]
    pub cleanup: bool,
}

fn default_cleanup() -> bool {
    true
}

/// Where a required path comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceOrigin {
    Download { url: String },
    Dataset,
    StageLoadPath { stage: usize, component: String, trainable: bool },
}

impl fmt::Display for ResourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceOrigin::Download { url } => write!(f, "download {}", url),
            ResourceOrigin::Dataset => write!(f, "dataset"),
            ResourceOrigin::StageLoadPath { stage, component, .. } => {
                write!(f, "stage {} ({}) load_path", stage, component)
            }
        }
    }
}

/// Existence of one required path
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceStatus {
    pub path: PathBuf,
    pub origin: ResourceOrigin,
    pub present: bool,
}

impl ResourceStatus {
    fn probe(path: &Path, origin: ResourceOrigin) -> Self {
        Self {
            path: path.to_path_buf(),
            present: path.exists(),
            origin,
        }
    }

    /// Missing and needed before inference can run; dataset files are only
    /// read by training
    pub fn blocks_inference(&self) -> bool {
        !self.present && !matches!(self.origin, ResourceOrigin::Dataset)
    }
}

/// Every path a description depends on, with its presence on disk
pub fn check_resources(description: &PipelineDescription) -> Vec<ResourceStatus> {
    let mut statuses: Vec<ResourceStatus> = description
        .metadata
        .download
        .iter()
        .map(|resource| {
            ResourceStatus::probe(
                &resource.subdir,
                ResourceOrigin::Download {
                    url: resource.url.clone(),
                },
            )
        })
        .collect();

    if let Some(reader) = &description.dataset_reader {
        let path = match &reader.train {
            Some(train) => reader.data_path.join(train),
            None => reader.data_path.clone(),
        };
        statuses.push(ResourceStatus::probe(&path, ResourceOrigin::Dataset));
    }

    for (index, spec) in description.chainer.pipe.iter().enumerate() {
        if let Some(path) = &spec.load_path {
            statuses.push(ResourceStatus::probe(
                path,
                ResourceOrigin::StageLoadPath {
                    stage: index,
                    component: spec.label().to_string(),
                    trainable: !spec.fit_on.is_empty(),
                },
            ));
        }
    }

    let missing = statuses.iter().filter(|s| !s.present).count();
    if missing > 0 {
        tracing::warn!(missing, total = statuses.len(), "Pipeline resources missing");
    } else {
        tracing::debug!(total = statuses.len(), "All pipeline resources present");
    }
    statuses
}

/// Missing entries only
pub fn missing_resources(description: &PipelineDescription) -> Vec<ResourceStatus> {
    check_resources(description)
        .into_iter()
        .filter(|s| !s.present)
        .collect()
}
