//! Application settings
//!
//! TOML file at `~/.qachain/config.toml`, created with defaults on first
//! load. Pipeline descriptions are separate JSON documents; settings only
//! carry values shared by every pipeline.

use crate::pipeline::variables::expand_path;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Variable name that receives `paths.root` during substitution
pub const ROOT_PATH_VARIABLE: &str = "ROOT_PATH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathsSettings,

    #[serde(default)]
    pub qa: QaSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsSettings {
    /// Base directory for data and models, exposed as `{ROOT_PATH}`
    pub root: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaSettings {
    /// Stripped from the start of interactive input lines
    #[serde(default)]
    pub prefix: String,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Answers scoring below this are reported as not confident
    #[serde(default)]
    pub min_score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

fn default_top_n() -> usize {
    1
}

impl Default for PathsSettings {
    fn default() -> Self {
        Self {
            root: "~/.qachain".to_string(),
        }
    }
}

impl Default for QaSettings {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            top_n: default_top_n(),
            min_score: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "qachain=info".to_string(),
        }
    }
}

impl Settings {
    /// Load from `path`, or from the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load_default(),
        }
    }

    /// Load from the default location, creating it with defaults if missing
    pub fn load_default() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let settings = Settings::default();
            settings.save(&path)?;
            return Ok(settings);
        }
        Self::load_from_file(&path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, contents).context("Failed to write settings file")?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".qachain").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.paths.root.trim().is_empty() {
            bail!("paths.root must not be empty");
        }
        if self.qa.top_n == 0 {
            bail!("qa.top_n must be greater than 0");
        }
        if let Some(min_score) = self.qa.min_score {
            if !(-1.0..=1.0).contains(&min_score) {
                bail!("qa.min_score must be between -1.0 and 1.0");
            }
        }
        if self.logging.filter.trim().is_empty() {
            bail!("logging.filter must not be empty");
        }
        Ok(())
    }

    /// `paths.root` with `~` expanded
    pub fn root_path(&self) -> PathBuf {
        expand_path(&self.paths.root)
    }

    /// Substitution overrides handed to pipeline descriptions
    pub fn variables(&self) -> BTreeMap<String, String> {
        let mut variables = BTreeMap::new();
        variables.insert(
            ROOT_PATH_VARIABLE.to_string(),
            self.root_path().to_string_lossy().into_owned(),
        );
        variables
    }

    /// Remove the configured prefix from an input line
    pub fn strip_prefix<'a>(&self, line: &'a str) -> &'a str {
        let line = line.trim();
        if self.qa.prefix.is_empty() {
            return line;
        }
        line.strip_prefix(self.qa.prefix.as_str())
            .map(str::trim_start)
            .unwrap_or(line)
    }
}
