//! Tabular dataset reader
//!
//! Reads (question, answer) examples from CSV, TSV or JSON files. Column
//! names for the input and the label are taken from the reader descriptor,
//! so the same reader serves any FAQ-style table.

use crate::data::dataset::{Dataset, Example, TEST, TRAIN, VALID};
use crate::errors::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::path::{Path, PathBuf};

/// Reader identifiers accepted in `dataset_reader.class_name`
pub const READER_CLASSES: &[&str] = &["faq_reader", "tabular_reader"];

/// Seed used for the held-out split when none is configured
const DEFAULT_SPLIT_SEED: u64 = 42;

/// On-disk layout of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Tsv,
    Json,
}

impl SourceFormat {
    /// Guess from the file extension, defaulting to CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tsv") => SourceFormat::Tsv,
            Some("json") => SourceFormat::Json,
            _ => SourceFormat::Csv,
        }
    }
}

/// `dataset_reader` section of a pipeline description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    #[serde(default = "default_reader_class")]
    pub class_name: String,

    /// Directory holding the split files, or the train file itself
    pub data_path: PathBuf,

    /// Train file name relative to `data_path`
    #[serde(default)]
    pub train: Option<String>,

    #[serde(default)]
    pub valid: Option<String>,

    #[serde(default)]
    pub test: Option<String>,

    /// Input column
    #[serde(default = "default_x")]
    pub x: String,

    /// Label column
    #[serde(default = "default_y")]
    pub y: String,

    /// Explicit format; otherwise guessed per file from its extension
    #[serde(default)]
    pub format: Option<SourceFormat>,

    /// Hold out this share of `train` as `valid` when no valid file is given
    #[serde(default)]
    pub valid_fraction: Option<f64>,

    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_reader_class() -> String {
    "faq_reader".to_string()
}

fn default_x() -> String {
    "Question".to_string()
}

fn default_y() -> String {
    "Answer".to_string()
}

impl ReaderConfig {
    /// Reader for a single train file with the given columns
    pub fn new(data_path: impl Into<PathBuf>, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            class_name: default_reader_class(),
            data_path: data_path.into(),
            train: None,
            valid: None,
            test: None,
            x: x.into(),
            y: y.into(),
            format: None,
            valid_fraction: None,
            seed: None,
        }
    }

    fn split_path(&self, file: Option<&str>) -> PathBuf {
        match file {
            Some(name) => self.data_path.join(name),
            None => self.data_path.clone(),
        }
    }
}

/// Loads a `Dataset` from a reader descriptor
pub struct DatasetReader;

impl DatasetReader {
    /// Read every configured split
    pub fn load(config: &ReaderConfig) -> Result<Dataset> {
        if !READER_CLASSES.contains(&config.class_name.as_str()) {
            return Err(PipelineError::UnknownComponent {
                name: config.class_name.clone(),
            });
        }

        let mut train = Self::read_file(
            &config.split_path(config.train.as_deref()),
            config.format,
            &config.x,
            &config.y,
        )?;

        let mut dataset = Dataset::new();

        if let Some(valid) = &config.valid {
            let examples = Self::read_file(
                &config.data_path.join(valid),
                config.format,
                &config.x,
                &config.y,
            )?;
            dataset = dataset.with_split(VALID, examples);
        } else if let Some(fraction) = config.valid_fraction {
            let held_out = hold_out(&mut train, fraction, config.seed)?;
            dataset = dataset.with_split(VALID, held_out);
        }

        if let Some(test) = &config.test {
            let examples = Self::read_file(
                &config.data_path.join(test),
                config.format,
                &config.x,
                &config.y,
            )?;
            dataset = dataset.with_split(TEST, examples);
        }

        if train.is_empty() {
            return Err(PipelineError::MalformedSource(
                "train split has no examples".to_string(),
            ));
        }

        tracing::info!(
            train = train.len(),
            valid = dataset.split(VALID).len(),
            test = dataset.split(TEST).len(),
            "Loaded dataset"
        );
        Ok(dataset.with_split(TRAIN, train))
    }

    /// Read one source file into examples
    pub fn read_file(
        path: &Path,
        format: Option<SourceFormat>,
        x: &str,
        y: &str,
    ) -> Result<Vec<Example>> {
        if !path.is_file() {
            return Err(PipelineError::MissingResource {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path)?;
        let format = format.unwrap_or_else(|| SourceFormat::from_path(path));

        let examples = match format {
            SourceFormat::Csv => parse_table(&contents, ',', x, y),
            SourceFormat::Tsv => parse_table(&contents, '\t', x, y),
            SourceFormat::Json => parse_json(&contents, x, y),
        }
        .map_err(|e| match e {
            PipelineError::MalformedSource(reason) => {
                PipelineError::MalformedSource(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })?;

        if examples.is_empty() {
            return Err(PipelineError::MalformedSource(format!(
                "{}: source has no examples",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), examples = examples.len(), "Read source file");
        Ok(examples)
    }
}

/// Move a seeded random `fraction` of `train` into a new split
fn hold_out(train: &mut Vec<Example>, fraction: f64, seed: Option<u64>) -> Result<Vec<Example>> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(PipelineError::InvalidArgument(format!(
            "valid_fraction must be in (0, 1), got {}",
            fraction
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed.unwrap_or(DEFAULT_SPLIT_SEED));
    train.shuffle(&mut rng);

    let held = ((train.len() as f64) * fraction).round() as usize;
    let split_at = train.len() - held.min(train.len());
    Ok(train.split_off(split_at))
}

/// Parse a delimited table with a header row into examples
pub fn parse_table(contents: &str, delimiter: char, x: &str, y: &str) -> Result<Vec<Example>> {
    let mut records = parse_delimited(contents, delimiter)?.into_iter();
    let header = records
        .next()
        .ok_or_else(|| PipelineError::MalformedSource("source is empty".to_string()))?;

    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| PipelineError::MalformedSource(format!("missing column '{}'", name)))
    };
    let (xi, yi) = (column(x)?, column(y)?);

    records
        .enumerate()
        .map(|(row, record)| {
            if record.len() != header.len() {
                return Err(PipelineError::MalformedSource(format!(
                    "row {} has {} fields, header has {}",
                    row + 2,
                    record.len(),
                    header.len()
                )));
            }
            Ok(Example::new(record[xi].trim(), record[yi].trim()))
        })
        .collect()
}

/// Split delimited text into records, honouring double-quoted fields
///
/// Quotes inside a quoted field are escaped by doubling. Blank lines are
/// dropped.
pub fn parse_delimited(contents: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = contents.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' && field.is_empty() {
            in_quotes = true;
        } else if c == delimiter {
            record.push(std::mem::take(&mut field));
        } else if c == '\n' {
            record.push(std::mem::take(&mut field));
            records.push(std::mem::take(&mut record));
        } else if c != '\r' {
            field.push(c);
        }
    }

    if in_quotes {
        return Err(PipelineError::MalformedSource(
            "unterminated quoted field".to_string(),
        ));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records
        .into_iter()
        .filter(|r| !(r.len() == 1 && r[0].trim().is_empty()))
        .collect())
}

/// Parse a JSON array of objects into examples
pub fn parse_json(contents: &str, x: &str, y: &str) -> Result<Vec<Example>> {
    let rows: Vec<Map<String, JsonValue>> = serde_json::from_str(contents)
        .map_err(|e| PipelineError::MalformedSource(format!("invalid JSON: {}", e)))?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let field = |name: &str| match row.get(name) {
                Some(JsonValue::String(s)) => Ok(s.trim().to_string()),
                Some(JsonValue::Number(n)) => Ok(n.to_string()),
                _ => Err(PipelineError::MalformedSource(format!(
                    "record {} lacks string column '{}'",
                    i, name
                ))),
            };
            Ok(Example::new(field(x)?, field(y)?))
        })
        .collect()
}
