//! Parameter mapping handed to component factories
//!
//! Stage descriptors carry arbitrary extra keys next to the wiring fields;
//! this wrapper gives factories typed accessors that fail with
//! `InvalidArgument` when a key holds the wrong JSON type.

use crate::errors::{PipelineError, Result};
use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};

/// Construction parameters for one component
#[derive(Debug, Clone, Default)]
pub struct ComponentParams {
    values: Map<String, JsonValue>,
    load_path: Option<PathBuf>,
    save_path: Option<PathBuf>,
}

impl ComponentParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a JSON object
    pub fn from_map(values: Map<String, JsonValue>) -> Self {
        Self {
            values,
            ..Default::default()
        }
    }

    /// Set a parameter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set the persisted-state load path
    pub fn with_load_path(mut self, path: Option<PathBuf>) -> Self {
        self.load_path = path;
        self
    }

    /// Set the persisted-state save path
    pub fn with_save_path(mut self, path: Option<PathBuf>) -> Self {
        self.save_path = path;
        self
    }

    pub fn load_path(&self) -> Option<&Path> {
        self.load_path.as_deref()
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    /// Check if a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Read an integer parameter, allowing negative values
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.values.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| {
                PipelineError::InvalidArgument(format!("'{}' must be an integer, got {}", key, value))
            }),
        }
    }

    /// Read a strictly positive integer parameter
    pub fn get_positive(&self, key: &str) -> Result<Option<usize>> {
        match self.get_i64(key)? {
            None => Ok(None),
            Some(n) if n > 0 => Ok(Some(n as usize)),
            Some(n) => Err(PipelineError::InvalidArgument(format!(
                "'{}' must be greater than 0, got {}",
                key, n
            ))),
        }
    }

    /// Read a boolean parameter with a default
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.values.get(key) {
            None | Some(JsonValue::Null) => Ok(default),
            Some(JsonValue::Bool(b)) => Ok(*b),
            Some(other) => Err(PipelineError::InvalidArgument(format!(
                "'{}' must be a boolean, got {}",
                key, other
            ))),
        }
    }

    /// Read a string parameter
    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.values.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(PipelineError::InvalidArgument(format!(
                "'{}' must be a string, got {}",
                key, other
            ))),
        }
    }

    /// Read a list of strings; absent means empty
    pub fn get_string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.values.get(key) {
            None | Some(JsonValue::Null) => Ok(Vec::new()),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        PipelineError::InvalidArgument(format!(
                            "'{}' must contain only strings",
                            key
                        ))
                    })
                })
                .collect(),
            Some(other) => Err(PipelineError::InvalidArgument(format!(
                "'{}' must be a list of strings, got {}",
                key, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_rejects_zero_and_negative() {
        let params = ComponentParams::new().with("top_n", 0).with("dim", -3);
        assert!(matches!(
            params.get_positive("top_n"),
            Err(PipelineError::InvalidArgument(_))
        ));
        assert!(params.get_positive("dim").is_err());
        assert_eq!(params.get_positive("missing").unwrap(), None);
    }

    #[test]
    fn test_bool_default_and_type_check() {
        let params = ComponentParams::new().with("lemmatize", "yes");
        assert!(params.get_bool("lowercase", true).unwrap());
        assert!(params.get_bool("lemmatize", false).is_err());
    }

    #[test]
    fn test_string_list() {
        let params = ComponentParams::new().with("stopwords", vec!["the", "a"]);
        assert_eq!(
            params.get_string_list("stopwords").unwrap(),
            vec!["the".to_string(), "a".to_string()]
        );
        assert!(params.get_string_list("other").unwrap().is_empty());
    }

    #[test]
    fn test_paths() {
        let params = ComponentParams::new()
            .with_load_path(Some(PathBuf::from("/tmp/a.json")))
            .with_save_path(None);
        assert_eq!(params.load_path(), Some(Path::new("/tmp/a.json")));
        assert!(params.save_path().is_none());
    }
}
