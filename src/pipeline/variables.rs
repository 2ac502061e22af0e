//! Path-template substitution over pipeline descriptions
//!
//! `metadata.variables` declares `NAME -> value` pairs. Values may reference
//! other variables as `{NAME}`; they are resolved to a fixed point before
//! every string in the document has its references replaced. A leading `~`
//! is expanded to the home directory.

use crate::errors::{PipelineError, Result};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Resolved substitution variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTable {
    values: BTreeMap<String, String>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve document variables, letting `overrides` win
    pub fn resolve(
        declared: &serde_json::Map<String, JsonValue>,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let mut values = BTreeMap::new();
        for (name, value) in declared {
            let text = match value {
                JsonValue::String(s) => s.clone(),
                JsonValue::Number(n) => n.to_string(),
                JsonValue::Bool(b) => b.to_string(),
                other => {
                    return Err(PipelineError::ConfigError(format!(
                        "variable '{}' must be a string, got {}",
                        name, other
                    )))
                }
            };
            values.insert(name.clone(), text);
        }
        for (name, value) in overrides {
            values.insert(name.clone(), value.clone());
        }

        // Each round inlines one more level of references; a chain can be at
        // most `len` deep without repeating a name.
        for _ in 0..=values.len() {
            let next: BTreeMap<String, String> = values
                .iter()
                .map(|(name, value)| (name.clone(), substitute(value, &values)))
                .collect();
            if next == values {
                break;
            }
            values = next;
        }

        for (name, value) in &values {
            if let Some(reference) = values.keys().find(|other| value.contains(&placeholder(other))) {
                return Err(PipelineError::ConfigError(format!(
                    "variable '{}' has a cyclic reference through '{}'",
                    name, reference
                )));
            }
        }

        let values = values
            .into_iter()
            .map(|(name, value)| (name, expand_home(&value)))
            .collect();
        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace references in one string
    pub fn substitute_str(&self, text: &str) -> String {
        expand_home(&substitute(text, &self.values))
    }

    /// Replace references in every string of a JSON tree, in place
    pub fn apply(&self, document: &mut JsonValue) {
        match document {
            JsonValue::String(s) => {
                let replaced = self.substitute_str(s);
                *s = replaced;
            }
            JsonValue::Array(items) => items.iter_mut().for_each(|item| self.apply(item)),
            JsonValue::Object(map) => map.values_mut().for_each(|item| self.apply(item)),
            _ => {}
        }
    }
}

fn placeholder(name: &str) -> String {
    format!("{{{}}}", name)
}

fn substitute(text: &str, values: &BTreeMap<String, String>) -> String {
    if !text.contains('{') {
        return text.to_string();
    }
    values.iter().fold(text.to_string(), |acc, (name, value)| {
        acc.replace(&placeholder(name), value)
    })
}

/// Expand a leading `~` to the home directory
pub fn expand_home(text: &str) -> String {
    let rest = match text.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return text.to_string(),
    };
    match dirs::home_dir() {
        Some(home) => {
            let mut path = home.to_string_lossy().into_owned();
            path.push_str(rest);
            path
        }
        None => text.to_string(),
    }
}

/// `expand_home` for paths
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(expand_home(path))
}
