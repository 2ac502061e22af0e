//! Per-pass variable store

use crate::errors::{PipelineError, Result};
use crate::types::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Named values produced during one execution pass
///
/// A namespace is created by `PipelineGraph::run` (or per batch during a fit
/// prefix) and dropped at the end of the pass.
#[derive(Debug)]
pub struct VariableNamespace {
    pass_id: Uuid,
    values: HashMap<String, Value>,
}

impl VariableNamespace {
    pub fn new() -> Self {
        Self {
            pass_id: Uuid::new_v4(),
            values: HashMap::new(),
        }
    }

    /// Identifier attached to log records of this pass
    pub fn pass_id(&self) -> Uuid {
        self.pass_id
    }

    /// Bind `name`, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Clone a stage input out of the namespace
    pub fn read(&self, stage: usize, component: &str, name: &str) -> Result<Value> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::MissingVariable {
                stage,
                component: component.to_string(),
                variable: name.to_string(),
            })
    }

    /// Remove and return a value
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for VariableNamespace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_read() {
        let mut namespace = VariableNamespace::new();
        namespace.insert("x", Value::Texts(vec!["q".to_string()]));
        assert!(namespace.contains("x"));
        assert_eq!(
            namespace.read(0, "tokenizer", "x").unwrap(),
            Value::Texts(vec!["q".to_string()])
        );
    }

    #[test]
    fn test_missing_variable() {
        let namespace = VariableNamespace::new();
        let err = namespace.read(2, "cos_classifier", "q_vect").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingVariable { stage: 2, ref variable, .. } if variable == "q_vect"
        ));
    }

    #[test]
    fn test_take_removes() {
        let mut namespace = VariableNamespace::new();
        namespace.insert("y", Value::Texts(vec![]));
        assert!(namespace.take("y").is_some());
        assert!(namespace.is_empty());
        assert!(namespace.take("y").is_none());
    }

    #[test]
    fn test_pass_ids_differ() {
        assert_ne!(VariableNamespace::new().pass_id(), VariableNamespace::new().pass_id());
    }
}
