//! Component registry
//!
//! Maps textual identifiers from pipeline descriptions onto factories.
//!
//! Built-in identifiers:
//! - tokenizer: word tokenizer with optional lemmatization
//! - word_embedder: word-vector file or hashed token vectors
//! - mean_aggregator: mean pooling of token vectors
//! - cos_classifier / nearest_neighbor_classifier: cosine nearest neighbor

use crate::components::{
    Component, ComponentParams, NearestNeighborClassifier, Tokenizer, VectorAggregator,
    WordEmbedder,
};
use crate::errors::{PipelineError, Result};
use std::collections::HashMap;
use std::fmt;

/// Constructor for a component from its stage parameters
pub type ComponentFactory = Box<dyn Fn(&ComponentParams) -> Result<Component> + Send + Sync>;

/// Component registry
pub struct ComponentRegistry {
    /// Map of identifier to factory
    factories: HashMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    /// Create new registry with all built-in components
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_tokenizer();
        registry.register_word_embedder();
        registry.register_mean_aggregator();
        registry.register_classifier();

        registry
    }

    /// Create a registry with no identifiers
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register (or replace) a factory under `identifier`
    pub fn register<F>(&mut self, identifier: impl Into<String>, factory: F)
    where
        F: Fn(&ComponentParams) -> Result<Component> + Send + Sync + 'static,
    {
        let identifier = identifier.into();
        if self
            .factories
            .insert(identifier.clone(), Box::new(factory))
            .is_some()
        {
            tracing::debug!(identifier = %identifier, "Replaced component factory");
        }
    }

    /// Construct the component registered under `identifier`
    pub fn create(&self, identifier: &str, params: &ComponentParams) -> Result<Component> {
        let factory = self
            .factories
            .get(identifier)
            .ok_or_else(|| PipelineError::UnknownComponent {
                name: identifier.to_string(),
            })?;
        factory(params)
    }

    fn register_tokenizer(&mut self) {
        self.register("tokenizer", |params| {
            Ok(Component::Tokenizer(Tokenizer::from_params(params)?))
        });
    }

    fn register_word_embedder(&mut self) {
        self.register("word_embedder", |params| {
            Ok(Component::WordEmbedder(WordEmbedder::from_params(params)?))
        });
    }

    fn register_mean_aggregator(&mut self) {
        self.register("mean_aggregator", |params| {
            Ok(Component::VectorAggregator(VectorAggregator::from_params(
                params,
            )?))
        });
    }

    fn register_classifier(&mut self) {
        for identifier in ["cos_classifier", "nearest_neighbor_classifier"] {
            self.register(identifier, |params| {
                Ok(Component::NearestNeighborClassifier(
                    NearestNeighborClassifier::from_params(params)?,
                ))
            });
        }
    }

    /// Check if identifier exists
    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// All registered identifiers, sorted
    pub fn identifiers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get total number of identifiers
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = ComponentRegistry::new();
        assert_eq!(registry.len(), 5);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_all_components_registered() {
        let registry = ComponentRegistry::new();

        assert!(registry.contains("tokenizer"));
        assert!(registry.contains("word_embedder"));
        assert!(registry.contains("mean_aggregator"));
        assert!(registry.contains("cos_classifier"));
        assert!(registry.contains("nearest_neighbor_classifier"));
    }

    #[test]
    fn test_create_component() {
        let registry = ComponentRegistry::new();
        let params = ComponentParams::new().with("dim", 4);
        let component = registry.create("mean_aggregator", &params).unwrap();
        assert_eq!(component.kind(), "mean_aggregator");
    }

    #[test]
    fn test_unknown_component() {
        let registry = ComponentRegistry::new();
        let err = registry
            .create("nonexistent_component", &ComponentParams::new())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnknownComponent { ref name } if name == "nonexistent_component"
        ));
    }

    #[test]
    fn test_factory_errors_propagate() {
        let registry = ComponentRegistry::new();
        assert!(matches!(
            registry.create("mean_aggregator", &ComponentParams::new()),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_register_custom_alias() {
        let mut registry = ComponentRegistry::empty();
        assert!(registry.is_empty());
        registry.register("lemmatizer", |_| {
            Ok(Component::Tokenizer(Tokenizer::new().with_lemmatization(true)))
        });
        assert_eq!(registry.identifiers(), vec!["lemmatizer".to_string()]);
        assert!(registry.create("lemmatizer", &ComponentParams::new()).is_ok());
    }
}
