//! Registry of pluggable request-evaluation operators.
//!
//! The registry is an indirection table from configuration-declared operator names to runtime
//! implementations. It holds no business logic: feature extraction itself happens behind the
//! [`ModelFeatureOperator`] trait, in plugins the core never interprets.
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::models::FeatureConfiguration;

/// A pluggable operator applied during request evaluation.
///
/// The only capability today is feature extraction: pulling a raw value out of the request
/// document as directed by a [`FeatureConfiguration`]. Future operator kinds register through the
/// same trait.
pub trait ModelFeatureOperator: Send + Sync {
    /// Simple type name the operator registers under. Configuration refers to operators by this
    /// name (`ModelDefinition::extractor_type`).
    fn operator_name(&self) -> &'static str;

    /// Extract a feature value from `document`. Returns `None` when the configured fields are
    /// absent.
    fn extract(&self, document: &serde_json::Value, feature: &FeatureConfiguration)
        -> Option<String>;
}

/// A mapping from operator names to implementations, populated once near process start.
pub struct OperatorRegistry {
    /// Human-readable label used only in diagnostics.
    registry_type: &'static str,
    operators: RwLock<HashMap<String, Arc<dyn ModelFeatureOperator>>>,
}

impl OperatorRegistry {
    /// Create an empty registry labeled `registry_type`.
    pub fn new(registry_type: &'static str) -> OperatorRegistry {
        OperatorRegistry {
            registry_type,
            operators: RwLock::new(HashMap::new()),
        }
    }

    /// Register `operator` under its simple type name.
    ///
    /// Registering the same name twice replaces the prior binding: the registry is last writer
    /// wins, not append-only.
    pub fn register(&self, operator: Arc<dyn ModelFeatureOperator>) {
        let name = operator.operator_name();
        let mut operators = self
            .operators
            .write()
            .expect("thread holding registry lock should not panic");
        if operators.insert(name.to_owned(), operator).is_some() {
            log::debug!(
                target: "adeval",
                "operator {} re-registered in {} registry, previous binding replaced",
                name, self.registry_type
            );
        }
    }

    /// Resolve an operator by name. Returns `None` for unknown names.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn ModelFeatureOperator>> {
        let operators = self
            .operators
            .read()
            .expect("thread holding registry lock should not panic");
        operators.get(name).cloned()
    }

    /// The registry's diagnostics label.
    pub fn registry_type(&self) -> &'static str {
        self.registry_type
    }

    /// Number of registered operators.
    pub fn len(&self) -> usize {
        self.operators
            .read()
            .expect("thread holding registry lock should not panic")
            .len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
