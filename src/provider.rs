//! Read-only accessors over the configuration cache.
//!
//! Configuration is mandatory at the point of use: a provider that finds no entry fails fast with
//! [`Error::MissingConfiguration`] naming the configuration it could not obtain, rather than
//! letting the evaluator run against nothing.
use std::sync::Arc;

use crate::cache::DataCache;
use crate::models::{ExperimentConfiguration, ModelConfiguration};
use crate::{Error, Result};

/// Well-known cache namespaces and keys, passed explicitly to constructors instead of being
/// shared as global string constants.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    /// Namespace of the configuration cache holding the two configuration singletons.
    pub configuration_namespace: String,
    /// Identifier-cache namespace tracking per-artifact version identifiers.
    pub file_identifier_namespace: String,
    /// Key of the experiment-configuration singleton.
    pub experiment_configuration_key: String,
    /// Key of the model-configuration singleton.
    pub model_configuration_key: String,
}

impl Default for CacheLayout {
    fn default() -> CacheLayout {
        CacheLayout {
            configuration_namespace: "configuration".to_owned(),
            file_identifier_namespace: "file-identifier".to_owned(),
            experiment_configuration_key: "experiment-configuration".to_owned(),
            model_configuration_key: "model-configuration".to_owned(),
        }
    }
}

/// A value stored in the configuration cache.
///
/// Both singletons live in one namespace, so the cache's value type is a tagged union; providers
/// check the tag and fail fast on a mismatch.
#[derive(Debug, Clone)]
pub enum ConfigurationValue {
    /// The experiment-configuration singleton.
    Experiments(Arc<ExperimentConfiguration>),
    /// The model-configuration singleton.
    Models(Arc<ModelConfiguration>),
}

/// Fails fast if the experiment configuration has not been loaded.
pub struct ExperimentConfigurationProvider {
    configuration: Arc<DataCache<ConfigurationValue>>,
    layout: CacheLayout,
}

impl ExperimentConfigurationProvider {
    /// Create a provider reading from `configuration` under `layout`'s well-known names.
    pub fn new(
        configuration: Arc<DataCache<ConfigurationValue>>,
        layout: CacheLayout,
    ) -> ExperimentConfigurationProvider {
        ExperimentConfigurationProvider {
            configuration,
            layout,
        }
    }

    /// Get the experiment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfiguration`] if the singleton is absent from the cache.
    pub fn get(&self) -> Result<Arc<ExperimentConfiguration>> {
        match self.configuration.get(
            &self.layout.configuration_namespace,
            &self.layout.experiment_configuration_key,
        ) {
            Some(ConfigurationValue::Experiments(config)) => Ok(config),
            _ => Err(Error::MissingConfiguration("experiment configuration")),
        }
    }
}

/// Fails fast if the model configuration has not been loaded.
pub struct ModelConfigurationProvider {
    configuration: Arc<DataCache<ConfigurationValue>>,
    layout: CacheLayout,
}

impl ModelConfigurationProvider {
    /// Create a provider reading from `configuration` under `layout`'s well-known names.
    pub fn new(
        configuration: Arc<DataCache<ConfigurationValue>>,
        layout: CacheLayout,
    ) -> ModelConfigurationProvider {
        ModelConfigurationProvider {
            configuration,
            layout,
        }
    }

    /// Get the model configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfiguration`] if the singleton is absent from the cache.
    pub fn get(&self) -> Result<Arc<ModelConfiguration>> {
        match self.configuration.get(
            &self.layout.configuration_namespace,
            &self.layout.model_configuration_key,
        ) {
            Some(ConfigurationValue::Models(config)) => Ok(config),
            _ => Err(Error::MissingConfiguration("model configuration")),
        }
    }
}
