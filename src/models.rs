//! Wire types for model and feature configuration.
//!
//! These are the structured objects a configuration refresh parses out of the remote artifact and
//! publishes into the configuration cache. The core passes [`FeatureConfiguration`] through to
//! extractor plugins without interpreting it.
use serde::{Deserialize, Serialize};

#[allow(missing_docs)]
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Whether a model's result cache marks high-value or low-value traffic.
///
/// The declared type fixes both the cache-hit score and the default (no-hit) score: they are
/// always inverses of each other.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelType {
    /// A cache hit scores 1.0; absence scores 0.0.
    HighValue,
    /// A cache hit scores 0.0; absence scores 1.0.
    LowValue,
}

impl ModelType {
    /// Score stored for every key present in the model's result cache.
    pub fn hit_value(self) -> f64 {
        match self {
            ModelType::HighValue => 1.0,
            ModelType::LowValue => 0.0,
        }
    }

    /// Score used when no field value of a request is present in the result cache.
    pub fn default_value(self) -> f64 {
        match self {
            ModelType::HighValue => 0.0,
            ModelType::LowValue => 1.0,
        }
    }
}

/// Configuration of a single decision model.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    /// Unique model identifier. Doubles as the model's namespace in the result cache.
    pub identifier: String,
    /// Human-readable model name.
    pub name: String,
    /// Demand-side platform the model belongs to.
    pub dsp: String,
    /// Model version as published by the producer.
    pub version: String,
    /// Determines cache-hit and default scores.
    pub model_type: ModelType,
    /// Name of the feature-extractor operator to resolve from the registry.
    pub extractor_type: String,
    /// Features the extractor should pull from the request document.
    #[serde(default)]
    pub features: Vec<FeatureConfiguration>,
}

/// Configuration for one extracted feature. Opaque to the core: extractor plugins interpret the
/// field paths, transformations and mapping.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FeatureConfiguration {
    /// Feature name.
    pub name: String,
    /// Document field paths the extractor reads, in priority order.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Transformations applied to the raw field value, in order.
    #[serde(default)]
    pub transformations: Vec<String>,
    /// Name of the value mapping applied after transformation.
    #[serde(default)]
    pub mapping: Option<String>,
    /// Value to use when the mapping has no entry for the transformed value.
    #[serde(default)]
    pub mapping_default_value: Option<String>,
}

/// Outcome of evaluating one model against a request.
///
/// `value` is the score of the first result-cache hit among the extracted field values, or the
/// model's default when none of them is present in the cache.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelResult {
    /// Final score.
    pub value: f64,
    /// Scores of all probed field values, in probe order.
    pub values: Vec<f64>,
    /// Field values probed against the result cache, in probe order.
    pub keys: Vec<String>,
}

/// The model-configuration singleton stored in the configuration cache.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfiguration {
    /// All configured models.
    pub models: Vec<ModelDefinition>,
}

/// The experiment-configuration singleton stored in the configuration cache.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentConfiguration {
    /// All configured experiments.
    pub experiments: Vec<crate::allocation::ExperimentDefinition>,
}
