//! Loader for scored-result artifacts.
//!
//! A model-result artifact is UTF-8 text with one raw lookup key per line. Every key is stored in
//! the result cache under the owning model's identifier namespace, mapped to the constant
//! cache-hit score dictated by the model's declared value type.
use std::sync::Arc;

use crate::blob::BlobStore;
use crate::cache::DataCache;
use crate::identifier_cache::IdentifierCache;
use crate::models::{ModelDefinition, ModelResult};
use crate::refresh::{hourly_object_key, ArtifactRequest, ObjectKeyFn, RefreshStrategy, Refresher};
use crate::Result;

/// Observability counters for one load run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadStats {
    /// Number of keys written to the result cache. Counts every write event: duplicate lines are
    /// counted each time, not deduplicated.
    pub keys_loaded: u64,
    /// Cumulative byte length of the loaded keys (line terminators excluded).
    pub bytes_loaded: u64,
}

/// Streams hourly model-result snapshots into the result cache.
pub struct ModelResultLoader {
    refresher: Refresher,
    results: Arc<DataCache<f64>>,
    model: ModelDefinition,
    derive_key: ObjectKeyFn,
}

impl ModelResultLoader {
    /// Create a loader for `model`, tracking artifact versions under `identifier_namespace`.
    /// Object keys default to the hour-bucketed derivation of [`hourly_object_key`].
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        identifiers: Arc<IdentifierCache>,
        identifier_namespace: String,
        results: Arc<DataCache<f64>>,
        model: ModelDefinition,
    ) -> ModelResultLoader {
        ModelResultLoader {
            refresher: Refresher::new(blob_store, identifiers, identifier_namespace),
            results,
            model,
            derive_key: Box::new(hourly_object_key),
        }
    }

    /// Replace the object-key derivation.
    pub fn with_key_derivation(mut self, derive_key: ObjectKeyFn) -> ModelResultLoader {
        self.derive_key = derive_key;
        self
    }

    /// Refresh the model's result-cache namespace from the latest hourly snapshot.
    ///
    /// Returns `Ok(true)` if the namespace was repopulated, `Ok(false)` if the artifact was
    /// missing, unchanged, or transiently unavailable.
    pub fn load(&self, request: &ArtifactRequest) -> Result<bool> {
        let (refreshed, stats) = self.run(request)?;
        if refreshed {
            log::info!(
                target: "adeval",
                "loaded {} result keys ({} bytes) for model {}",
                stats.keys_loaded, stats.bytes_loaded, self.model.identifier
            );
        }
        Ok(refreshed)
    }

    fn run(&self, request: &ArtifactRequest) -> Result<(bool, LoadStats)> {
        let namespace = self.model.identifier.as_str();
        let hit_value = self.model.model_type.hit_value();
        let results = &self.results;

        let mut stats = LoadStats::default();
        let refreshed = self.refresher.refresh(
            request,
            RefreshStrategy {
                derive_key: self.derive_key.as_ref(),
                identifier_key: namespace,
                clear: &|| results.clear(namespace),
                repopulate: &mut |body| {
                    let text = std::str::from_utf8(body)
                        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
                    for line in text.split('\n') {
                        if line.is_empty() {
                            continue;
                        }
                        results.insert(namespace, line.to_owned(), hit_value);
                        stats.keys_loaded += 1;
                        stats.bytes_loaded += line.len() as u64;
                    }
                    Ok(())
                },
            },
        )?;

        Ok((refreshed, stats))
    }

    /// The model this loader feeds.
    pub fn model(&self) -> &ModelDefinition {
        &self.model
    }
}

/// Probe the result cache for `keys` in order and assemble a [`ModelResult`].
///
/// `value` is the score of the first cache hit; when none of the keys is present, it falls back
/// to the model's declared default.
pub fn score_keys(
    results: &DataCache<f64>,
    model: &ModelDefinition,
    keys: &[String],
) -> ModelResult {
    let mut result = ModelResult {
        value: model.model_type.default_value(),
        values: Vec::with_capacity(keys.len()),
        keys: keys.to_vec(),
    };

    let mut hit = false;
    for key in keys {
        match results.get(&model.identifier, key) {
            Some(value) => {
                if !hit {
                    result.value = value;
                    hit = true;
                }
                result.values.push(value);
            }
            None => result.values.push(model.model_type.default_value()),
        }
    }

    result
}
