//! Loader for the versioned configuration artifact.
//!
//! The configuration artifact is a single JSON document carrying both the experiment and model
//! configuration. A refresh clears the configuration namespace and republishes both singletons
//! together, so readers never observe one generation's experiments paired with another's models.
use std::sync::Arc;

use serde::Deserialize;

use crate::blob::BlobStore;
use crate::cache::DataCache;
use crate::identifier_cache::IdentifierCache;
use crate::models::{ExperimentConfiguration, ModelConfiguration, ModelDefinition};
use crate::provider::{CacheLayout, ConfigurationValue};
use crate::refresh::{hourly_object_key, ArtifactRequest, ObjectKeyFn, RefreshStrategy, Refresher};
use crate::{allocation::ExperimentDefinition, Result};

/// Wire shape of the configuration artifact.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigurationDocument {
    #[serde(default)]
    experiments: Vec<ExperimentDefinition>,
    #[serde(default)]
    models: Vec<ModelDefinition>,
}

/// Refreshes the configuration cache from hourly configuration snapshots.
pub struct ConfigurationLoader {
    refresher: Refresher,
    configuration: Arc<DataCache<ConfigurationValue>>,
    layout: CacheLayout,
    derive_key: ObjectKeyFn,
}

impl ConfigurationLoader {
    /// Create a loader publishing into `configuration` under `layout`'s well-known names.
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        identifiers: Arc<IdentifierCache>,
        configuration: Arc<DataCache<ConfigurationValue>>,
        layout: CacheLayout,
    ) -> ConfigurationLoader {
        ConfigurationLoader {
            refresher: Refresher::new(
                blob_store,
                identifiers,
                layout.file_identifier_namespace.clone(),
            ),
            configuration,
            layout,
            derive_key: Box::new(hourly_object_key),
        }
    }

    /// Replace the object-key derivation.
    pub fn with_key_derivation(mut self, derive_key: ObjectKeyFn) -> ConfigurationLoader {
        self.derive_key = derive_key;
        self
    }

    /// Refresh both configuration singletons from the latest snapshot.
    ///
    /// Every experiment definition is validated against the allocation-tiling invariant before
    /// anything is published; a malformed document is a fatal refresh failure, not a skip.
    ///
    /// Returns `Ok(true)` if the configuration namespace was repopulated, `Ok(false)` if the
    /// artifact was missing, unchanged, or transiently unavailable.
    pub fn load(&self, request: &ArtifactRequest) -> Result<bool> {
        let namespace = self.layout.configuration_namespace.as_str();
        let configuration = &self.configuration;
        let layout = &self.layout;

        let refreshed = self.refresher.refresh(
            request,
            RefreshStrategy {
                derive_key: self.derive_key.as_ref(),
                identifier_key: namespace,
                clear: &|| configuration.clear(namespace),
                repopulate: &mut |body| {
                    let document: ConfigurationDocument = serde_json::from_slice(body)
                        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
                    for experiment in &document.experiments {
                        experiment.validate()?;
                    }

                    configuration.insert(
                        namespace,
                        layout.experiment_configuration_key.clone(),
                        ConfigurationValue::Experiments(Arc::new(ExperimentConfiguration {
                            experiments: document.experiments,
                        })),
                    );
                    configuration.insert(
                        namespace,
                        layout.model_configuration_key.clone(),
                        ConfigurationValue::Models(Arc::new(ModelConfiguration {
                            models: document.models,
                        })),
                    );
                    Ok(())
                },
            },
        )?;

        if refreshed {
            log::info!(target: "adeval", "published new experiment and model configuration");
        }
        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::ConfigurationLoader;
    use crate::cache::{DataCache, DataCacheConfig};
    use crate::identifier_cache::IdentifierCache;
    use crate::provider::{CacheLayout, ExperimentConfigurationProvider, ModelConfigurationProvider};
    use crate::refresh::tests::FakeBlobStore;
    use crate::refresh::ArtifactRequest;
    use crate::Error;

    const KEY: &str = "vendor/2024-01-01/07/config.json";

    fn request() -> ArtifactRequest {
        ArtifactRequest {
            bucket: "artifacts".to_owned(),
            key_suffix: "config.json".to_owned(),
            artifact_type: "configuration".to_owned(),
            vendor: "vendor".to_owned(),
        }
    }

    fn loader(
        store: Arc<FakeBlobStore>,
    ) -> (
        ConfigurationLoader,
        ExperimentConfigurationProvider,
        ModelConfigurationProvider,
    ) {
        let cache = Arc::new(DataCache::new(DataCacheConfig::new()));
        let loader = ConfigurationLoader::new(
            store,
            Arc::new(IdentifierCache::new()),
            cache.clone(),
            CacheLayout::default(),
        )
        .with_key_derivation(Box::new(|_request, _now| KEY.to_owned()));
        let experiments = ExperimentConfigurationProvider::new(cache.clone(), CacheLayout::default());
        let models = ModelConfigurationProvider::new(cache, CacheLayout::default());
        (loader, experiments, models)
    }

    const VALID_DOCUMENT: &str = r#"{
        "experiments": [
            {
                "name": "ranker-ab",
                "type": "model",
                "salt": "s1",
                "startTimeUTC": "2024-01-01T00:00:00Z",
                "endTimeUTC": "2024-12-31T00:00:00Z",
                "allocationIdStart": 0,
                "allocationIdEnd": 100,
                "hashEnabled": true,
                "treatments": [
                    {"treatmentCode": "control", "weight": 50, "idStart": 0, "idEnd": 50},
                    {"treatmentCode": "t1", "weight": 50, "idStart": 50, "idEnd": 100}
                ]
            }
        ],
        "models": [
            {
                "identifier": "m-1",
                "name": "retail",
                "dsp": "dsp-a",
                "version": "1",
                "modelType": "HIGH_VALUE",
                "extractorType": "DeviceIdExtractor"
            }
        ]
    }"#;

    #[test]
    fn publishes_both_singletons() {
        let store = Arc::new(FakeBlobStore::default());
        store.put("artifacts", KEY, VALID_DOCUMENT.as_bytes(), "v1");
        let (loader, experiments, models) = loader(store);

        assert!(loader.load(&request()).unwrap());

        let experiments = experiments.get().unwrap();
        assert_eq!(experiments.experiments[0].name, "ranker-ab");
        let models = models.get().unwrap();
        assert_eq!(models.models[0].identifier, "m-1");
    }

    #[test]
    fn providers_fail_before_first_load() {
        let store = Arc::new(FakeBlobStore::default());
        let (loader, experiments, _models) = loader(store);

        assert!(!loader.load(&request()).unwrap());
        assert!(matches!(
            experiments.get(),
            Err(Error::MissingConfiguration(_))
        ));
    }

    #[test]
    fn unchanged_configuration_is_not_republished() {
        let store = Arc::new(FakeBlobStore::default());
        store.put("artifacts", KEY, VALID_DOCUMENT.as_bytes(), "v1");
        let (loader, _experiments, _models) = loader(store);

        assert!(loader.load(&request()).unwrap());
        assert!(!loader.load(&request()).unwrap());
    }

    #[test]
    fn invalid_allocation_tiling_is_a_fatal_refresh_failure() {
        let document = VALID_DOCUMENT.replace("\"idStart\": 50", "\"idStart\": 60");
        let store = Arc::new(FakeBlobStore::default());
        store.put("artifacts", KEY, document.as_bytes(), "v1");
        let (loader, _experiments, _models) = loader(store);

        assert!(matches!(
            loader.load(&request()),
            Err(Error::RefreshFailed { .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_fatal_refresh_failure() {
        let store = Arc::new(FakeBlobStore::default());
        store.put("artifacts", KEY, b"not json", "v1");
        let (loader, _experiments, _models) = loader(store);

        assert!(matches!(
            loader.load(&request()),
            Err(Error::RefreshFailed { .. })
        ));
    }
}
