//! One-shot operator discovery.
//!
//! Discovery enumerates a statically compiled catalog of operator constructors and registers each
//! implementation under its simple type name. It runs once, on a background thread, after a
//! randomized initial delay: a fleet of instances restarting together then spreads its discovery
//! work over the delay window instead of hitting the discovery surface at the same instant.
//!
//! The task performs no retries and is never rescheduled. Discovering zero operators is a valid
//! (if unusual) outcome, not an error.
use std::{sync::Arc, time::Duration};

use rand::{thread_rng, Rng};

use crate::registry::{ModelFeatureOperator, OperatorRegistry};
use crate::{Error, Result};

/// Configuration for [`DiscoveryTask`].
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Upper bound of the randomized initial delay. The task fires at a uniformly random instant
    /// within `[0, max_start_delay]`.
    ///
    /// Defaults to [`DiscoveryConfig::DEFAULT_MAX_START_DELAY`].
    pub max_start_delay: Duration,
}

impl DiscoveryConfig {
    /// Default value for [`DiscoveryConfig::max_start_delay`].
    pub const DEFAULT_MAX_START_DELAY: Duration = Duration::from_secs(30);

    /// Create a new `DiscoveryConfig` using default configuration.
    pub fn new() -> DiscoveryConfig {
        DiscoveryConfig::default()
    }

    /// Update the maximum start delay with `max_start_delay`.
    pub fn with_max_start_delay(mut self, max_start_delay: Duration) -> DiscoveryConfig {
        self.max_start_delay = max_start_delay;
        self
    }
}

impl Default for DiscoveryConfig {
    fn default() -> DiscoveryConfig {
        DiscoveryConfig {
            max_start_delay: DiscoveryConfig::DEFAULT_MAX_START_DELAY,
        }
    }
}

/// A constructor for one discoverable operator implementation.
pub type OperatorConstructor = Box<dyn Fn() -> Arc<dyn ModelFeatureOperator> + Send>;

/// The enumerable discovery surface: every operator implementation available to this process.
/// Enumeration order carries no meaning.
pub type OperatorCatalog = Vec<OperatorConstructor>;

/// Handle to the one-shot discovery task.
pub struct DiscoveryTask {
    join_handle: std::thread::JoinHandle<()>,
}

impl DiscoveryTask {
    /// Spawn the discovery thread.
    ///
    /// After a random delay in `[0, max_start_delay]`, every catalog entry is constructed and
    /// registered in `registry`. The task either completes or is abandoned with the process; it
    /// does not honor cancellation.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the thread failed to start.
    pub fn spawn(
        catalog: OperatorCatalog,
        registry: Arc<OperatorRegistry>,
        config: DiscoveryConfig,
    ) -> std::io::Result<DiscoveryTask> {
        let join_handle = std::thread::Builder::new()
            .name("adeval-discovery".to_owned())
            .spawn(move || {
                let delay = random_start_delay(config.max_start_delay);
                log::debug!(
                    target: "adeval",
                    "operator discovery starts in {:?}",
                    delay
                );
                std::thread::sleep(delay);

                let mut registered = 0usize;
                for constructor in &catalog {
                    let operator = constructor();
                    log::debug!(
                        target: "adeval",
                        "discovered operator {} for {} registry",
                        operator.operator_name(), registry.registry_type()
                    );
                    registry.register(operator);
                    registered += 1;
                }
                // Zero registrations is valid: this process may simply carry no plugins.
                log::info!(
                    target: "adeval",
                    "operator discovery registered {} implementations in {} registry",
                    registered, registry.registry_type()
                );
            })?;

        Ok(DiscoveryTask { join_handle })
    }

    /// Block until discovery has completed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryThreadPanicked`] if the discovery thread panicked (e.g., an
    /// operator constructor panicked).
    pub fn join(self) -> Result<()> {
        self.join_handle
            .join()
            .map_err(|_| Error::DiscoveryThreadPanicked)
    }
}

/// Pick a uniformly random delay in `[0, max]`.
fn random_start_delay(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    thread_rng().gen_range(Duration::ZERO..=max)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::{random_start_delay, DiscoveryConfig, DiscoveryTask, OperatorCatalog};
    use crate::registry::tests::ConstantExtractor;
    use crate::registry::{ModelFeatureOperator, OperatorRegistry};

    #[test]
    fn start_delay_is_within_the_configured_window() {
        let max = Duration::from_millis(50);
        for _ in 0..100 {
            let delay = random_start_delay(max);
            assert!(delay <= max, "{delay:?} must be <= {max:?}");
        }
    }

    #[test]
    fn start_delay_handles_zero_window() {
        assert_eq!(random_start_delay(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn discovery_registers_every_catalog_entry_once() {
        let _ = env_logger::builder().is_test(true).try_init();
        let registry = Arc::new(OperatorRegistry::new("feature-extractors"));
        let catalog: OperatorCatalog = vec![
            Box::new(|| {
                Arc::new(ConstantExtractor {
                    name: "DeviceIdExtractor",
                    value: "a",
                }) as Arc<dyn ModelFeatureOperator>
            }),
            Box::new(|| {
                Arc::new(ConstantExtractor {
                    name: "GeoExtractor",
                    value: "b",
                }) as Arc<dyn ModelFeatureOperator>
            }),
        ];

        let task = DiscoveryTask::spawn(
            catalog,
            registry.clone(),
            DiscoveryConfig::new().with_max_start_delay(Duration::ZERO),
        )
        .unwrap();
        task.join().unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("DeviceIdExtractor").is_some());
        assert!(registry.lookup("GeoExtractor").is_some());
    }

    #[test]
    fn empty_catalog_is_a_valid_outcome() {
        let registry = Arc::new(OperatorRegistry::new("feature-extractors"));
        let task = DiscoveryTask::spawn(
            Vec::new(),
            registry.clone(),
            DiscoveryConfig::new().with_max_start_delay(Duration::ZERO),
        )
        .unwrap();
        task.join().unwrap();

        assert!(registry.is_empty());
    }
}
