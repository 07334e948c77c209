//! `adeval_core` is the decision-cache core of a real-time ad-request evaluation service. It
//! keeps in-process caches synchronized with versioned configuration and scored-result artifacts
//! in remote blob storage, while the request hot path reads those caches without ever blocking
//! on a refresh.
//!
//! # Overview
//!
//! [`DataCache`](cache::DataCache) is a namespaced, TTL/size-bounded key-value store with
//! eviction telemetry. One instance holds scored-result values (one namespace per model
//! identifier), another holds the structured configuration singletons. Entries are only ever
//! replaced wholesale; a namespace is fully cleared before its next generation is written, so
//! readers never observe a torn mix of two generations.
//!
//! [`IdentifierCache`](identifier_cache::IdentifierCache) records the version identifier of the
//! last successfully loaded artifact and is the source of staleness truth.
//!
//! [`Refresher`](refresh::Refresher) is the generic refresh routine: fetch the artifact through
//! the [`BlobStore`](blob::BlobStore) seam, compare its version identifier, and only on change
//! clear, repopulate, and record. [`ModelResultLoader`](model_results::ModelResultLoader) and
//! [`ConfigurationLoader`](configuration_loader::ConfigurationLoader) supply the two concrete
//! strategies: line-delimited result snapshots and the JSON configuration document. Loaders run
//! on background threads driven by an external scheduler; they contain all transient failures
//! and report them as "nothing refreshed".
//!
//! [`ExperimentConfigurationProvider`](provider::ExperimentConfigurationProvider) and
//! [`ModelConfigurationProvider`](provider::ModelConfigurationProvider) are the read side:
//! configuration is mandatory at the point of use, so an empty cache is a loud error, never a
//! silent default.
//!
//! [`OperatorRegistry`](registry::OperatorRegistry) indexes pluggable
//! [`ModelFeatureOperator`](registry::ModelFeatureOperator) implementations by simple type name;
//! the one-shot [`DiscoveryTask`](discovery::DiscoveryTask) populates it near startup after a
//! randomized delay.
//!
//! [`ExperimentDefinition`](allocation::ExperimentDefinition) is the deterministic
//! traffic-allocation model: salted identifier, hashed into the allocation space, bucketed into
//! the treatment whose range contains the hash. The crate guarantees the data invariant (ranges
//! exactly tile the allocation space); the hash itself is pluggable through
//! [`Sharder`](allocation::Sharder).

#![warn(rustdoc::missing_crate_level_docs)]

pub mod allocation;
pub mod blob;
pub mod cache;
pub mod configuration_loader;
pub mod discovery;
pub mod identifier_cache;
pub mod model_results;
pub mod models;
pub mod provider;
pub mod refresh;
pub mod registry;

mod error;

pub use error::{Error, Result};
