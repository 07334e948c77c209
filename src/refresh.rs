//! The generic staleness-detection and atomic-refresh routine.
//!
//! A refresh run fetches a remote artifact, compares its version identifier against the
//! [`IdentifierCache`], and only when the artifact changed clears the target cache namespace,
//! repopulates it, and records the new identifier. Concrete loaders supply the two varying
//! pieces, key derivation and repopulation, as a [`RefreshStrategy`].
//!
//! The identifier is written strictly after repopulation succeeds. A crash in between leaves the
//! old identifier behind, so the next run sees a mismatch and performs a full reload instead of
//! pairing a fresh identifier with a partially loaded cache.
use std::sync::Arc;

use chrono::Utc;

use crate::blob::{BlobStore, FetchError};
use crate::identifier_cache::IdentifierCache;
use crate::models::Timestamp;
use crate::{Error, Result};

/// Caller-supplied description of the artifact to refresh.
#[derive(Debug, Clone)]
pub struct ArtifactRequest {
    /// Remote bucket holding the artifact.
    pub bucket: String,
    /// Object-key suffix, appended after the derived path prefix.
    pub key_suffix: String,
    /// Logical artifact type, used in diagnostics.
    pub artifact_type: String,
    /// Vendor tag, the first segment of the derived object key.
    pub vendor: String,
}

/// Default object-key derivation: `{vendor}/{yyyy-MM-dd}/{HH}/{suffix}`, UTC.
///
/// Upstream producers publish hour-bucketed snapshots, so sequential snapshots never collide and
/// the newest hour is always addressed by wall-clock time.
pub fn hourly_object_key(request: &ArtifactRequest, now: Timestamp) -> String {
    format!(
        "{}/{}/{}",
        request.vendor,
        now.format("%Y-%m-%d/%H"),
        request.key_suffix
    )
}

/// Owned, pluggable object-key derivation.
pub type ObjectKeyFn = Box<dyn Fn(&ArtifactRequest, Timestamp) -> String + Send + Sync>;

/// The varying pieces of a refresh run.
///
/// A strategy is built fresh for every run; `repopulate` typically captures the loader's counters
/// and target cache namespace.
pub struct RefreshStrategy<'a> {
    /// Derives the full object key from the request and the current UTC time.
    pub derive_key: &'a (dyn Fn(&ArtifactRequest, Timestamp) -> String + Send + Sync),
    /// Logical key of this artifact in the identifier cache.
    pub identifier_key: &'a str,
    /// Fully clears the target cache namespace.
    pub clear: &'a (dyn Fn() + Sync),
    /// Parses the artifact body into the (already cleared) target namespace.
    pub repopulate: &'a mut (dyn FnMut(&[u8]) -> Result<()> + Send),
}

/// Runs the fetch/compare/clear/repopulate/record sequence for any artifact-backed cache.
pub struct Refresher {
    blob_store: Arc<dyn BlobStore>,
    identifiers: Arc<IdentifierCache>,
    /// Identifier-cache namespace under which artifact versions are tracked.
    identifier_namespace: String,
}

impl Refresher {
    /// Create a refresher tracking artifact versions under `identifier_namespace`.
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        identifiers: Arc<IdentifierCache>,
        identifier_namespace: String,
    ) -> Refresher {
        Refresher {
            blob_store,
            identifiers,
            identifier_namespace,
        }
    }

    /// Refresh one artifact.
    ///
    /// Returns `Ok(true)` if the cache was repopulated from a changed artifact, `Ok(false)` if
    /// there was nothing to do: the artifact is missing, unchanged, or the fetch failed
    /// transiently (logged, previous cache generation retained).
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefreshFailed`] if repopulation fails after the staleness decision. This
    /// is never swallowed: by then the namespace has been cleared, and masking the failure would
    /// mean silently serving a partial cache.
    pub fn refresh(&self, request: &ArtifactRequest, strategy: RefreshStrategy) -> Result<bool> {
        let RefreshStrategy {
            derive_key,
            identifier_key,
            clear,
            repopulate,
        } = strategy;
        let key = derive_key(request, Utc::now());

        let object = match self.blob_store.get(&request.bucket, &key) {
            Ok(object) => object,
            Err(FetchError::NotFound { .. }) => {
                log::debug!(
                    target: "adeval",
                    "{} artifact {}/{} not published yet, nothing to refresh",
                    request.artifact_type, request.bucket, key
                );
                return Ok(false);
            }
            Err(err) => {
                log::warn!(
                    target: "adeval",
                    "failed to fetch {} artifact {}/{}, keeping previous cache generation: {}",
                    request.artifact_type, request.bucket, key, err
                );
                return Ok(false);
            }
        };

        let previous = self.identifiers.get(&self.identifier_namespace, identifier_key);
        if previous.as_deref() == Some(object.version_identifier.as_str()) {
            log::debug!(
                target: "adeval",
                "{} artifact {}/{} unchanged (version {})",
                request.artifact_type, request.bucket, key, object.version_identifier
            );
            return Ok(false);
        }

        clear();
        repopulate(&object.body).map_err(|err| Error::RefreshFailed {
            artifact_key: key.clone(),
            reason: err.to_string(),
        })?;
        self.identifiers
            .put(&self.identifier_namespace, identifier_key, &object.version_identifier);

        log::info!(
            target: "adeval",
            "refreshed {} artifact {}/{} to version {}",
            request.artifact_type, request.bucket, key, object.version_identifier
        );
        Ok(true)
    }
}
