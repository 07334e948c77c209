//! A thread-safe store for the last successfully loaded version identifier of each remote
//! artifact. [`IdentifierCache`] is the source of staleness truth: refresh loaders compare the
//! identifier of a freshly fetched artifact against it to decide whether the data caches need
//! repopulating.
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

/// `IdentifierCache` maps `{namespace, key}` to the version identifier recorded by the last
/// successful refresh.
///
/// An absent entry means "never successfully refreshed". Entries are written only after a refresh
/// has fully repopulated its data-cache namespace, so a crash mid-refresh leaves a stale (or
/// absent) identifier and the next run re-triggers a full reload.
#[derive(Default)]
pub struct IdentifierCache {
    identifiers: RwLock<HashMap<(String, String), Arc<str>>>,
}

impl IdentifierCache {
    /// Create a new empty identifier cache.
    pub fn new() -> IdentifierCache {
        IdentifierCache::default()
    }

    /// Get the version identifier recorded for `{namespace, key}`. Returns `None` if the artifact
    /// has never been successfully refreshed.
    pub fn get(&self, namespace: &str, key: &str) -> Option<Arc<str>> {
        // self.identifiers.read() should always return Ok(). Err() is possible only if the lock
        // is poisoned (writer panicked while holding the lock), which should never happen.
        let identifiers = self
            .identifiers
            .read()
            .expect("thread holding identifier lock should not panic");

        identifiers
            .get(&(namespace.to_owned(), key.to_owned()))
            .cloned()
    }

    /// Record `identifier` for `{namespace, key}`, replacing any previous value.
    pub fn put(&self, namespace: &str, key: &str, identifier: &str) {
        let mut identifiers = self
            .identifiers
            .write()
            .expect("thread holding identifier lock should not panic");

        identifiers.insert((namespace.to_owned(), key.to_owned()), identifier.into());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::IdentifierCache;

    #[test]
    fn absent_entry_means_never_refreshed() {
        let cache = IdentifierCache::new();
        assert_eq!(cache.get("file-identifier", "models"), None);
    }

    #[test]
    fn put_replaces_previous_identifier() {
        let cache = IdentifierCache::new();
        cache.put("file-identifier", "models", "etag-1");
        cache.put("file-identifier", "models", "etag-2");

        assert_eq!(
            cache.get("file-identifier", "models").as_deref(),
            Some("etag-2")
        );
    }

    #[test]
    fn can_put_from_another_thread() {
        let cache = Arc::new(IdentifierCache::new());

        {
            let cache = cache.clone();
            let _ = std::thread::spawn(move || {
                cache.put("file-identifier", "models", "etag-1");
            })
            .join();
        }

        assert_eq!(
            cache.get("file-identifier", "models").as_deref(),
            Some("etag-1")
        );
    }
}
