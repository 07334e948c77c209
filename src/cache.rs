//! Namespaced, TTL/size-bounded in-memory cache with eviction telemetry.
//!
//! [`DataCache`] is the storage the request-evaluation hot path reads on every request: one
//! instance holds scored-result values (one namespace per model identifier), another holds the
//! structured configuration singletons. Mutation is confined to refresh-loader code paths;
//! readers never trigger a refresh.
//!
//! Each namespace is backed by its own [`moka::sync::Cache`], so clearing one namespace during a
//! refresh cannot disturb readers of sibling namespaces, and a namespace is always fully cleared
//! before its new generation is written.
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use moka::notification::RemovalCause;

/// Classification of why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionCause {
    /// Evicted under capacity pressure.
    Size,
    /// The entry outlived its time-to-live.
    Expired,
    /// Explicitly invalidated, e.g. by [`DataCache::clear`] during a refresh.
    Explicit,
    /// Overwritten by a newer value under the same key.
    Replaced,
    /// A weakly-held value was collected. Never produced by the current backend (Rust has no
    /// garbage-collected weak values); kept so telemetry consumers see a stable vocabulary.
    Collected,
}

impl From<RemovalCause> for EvictionCause {
    fn from(cause: RemovalCause) -> EvictionCause {
        match cause {
            RemovalCause::Size => EvictionCause::Size,
            RemovalCause::Expired => EvictionCause::Expired,
            RemovalCause::Explicit => EvictionCause::Explicit,
            RemovalCause::Replaced => EvictionCause::Replaced,
        }
    }
}

/// A single observed eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionEvent {
    /// Namespace the entry belonged to.
    pub namespace: String,
    /// Key of the evicted entry.
    pub key: String,
    /// Why the entry left the cache.
    pub cause: EvictionCause,
}

/// Observability hook invoked for every eviction.
///
/// Invoked synchronously from cache mutation paths: implementations must not panic and must not
/// block (hand the event off to a channel or counter and return).
pub type EvictionListener = Arc<dyn Fn(EvictionEvent) + Send + Sync>;

/// Bounds applied to every namespace of a [`DataCache`].
#[derive(Debug, Clone, Default)]
pub struct DataCacheConfig {
    /// Time-to-live for entries. `None` means entries never expire.
    pub time_to_live: Option<Duration>,
    /// Maximum number of entries per namespace. `None` means unbounded.
    pub max_capacity: Option<u64>,
}

impl DataCacheConfig {
    /// Create a new `DataCacheConfig` with no bounds.
    pub fn new() -> DataCacheConfig {
        DataCacheConfig::default()
    }

    /// Bound entry lifetime by `ttl`.
    pub fn with_time_to_live(mut self, ttl: Duration) -> DataCacheConfig {
        self.time_to_live = Some(ttl);
        self
    }

    /// Bound every namespace to at most `max` entries.
    pub fn with_max_capacity(mut self, max: u64) -> DataCacheConfig {
        self.max_capacity = Some(max);
        self
    }
}

/// A namespaced key-value store for decision data.
///
/// Values are replaced wholesale, never mutated in place. Reads are non-blocking and safe to call
/// concurrently with a refresh of any namespace.
pub struct DataCache<V> {
    config: DataCacheConfig,
    listener: Option<EvictionListener>,
    namespaces: RwLock<HashMap<String, moka::sync::Cache<String, V>>>,
}

impl<V> DataCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache with the given bounds and no eviction listener.
    pub fn new(config: DataCacheConfig) -> DataCache<V> {
        DataCache {
            config,
            listener: None,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty cache that reports every eviction to `listener`.
    ///
    /// The listener is invoked synchronously on mutation paths and must neither panic nor block.
    pub fn with_eviction_listener(
        config: DataCacheConfig,
        listener: EvictionListener,
    ) -> DataCache<V> {
        DataCache {
            config,
            listener: Some(listener),
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Look up `key` within `namespace`. Returns `None` on miss.
    pub fn get(&self, namespace: &str, key: &str) -> Option<V> {
        let namespaces = self
            .namespaces
            .read()
            .expect("thread holding cache lock should not panic");
        namespaces.get(namespace)?.get(key)
    }

    /// Insert (or overwrite) `key` within `namespace`, creating the namespace if needed.
    ///
    /// Overwriting surfaces an [`EvictionCause::Replaced`] event for the previous value.
    pub fn insert(&self, namespace: &str, key: String, value: V) {
        {
            let namespaces = self
                .namespaces
                .read()
                .expect("thread holding cache lock should not panic");
            if let Some(cache) = namespaces.get(namespace) {
                cache.insert(key, value);
                return;
            }
        }

        let mut namespaces = self
            .namespaces
            .write()
            .expect("thread holding cache lock should not panic");
        namespaces
            .entry(namespace.to_owned())
            .or_insert_with(|| self.build_namespace(namespace))
            .insert(key, value);
    }

    /// Remove every entry of `namespace`, leaving other namespaces untouched.
    ///
    /// Each removed entry surfaces an [`EvictionCause::Explicit`] event. Readers of the cleared
    /// namespace observe an empty namespace immediately; readers of other namespaces are
    /// unaffected.
    pub fn clear(&self, namespace: &str) {
        let removed = self
            .namespaces
            .write()
            .expect("thread holding cache lock should not panic")
            .remove(namespace);

        let Some(cache) = removed else { return };
        cache.run_pending_tasks();
        if let Some(listener) = &self.listener {
            for (key, _value) in cache.iter() {
                listener(EvictionEvent {
                    namespace: namespace.to_owned(),
                    key: (*key).clone(),
                    cause: EvictionCause::Explicit,
                });
            }
        }
    }

    /// Number of entries currently held under `namespace`.
    ///
    /// The count is eventually consistent with respect to pending size/TTL evictions; call
    /// [`DataCache::run_pending_tasks`] first when an exact count is needed.
    pub fn entry_count(&self, namespace: &str) -> u64 {
        let namespaces = self
            .namespaces
            .read()
            .expect("thread holding cache lock should not panic");
        namespaces
            .get(namespace)
            .map(|cache| cache.entry_count())
            .unwrap_or(0)
    }

    /// Flush pending size/TTL evictions for `namespace`, delivering their telemetry.
    pub fn run_pending_tasks(&self, namespace: &str) {
        let namespaces = self
            .namespaces
            .read()
            .expect("thread holding cache lock should not panic");
        if let Some(cache) = namespaces.get(namespace) {
            cache.run_pending_tasks();
        }
    }

    fn build_namespace(&self, namespace: &str) -> moka::sync::Cache<String, V> {
        let mut builder = moka::sync::Cache::builder();
        if let Some(ttl) = self.config.time_to_live {
            builder = builder.time_to_live(ttl);
        }
        if let Some(max) = self.config.max_capacity {
            builder = builder.max_capacity(max);
        }
        if let Some(listener) = &self.listener {
            let listener = Arc::clone(listener);
            let namespace = namespace.to_owned();
            builder = builder.eviction_listener(move |key: Arc<String>, _value, cause| {
                listener(EvictionEvent {
                    namespace: namespace.clone(),
                    key: (*key).clone(),
                    cause: cause.into(),
                });
            });
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{DataCache, DataCacheConfig, EvictionCause, EvictionEvent};

    fn recording_listener() -> (super::EvictionListener, Arc<Mutex<Vec<EvictionEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let listener = {
            let events = Arc::clone(&events);
            Arc::new(move |event| events.lock().unwrap().push(event)) as super::EvictionListener
        };
        (listener, events)
    }

    #[test]
    fn get_returns_inserted_value() {
        let cache = DataCache::new(DataCacheConfig::new());
        cache.insert("model-1", "key".to_owned(), 1.0);

        assert_eq!(cache.get("model-1", "key"), Some(1.0));
        assert_eq!(cache.get("model-1", "missing"), None);
        assert_eq!(cache.get("model-2", "key"), None);
    }

    #[test]
    fn clear_is_namespace_scoped() {
        let cache = DataCache::new(DataCacheConfig::new());
        cache.insert("model-1", "a".to_owned(), 1.0);
        cache.insert("model-2", "b".to_owned(), 0.0);

        cache.clear("model-1");

        assert_eq!(cache.get("model-1", "a"), None);
        assert_eq!(cache.get("model-2", "b"), Some(0.0));
    }

    #[test]
    fn clear_of_unknown_namespace_is_a_noop() {
        let cache = DataCache::<f64>::new(DataCacheConfig::new());
        cache.clear("never-populated");
    }

    #[test]
    fn replacing_write_surfaces_replaced_cause() {
        let (listener, events) = recording_listener();
        let cache = DataCache::with_eviction_listener(DataCacheConfig::new(), listener);

        cache.insert("model-1", "a".to_owned(), 1.0);
        cache.insert("model-1", "a".to_owned(), 0.0);
        cache.run_pending_tasks("model-1");

        let events = events.lock().unwrap();
        assert!(events.contains(&EvictionEvent {
            namespace: "model-1".to_owned(),
            key: "a".to_owned(),
            cause: EvictionCause::Replaced,
        }));
    }

    #[test]
    fn clear_surfaces_explicit_cause_per_entry() {
        let (listener, events) = recording_listener();
        let cache = DataCache::with_eviction_listener(DataCacheConfig::new(), listener);

        cache.insert("model-1", "a".to_owned(), 1.0);
        cache.insert("model-1", "b".to_owned(), 1.0);
        cache.clear("model-1");

        let events = events.lock().unwrap();
        let explicit: Vec<_> = events
            .iter()
            .filter(|event| event.cause == EvictionCause::Explicit)
            .collect();
        assert_eq!(explicit.len(), 2);
        assert!(explicit.iter().all(|event| event.namespace == "model-1"));
    }

    #[test]
    fn reads_are_safe_concurrently_with_clear() {
        let cache = Arc::new(DataCache::new(DataCacheConfig::new()));
        cache.insert("stable", "k".to_owned(), 42.0);
        for i in 0..100 {
            cache.insert("volatile", format!("k{i}"), 1.0);
        }

        let reader = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    assert_eq!(cache.get("stable", "k"), Some(42.0));
                }
            })
        };
        cache.clear("volatile");
        reader.join().unwrap();
    }
}
