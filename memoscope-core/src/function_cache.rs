use std::fmt;
use std::hash::Hash;
#[cfg(feature = "stats")]
use std::sync::Arc;

#[cfg(feature = "stats")]
use crate::{stats_registry, CacheStats};
use crate::registry::Registration;
use crate::{CacheMode, FunctionId, GlobalCache, Registry, Scope};

enum Store<K, R> {
    Global(GlobalCache<K, R>),
    Scoped(Registration<K, R>),
}

/// The cache of one memoized function, keyed by `K`.
///
/// This is the storage half of a memoized function: [`Memoized`](crate::Memoized)
/// pairs it with a [`Signature`](crate::Signature) and a target, and the
/// `#[memoize]` attribute macros place one in a `static` per annotated
/// function, keyed by a tuple of the owned argument values.
///
/// Every operation takes the scope of the call as `Option<&Scope>`. A global
/// cache ignores it. A scoped cache with no scope never hits and stores
/// nothing, so the function simply runs uncached.
///
/// A scoped cache installs an empty layer into its [`Registry`] when created
/// and removes it again when dropped. Results already cached in running
/// scopes stay there until those scopes are dropped.
///
/// # Examples
///
/// ```
/// use memoscope_core::{CacheMode, FunctionCache, Scope};
///
/// let cache: FunctionCache<(u32, String), usize> =
///     FunctionCache::new("repeat_len", CacheMode::Scoped);
///
/// let scope = Scope::new();
/// let key = (3, "ab".to_string());
/// assert_eq!(cache.lookup(Some(&scope), &key), None);
/// assert_eq!(cache.store(Some(&scope), key.clone(), 6), 6);
/// assert_eq!(cache.lookup(Some(&scope), &key), Some(6));
/// assert_eq!(cache.lookup(Some(&Scope::new()), &key), None);
/// ```
pub struct FunctionCache<K, R> {
    name: String,
    store: Store<K, R>,
    #[cfg(feature = "stats")]
    stats: Arc<CacheStats>,
}

impl<K, R> FunctionCache<K, R>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Creates a cache registered under `name` with the global [`Registry`]
    /// and, with the `stats` feature, in the stats registry.
    pub fn new(name: impl Into<String>, mode: CacheMode) -> Self {
        Self::build(name.into(), mode, Registry::global(), true)
    }

    /// Like [`new`](Self::new), registering a scoped cache with `registry`.
    pub fn with_registry(name: impl Into<String>, mode: CacheMode, registry: &Registry) -> Self {
        Self::build(name.into(), mode, registry, true)
    }

    pub(crate) fn build(name: String, mode: CacheMode, registry: &Registry, publish: bool) -> Self {
        let store = match mode {
            CacheMode::Global => Store::Global(GlobalCache::new()),
            CacheMode::Scoped => Store::Scoped(registry.enroll::<K, R>(&name)),
        };

        #[cfg(feature = "stats")]
        let stats = Arc::new(CacheStats::new());
        #[cfg(feature = "stats")]
        {
            if publish {
                stats_registry::register(&name, Arc::clone(&stats));
            }
        }
        #[cfg(not(feature = "stats"))]
        let _ = publish;

        Self {
            name,
            store,
            #[cfg(feature = "stats")]
            stats,
        }
    }

    /// Returns the cached value for `key`, recording a hit or a miss.
    pub fn lookup(&self, scope: Option<&Scope>, key: &K) -> Option<R> {
        let cached = match (&self.store, scope) {
            (Store::Global(cache), _) => cache.get(key),
            (Store::Scoped(registration), Some(scope)) => scope.get(registration.id(), key),
            (Store::Scoped(_), None) => None,
        };

        #[cfg(feature = "stats")]
        {
            if cached.is_some() {
                self.stats.record_hit();
            } else {
                self.stats.record_miss();
            }
        }

        if cached.is_some() {
            tracing::trace!(function = %self.name, "memoized hit");
        } else {
            tracing::trace!(function = %self.name, "memoized miss");
        }
        cached
    }

    /// Stores a freshly computed `value` unless one is already present, and
    /// returns the stored value.
    pub fn store(&self, scope: Option<&Scope>, key: K, value: R) -> R {
        match (&self.store, scope) {
            (Store::Global(cache), _) => {
                tracing::debug!(function = %self.name, "storing global result");
                cache.insert(key, value)
            }
            (Store::Scoped(registration), Some(scope)) => {
                tracing::debug!(function = %self.name, "storing scoped result");
                scope.insert(registration.id(), key, value)
            }
            (Store::Scoped(_), None) => value,
        }
    }

    /// Records a computation that returned an error.
    pub fn record_failure(&self) {
        #[cfg(feature = "stats")]
        self.stats.record_failure();
        tracing::debug!(function = %self.name, "memoized computation failed, nothing stored");
    }

    pub fn contains(&self, scope: Option<&Scope>, key: &K) -> bool {
        match (&self.store, scope) {
            (Store::Global(cache), _) => cache.contains_key(key),
            (Store::Scoped(registration), Some(scope)) => scope.contains(registration.id(), key),
            (Store::Scoped(_), None) => false,
        }
    }

    pub fn cached_len(&self, scope: Option<&Scope>) -> usize {
        match (&self.store, scope) {
            (Store::Global(cache), _) => cache.len(),
            (Store::Scoped(registration), Some(scope)) => scope.cached_len(registration.id()),
            (Store::Scoped(_), None) => 0,
        }
    }
}

impl<K, R> FunctionCache<K, R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> CacheMode {
        match &self.store {
            Store::Global(_) => CacheMode::Global,
            Store::Scoped(_) => CacheMode::Scoped,
        }
    }

    /// The scope-layer identity of a scoped cache, `None` in global mode.
    pub fn function_id(&self) -> Option<FunctionId<K, R>> {
        match &self.store {
            Store::Global(_) => None,
            Store::Scoped(registration) => Some(registration.id()),
        }
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl<K, R> fmt::Debug for FunctionCache<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCache")
            .field("name", &self.name)
            .field("mode", &self.mode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "stats")]
    use serial_test::serial;

    #[test]
    fn test_scoped_needs_a_scope() {
        let registry = Registry::new();
        let cache: FunctionCache<u8, u8> =
            FunctionCache::with_registry("needs_scope", CacheMode::Scoped, &registry);

        assert_eq!(cache.store(None, 1, 10), 10);
        assert_eq!(cache.lookup(None, &1), None);
        assert!(!cache.contains(None, &1));
        assert_eq!(cache.cached_len(None), 0);

        let scope = registry.scope();
        cache.store(Some(&scope), 1, 10);
        assert!(cache.contains(Some(&scope), &1));
        assert_eq!(cache.function_id().map(|_| ()), Some(()));
    }

    #[test]
    fn test_global_ignores_scope() {
        let cache: FunctionCache<u8, u8> = FunctionCache::new("ignores_scope", CacheMode::Global);
        cache.store(None, 1, 10);
        assert_eq!(cache.lookup(Some(&Scope::new()), &1), Some(10));
        assert_eq!(cache.store(Some(&Scope::new()), 1, 99), 10);
        assert_eq!(cache.cached_len(None), 1);
        assert_eq!(cache.function_id(), None);
    }

    #[test]
    fn test_dropped_caches_leave_registry() {
        let registry = Registry::new();
        let caches: Vec<FunctionCache<u8, u8>> = (0..1000)
            .map(|_| FunctionCache::build("dropped".to_string(), CacheMode::Scoped, &registry, false))
            .collect();
        assert_eq!(registry.registered(), 1000);

        let scope = registry.scope();
        caches[0].store(Some(&scope), 1, 1);
        drop(caches);

        assert_eq!(registry.registered(), 0);
        assert_eq!(registry.scope().functions(), 0);
        assert_eq!(scope.functions(), 1000);
    }

    #[cfg(feature = "stats")]
    #[test]
    #[serial]
    fn test_stats_published_by_name() {
        let cache: FunctionCache<u8, u8> =
            FunctionCache::new("function_cache_published", CacheMode::Global);
        cache.lookup(None, &1);
        cache.store(None, 1, 1);
        cache.lookup(None, &1);
        cache.record_failure();

        let stats = stats_registry::get("function_cache_published").unwrap();
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.failures(), 1);
        assert_eq!(cache.stats().total_accesses(), 2);
    }
}
