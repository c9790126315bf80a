use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;

/// A process-wide memoization store shared by every caller of one function.
///
/// Unlike the scope-local store, all tasks and threads read and write the same
/// map. Entries are never evicted: the store grows with the number of
/// distinct keys it has seen, and bounding that space is the caller's job.
///
/// # Concurrency
///
/// The map is a `DashMap`, so lookups and insertions only lock one shard for
/// the duration of that operation. No lock is held while a value is being
/// computed, which means two concurrent misses for the same key may both run
/// the computation. Only the first value to arrive is stored; later arrivals
/// are discarded and every caller is handed the stored value, so a key never
/// maps to more than one value over the life of the store.
///
/// # Examples
///
/// ```
/// use memoscope_core::GlobalCache;
///
/// let cache: GlobalCache<u32, String> = GlobalCache::new();
///
/// let first = cache.get_or_try_insert_with(7, || Ok::<_, ()>("seven".to_string()));
/// assert_eq!(first.as_deref(), Ok("seven"));
///
/// // The stored value wins over anything computed later.
/// assert_eq!(cache.insert(7, "SEVEN".to_string()), "seven");
/// assert_eq!(cache.get(&7).as_deref(), Some("seven"));
/// ```
pub struct GlobalCache<K, R> {
    map: DashMap<K, R>,
}

impl<K, R> GlobalCache<K, R>
where
    K: Hash + Eq,
    R: Clone,
{
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<R> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Stores `value` under `key` unless a value is already present, and
    /// returns whichever value ends up stored.
    pub fn insert(&self, key: K, value: R) -> R {
        self.map.entry(key).or_insert(value).value().clone()
    }

    /// Returns the stored value for `key`, computing and storing it on a miss.
    ///
    /// `compute` runs without any lock held, so it may itself call into this
    /// store (recursive memoized functions do). An `Err` is returned unchanged
    /// and leaves the store untouched.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, compute: F) -> Result<R, E>
    where
        F: FnOnce() -> Result<R, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        Ok(self.insert(key, value))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: Hash + Eq, R: Clone> Default for GlobalCache<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, R> fmt::Debug for GlobalCache<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalCache")
            .field("len", &self.map.len())
            .finish()
    }
}
