//! Process-wide lookup of memoized functions' statistics by name.
//!
//! Wrappers built with a name (`Memoizer::name`, or any function annotated
//! with `#[memoize]` / `#[memoize_async]`) register their [`CacheStats`] here
//! when they are created or first called.
//!
//! ```
//! use memoscope_core::stats_registry;
//!
//! if let Some(stats) = stats_registry::get("fetch_user") {
//!     println!("hit rate: {:.2}%", stats.hit_rate() * 100.0);
//! }
//! ```

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::CacheStats;

static STATS_REGISTRY: Lazy<RwLock<HashMap<String, Arc<CacheStats>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers `stats` under `name`, replacing an earlier registration.
pub fn register(name: &str, stats: Arc<CacheStats>) {
    tracing::debug!(name, "registering memoization statistics");
    STATS_REGISTRY.write().insert(name.to_string(), stats);
}

/// A snapshot of the statistics registered under `name`.
pub fn get(name: &str) -> Option<CacheStats> {
    STATS_REGISTRY.read().get(name).map(|stats| (**stats).clone())
}

/// The live statistics registered under `name`.
pub fn get_ref(name: &str) -> Option<Arc<CacheStats>> {
    STATS_REGISTRY.read().get(name).cloned()
}

/// Names of all registered functions.
pub fn list() -> Vec<String> {
    STATS_REGISTRY.read().keys().cloned().collect()
}

/// Removes every registration. The statistics themselves are left untouched.
pub fn clear() {
    STATS_REGISTRY.write().clear();
}

/// Resets the counters registered under `name`; `false` if there are none.
pub fn reset(name: &str) -> bool {
    match STATS_REGISTRY.read().get(name) {
        Some(stats) => {
            stats.reset();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_register_and_get() {
        let stats = Arc::new(CacheStats::new());
        register("registry_test_fn", Arc::clone(&stats));
        stats.record_hit();

        let snapshot = get("registry_test_fn").unwrap();
        assert_eq!(snapshot.hits(), 1);

        stats.record_hit();
        assert_eq!(snapshot.hits(), 1);
        assert_eq!(get_ref("registry_test_fn").unwrap().hits(), 2);
    }

    #[test]
    #[serial]
    fn test_list_and_clear() {
        register("registry_fn1", Arc::new(CacheStats::new()));
        register("registry_fn2", Arc::new(CacheStats::new()));

        let names = list();
        assert!(names.contains(&"registry_fn1".to_string()));
        assert!(names.contains(&"registry_fn2".to_string()));

        clear();
        let names = list();
        assert!(!names.contains(&"registry_fn1".to_string()));
        assert!(!names.contains(&"registry_fn2".to_string()));
    }

    #[test]
    #[serial]
    fn test_reset() {
        let stats = Arc::new(CacheStats::new());
        register("registry_reset_fn", Arc::clone(&stats));
        stats.record_miss();

        assert!(reset("registry_reset_fn"));
        assert_eq!(stats.misses(), 0);
        assert!(!reset("registry_missing_fn"));
    }
}
