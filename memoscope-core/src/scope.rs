use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::Registry;

/// Process-unique identity of a memoized function whose cache maps `K` to `R`.
///
/// Allocated once per wrapped function by [`Registry::register`] and used to
/// find that function's cache layer inside a [`ScopeState`]. The key and
/// result types travel with the id, so a layer can only be read or written
/// with the types it was registered with.
pub struct FunctionId<K, R> {
    raw: u64,
    types: PhantomData<fn(K) -> R>,
}

impl<K, R> FunctionId<K, R> {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self::from_raw(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    fn from_raw(raw: u64) -> Self {
        FunctionId {
            raw,
            types: PhantomData,
        }
    }

    pub fn as_u64(self) -> u64 {
        self.raw
    }

    /// The same identity seen with other key and result types.
    #[cfg(test)]
    pub(crate) fn retyped<K2, R2>(self) -> FunctionId<K2, R2> {
        FunctionId::from_raw(self.raw)
    }
}

impl<K, R> Clone for FunctionId<K, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, R> Copy for FunctionId<K, R> {}

impl<K, R> PartialEq for FunctionId<K, R> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K, R> Eq for FunctionId<K, R> {}

impl<K, R> Hash for FunctionId<K, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K, R> fmt::Debug for FunctionId<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FunctionId").field(&self.raw).finish()
    }
}

impl<K, R> fmt::Display for FunctionId<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.raw)
    }
}

/// Every layer is an `Arc<HashMap<K, R>>` behind `dyn Any`, typed by the
/// function that owns it.
type Layer = Arc<dyn Any + Send + Sync>;

/// An immutable-by-sharing snapshot of all scope-local cache layers.
///
/// Cloning a `ScopeState` is cheap: both copies share the outer map and every
/// layer. Writing through [`insert`](Self::insert) copies the outer map and
/// the touched function's layer only if they are still shared with another
/// snapshot, so a write is never observable through any other clone.
///
/// # Examples
///
/// ```
/// use memoscope_core::{Registry, ScopeState};
///
/// let id = Registry::new().register::<u32, u32>("square");
///
/// let mut parent = ScopeState::new();
/// parent.insert(id, 2u32, 4u32);
///
/// let mut child = parent.clone();
/// child.insert(id, 3u32, 9u32);
///
/// assert_eq!(child.get::<u32, u32>(id, &2), Some(4));
/// assert_eq!(parent.get::<u32, u32>(id, &3), None);
/// ```
#[derive(Clone, Default)]
pub struct ScopeState {
    layers: Arc<HashMap<u64, Layer>>,
}

impl ScopeState {
    pub fn new() -> Self {
        Self::default()
    }

    fn layer<K, R>(&self, id: FunctionId<K, R>) -> Option<&HashMap<K, R>>
    where
        K: 'static,
        R: 'static,
    {
        self.layers.get(&id.raw).and_then(|layer| layer.downcast_ref())
    }

    /// Returns a copy of the value cached for `key` by function `id`.
    pub fn get<K, R>(&self, id: FunctionId<K, R>, key: &K) -> Option<R>
    where
        K: Hash + Eq + 'static,
        R: Clone + 'static,
    {
        self.layer::<K, R>(id)?.get(key).cloned()
    }

    pub fn contains<K, R>(&self, id: FunctionId<K, R>, key: &K) -> bool
    where
        K: Hash + Eq + 'static,
        R: 'static,
    {
        self.layer::<K, R>(id)
            .map_or(false, |layer| layer.contains_key(key))
    }

    /// Number of keys cached for function `id` in this snapshot.
    pub fn cached_len<K, R>(&self, id: FunctionId<K, R>) -> usize
    where
        K: 'static,
        R: 'static,
    {
        self.layer::<K, R>(id).map_or(0, HashMap::len)
    }

    /// Number of functions with a layer in this snapshot.
    pub fn functions(&self) -> usize {
        self.layers.len()
    }

    /// Whether both snapshots share the same outer map.
    pub fn ptr_eq(&self, other: &ScopeState) -> bool {
        Arc::ptr_eq(&self.layers, &other.layers)
    }

    /// Records `value` for `key` under function `id` unless the key is already
    /// cached, and returns whichever value ends up stored.
    pub fn insert<K, R>(&mut self, id: FunctionId<K, R>, key: K, value: R) -> R
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        if let Some(existing) = self.get::<K, R>(id, &key) {
            return existing;
        }

        if self
            .layers
            .get(&id.raw)
            .map_or(false, |layer| !layer.is::<HashMap<K, R>>())
        {
            tracing::warn!(function = %id, "cache layer has unexpected type, result not stored");
            return value;
        }

        let layers = Arc::make_mut(&mut self.layers);
        let slot = layers
            .entry(id.raw)
            .or_insert_with(|| Arc::new(HashMap::<K, R>::new()));

        if Arc::get_mut(slot).is_none() {
            let copy = match slot.downcast_ref::<HashMap<K, R>>() {
                Some(layer) => layer.clone(),
                None => return value,
            };
            *slot = Arc::new(copy);
        }

        match Arc::get_mut(slot).and_then(|layer| layer.downcast_mut::<HashMap<K, R>>()) {
            Some(layer) => layer.entry(key).or_insert(value).clone(),
            None => value,
        }
    }

    /// Installs an empty layer for `id` if it has none yet.
    pub(crate) fn install<K, R>(&mut self, id: FunctionId<K, R>)
    where
        K: Send + Sync + 'static,
        R: Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.layers)
            .entry(id.raw)
            .or_insert_with(|| Arc::new(HashMap::<K, R>::new()));
    }

    /// Drops the layer of `id`, returning whether there was one.
    pub(crate) fn uninstall<K, R>(&mut self, id: FunctionId<K, R>) -> bool {
        if !self.layers.contains_key(&id.raw) {
            return false;
        }
        Arc::make_mut(&mut self.layers).remove(&id.raw).is_some()
    }

    /// Whether this snapshot has a layer for `id`.
    pub fn has_layer<K, R>(&self, id: FunctionId<K, R>) -> bool {
        self.layers.contains_key(&id.raw)
    }
}

impl fmt::Debug for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeState")
            .field("functions", &self.layers.len())
            .finish()
    }
}

/// A logical execution scope holding scope-local memoization results.
///
/// A `Scope` is a handle: clones of it refer to the *same* scope and see each
/// other's writes. [`fork`](Self::fork) starts a *child* scope that begins
/// with everything this scope has cached so far and from then on evolves
/// independently: the child's writes are never visible to the parent or its
/// siblings, and the parent's later writes are never visible to the child.
///
/// Fork a scope for every concurrently running task that should memoize
/// independently, and move it into the task:
///
/// ```
/// use memoscope_core::Scope;
///
/// let request = Scope::new();
/// let task_a = request.fork();
/// let task_b = request.fork();
/// # drop((task_a, task_b));
/// ```
///
/// The internal lock is only held to read or replace the current snapshot and
/// never while a memoized function runs, so a `Scope` can be shared freely
/// between cooperating tasks and threads.
#[derive(Clone)]
pub struct Scope {
    cell: Arc<Mutex<ScopeState>>,
}

impl Scope {
    /// A new branch of the process-wide [`Registry`].
    pub fn new() -> Self {
        Registry::global().scope()
    }

    /// A scope starting from the given snapshot.
    pub fn from_state(state: ScopeState) -> Self {
        Self {
            cell: Arc::new(Mutex::new(state)),
        }
    }

    /// Starts a child scope that inherits the current snapshot.
    pub fn fork(&self) -> Scope {
        Scope::from_state(self.snapshot())
    }

    /// The current snapshot of this scope.
    pub fn snapshot(&self) -> ScopeState {
        self.cell.lock().clone()
    }

    /// Whether both handles refer to the same scope.
    pub fn same_scope(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    pub fn get<K, R>(&self, id: FunctionId<K, R>, key: &K) -> Option<R>
    where
        K: Hash + Eq + 'static,
        R: Clone + 'static,
    {
        self.cell.lock().get::<K, R>(id, key)
    }

    pub fn contains<K, R>(&self, id: FunctionId<K, R>, key: &K) -> bool
    where
        K: Hash + Eq + 'static,
        R: 'static,
    {
        self.cell.lock().contains::<K, R>(id, key)
    }

    pub fn cached_len<K, R>(&self, id: FunctionId<K, R>) -> usize
    where
        K: 'static,
        R: 'static,
    {
        self.cell.lock().cached_len::<K, R>(id)
    }

    pub fn functions(&self) -> usize {
        self.cell.lock().functions()
    }

    /// Stores `value` for `key` in this scope unless already cached there,
    /// returning the stored value.
    pub fn insert<K, R>(&self, id: FunctionId<K, R>, key: K, value: R) -> R
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        self.cell.lock().insert(id, key, value)
    }

    /// Returns the value cached in this scope for `key`, computing and storing
    /// it on a miss. `compute` runs without the scope locked; an `Err` leaves
    /// the scope untouched.
    pub fn get_or_try_insert_with<K, R, E, F>(
        &self,
        id: FunctionId<K, R>,
        key: K,
        compute: F,
    ) -> Result<R, E>
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<R, E>,
    {
        if let Some(value) = self.get::<K, R>(id, &key) {
            return Ok(value);
        }
        let value = compute()?;
        Ok(self.insert(id, key, value))
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("functions", &self.functions())
            .finish()
    }
}
