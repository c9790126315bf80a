use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::{FunctionId, Scope, ScopeState};

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// The root of a tree of scopes.
///
/// A registry owns the root [`ScopeState`]. Every scoped wrapper registers
/// itself here when it is created, which installs an empty cache layer for
/// it into the root so that all scopes started afterwards have a defined
/// starting point. [`scope`](Self::scope) starts a new, independent branch.
///
/// A layer stays in the root until it is removed with
/// [`unregister`](Self::unregister). Wrappers ([`FunctionCache`](crate::FunctionCache)
/// and everything built on it) remove their own layer when they are dropped;
/// functions annotated with `#[memoize]` live in statics and are never removed.
///
/// Most programs use the process-wide [`Registry::global`]; separate
/// registries are useful to keep unrelated subsystems (or tests) apart.
///
/// # Examples
///
/// ```
/// use memoscope_core::Registry;
///
/// let registry = Registry::new();
/// let id = registry.register::<u64, u64>("fib");
///
/// let scope = registry.scope();
/// assert_eq!(scope.cached_len::<u64, u64>(id), 0);
/// assert_eq!(registry.registered(), 1);
/// ```
pub struct Registry {
    root: Arc<Mutex<ScopeState>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            root: Arc::new(Mutex::new(ScopeState::new())),
        }
    }

    /// The process-wide registry used unless another one is configured.
    pub fn global() -> &'static Registry {
        &GLOBAL_REGISTRY
    }

    /// Allocates an identity for a scoped function with key type `K` and
    /// result type `R`, and installs its empty layer into the root state.
    pub fn register<K, R>(&self, name: &str) -> FunctionId<K, R>
    where
        K: Send + Sync + 'static,
        R: Send + Sync + 'static,
    {
        let id = FunctionId::next();
        self.root.lock().install::<K, R>(id);
        tracing::debug!(function = %id, name, "registered scoped memoized function");
        id
    }

    /// Removes the root layer of `id`. Scopes started earlier keep theirs.
    pub fn unregister<K, R>(&self, id: FunctionId<K, R>) -> bool {
        let removed = self.root.lock().uninstall(id);
        if removed {
            tracing::debug!(function = %id, "unregistered scoped memoized function");
        }
        removed
    }

    pub fn is_registered<K, R>(&self, id: FunctionId<K, R>) -> bool {
        self.root.lock().has_layer(id)
    }

    /// Registers like [`register`](Self::register) and returns a handle that
    /// unregisters the function when dropped.
    pub(crate) fn enroll<K, R>(&self, name: &str) -> Registration<K, R>
    where
        K: Send + Sync + 'static,
        R: Send + Sync + 'static,
    {
        Registration {
            id: self.register::<K, R>(name),
            root: Arc::downgrade(&self.root),
        }
    }

    /// Starts a new scope from the current root state.
    pub fn scope(&self) -> Scope {
        Scope::from_state(self.root.lock().clone())
    }

    /// Number of functions registered with this registry.
    pub fn registered(&self) -> usize {
        self.root.lock().functions()
    }
}

/// A registered function's root layer, removed on drop. Holds the root weakly
/// so it never keeps a dropped registry alive.
pub(crate) struct Registration<K, R> {
    id: FunctionId<K, R>,
    root: Weak<Mutex<ScopeState>>,
}

impl<K, R> Registration<K, R> {
    pub(crate) fn id(&self) -> FunctionId<K, R> {
        self.id
    }
}

impl<K, R> Drop for Registration<K, R> {
    fn drop(&mut self) {
        if let Some(root) = self.root.upgrade() {
            if root.lock().uninstall(self.id) {
                tracing::debug!(function = %self.id, "dropped scoped memoized function");
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("registered", &self.registered())
            .finish()
    }
}
