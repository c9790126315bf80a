use std::fmt;
use std::hash::Hash;

#[cfg(feature = "stats")]
use crate::CacheStats;
use crate::{CacheKey, CallArgs, FunctionCache, FunctionId, Registry, Scope, Signature};

/// Where a memoized function keeps its results.
///
/// # Examples
///
/// ```
/// use memoscope_core::CacheMode;
///
/// assert_eq!(CacheMode::default(), CacheMode::Scoped);
/// assert_ne!(CacheMode::Global, CacheMode::Scoped);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Results live in the calling [`Scope`] and are inherited by scopes
    /// forked from it afterwards.
    #[default]
    Scoped,
    /// Results are shared by every caller for the life of the wrapper.
    Global,
}

/// Builds memoized wrappers with a given configuration.
///
/// This is the configurable form of [`memoize`]: choose the cache mode, an
/// optional name (used in logs and, with the `stats` feature, to register
/// the wrapper's statistics in [`stats_registry`](crate::stats_registry)),
/// and the [`Registry`] scoped wrappers register with. One `Memoizer` can
/// wrap any number of functions.
///
/// # Examples
///
/// ```
/// use memoscope_core::{CallArgs, Memoizer, Scope, Signature};
/// use std::convert::Infallible;
///
/// let double = Memoizer::new()
///     .global(true)
///     .name("double")
///     .wrap(Signature::new().required("x"), |_: &Scope, args: &CallArgs<i64>| {
///         Ok::<_, Infallible>(args.positional()[0] * 2)
///     });
///
/// let scope = Scope::new();
/// assert_eq!(double.call(&scope, &CallArgs::new().arg(21)), Ok(42));
/// assert_eq!(double.name(), "double");
/// ```
#[derive(Clone)]
pub struct Memoizer<'r> {
    mode: CacheMode,
    name: Option<String>,
    registry: &'r Registry,
}

impl Memoizer<'static> {
    /// Scoped mode, no name, process-wide registry.
    pub fn new() -> Self {
        Self {
            mode: CacheMode::Scoped,
            name: None,
            registry: Registry::global(),
        }
    }
}

impl Default for Memoizer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Memoizer<'r> {
    /// `true` selects [`CacheMode::Global`], `false` [`CacheMode::Scoped`].
    pub fn global(mut self, global: bool) -> Self {
        self.mode = if global {
            CacheMode::Global
        } else {
            CacheMode::Scoped
        };
        self
    }

    pub fn mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Registers scoped wrappers with `registry` instead of the global one.
    pub fn registry<'s>(self, registry: &'s Registry) -> Memoizer<'s> {
        Memoizer {
            mode: self.mode,
            name: self.name,
            registry,
        }
    }

    /// Unnamed wrappers are called after the target's type and are not
    /// published in the stats registry.
    pub(crate) fn cache<V, R, F>(&self) -> FunctionCache<CacheKey<V>, R>
    where
        V: Clone + Hash + Eq + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        match &self.name {
            Some(name) => FunctionCache::build(name.clone(), self.mode, self.registry, true),
            None => FunctionCache::build(
                std::any::type_name::<F>().to_string(),
                self.mode,
                self.registry,
                false,
            ),
        }
    }

    /// Wraps a synchronous function.
    ///
    /// The target receives the scope of the call (so that it can call other
    /// memoized functions in the same scope) and the call arguments.
    pub fn wrap<V, R, E, F>(&self, signature: Signature<V>, f: F) -> Memoized<V, R, E>
    where
        V: Clone + Hash + Eq + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
        F: Fn(&Scope, &CallArgs<V>) -> Result<R, E> + Send + Sync + 'static,
    {
        Memoized {
            cache: self.cache::<V, R, F>(),
            signature,
            func: Box::new(f),
        }
    }
}

impl fmt::Debug for Memoizer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoizer")
            .field("mode", &self.mode)
            .field("name", &self.name)
            .finish()
    }
}

type SyncTarget<V, R, E> = Box<dyn Fn(&Scope, &CallArgs<V>) -> Result<R, E> + Send + Sync>;

/// A synchronous function wrapped with memoization.
///
/// Created by [`memoize`], [`memoize_global`] or [`Memoizer::wrap`].
pub struct Memoized<V, R, E> {
    cache: FunctionCache<CacheKey<V>, R>,
    signature: Signature<V>,
    func: SyncTarget<V, R, E>,
}

impl<V, R, E> Memoized<V, R, E>
where
    V: Clone + Hash + Eq + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Calls the function, or returns the result cached for equivalent
    /// arguments.
    ///
    /// In scoped mode the result is looked up in and stored into `scope`; in
    /// global mode `scope` is only handed through to the target. An `Err` from
    /// the target is returned unchanged and nothing is cached for the call.
    pub fn call(&self, scope: &Scope, args: &CallArgs<V>) -> Result<R, E> {
        let key = self.signature.derive_key(args);
        if let Some(cached) = self.cache.lookup(Some(scope), &key) {
            return Ok(cached);
        }

        match (self.func)(scope, args) {
            Ok(value) => Ok(self.cache.store(Some(scope), key, value)),
            Err(err) => {
                self.cache.record_failure();
                Err(err)
            }
        }
    }

    /// Whether a call with `args` would be served from the cache.
    pub fn is_cached(&self, scope: &Scope, args: &CallArgs<V>) -> bool {
        self.cache
            .contains(Some(scope), &self.signature.derive_key(args))
    }

    /// Number of results cached for this function (in `scope` when scoped).
    pub fn cached_len(&self, scope: &Scope) -> usize {
        self.cache.cached_len(Some(scope))
    }
}

impl<V, R, E> Memoized<V, R, E> {
    pub fn name(&self) -> &str {
        self.cache.name()
    }

    pub fn mode(&self) -> CacheMode {
        self.cache.mode()
    }

    pub fn signature(&self) -> &Signature<V> {
        &self.signature
    }

    /// The scope-layer identity of a scoped wrapper, `None` in global mode.
    pub fn function_id(&self) -> Option<FunctionId<CacheKey<V>, R>> {
        self.cache.function_id()
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.cache.stats()
    }
}

impl<V, R, E> fmt::Debug for Memoized<V, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("name", &self.cache.name())
            .field("mode", &self.cache.mode())
            .finish_non_exhaustive()
    }
}

/// Wraps `f` with scope-local memoization.
///
/// # Examples
///
/// ```
/// use memoscope_core::{memoize, CallArgs, Scope, Signature};
/// use std::convert::Infallible;
///
/// let draw = memoize(Signature::<i64>::new(), |_: &Scope, _: &CallArgs<i64>| {
///     Ok::<_, Infallible>(fastrand::u64(..))
/// });
///
/// let scope = Scope::new();
/// let first = draw.call(&scope, &CallArgs::new()).unwrap();
/// assert_eq!(draw.call(&scope, &CallArgs::new()).unwrap(), first);
/// ```
pub fn memoize<V, R, E, F>(signature: Signature<V>, f: F) -> Memoized<V, R, E>
where
    V: Clone + Hash + Eq + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    F: Fn(&Scope, &CallArgs<V>) -> Result<R, E> + Send + Sync + 'static,
{
    Memoizer::new().wrap(signature, f)
}

/// Wraps `f` with process-wide memoization; shorthand for
/// `Memoizer::new().global(true).wrap(signature, f)`.
pub fn memoize_global<V, R, E, F>(signature: Signature<V>, f: F) -> Memoized<V, R, E>
where
    V: Clone + Hash + Eq + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    F: Fn(&Scope, &CallArgs<V>) -> Result<R, E> + Send + Sync + 'static,
{
    Memoizer::new().global(true).wrap(signature, f)
}
