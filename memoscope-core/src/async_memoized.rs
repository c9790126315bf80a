use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;

#[cfg(feature = "stats")]
use crate::CacheStats;
use crate::{CacheKey, CacheMode, CallArgs, FunctionCache, FunctionId, Memoizer, Scope, Signature};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type AsyncTarget<V, R, E> = Box<dyn Fn(Scope, CallArgs<V>) -> BoxFuture<Result<R, E>> + Send + Sync>;

impl<'r> Memoizer<'r> {
    /// Wraps an async function.
    ///
    /// The target receives a handle to the caller's scope and the call
    /// arguments by value, and returns the future to await. Tasks it spawns
    /// should be given `scope.fork()` to inherit the results cached so far.
    pub fn wrap_async<V, R, E, F, Fut>(&self, signature: Signature<V>, f: F) -> AsyncMemoized<V, R, E>
    where
        V: Clone + Hash + Eq + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
        F: Fn(Scope, CallArgs<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        AsyncMemoized {
            cache: self.cache::<V, R, F>(),
            signature,
            func: Box::new(move |scope, args| -> BoxFuture<Result<R, E>> {
                Box::pin(f(scope, args))
            }),
        }
    }
}

/// An async function wrapped with memoization.
///
/// The cache is consulted before the target's future is created and written
/// once it completes, so a call that is dropped before completion stores
/// nothing. Two calls racing on the same key in the same scope may both run
/// the target; the first to finish wins and the other is handed its value.
pub struct AsyncMemoized<V, R, E> {
    cache: FunctionCache<CacheKey<V>, R>,
    signature: Signature<V>,
    func: AsyncTarget<V, R, E>,
}

impl<V, R, E> AsyncMemoized<V, R, E>
where
    V: Clone + Hash + Eq + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Awaits the function, or returns the result cached for equivalent
    /// arguments. See [`Memoized::call`](crate::Memoized::call).
    pub async fn call(&self, scope: &Scope, args: CallArgs<V>) -> Result<R, E> {
        let key = self.signature.derive_key(&args);
        if let Some(cached) = self.cache.lookup(Some(scope), &key) {
            return Ok(cached);
        }

        match (self.func)(scope.clone(), args).await {
            Ok(value) => Ok(self.cache.store(Some(scope), key, value)),
            Err(err) => {
                self.cache.record_failure();
                Err(err)
            }
        }
    }

    pub fn is_cached(&self, scope: &Scope, args: &CallArgs<V>) -> bool {
        self.cache
            .contains(Some(scope), &self.signature.derive_key(args))
    }

    pub fn cached_len(&self, scope: &Scope) -> usize {
        self.cache.cached_len(Some(scope))
    }
}

impl<V, R, E> AsyncMemoized<V, R, E> {
    pub fn name(&self) -> &str {
        self.cache.name()
    }

    pub fn mode(&self) -> CacheMode {
        self.cache.mode()
    }

    pub fn signature(&self) -> &Signature<V> {
        &self.signature
    }

    pub fn function_id(&self) -> Option<FunctionId<CacheKey<V>, R>> {
        self.cache.function_id()
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.cache.stats()
    }
}

impl<V, R, E> fmt::Debug for AsyncMemoized<V, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMemoized")
            .field("name", &self.cache.name())
            .field("mode", &self.cache.mode())
            .finish_non_exhaustive()
    }
}

/// Wraps an async `f` with scope-local memoization.
///
/// # Examples
///
/// ```
/// use memoscope_core::{memoize_async, CallArgs, Scope, Signature};
/// use std::convert::Infallible;
///
/// let lookup = memoize_async(
///     Signature::new().required("id"),
///     |_scope: Scope, args: CallArgs<u32>| async move {
///         Ok::<_, Infallible>(format!("user-{}", args.positional()[0]))
///     },
/// );
///
/// let scope = Scope::new();
/// let name = futures::executor::block_on(lookup.call(&scope, CallArgs::new().arg(7u32)));
/// assert_eq!(name.as_deref(), Ok("user-7"));
/// assert!(lookup.is_cached(&scope, &CallArgs::new().kwarg("id", 7u32)));
/// ```
pub fn memoize_async<V, R, E, F, Fut>(signature: Signature<V>, f: F) -> AsyncMemoized<V, R, E>
where
    V: Clone + Hash + Eq + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    F: Fn(Scope, CallArgs<V>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    Memoizer::new().wrap_async(signature, f)
}

/// Wraps an async `f` with process-wide memoization.
pub fn memoize_global_async<V, R, E, F, Fut>(
    signature: Signature<V>,
    f: F,
) -> AsyncMemoized<V, R, E>
where
    V: Clone + Hash + Eq + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    F: Fn(Scope, CallArgs<V>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    Memoizer::new().global(true).wrap_async(signature, f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::future::{join, poll_fn};
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::Poll;

    fn draw() -> impl Future<Output = Result<u64, Infallible>> + Send {
        async { Ok(fastrand::u64(..)) }
    }

    #[test]
    fn test_async_same_scope_computes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let square = memoize_async(
            Signature::new().required("x"),
            move |_: Scope, args: CallArgs<i64>| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, Infallible>(args.positional()[0] * args.positional()[0]) }
            },
        );

        let scope = Scope::new();
        block_on(async {
            assert_eq!(square.call(&scope, CallArgs::new().arg(4)).await, Ok(16));
            assert_eq!(square.call(&scope, CallArgs::new().kwarg("x", 4)).await, Ok(16));
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_async_joined_scoped_calls_differ_in_forks() {
        let random = memoize_async(Signature::<u8>::new(), |_: Scope, _: CallArgs<u8>| draw());
        let scope = Scope::new();

        let (a, b) = block_on(async {
            let left = scope.fork();
            let right = scope.fork();
            join(
                random.call(&left, CallArgs::new()),
                random.call(&right, CallArgs::new()),
            )
            .await
        });
        assert_ne!(a, b);
        assert_eq!(random.cached_len(&scope), 0);
    }

    #[test]
    fn test_async_joined_global_calls_agree() {
        let random = memoize_global_async(Signature::<u8>::new(), |_: Scope, _: CallArgs<u8>| draw());
        let scope = Scope::new();

        let (a, b) = block_on(join(
            random.call(&scope.fork(), CallArgs::new()),
            random.call(&scope.fork(), CallArgs::new()),
        ));
        assert_eq!(a, b);
        assert_eq!(random.mode(), CacheMode::Global);
    }

    #[test]
    fn test_async_failure_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let flaky = memoize_async(Signature::<u8>::new(), move |_: Scope, _: CallArgs<u8>| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err("unavailable")
                } else {
                    Ok(attempt)
                }
            }
        });

        let scope = Scope::new();
        block_on(async {
            assert_eq!(flaky.call(&scope, CallArgs::new()).await, Err("unavailable"));
            assert_eq!(flaky.call(&scope, CallArgs::new()).await, Ok(1));
            assert_eq!(flaky.call(&scope, CallArgs::new()).await, Ok(1));
        });
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_async_dropped_call_stores_nothing() {
        let pending_once = memoize_async(Signature::<u8>::new(), |_: Scope, _: CallArgs<u8>| async {
            let mut polled = false;
            poll_fn(|_| {
                if polled {
                    Poll::Ready(())
                } else {
                    polled = true;
                    Poll::Pending
                }
            })
            .await;
            Ok::<_, Infallible>(1u8)
        });

        let scope = Scope::new();
        {
            let mut call = Box::pin(pending_once.call(&scope, CallArgs::new()));
            let waker = futures::task::noop_waker();
            let mut cx = std::task::Context::from_waker(&waker);
            assert!(call.as_mut().poll(&mut cx).is_pending());
        }
        assert!(!pending_once.is_cached(&scope, &CallArgs::new()));
    }

    #[test]
    fn test_async_target_sees_caller_scope() {
        let inner = Arc::new(memoize_async(
            Signature::new().required("x"),
            |_: Scope, args: CallArgs<i64>| async move { Ok::<_, Infallible>(args.positional()[0] + 1) },
        ));
        let nested = Arc::clone(&inner);
        let outer = memoize_async(
            Signature::new().required("x"),
            move |scope: Scope, args: CallArgs<i64>| {
                let inner = Arc::clone(&nested);
                async move {
                    let x = args.positional()[0];
                    inner.call(&scope, CallArgs::new().arg(x)).await
                }
            },
        );

        let scope = Scope::new();
        assert_eq!(block_on(outer.call(&scope, CallArgs::new().arg(1))), Ok(2));
        assert!(inner.is_cached(&scope, &CallArgs::new().arg(1)));
    }
}
