//! # Memoscope Async
//!
//! Scope-aware memoization for async functions.
//!
//! This crate provides the `#[memoize_async]` attribute and re-exports the
//! async wrappers of `memoscope-core`. A memoized async function caches its
//! successful results either in the [`Scope`] it is called with, or (with
//! `global = true`) in one cache shared by every task and thread.
//!
//! ## Features
//!
//! - **Scope-local by default**: concurrent tasks given forks of one scope
//!   each compute their own results and never see each other's
//! - **Global mode**: one `DashMap`-backed cache for the whole process
//! - **Result caching**: only `Ok` values from `Result` types are cached
//! - **Cancellation safe**: a dropped call caches nothing
//! - **Statistics**: hit/miss counters by name via `stats_registry`
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! memoscope-async = "0.3.0"
//! memoscope-core = "0.3.0"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ### Scoped
//!
//! ```rust,ignore
//! use memoscope_async::{memoize_async, Scope};
//!
//! #[memoize_async]
//! async fn session_token(scope: &Scope, user: u64) -> String {
//!     issue_token(user).await
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let request = Scope::new();
//!     let a = session_token(&request, 7).await;
//!     let b = session_token(&request, 7).await; // cached for this request
//!     assert_eq!(a, b);
//!
//!     let other_request = Scope::new();
//!     let c = session_token(&other_request, 7).await; // computed again
//! }
//! ```
//!
//! ### Global
//!
//! ```rust,ignore
//! use memoscope_async::memoize_async;
//!
//! #[memoize_async(global = true)]
//! async fn fetch_weather(city: String) -> Result<Weather, Error> {
//!     // Errors are not cached and always re-executed
//!     api::get_weather(&city).await
//! }
//! ```
//!
//! ### Without the macro
//!
//! ```rust,ignore
//! use memoscope_async::{memoize_async, CallArgs, Scope, Signature};
//!
//! let lookup = memoize_async(Signature::new().required("id"), |_scope: Scope, args: CallArgs<u64>| async move {
//!     db::find(args.positional()[0]).await
//! });
//! let user = lookup.call(&Scope::new(), CallArgs::new().kwarg("id", 7u64)).await;
//! ```
//!
//! ## Spawning
//!
//! A [`Scope`] is `Send + Sync + Clone`. Clones refer to the same scope; give
//! spawned tasks `scope.fork()` so they start from what the parent cached so
//! far without writing back into it.

// Re-export the macro
pub use memoscope_async_macros::memoize_async;

// Re-export the async wrapper API from memoscope-core
pub use memoscope_core::{
    memoize_async, memoize_global_async, AsyncMemoized, CacheMode, CallArgs, Memoizer, Registry,
    Scope, Signature, Value,
};

#[cfg(feature = "stats")]
pub use memoscope_core::{stats_registry, CacheStats};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::memoize_async;
    pub use crate::{AsyncMemoized, CacheMode, CallArgs, Scope, Signature};

    #[cfg(feature = "stats")]
    pub use crate::{stats_registry, CacheStats};
}
