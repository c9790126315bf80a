//! # Memoscope Core
//!
//! Core types for the memoscope memoization library.
//!
//! A memoized function caches its successful results by a key derived from
//! its arguments. Results are kept in one of two places:
//!
//! - **Scope-local** ([`CacheMode::Scoped`], the default): each [`Scope`]
//!   sees only the results computed in it or in the scope it was forked from.
//!   Forking is a cheap copy-on-write snapshot, so concurrent tasks given
//!   forks of one scope never see each other's results.
//! - **Global** ([`CacheMode::Global`]): one [`GlobalCache`] per function,
//!   shared by every caller for the life of the wrapper.
//!
//! ## Features
//!
//! - **Call-shape independent keys**: positional, keyword and omitted-default
//!   forms of one call share a cache entry (see [`Signature::derive_key`])
//! - **Sync and async wrappers**: [`Memoized`] and [`AsyncMemoized`]
//! - **Failures are not cached**: an `Err` from the target leaves the cache
//!   untouched and the next call retries
//! - **Statistics** (`stats` feature): per-function hit/miss/failure counters,
//!   available by name through [`stats_registry`]
//!
//! ## Module Organization
//!
//! - [`keys`] - signatures, call arguments and cache key derivation
//! - [`scope`] - copy-on-write scope state and scope handles
//! - [`registry`] - scope roots and function registration
//! - [`global_cache`] - the process-wide store
//! - [`function_cache`] - one function's cache in either mode
//! - [`memoized`] / [`async_memoized`] - the wrappers and [`Memoizer`] builder
//!
//! ## Example
//!
//! ```
//! use memoscope_core::{memoize, CallArgs, Scope, Signature, Value};
//! use std::convert::Infallible;
//!
//! let greet = memoize(
//!     Signature::new().required("name").optional("greeting", "hello"),
//!     |_: &Scope, args: &CallArgs<Value>| {
//!         let name = args.positional().first().or(args.keyword("name"));
//!         Ok::<_, Infallible>(format!("{:?}", name))
//!     },
//! );
//!
//! let scope = Scope::new();
//! greet.call(&scope, &CallArgs::new().arg("ada")).unwrap();
//! assert!(greet.is_cached(&scope, &CallArgs::new().kwarg("name", "ada").kwarg("greeting", "hello")));
//! ```

pub mod async_memoized;
mod error;
pub mod function_cache;
pub mod global_cache;
pub mod keys;
pub mod memoized;
pub mod registry;
pub mod scope;
mod value;

#[cfg(feature = "stats")]
mod stats;

#[cfg(feature = "stats")]
pub mod stats_registry;

pub use async_memoized::{memoize_async, memoize_global_async, AsyncMemoized};
pub use error::BindError;
pub use function_cache::FunctionCache;
pub use global_cache::GlobalCache;
pub use keys::{CacheKey, CallArgs, Param, Signature};
pub use memoized::{memoize, memoize_global, CacheMode, Memoized, Memoizer};
pub use registry::Registry;
pub use scope::{FunctionId, Scope, ScopeState};
pub use value::Value;

#[cfg(feature = "stats")]
pub use stats::CacheStats;

/// Items used by the code `#[memoize]` and `#[memoize_async]` expand to.
#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}
