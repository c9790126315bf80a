//! # Memoscope
//!
//! Function memoization with a choice of where results live: in the scope a
//! call runs in, or in one cache shared by the whole process.
//!
//! ## Features
//!
//! - **Easy to use**: add `#[memoize]` to a function, or wrap any closure with
//!   [`memoize`](fn@memoize) / [`Memoizer`]
//! - **Scope-local caching**: results are visible to the [`Scope`] that
//!   computed them and to scopes forked from it afterwards, never to siblings
//! - **Global caching**: `#[memoize(global = true)]` shares results between
//!   all callers and threads
//! - **Keyword-aware keys**: positional, keyword and default-omitted forms of
//!   one call share a cache entry ([`Signature::derive_key`])
//! - **Result-aware**: only `Ok` values are cached; errors are retried
//! - **Async support**: see the `memoscope-async` crate
//!
//! ## Quick Start
//!
//! ```rust
//! use memoscope::{memoize, Scope};
//!
//! #[memoize(global = true)]
//! fn fibonacci(n: u32) -> u64 {
//!     if n <= 1 {
//!         return n as u64;
//!     }
//!     fibonacci(n - 1) + fibonacci(n - 2)
//! }
//!
//! #[memoize]
//! fn shout(scope: &Scope, word: &str) -> String {
//!     word.to_uppercase()
//! }
//!
//! assert_eq!(fibonacci(50), 12586269025);
//!
//! let scope = Scope::new();
//! assert_eq!(shout(&scope, "hey"), "HEY"); // computed
//! assert_eq!(shout(&scope, "hey"), "HEY"); // cached in `scope`
//! assert_eq!(shout(&Scope::new(), "hey"), "HEY"); // computed again
//! ```
//!
//! ## Scopes
//!
//! A [`Scope`] is a cheap handle; clones refer to the same scope. A child made
//! with [`Scope::fork`] starts with a snapshot of everything its parent cached,
//! and what it caches afterwards stays in the child:
//!
//! ```rust
//! use memoscope::{memoize, Scope};
//!
//! #[memoize]
//! fn roll(scope: &Scope) -> u64 {
//!     fastrand::u64(..)
//! }
//!
//! let parent = Scope::new();
//! let first = roll(&parent);
//!
//! let child = parent.fork();
//! assert_eq!(roll(&child), first);
//!
//! let a = roll(&Scope::new());
//! let b = roll(&Scope::new());
//! assert_ne!(a, b);
//! ```
//!
//! ## Dynamic Arguments
//!
//! Without the macro, a function is described by a [`Signature`] and called
//! with [`CallArgs`], which may mix positional and keyword arguments:
//!
//! ```rust
//! use memoscope::{memoize, CallArgs, Scope, Signature, Value};
//! use std::convert::Infallible;
//!
//! let power = memoize(
//!     Signature::new().required("base").optional("exp", 2),
//!     |_: &Scope, args: &CallArgs<Value>| {
//!         let bound = Signature::<Value>::new()
//!             .required("base")
//!             .optional("exp", 2)
//!             .bind(args)
//!             .unwrap();
//!         let (base, exp) = (bound[0].as_int().unwrap(), bound[1].as_int().unwrap());
//!         Ok::<_, Infallible>(base.pow(exp as u32))
//!     },
//! );
//!
//! let scope = Scope::new();
//! assert_eq!(power.call(&scope, &CallArgs::new().arg(3)), Ok(9));
//! assert!(power.is_cached(&scope, &CallArgs::new().kwarg("base", 3).kwarg("exp", 2)));
//! ```
//!
//! ## Statistics
//!
//! With the default `stats` feature, every `#[memoize]` function and every
//! named wrapper registers hit/miss counters under its name:
//!
//! ```rust
//! # #[cfg(feature = "stats")]
//! # {
//! use memoscope::{memoize, stats_registry};
//!
//! #[memoize(global = true, name = "doc_double")]
//! fn double(x: i32) -> i32 {
//!     x * 2
//! }
//!
//! double(1);
//! double(1);
//!
//! let stats = stats_registry::get("doc_double").unwrap();
//! assert_eq!(stats.hits(), 1);
//! assert_eq!(stats.misses(), 1);
//! # }
//! ```

pub use memoscope_core::*;
pub use memoscope_macros::memoize;
