//! # Concurrent Scopes Example
//!
//! Every request gets its own scope. Work done for one request is cached for
//! the rest of that request only, while the global lookup is shared by all.

use memoscope_async::memoize_async;
use memoscope_core::Scope;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;

static TOKEN_CALLS: AtomicUsize = AtomicUsize::new(0);
static CONFIG_CALLS: AtomicUsize = AtomicUsize::new(0);

/// Per-request: a fresh token for every request, reused within it
#[memoize_async]
async fn request_token(scope: &Scope) -> u64 {
    TOKEN_CALLS.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(20)).await;
    fastrand::u64(..)
}

/// Process-wide: loaded once for everyone
#[memoize_async(global = true)]
async fn load_config(section: &str) -> String {
    CONFIG_CALLS.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("[{section}] enabled=true")
}

async fn handle_request(id: u32, scope: Scope) -> (u32, u64) {
    let config = load_config("server").await;
    let first = request_token(&scope).await;
    let again = request_token(&scope).await;
    assert_eq!(first, again);
    println!("request {id}: token={first:016x} config={config}");
    (id, first)
}

#[tokio::main]
async fn main() {
    println!("=== Concurrent Scopes Example ===\n");

    // Warm the global cache so every request hits it.
    load_config("server").await;

    let root = Scope::new();
    let mut tasks = JoinSet::new();
    for id in 0..5 {
        tasks.spawn(handle_request(id, root.fork()));
    }

    let mut tokens = Vec::new();
    while let Some(result) = tasks.join_next().await {
        tokens.push(result.unwrap().1);
    }
    tokens.sort_unstable();
    tokens.dedup();

    println!("\n--- Results ---");
    println!("Distinct tokens:       {}", tokens.len());
    println!("request_token bodies:  {}", TOKEN_CALLS.load(Ordering::SeqCst));
    println!("load_config bodies:    {}", CONFIG_CALLS.load(Ordering::SeqCst));
}
