use memoscope::{memoize, Scope};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

static SQUARE_CALLS: AtomicUsize = AtomicUsize::new(0);

#[memoize]
fn square(scope: &Scope, x: i64) -> i64 {
    SQUARE_CALLS.fetch_add(1, Ordering::SeqCst);
    x * x
}

#[test]
fn test_scoped_cache_per_scope() {
    let scope = Scope::new();
    let before = SQUARE_CALLS.load(Ordering::SeqCst);

    assert_eq!(square(&scope, 7), 49);
    assert_eq!(square(&scope, 7), 49);
    assert_eq!(SQUARE_CALLS.load(Ordering::SeqCst) - before, 1);

    let child = scope.fork();
    assert_eq!(square(&child, 7), 49);
    assert_eq!(SQUARE_CALLS.load(Ordering::SeqCst) - before, 1);
}

#[memoize]
fn draw(scope: &Scope) -> u64 {
    fastrand::u64(..)
}

#[memoize(global = true)]
fn draw_global() -> u64 {
    fastrand::u64(..)
}

#[test]
fn test_fresh_scopes_see_fresh_values() {
    let a = draw(&Scope::new());
    let b = draw(&Scope::new());
    assert_ne!(a, b);
}

#[test]
fn test_fork_does_not_write_back() {
    let parent = Scope::new();
    let child = parent.fork();
    let in_child = draw(&child);

    assert_eq!(draw(&child), in_child);
    assert_ne!(draw(&parent), in_child);
}

#[test]
fn test_global_shared_between_threads() {
    let main_value = draw_global();
    let handles: Vec<_> = (0..4).map(|_| thread::spawn(draw_global)).collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), main_value);
    }
}

static LEN_CALLS: AtomicUsize = AtomicUsize::new(0);

#[memoize(global = true)]
fn char_len(text: &str) -> usize {
    LEN_CALLS.fetch_add(1, Ordering::SeqCst);
    text.chars().count()
}

#[test]
fn test_borrowed_arguments_keyed_by_owned_value() {
    let owned = String::from("grüße");
    assert_eq!(char_len(&owned), 5);
    assert_eq!(char_len("grüße"), 5);
    assert_eq!(LEN_CALLS.load(Ordering::SeqCst), 1);

    assert_eq!(char_len("grusse"), 6);
    assert_eq!(LEN_CALLS.load(Ordering::SeqCst), 2);
}

static PARSE_CALLS: AtomicUsize = AtomicUsize::new(0);

#[memoize]
fn parse_port(scope: &Scope, raw: &str) -> Result<u16, String> {
    PARSE_CALLS.fetch_add(1, Ordering::SeqCst);
    let port: u16 = raw.trim().parse().map_err(|e| format!("{raw:?}: {e}"))?;
    if port == 0 {
        return Err("port 0 is reserved".to_string());
    }
    Ok(port)
}

#[test]
fn test_result_only_ok_cached() {
    let scope = Scope::new();

    assert!(parse_port(&scope, "http").is_err());
    assert!(parse_port(&scope, "http").is_err());
    assert_eq!(PARSE_CALLS.load(Ordering::SeqCst), 2);

    assert_eq!(parse_port(&scope, "0"), Err("port 0 is reserved".to_string()));
    assert_eq!(PARSE_CALLS.load(Ordering::SeqCst), 3);

    assert_eq!(parse_port(&scope, "8080"), Ok(8080));
    assert_eq!(parse_port(&scope, "8080"), Ok(8080));
    assert_eq!(PARSE_CALLS.load(Ordering::SeqCst), 4);
}

#[memoize(global = true)]
fn collatz_steps(n: u64) -> u32 {
    if n <= 1 {
        return 0;
    }
    let next = if n % 2 == 0 { n / 2 } else { 3 * n + 1 };
    1 + collatz_steps(next)
}

#[test]
fn test_recursive_global_function() {
    assert_eq!(collatz_steps(27), 111);
    assert_eq!(collatz_steps(9), 19);
}

#[memoize]
fn path_count(scope: &Scope, rows: u32, cols: u32) -> u64 {
    if rows == 0 || cols == 0 {
        return 1;
    }
    path_count(scope, rows - 1, cols) + path_count(scope, rows, cols - 1)
}

#[test]
fn test_recursive_scoped_function() {
    let scope = Scope::new();
    assert_eq!(path_count(&scope, 16, 16), 601080390);
    assert_eq!(path_count(&scope.fork(), 16, 16), 601080390);
}

static GREET_CALLS: AtomicUsize = AtomicUsize::new(0);

#[memoize(global = true)]
fn greet(scope: &Scope, name: String) -> String {
    GREET_CALLS.fetch_add(1, Ordering::SeqCst);
    format!("hello {name}")
}

#[test]
fn test_global_ignores_scope_argument() {
    assert_eq!(greet(&Scope::new(), "ada".to_string()), "hello ada");
    assert_eq!(greet(&Scope::new(), "ada".to_string()), "hello ada");
    assert_eq!(GREET_CALLS.load(Ordering::SeqCst), 1);
}

static FRAGILE_CALLS: AtomicUsize = AtomicUsize::new(0);

#[memoize]
fn fragile(scope: &Scope, n: u32) -> u32 {
    if FRAGILE_CALLS.fetch_add(1, Ordering::SeqCst) == 0 {
        panic!("first call fails");
    }
    n / 2
}

#[test]
fn test_panic_caches_nothing() {
    let scope = Scope::new();
    let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| fragile(&scope, 4)));
    assert!(caught.is_err());

    assert_eq!(fragile(&scope, 4), 2);
    assert_eq!(fragile(&scope, 4), 2);
    assert_eq!(FRAGILE_CALLS.load(Ordering::SeqCst), 2);
}

static LATE_CALLS: AtomicUsize = AtomicUsize::new(0);

#[memoize]
fn late_registered(scope: &Scope, n: u32) -> u32 {
    LATE_CALLS.fetch_add(1, Ordering::SeqCst);
    n + 1
}

#[test]
fn test_scope_started_before_first_call() {
    let early = Scope::new();
    let sibling = early.fork();

    assert_eq!(late_registered(&early, 1), 2);
    assert_eq!(late_registered(&early, 1), 2);
    assert_eq!(LATE_CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(late_registered(&early.fork(), 1), 2);
    assert_eq!(LATE_CALLS.load(Ordering::SeqCst), 1);

    assert_eq!(late_registered(&sibling, 1), 2);
    assert_eq!(LATE_CALLS.load(Ordering::SeqCst), 2);
}
