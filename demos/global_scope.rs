use memoscope::{memoize, Scope};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

// Global counters to verify how many times each function executes
static SQUARE_COUNT: AtomicUsize = AtomicUsize::new(0);
static CUBE_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Global cache - shared across all threads and scopes
#[memoize(global = true)]
fn compute_square(x: u32) -> u32 {
    SQUARE_COUNT.fetch_add(1, Ordering::SeqCst);
    println!(
        "Executing compute_square({x}) in thread {:?}",
        thread::current().id()
    );
    x * x
}

/// Scoped cache (default) - results belong to the scope they were computed in
#[memoize]
fn compute_cube(scope: &Scope, x: u32) -> u32 {
    CUBE_COUNT.fetch_add(1, Ordering::SeqCst);
    println!(
        "Executing compute_cube({x}) in thread {:?}",
        thread::current().id()
    );
    x * x * x
}

fn main() {
    println!("\n=== Global vs Scoped Caches ===\n");

    println!("--- Global cache shared across threads ---\n");
    assert_eq!(compute_square(2), 4);
    assert_eq!(compute_square(3), 9);

    let handles: Vec<_> = (0..3)
        .map(|i| {
            thread::spawn(move || {
                println!("Thread {i} calling compute_square(2) and compute_square(3)...");
                (compute_square(2), compute_square(3))
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), (4, 9));
    }
    println!(
        "compute_square bodies run: {} (expected 2)\n",
        SQUARE_COUNT.load(Ordering::SeqCst)
    );

    println!("--- Scoped cache: one scope per unit of work ---\n");
    let root = Scope::new();
    assert_eq!(compute_cube(&root, 2), 8);

    let handles: Vec<_> = (0..3)
        .map(|i| {
            // Each worker starts from what `root` cached so far
            let scope = root.fork();
            thread::spawn(move || {
                println!("Worker {i} calling compute_cube(2) and compute_cube({})...", 10 + i);
                (compute_cube(&scope, 2), compute_cube(&scope, 10 + i))
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    println!(
        "compute_cube bodies run: {} (1 in root + 1 new value per worker)",
        CUBE_COUNT.load(Ordering::SeqCst)
    );

    // Workers never wrote back into root.
    compute_cube(&root, 10);
    println!(
        "after root computes cube(10) itself: {}",
        CUBE_COUNT.load(Ordering::SeqCst)
    );
}
