use memoscope::{memoize, BindError, CallArgs, Scope, Signature, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn signature() -> Signature<Value> {
    Signature::new()
        .required("base")
        .optional("exponent", 2)
        .optional("modulus", ())
}

fn main() {
    println!("\n=== Keyword-Aware Cache Keys ===\n");

    let executions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&executions);
    let bound_signature = signature();

    let power = memoize(signature(), move |_: &Scope, args: &CallArgs<Value>| {
        counter.fetch_add(1, Ordering::SeqCst);
        let bound = bound_signature.bind(args)?;
        let base = bound[0].as_int().unwrap_or(0);
        let exponent = bound[1].as_int().unwrap_or(0) as u32;
        let result = base.pow(exponent);
        Ok::<_, BindError>(match bound[2].as_int() {
            Some(modulus) => result % modulus,
            None => result,
        })
    });

    let scope = Scope::new();
    let forms = [
        ("power(3)", CallArgs::new().arg(3)),
        ("power(3, 2)", CallArgs::new().arg(3).arg(2)),
        ("power(base=3)", CallArgs::new().kwarg("base", 3)),
        (
            "power(exponent=2, base=3)",
            CallArgs::new().kwarg("exponent", 2).kwarg("base", 3),
        ),
    ];
    for (label, args) in &forms {
        let key = power.signature().derive_key(args);
        println!("{label:<28} key {key:?} -> {:?}", power.call(&scope, args));
    }
    println!(
        "\nExecutions: {} (all four forms share one entry)\n",
        executions.load(Ordering::SeqCst)
    );

    let modular = CallArgs::new().arg(3).kwarg("exponent", 5).kwarg("modulus", 7);
    println!("power(3, exponent=5, modulus=7) -> {:?}", power.call(&scope, &modular));
    println!("Entries in scope: {}", power.cached_len(&scope));

    println!("\n--- Binding errors are returned, not cached ---\n");
    let bad = CallArgs::new().arg(3).kwarg("base", 4);
    println!("power(3, base=4) -> {:?}", power.call(&scope, &bad));
    println!("cached: {}", power.is_cached(&scope, &bad));
}
