use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

use memoscope_macro_utils::{analyze, parse_attributes};

/// A procedural macro that memoizes a synchronous function.
///
/// The function's successful results are cached by a key made of its
/// arguments, either in the [`Scope`] the call runs in (the default) or in
/// one process-wide cache (`global = true`).
///
/// # Requirements
///
/// - **Arguments**: plain identifiers. Owned arguments must be
///   `Clone + Hash + Eq + Send + Sync + 'static`; `&T` arguments are keyed by
///   `T::to_owned()`, whose type must meet the same bounds.
/// - **Scope**: scoped functions take exactly one `&Scope` argument. It is the
///   scope the result is looked up in and stored into, and is not part of the
///   key. Global functions may take one too; it is then simply passed along.
/// - **Return type**: `Clone + Send + Sync + 'static`.
/// - No `self` receivers and no generic parameters: the cache is a `static`
///   inside the function.
///
/// # Macro Parameters
///
/// - `global` (optional): `true` shares one cache between all callers for the
///   life of the process. Default: `false` (scope-local).
/// - `name` (optional): identifier in logs and in the statistics registry.
///   Default: the function name.
///
/// # Cache Behavior
///
/// - **Result-returning functions**: only `Ok` values are cached, an `Err` is
///   returned as is and the next call runs the body again
/// - **Panics**: nothing is cached
/// - **Concurrent misses**: may both run the body; the first stored value is
///   the one every caller gets back
/// - **Registration**: the cache is created and registered on the first call,
///   not where the function is defined. Scopes started before that call have
///   no layer for it yet and get one on their first write, so what they see
///   is the same. The layer is never unregistered.
///
/// # Examples
///
/// ```ignore
/// use memoscope::{memoize, Scope};
///
/// #[memoize]
/// fn word_count(scope: &Scope, text: &str) -> usize {
///     text.split_whitespace().count()
/// }
///
/// #[memoize(global = true, name = "fib")]
/// fn fibonacci(n: u64) -> u64 {
///     if n < 2 {
///         return n;
///     }
///     fibonacci(n - 1) + fibonacci(n - 2)
/// }
///
/// #[memoize(global = true)]
/// fn parse_port(raw: &str) -> Result<u16, std::num::ParseIntError> {
///     raw.parse()
/// }
///
/// let scope = Scope::new();
/// assert_eq!(word_count(&scope, "a b c"), 3);
/// assert_eq!(fibonacci(90), 2880067194370816120);
/// assert!(parse_port("http").is_err()); // not cached
/// ```
#[proc_macro_attribute]
pub fn memoize(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = match parse_attributes(attr.into()) {
        Ok(attrs) => attrs,
        Err(err) => return err.into(),
    };

    let input = parse_macro_input!(item as ItemFn);
    if let Some(asyncness) = &input.sig.asyncness {
        return syn::Error::new_spanned(asyncness, "use #[memoize_async] on async functions")
            .to_compile_error()
            .into();
    }

    let memo = match analyze(&input.sig, &attrs) {
        Ok(memo) => memo,
        Err(err) => return err.into(),
    };

    let fn_attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;
    let ret_type = &memo.ret_type;
    let lookup = memo.generate_lookup();
    let store = memo.generate_store();

    let expanded = quote! {
        #(#fn_attrs)*
        #vis #sig {
            #lookup

            let __result: #ret_type = (|| -> #ret_type #block)();
            #store
        }
    };

    TokenStream::from(expanded)
}
