use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

use memoscope_macro_utils::{analyze, parse_attributes};

/// A procedural macro that memoizes an async function.
///
/// Works like `#[memoize]`, for `async fn`. The cache is consulted before
/// the body starts and written after it completes:
///
/// - a call that is dropped (cancelled) before completing caches nothing;
/// - the result is stored into the scope as it is *after* the body finished,
///   so entries other calls wrote into the same scope meanwhile are kept;
/// - tasks spawned by the body that should inherit the cached results get
///   `scope.fork()`, and never write back into the caller's scope.
///
/// # Requirements
///
/// - **Function must be async**: The function must be declared with `async fn`
/// - **Arguments**: plain identifiers; owned arguments (or `T::to_owned()` of
///   `&T` arguments) must be `Clone + Hash + Eq + Send + Sync + 'static`
/// - **Scope**: scoped functions take exactly one `&Scope` argument, which is
///   not part of the key
/// - **Return type**: `Clone + Send + Sync + 'static`
///
/// # Macro Parameters
///
/// - `global` (optional): `true` shares one cache between all tasks and
///   threads. Default: `false` (scope-local).
/// - `name` (optional): identifier in logs and in the statistics registry.
///   Default: the function name.
///
/// # Cache Behavior
///
/// - **Result-returning async functions**: only `Ok` values are cached
/// - **Concurrent misses**: two tasks missing the same key may both run the
///   body; the first value stored is returned to both
/// - **Registration**: as with `#[memoize]`, the cache registers on the first
///   call; earlier scopes gain its layer on their first write
///
/// # Examples
///
/// ```ignore
/// use memoscope_async::{memoize_async, Scope};
///
/// #[memoize_async]
/// async fn roll(scope: &Scope) -> f64 {
///     fastrand::f64()
/// }
///
/// #[memoize_async(global = true, name = "user_lookup")]
/// async fn fetch_user(id: u64) -> Result<String, String> {
///     tokio::time::sleep(std::time::Duration::from_millis(10)).await;
///     Ok(format!("user-{id}"))
/// }
///
/// let scope = Scope::new();
/// let (a, b) = tokio::join!(roll(&scope), roll(&scope));
/// assert_eq!(a, b);
///
/// let (left, right) = (scope.fork(), scope.fork());
/// let fresh = tokio::spawn(async move { roll(&left).await });
/// let other = tokio::spawn(async move { roll(&right).await });
/// assert_eq!(fresh.await.unwrap(), a); // forks inherit what the parent cached
/// assert_eq!(other.await.unwrap(), a);
/// ```
#[proc_macro_attribute]
pub fn memoize_async(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attrs = match parse_attributes(attr.into()) {
        Ok(attrs) => attrs,
        Err(err) => return err.into(),
    };

    let input = parse_macro_input!(item as ItemFn);
    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(&input.sig.fn_token, "#[memoize_async] requires an async fn")
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

            let __result: #ret_type = (async #block).await;
            #store
        }
    };

    TokenStream::from(expanded)
}
