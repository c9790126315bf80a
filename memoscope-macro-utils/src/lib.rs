//! Shared utilities for memoscope procedural macros
//!
//! This crate provides the attribute parsing and code generation used by
//! both `memoscope-macros` and `memoscope-async-macros`. The two macros only
//! differ in how the original body is run; everything about keys, scopes and
//! result handling is decided here.

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    punctuated::Punctuated, spanned::Spanned, Expr, FnArg, GenericArgument, Ident, Lit,
    MetaNameValue, Pat, PathArguments, ReturnType, Signature, Token, Type,
};

/// Parsed macro attributes, shared by `#[memoize]` and `#[memoize_async]`
#[derive(Debug, Default)]
pub struct MemoizeAttributes {
    pub global: bool,
    pub custom_name: Option<String>,
}

/// Parse the `global` attribute
pub fn parse_global_attribute(nv: &MetaNameValue) -> Result<bool, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Bool(b) => Ok(b.value),
            _ => Err(quote! { compile_error!("Invalid literal for `global`: expected `true` or `false`") }),
        },
        _ => Err(quote! { compile_error!("Invalid syntax for `global`: expected `global = true|false`") }),
    }
}

/// Parse the `name` attribute
pub fn parse_name_attribute(nv: &MetaNameValue) -> Result<String, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(s) if !s.value().is_empty() => Ok(s.value()),
            Lit::Str(_) => Err(quote! { compile_error!("`name` must not be empty") }),
            _ => Err(quote! { compile_error!("Invalid literal for `name`: expected string") }),
        },
        _ => Err(quote! { compile_error!("Invalid syntax for `name`: expected `name = \"...\"`") }),
    }
}

/// Parse memoize attributes from a token stream
pub fn parse_attributes(attr: TokenStream2) -> Result<MemoizeAttributes, TokenStream2> {
    use syn::parse::Parser;

    let parser = Punctuated::<MetaNameValue, Token![,]>::parse_terminated;
    let parsed_args = parser.parse2(attr).map_err(|e| {
        let msg = format!("Failed to parse attributes: {}", e);
        quote! { compile_error!(#msg) }
    })?;

    let mut attrs = MemoizeAttributes::default();

    for nv in parsed_args {
        if nv.path.is_ident("global") {
            attrs.global = parse_global_attribute(&nv)?;
        } else if nv.path.is_ident("name") {
            attrs.custom_name = Some(parse_name_attribute(&nv)?);
        } else {
            let path = &nv.path;
            let msg = format!(
                "Unknown attribute `{}`: expected `global` or `name`",
                quote!(#path).to_string().replace(' ', "")
            );
            return Err(quote! { compile_error!(#msg) });
        }
    }

    Ok(attrs)
}

/// Everything the code generators need to know about an annotated function.
pub struct MemoizedFn {
    /// Name the cache is registered under.
    pub name: String,
    pub global: bool,
    /// Tuple type of the owned key.
    pub key_type: TokenStream2,
    /// Expression building the key from the arguments.
    pub key_expr: TokenStream2,
    /// The `&Scope` argument, if the function has one.
    pub scope_arg: Option<Ident>,
    /// The declared return type.
    pub ret_type: TokenStream2,
    /// The cached type: `T` for `Result<T, E>`, the return type otherwise.
    pub value_type: TokenStream2,
    pub is_result: bool,
}

fn error(span: impl Spanned, message: &str) -> TokenStream2 {
    syn::Error::new(span.span(), message).to_compile_error()
}

/// `true` for `&Scope` and `&path::to::Scope`.
pub fn is_scope_type(ty: &Type) -> bool {
    match ty {
        Type::Reference(reference) if reference.mutability.is_none() => match &*reference.elem {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .map_or(false, |segment| segment.ident == "Scope"),
            _ => false,
        },
        _ => false,
    }
}

/// The `T` of a `Result<T, ..>` return type.
pub fn result_ok_type(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        }),
        _ => None,
    }
}

/// Owned key type and key expression for one argument.
fn key_part(ident: &Ident, ty: &Type) -> (TokenStream2, TokenStream2) {
    match ty {
        Type::Reference(reference) => {
            let elem = &reference.elem;
            (
                quote! { <#elem as ::std::borrow::ToOwned>::Owned },
                quote! { <#elem as ::std::borrow::ToOwned>::to_owned(#ident) },
            )
        }
        _ => (
            quote! { #ty },
            quote! { ::std::clone::Clone::clone(&#ident) },
        ),
    }
}

/// Inspect a function signature and decide how it is memoized.
pub fn analyze(sig: &Signature, attrs: &MemoizeAttributes) -> Result<MemoizedFn, TokenStream2> {
    if !sig.generics.params.is_empty() {
        return Err(error(
            &sig.generics,
            "memoized functions cannot be generic: the cache is a `static` with one concrete key type",
        ));
    }

    let mut key_types = Vec::new();
    let mut key_exprs = Vec::new();
    let mut scope_arg = None;

    for arg in &sig.inputs {
        let pat_type = match arg {
            FnArg::Receiver(receiver) => {
                return Err(error(
                    receiver,
                    "memoized functions cannot take `self`: pass the value as an ordinary argument",
                ))
            }
            FnArg::Typed(pat_type) => pat_type,
        };

        let ident = match &*pat_type.pat {
            Pat::Ident(pat_ident) => &pat_ident.ident,
            other => {
                return Err(error(
                    other,
                    "memoized function arguments must be plain identifiers",
                ))
            }
        };

        if is_scope_type(&pat_type.ty) {
            if scope_arg.is_some() {
                return Err(error(pat_type, "only one `&Scope` argument is allowed"));
            }
            scope_arg = Some(ident.clone());
            continue;
        }

        let (ty, expr) = key_part(ident, &pat_type.ty);
        key_types.push(ty);
        key_exprs.push(expr);
    }

    if !attrs.global && scope_arg.is_none() {
        return Err(error(
            &sig.ident,
            "scoped memoization needs the scope of the call: add a `scope: &Scope` argument or use `global = true`",
        ));
    }

    let (ret_type, value_type, is_result) = match &sig.output {
        ReturnType::Default => (quote! { () }, quote! { () }, false),
        ReturnType::Type(_, ty) => {
            if let Type::ImplTrait(_) = &**ty {
                return Err(error(ty, "memoized functions cannot return `impl Trait`"));
            }
            match result_ok_type(ty) {
                Some(ok) => (quote! { #ty }, quote! { #ok }, true),
                None => (quote! { #ty }, quote! { #ty }, false),
            }
        }
    };

    Ok(MemoizedFn {
        name: attrs
            .custom_name
            .clone()
            .unwrap_or_else(|| sig.ident.to_string()),
        global: attrs.global,
        key_type: quote! { ( #(#key_types,)* ) },
        key_expr: quote! { ( #(#key_exprs,)* ) },
        scope_arg,
        ret_type,
        value_type,
        is_result,
    })
}

impl MemoizedFn {
    /// The `Option<&Scope>` handed to the cache.
    fn scope_expr(&self) -> TokenStream2 {
        match (&self.scope_arg, self.global) {
            (Some(scope), false) => quote! { ::std::option::Option::Some(#scope) },
            _ => quote! { ::std::option::Option::None },
        }
    }

    /// The `static` cache, the key, and the early return on a hit.
    pub fn generate_lookup(&self) -> TokenStream2 {
        let name = &self.name;
        let key_type = &self.key_type;
        let key_expr = &self.key_expr;
        let value_type = &self.value_type;
        let scope_expr = self.scope_expr();
        let mode = if self.global {
            quote! { ::memoscope_core::CacheMode::Global }
        } else {
            quote! { ::memoscope_core::CacheMode::Scoped }
        };
        let cached = if self.is_result {
            quote! { ::std::result::Result::Ok(__cached) }
        } else {
            quote! { __cached }
        };
        let unused_scope = match (&self.scope_arg, self.global) {
            (Some(scope), true) => quote! { let _ = #scope; },
            _ => quote! {},
        };

        quote! {
            static __MEMOSCOPE_CACHE: ::memoscope_core::__private::Lazy<
                ::memoscope_core::FunctionCache<#key_type, #value_type>,
            > = ::memoscope_core::__private::Lazy::new(|| {
                ::memoscope_core::FunctionCache::new(#name, #mode)
            });

            #unused_scope
            let __key: #key_type = #key_expr;
            if let ::std::option::Option::Some(__cached) =
                __MEMOSCOPE_CACHE.lookup(#scope_expr, &__key)
            {
                return #cached;
            }
        }
    }

    /// Stores `__result` (only its `Ok` value for `Result` functions) and
    /// evaluates to what the function returns.
    pub fn generate_store(&self) -> TokenStream2 {
        let scope_expr = self.scope_expr();
        if self.is_result {
            quote! {
                match __result {
                    ::std::result::Result::Ok(__value) => ::std::result::Result::Ok(
                        __MEMOSCOPE_CACHE.store(#scope_expr, __key, __value),
                    ),
                    ::std::result::Result::Err(__err) => {
                        __MEMOSCOPE_CACHE.record_failure();
                        ::std::result::Result::Err(__err)
                    }
                }
            }
        } else {
            quote! { __MEMOSCOPE_CACHE.store(#scope_expr, __key, __result) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn tokens(ts: &TokenStream2) -> String {
        ts.to_string().replace(' ', "")
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(quote! { global = true, name = "lookup_v2" }).unwrap();
        assert!(attrs.global);
        assert_eq!(attrs.custom_name.as_deref(), Some("lookup_v2"));

        let defaults = parse_attributes(TokenStream2::new()).unwrap();
        assert!(!defaults.global);
        assert_eq!(defaults.custom_name, None);
    }

    #[test]
    fn test_parse_attributes_rejects_unknown_and_bad_values() {
        assert!(parse_attributes(quote! { limit = 10 }).is_err());
        assert!(parse_attributes(quote! { global = "yes" }).is_err());
        assert!(parse_attributes(quote! { name = 3 }).is_err());
        assert!(parse_attributes(quote! { name = "" }).is_err());
    }

    #[test]
    fn test_scope_argument_excluded_from_key() {
        let sig: Signature = parse_quote! {
            fn area(scope: &memoscope::Scope, width: u32, label: &str) -> u64
        };
        let memo = analyze(&sig, &MemoizeAttributes::default()).unwrap();

        assert_eq!(memo.scope_arg.as_ref().map(|i| i.to_string()).as_deref(), Some("scope"));
        assert_eq!(
            tokens(&memo.key_type),
            "(u32,<stras::std::borrow::ToOwned>::Owned,)"
        );
        assert!(!memo.is_result);
        assert_eq!(tokens(&memo.value_type), "u64");
        assert_eq!(memo.name, "area");
    }

    #[test]
    fn test_result_value_type() {
        let sig: Signature = parse_quote! {
            fn load(id: u64) -> std::result::Result<String, std::io::Error>
        };
        let attrs = MemoizeAttributes {
            global: true,
            custom_name: Some("loader".to_string()),
        };
        let memo = analyze(&sig, &attrs).unwrap();

        assert!(memo.is_result);
        assert_eq!(tokens(&memo.value_type), "String");
        assert_eq!(memo.name, "loader");
        assert!(memo.scope_arg.is_none());
        assert!(tokens(&memo.generate_store()).contains("record_failure"));
    }

    #[test]
    fn test_scoped_requires_scope_argument() {
        let sig: Signature = parse_quote! { fn f(x: u8) -> u8 };
        assert!(analyze(&sig, &MemoizeAttributes::default()).is_err());
    }

    #[test]
    fn test_rejected_signatures() {
        let attrs = MemoizeAttributes {
            global: true,
            custom_name: None,
        };
        let receiver: Signature = parse_quote! { fn f(&self, x: u8) -> u8 };
        let generic: Signature = parse_quote! { fn f<T: Clone>(x: T) -> T };
        let pattern: Signature = parse_quote! { fn f((a, b): (u8, u8)) -> u8 };
        let two_scopes: Signature = parse_quote! { fn f(a: &Scope, b: &Scope) -> u8 };

        for sig in [receiver, generic, pattern, two_scopes] {
            assert!(analyze(&sig, &attrs).is_err());
        }
    }

    #[test]
    fn test_global_ignores_scope_argument() {
        let sig: Signature = parse_quote! { fn f(scope: &Scope) -> u8 };
        let attrs = MemoizeAttributes {
            global: true,
            custom_name: None,
        };
        let memo = analyze(&sig, &attrs).unwrap();
        assert_eq!(tokens(&memo.key_type), "()");
        assert!(tokens(&memo.generate_lookup()).contains("lookup(::std::option::Option::None"));
    }
}
