use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ItemFn, LitStr};

/// Count the CPU cycles a function body takes and report them via
/// `perf_timer::report_cycles`.
///
/// The label defaults to `name()`; pass a string literal to override it.
/// `async fn` is rejected: the body runs inside a closure, which cannot await.
#[proc_macro_attribute]
pub fn time_function(args: TokenStream, input: TokenStream) -> TokenStream {
    expand_time_function(args.into(), input.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_time_function(args: TokenStream2, input: TokenStream2) -> syn::Result<TokenStream2> {
    let input: ItemFn = syn::parse2(input)?;

    if let Some(asyncness) = input.sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "#[time_function] cannot time an `async fn`; time the awaited work inside it with `time_snippet!` instead",
        ));
    }

    let func_label = if args.is_empty() {
        format!("{}()", input.sig.ident)
    } else {
        syn::parse2::<LitStr>(args)?.value()
    };

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;

    Ok(quote! {
        #(#attrs)*
        #vis #sig {
            let (result, cycles) = ::perf_timer::time_with(|| #block);
            ::perf_timer::report_cycles(#func_label, cycles);
            result
        }
    })
}

/// Count the CPU cycles a code snippet takes, labelled with its `file:line`.
///
/// The snippet is pasted inline, so `?`, `return`, `break` and `continue`
/// act on the enclosing function or loop. Leaving early that way skips the
/// report.
#[proc_macro]
pub fn time_snippet(input: TokenStream) -> TokenStream {
    expand_time_snippet(input.into()).into()
}

fn expand_time_snippet(block: TokenStream2) -> TokenStream2 {
    quote! {
        {
            let start = ::perf_timer::cpu_timer();
            let result = { #block };
            let end = ::perf_timer::cpu_timer();
            ::perf_timer::report_cycles(
                concat!(file!(), ":", line!()),
                ::perf_timer::Cycles::new(end.wrapping_sub(start)),
            );
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn async_fn_is_rejected_with_a_reason() {
        let err = expand_time_function(
            TokenStream2::new(),
            quote! { async fn fetch() -> u32 { 1 } },
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot time an `async fn`"));
    }

    #[test]
    fn non_string_label_is_rejected() {
        assert!(expand_time_function(quote! { 42 }, quote! { fn f() {} }).is_err());
    }

    #[test]
    fn default_label_is_the_function_name() {
        let out = expand_time_function(TokenStream2::new(), quote! { fn warm_up() {} })
            .unwrap()
            .to_string();
        assert!(out.contains("\"warm_up()\""));
    }

    #[test]
    fn custom_label_replaces_the_name() {
        let out = expand_time_function(quote! { "hot-path" }, quote! { fn warm_up() {} })
            .unwrap()
            .to_string();
        assert!(out.contains("\"hot-path\""));
        assert!(!out.contains("warm_up()\""));
    }

    #[test]
    fn snippet_is_pasted_without_a_closure() {
        let out = expand_time_snippet(quote! { parse()? }).to_string();
        assert!(out.contains("parse () ?"));
        assert!(!out.contains("time_with"));
        assert!(!out.contains("||"));
    }
}
