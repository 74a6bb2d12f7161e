use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Ident, ItemFn};

/// Runs an `async fn` test on a fresh current-thread runtime.
///
/// `#[core_async::test(start_paused)]` starts the runtime clock paused so
/// sleeps and intervals complete as soon as every task is idle. The calling
/// crate must enable the `core-async/test-util` feature for that variant.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mode = match parse_mode(attr) {
        Ok(mode) => mode,
        Err(err) => return err.to_compile_error().into(),
    };

    let input = parse_macro_input!(item as ItemFn);

    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            input.sig.fn_token,
            "core_async::test requires `async fn`",
        )
        .to_compile_error()
        .into();
    }

    expand_test(input, mode).into()
}

enum ClockMode {
    Realtime,
    Paused,
}

fn parse_mode(attr: TokenStream) -> syn::Result<ClockMode> {
    if attr.is_empty() {
        return Ok(ClockMode::Realtime);
    }

    let tokens = TokenStream2::from(attr);
    let ident: Ident = syn::parse2(tokens.clone())
        .map_err(|_| syn::Error::new_spanned(&tokens, "expected `start_paused`"))?;

    if ident == "start_paused" {
        Ok(ClockMode::Paused)
    } else {
        Err(syn::Error::new_spanned(
            ident,
            "unknown core_async::test argument; only `start_paused` is supported",
        ))
    }
}

fn expand_test(input: ItemFn, mode: ClockMode) -> TokenStream2 {
    let attrs = input.attrs;
    let vis = input.vis;
    let block = input.block;
    let mut sig = input.sig;
    sig.asyncness = None;

    let runner = match mode {
        ClockMode::Realtime => quote!(core_async::runtime::block_on),
        ClockMode::Paused => quote!(core_async::runtime::block_on_paused),
    };

    quote! {
        #(#attrs)*
        #[test]
        #vis #sig {
            #runner(async move #block)
        }
    }
}
