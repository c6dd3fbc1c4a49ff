// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
use quote::*;

use proc_macro::TokenStream as TokenStream1;
use proc_macro2::TokenStream as TokenStream2;
use syn::{parse::Parser, punctuated::Punctuated, spanned::Spanned, Expr, Token};

mod attr_data;
use attr_data::*;

/// Highest arity `dyninvoke::Signature` is implemented for.
const MAX_PARAMS: usize = 6;

#[proc_macro_attribute]
pub fn bind(args: TokenStream1, input: TokenStream1) -> TokenStream1 {
    let args = TokenStream2::from(args);
    let foreign_mod = match syn::parse2::<syn::ItemForeignMod>(TokenStream2::from(input)) {
        Ok(foreign_mod) => foreign_mod,
        Err(e) => return e.into_compile_error().into(),
    };

    let punct = match Parser::parse2(Punctuated::<Expr, Token!(,)>::parse_terminated, args) {
        Ok(punct) => punct,
        Err(e) => return e.into_compile_error().into(),
    };
    let attr = match AttrData::try_from(punct) {
        Ok(attr) => attr,
        Err(e) => return e.into_compile_error().into(),
    };

    let fn_count = foreign_mod
        .items
        .iter()
        .filter(|item| matches!(item, syn::ForeignItem::Fn(_)))
        .count();
    if let Some((_, span)) = &attr.link_name {
        if fn_count != 1 {
            return syn::Error::new(
                *span,
                "`link_name` in `bind` needs exactly one function; use `#[link_name]` on each function instead",
            )
            .into_compile_error()
            .into();
        }
    }

    let abi = &foreign_mod.abi;
    let mut ret = TokenStream2::new();
    for item in foreign_mod.items {
        match item {
            syn::ForeignItem::Fn(fn_item) => ret.extend(
                parse_fn(abi, fn_item, &attr).unwrap_or_else(syn::Error::into_compile_error),
            ),
            other => ret.extend(quote!(#abi {#other})),
        }
    }
    TokenStream1::from(ret)
}

/// Removes a `#[link_name = "..."]` from `attrs` and returns its value.
fn take_link_name(attrs: &mut Vec<syn::Attribute>) -> syn::Result<Option<String>> {
    let Some(pos) = attrs.iter().position(|a| a.path().is_ident("link_name")) else {
        return Ok(None);
    };
    let attr = attrs.remove(pos);
    match &attr.meta {
        syn::Meta::NameValue(syn::MetaNameValue {
            value:
                Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(val),
                    ..
                }),
            ..
        }) => Ok(Some(val.value())),
        meta => Err(syn::Error::new(
            meta.span(),
            "expected `#[link_name = \"...\"]`",
        )),
    }
}

fn parse_fn(
    abi: &syn::Abi,
    mut fn_item: syn::ForeignItemFn,
    attr: &AttrData,
) -> syn::Result<TokenStream2> {
    if let Some(variadic) = &fn_item.sig.variadic {
        return Err(syn::Error::new(
            variadic.span(),
            "variadic functions are unsupported",
        ));
    }
    if fn_item.sig.inputs.len() > MAX_PARAMS {
        return Err(syn::Error::new(
            fn_item.sig.inputs.span(),
            format!("at most {MAX_PARAMS} parameters are supported"),
        ));
    }

    let link_name = match take_link_name(&mut fn_item.attrs)? {
        Some(name) => name,
        None => match &attr.link_name {
            Some((name, _)) => name.clone(),
            None => fn_item.sig.ident.to_string(),
        },
    };

    let fn_name = &fn_item.sig.ident;
    let vis = &fn_item.vis;
    let output = &fn_item.sig.output;
    let fn_attrs = &fn_item.attrs;
    let library = &attr.library;

    let mut param_list = Vec::new();
    let mut param_ty_list = Vec::new();
    let mut ty_list = Vec::new();
    for (i, arg) in fn_item.sig.inputs.iter().enumerate() {
        match arg {
            syn::FnArg::Typed(pat_type) => {
                let ty = &pat_type.ty;
                let param_name = match pat_type.pat.as_ref() {
                    syn::Pat::Ident(pat_id) => pat_id.ident.clone(),
                    _ => format_ident!("p{}", i),
                };
                param_ty_list.push(quote!(#param_name : #ty));
                param_list.push(param_name);
                ty_list.push(ty);
            }
            syn::FnArg::Receiver(rec) => {
                return Err(syn::Error::new(
                    rec.span(),
                    "`self` arguments are unsupported",
                ));
            }
        }
    }

    // Foreign functions are unsafe to call, so the wrapper is as well. The
    // export is resolved on the first call and cached in `FUNC`.
    Ok(quote! {
        #(#fn_attrs)*
        #[allow(non_snake_case)]
        #[inline]
        #vis unsafe fn #fn_name (#(#param_ty_list),*) #output {
            type FnPtr = unsafe #abi fn (#(#ty_list),*) #output;
            static FUNC: dyninvoke::LazyFn<FnPtr> =
                unsafe { dyninvoke::LazyFn::new(&#library, #link_name) };
            match FUNC.get() {
                Ok(function) => function(#(#param_list),*),
                Err(err) => panic!("{}", err),
            }
        }
    })
}
