//! Derive macros for `wiretree_core::Composer` / `Decomposer` on
//! named-field structs, so a user type can round-trip through either wire
//! codec without a hand-written impl per field.
//!
//! Mirrors `gauss-api-derive`'s `ConfigParams` derive: a `DeriveInput`
//! parsed with `syn`, one codegen function per derive, `quote!` for the
//! output. Unlike `ConfigParams` there are no field attributes to parse —
//! the wire name is always the Rust field name.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

#[proc_macro_derive(Decompose)]
pub fn derive_decompose(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match decompose_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

#[proc_macro_derive(Compose)]
pub fn derive_compose(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match compose_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

fn named_fields(input: &DeriveInput) -> syn::Result<&syn::FieldsNamed> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                "wiretree derives only support structs with named fields",
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            "wiretree derives only support structs",
        )),
    }
}

fn decompose_impl(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let type_name = name.to_string();
    let fields = named_fields(input)?;

    let field_calls = fields.named.iter().map(|f| {
        let ident = f.ident.as_ref().unwrap();
        let field_name = ident.to_string();
        quote! {
            wiretree_core::Decomposer::decompose(&self.#ident, #field_name, formatter)?;
        }
    });

    let expanded = quote! {
        impl wiretree_core::Decomposer for #name {
            fn decompose(
                &self,
                name: &str,
                formatter: &mut dyn wiretree_core::Formatter,
            ) -> Result<(), wiretree_core::FormatError> {
                formatter.begin_object(name, #type_name)?;
                #(#field_calls)*
                formatter.finish_object()
            }
        }
    };

    Ok(expanded.into())
}

fn compose_impl(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let type_name_str = name.to_string();
    let fields = named_fields(input)?;

    let match_arms = fields.named.iter().map(|f| {
        let ident = f.ident.as_ref().unwrap();
        let field_name = ident.to_string();
        quote! {
            #field_name => Ok(&mut self.#ident as &mut dyn wiretree_core::Composer),
        }
    });

    let not_scalar_msg = format!("{type_name_str} is not a scalar value");
    let not_nullable_msg = format!("{type_name_str} cannot be null");
    let not_array_msg = format!("{type_name_str} is not an array");

    let expanded = quote! {
        impl wiretree_core::Composer for #name {
            fn set_category(&mut self, _category: wiretree_core::Category) {}

            fn set_type_name(&mut self, _type_name: String) {}

            fn set_scalar(&mut self, _value: wiretree_core::Scalar) -> Result<(), wiretree_core::TreeError> {
                Err(wiretree_core::TreeError::conversion(#not_scalar_msg))
            }

            fn set_null(&mut self) -> Result<(), wiretree_core::TreeError> {
                Err(wiretree_core::TreeError::conversion(#not_nullable_msg))
            }

            fn begin_member(
                &mut self,
                name: &str,
            ) -> Result<&mut dyn wiretree_core::Composer, wiretree_core::TreeError> {
                match name {
                    #(#match_arms)*
                    other => Err(wiretree_core::TreeError::conversion(format!(
                        "{} has no member named {other}",
                        #type_name_str
                    ))),
                }
            }

            fn begin_element(&mut self) -> Result<&mut dyn wiretree_core::Composer, wiretree_core::TreeError> {
                Err(wiretree_core::TreeError::conversion(#not_array_msg))
            }
        }
    };

    Ok(expanded.into())
}
