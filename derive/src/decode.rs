use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Error, Result};

use crate::attrs::named_fields;

pub fn expand(input: &DeriveInput) -> Result<TokenStream> {
    let fields = named_fields(input, "Decode")?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut assigns = Vec::new();
    for field in &fields {
        let ident = field.ident;
        let label = &field.label;
        let attrs = &field.attrs;

        let modes = [attrs.key.is_some(), attrs.squash, attrs.prefix.is_some()];
        if modes.iter().filter(|m| **m).count() > 1 {
            return Err(Error::new(
                ident.span(),
                "only one of `key`, `squash` and `prefix` may be used on a field",
            ));
        }

        if let Some(key) = &attrs.key {
            assigns.push(quote! {
                self.#ident = ::confbind::decode::field(map, prefix, #key)
                    .map_err(|e| e.in_field(#label))?;
            });
        } else if attrs.squash {
            assigns.push(quote! {
                ::confbind::Decode::decode_fields(&mut self.#ident, map, prefix)
                    .map_err(|e| e.in_field(#label))?;
            });
        } else if let Some(segment) = &attrs.prefix {
            assigns.push(quote! {
                ::confbind::Decode::decode_fields(
                    &mut self.#ident,
                    map,
                    &::confbind::decode::scoped(prefix, #segment),
                )
                .map_err(|e| e.in_field(#label))?;
            });
        }
    }

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::confbind::Decode for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn decode_fields(
                &mut self,
                map: &::confbind::FlatMap,
                prefix: &str,
            ) -> ::core::result::Result<(), ::confbind::ConfbindError> {
                #(#assigns)*
                ::core::result::Result::Ok(())
            }
        }
    })
}
