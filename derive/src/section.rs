use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

use crate::attrs::named_fields;

pub fn expand(input: &DeriveInput) -> Result<TokenStream> {
    let fields = named_fields(input, "Section")?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let visited: Vec<_> = fields.iter().filter(|f| !f.attrs.skip).collect();
    let walks = visited.iter().map(|f| {
        let ident = f.ident;
        let label = &f.label;
        quote! {
            ::confbind::Node::walk(&self.#ident, visit).map_err(|e| e.in_field(#label))?;
        }
    });
    let walk_muts = visited.iter().map(|f| {
        let ident = f.ident;
        let label = &f.label;
        quote! {
            ::confbind::Node::walk_mut(&mut self.#ident, visit).map_err(|e| e.in_field(#label))?;
        }
    });

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::confbind::Node for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn walk(
                &self,
                visit: &mut ::confbind::Visit<'_>,
            ) -> ::core::result::Result<(), ::confbind::ConfbindError> {
                #(#walks)*
                ::core::result::Result::Ok(())
            }

            #[allow(unused_variables)]
            fn walk_mut(
                &mut self,
                visit: &mut ::confbind::VisitMut<'_>,
            ) -> ::core::result::Result<(), ::confbind::ConfbindError> {
                #(#walk_muts)*
                ::core::result::Result::Ok(())
            }

            fn is_section(&self) -> bool {
                true
            }
        }
    })
}
