use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Error, Result};

use crate::attrs::{named_fields, option_char, option_str};

pub fn expand(input: &DeriveInput) -> Result<TokenStream> {
    let fields = named_fields(input, "Declare")?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut inits = Vec::with_capacity(fields.len());
    for field in &fields {
        let ident = field.ident;
        let attrs = &field.attrs;

        if attrs.skip {
            inits.push(quote!(#ident: ::core::default::Default::default()));
            continue;
        }
        if attrs.squash && attrs.name.is_some() {
            return Err(Error::new(
                ident.span(),
                "`squash` and `name` cannot be combined",
            ));
        }

        if attrs.name.is_none() && (attrs.shorthand.is_some() || attrs.usage.is_some()) {
            return Err(Error::new(
                ident.span(),
                "`shorthand` and `usage` describe a flag and require `name`",
            ));
        }

        let label = &field.label;
        let field_name = option_str(attrs.name.as_ref());
        let shorthand = option_char(attrs.shorthand.as_ref());
        let value = option_str(attrs.value.as_ref());
        let usage = option_str(attrs.usage.as_ref());
        let squash = attrs.squash;
        inits.push(quote! {
            #ident: ::confbind::Declare::declare(
                flags,
                &::confbind::FieldSpec {
                    ident: #label,
                    name: #field_name,
                    shorthand: #shorthand,
                    value: #value,
                    usage: #usage,
                    squash: #squash,
                    scope: &scope,
                },
            )
        });
    }

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::confbind::Declare for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn declare(
                flags: &::confbind::FlagSet,
                spec: &::confbind::FieldSpec<'_>,
            ) -> Self {
                let scope = spec.nested_scope();
                Self {
                    #(#inits,)*
                }
            }
        }
    })
}
