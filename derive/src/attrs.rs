use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Attribute, Data, DeriveInput, Error, Fields, Ident, LitChar, LitStr, Result};

/// Everything `#[config(...)]` may say about a field.
#[derive(Default)]
pub struct FieldAttrs {
    pub skip: bool,
    pub squash: bool,
    pub name: Option<LitStr>,
    pub shorthand: Option<LitChar>,
    pub value: Option<LitStr>,
    pub usage: Option<LitStr>,
    pub key: Option<LitStr>,
    pub prefix: Option<LitStr>,
}

impl FieldAttrs {
    pub fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = FieldAttrs::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("config")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    out.skip = true;
                } else if meta.path.is_ident("squash") {
                    out.squash = true;
                } else if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    if lit.value().is_empty() {
                        return Err(Error::new(lit.span(), "`name` must not be empty"));
                    }
                    out.name = Some(lit);
                } else if meta.path.is_ident("shorthand") {
                    out.shorthand = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("value") {
                    out.value = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("usage") {
                    out.usage = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("key") {
                    let lit: LitStr = meta.value()?.parse()?;
                    if lit.value().is_empty() {
                        return Err(Error::new(lit.span(), "`key` must not be empty"));
                    }
                    out.key = Some(lit);
                } else if meta.path.is_ident("prefix") {
                    out.prefix = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error(
                        "unknown config attribute; expected one of: skip, squash, name, \
                         shorthand, value, usage, key, prefix",
                    ));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }
}

/// A named field with its parsed attributes.
pub struct ConfigField<'a> {
    pub ident: &'a Ident,
    /// Field name without any `r#` prefix.
    pub label: String,
    pub attrs: FieldAttrs,
}

/// The named fields of a struct, or an error naming the derive.
pub fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> Result<Vec<ConfigField<'a>>> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return Err(Error::new(
                    other.span(),
                    format!("#[derive({derive})] requires a struct with named fields"),
                ));
            }
        },
        _ => {
            return Err(Error::new(
                input.ident.span(),
                format!("#[derive({derive})] can only be used on structs"),
            ));
        }
    };

    fields
        .iter()
        .filter_map(|field| field.ident.as_ref().map(|ident| (ident, field)))
        .map(|(ident, field)| {
            Ok(ConfigField {
                ident,
                label: ident.unraw().to_string(),
                attrs: FieldAttrs::parse(&field.attrs)?,
            })
        })
        .collect()
}

pub fn option_str(lit: Option<&LitStr>) -> TokenStream {
    match lit {
        Some(lit) => quote!(::core::option::Option::Some(#lit)),
        None => quote!(::core::option::Option::None),
    }
}

pub fn option_char(lit: Option<&LitChar>) -> TokenStream {
    match lit {
        Some(lit) => quote!(::core::option::Option::Some(#lit)),
        None => quote!(::core::option::Option::None),
    }
}
