//! Derive macros for confbind configuration trees.
//!
//! - `Section`: traversal over a configuration struct's values.
//! - `Declare`: build a configuration struct (keys, flags, defaults) from
//!   its `#[config(...)]` attributes.
//! - `Decode`: rehydrate a plain struct from a flattened configuration tree.
//!
//! The generated code refers to the runtime crate as `::confbind`.

use proc_macro::TokenStream;
use syn::{DeriveInput, Error, parse_macro_input};

mod attrs;
mod declare;
mod decode;
mod section;

/// Implement `confbind::Node` for a struct with named fields.
///
/// Fields are visited in declaration order. `#[config(skip)]` excludes a
/// field; every other field type must implement `Node`.
///
/// Primitives, `String`, `PathBuf` and flag handles are leaves and are
/// skipped without an attribute. Any other type (a `HashMap`, a struct
/// that does not derive `Section`) fails to compile until it is marked
/// `#[config(skip)]`.
#[proc_macro_derive(Section, attributes(config))]
pub fn derive_section(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    section::expand(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Implement `confbind::Declare` for a struct with named fields.
///
/// Field attributes: `name = "..."`, `shorthand = 'c'`, `value = "..."`,
/// `usage = "..."`, `squash`, `skip`. Without `name` a value gets no flag,
/// its `value` becomes the store default, and `shorthand` or `usage` is an
/// error.
#[proc_macro_derive(Declare, attributes(config))]
pub fn derive_declare(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    declare::expand(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Implement `confbind::Decode` for a plain struct with named fields.
///
/// Field attributes: `key = "..."`, `squash`, `prefix = "..."`. Fields
/// without one are left untouched.
#[proc_macro_derive(Decode, attributes(config))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    decode::expand(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}
