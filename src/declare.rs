//! Declare a whole configuration tree from field attributes.
//!
//! With `#[derive(Declare)]` the tree describes its own keys and flags, and
//! [`declare`] builds it in one call:
//!
//! ```ignore
//! #[derive(Section, Declare)]
//! struct GlobalConfig {
//!     #[config(name = "provider", value = "openai", usage = "provider to use")]
//!     provider: Value<String>,
//!     #[config(name = "openai")]
//!     openai: OpenAiConfig,
//! }
//!
//! #[derive(Section, Declare)]
//! struct OpenAiConfig {
//!     #[config(name = "model", shorthand = 'm', value = "text-davinci-002")]
//!     model: Value<String>,
//! }
//!
//! let config: GlobalConfig = confbind::declare(&flags, "");
//! // keys:  provider, openai.model
//! // flags: --provider, --openai-model / -m
//! ```
//!
//! Keys are the dot-joined segment path, flag names the dash-joined one. A
//! value gets a flag only when it has a `name`; without one its key segment
//! is the field name. A nested section marked `squash` adds no segment.

use crate::flags::FlagSet;
use crate::kind::Kind;
use crate::store::Store;
use crate::table::join;
use crate::value::Value;

/// Key and flag-name prefixes in effect at one level of a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub key: String,
    pub flag: String,
}

impl Scope {
    /// Root scope. A non-empty `prefix` starts both the key and flag paths.
    pub fn new(prefix: &str) -> Self {
        Self {
            key: prefix.to_string(),
            flag: prefix.to_string(),
        }
    }

    pub fn key_for(&self, segment: &str) -> String {
        join(&self.key, segment)
    }

    pub fn flag_for(&self, segment: &str) -> String {
        if self.flag.is_empty() {
            segment.to_string()
        } else {
            format!("{}-{segment}", self.flag)
        }
    }

    fn child(&self, segment: &str) -> Self {
        Self {
            key: self.key_for(segment),
            flag: self.flag_for(segment),
        }
    }
}

/// Attributes of one field, as the derive hands them down.
#[derive(Debug, Clone)]
pub struct FieldSpec<'a> {
    pub ident: &'static str,
    pub name: Option<&'static str>,
    pub shorthand: Option<char>,
    pub value: Option<&'static str>,
    pub usage: Option<&'static str>,
    pub squash: bool,
    pub scope: &'a Scope,
}

impl<'a> FieldSpec<'a> {
    /// Field spec for the root of a tree: no segment of its own.
    pub fn root(scope: &'a Scope) -> Self {
        Self {
            ident: "",
            name: None,
            shorthand: None,
            value: None,
            usage: None,
            squash: true,
            scope,
        }
    }

    /// Key/flag segment: the explicit `name`, else the field name.
    pub fn segment(&self) -> &'static str {
        self.name.unwrap_or(self.ident)
    }

    /// Scope for the fields of a nested section declared by this field.
    pub fn nested_scope(&self) -> Scope {
        if self.squash {
            self.scope.clone()
        } else {
            self.scope.child(self.segment())
        }
    }
}

/// A type that can build itself from field attributes.
pub trait Declare: Sized {
    fn declare(flags: &FlagSet, spec: &FieldSpec<'_>) -> Self;
}

impl<T: Kind> Declare for Value<T> {
    /// # Panics
    ///
    /// Panics if `value` does not parse as `T`, or on a duplicate flag.
    fn declare(flags: &FlagSet, spec: &FieldSpec<'_>) -> Self {
        let key = spec.scope.key_for(spec.segment());
        let flag = spec.name.map(|name| spec.scope.flag_for(name));
        let default = spec.value.map(|raw| {
            T::parse(raw).unwrap_or_else(|e| {
                let target = flag.as_ref().map_or(key.clone(), |f| format!("--{f}"));
                panic!("confbind: default for {target} ({}): {e}", T::NAME)
            })
        });

        let value = Value::new(key, Store::get_as::<T>).with_flag_setter(FlagSet::register::<T>);
        match (flag, default) {
            (Some(flag), default) => value.with_flag(
                flags,
                &flag,
                spec.shorthand,
                default.unwrap_or_default(),
                spec.usage.unwrap_or_default(),
            ),
            (None, Some(default)) => value.with_default(default),
            (None, None) => value,
        }
    }
}

impl<N: Declare> Declare for Box<N> {
    fn declare(flags: &FlagSet, spec: &FieldSpec<'_>) -> Self {
        Box::new(N::declare(flags, spec))
    }
}

/// Build a `T` from its attributes, registering its flags on `flags`.
///
/// # Panics
///
/// Panics on duplicate flag names or shorthands, or an unparsable `value`.
pub fn declare<T: Declare>(flags: &FlagSet, prefix: &str) -> T {
    let scope = Scope::new(prefix);
    T::declare(flags, &FieldSpec::root(&scope))
}
