//! Decode a configuration tree into an unrelated plain struct.
//!
//! Decoding is two steps. [`flatten`] walks the tree and collects every
//! value into a [`FlatMap`] keyed by its dotted key. The target struct,
//! deriving [`Decode`](crate::Decode), then pulls its tagged fields out of
//! that map:
//!
//! ```ignore
//! #[derive(Decode, Default)]
//! struct RequestBase {
//!     #[config(key = "openai.model")]
//!     model: String,
//!     #[config(key = "openai.maxtokens")]
//!     max_tokens: u32,
//!     // untagged: left at its default
//!     user: Option<String>,
//! }
//!
//! let request: RequestBase = confbind::decode(&config)?;
//! ```
//!
//! Coercion goes through serde, so numeric widening and range-checked
//! narrowing work, while a string never turns into a number.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::error::ConfbindError;
use crate::table::join;
use crate::traverse::{Node, traverse};

/// Dotted key → current value of every value in a tree.
pub type FlatMap = BTreeMap<String, toml::Value>;

/// A plain struct that can be rehydrated from a [`FlatMap`].
///
/// Usually derived. The derive assigns fields tagged `key = "..."` from
/// `prefix.key`, recurses into `squash` fields with the same prefix and into
/// `prefix = "..."` fields with the prefix extended. Untagged fields are not
/// touched.
pub trait Decode {
    fn decode_fields(&mut self, map: &FlatMap, prefix: &str) -> Result<(), ConfbindError>;
}

/// Collect `{key: current value}` for every value in `tree`.
///
/// Two values sharing a key fail with [`ConfbindError::DuplicateKey`].
pub fn flatten<N: Node + ?Sized>(tree: &N) -> Result<FlatMap, ConfbindError> {
    let mut map = FlatMap::new();
    traverse(tree, |value| {
        if map.contains_key(value.key()) {
            return Err(ConfbindError::DuplicateKey {
                key: value.key().to_string(),
            });
        }
        map.insert(value.key().to_string(), value.get_any()?);
        Ok(())
    })?;
    Ok(map)
}

/// Decode `tree` into a fresh `T`.
pub fn decode<T, N>(tree: &N) -> Result<T, ConfbindError>
where
    T: Decode + Default,
    N: Node + ?Sized,
{
    let mut out = T::default();
    decode_into(tree, &mut out)?;
    Ok(out)
}

/// Decode `tree` into `out`, leaving untagged fields as they are.
///
/// On error `out` may be partially updated.
pub fn decode_into<T, N>(tree: &N, out: &mut T) -> Result<(), ConfbindError>
where
    T: Decode + ?Sized,
    N: Node + ?Sized,
{
    let map = flatten(tree)?;
    out.decode_fields(&map, "")
}

/// Decode a `T` straight from a flattened map.
pub fn decode_map<T: Decode + Default>(map: &FlatMap) -> Result<T, ConfbindError> {
    let mut out = T::default();
    out.decode_fields(map, "")?;
    Ok(out)
}

/// Read `prefix.key` out of `map` as a `T`. Used by the derive.
pub fn field<T: DeserializeOwned>(map: &FlatMap, prefix: &str, key: &str) -> Result<T, ConfbindError> {
    let key = join(prefix, key);
    let value = map
        .get(&key)
        .ok_or_else(|| ConfbindError::MissingKey { key: key.clone() })?;
    value
        .clone()
        .try_into()
        .map_err(|e: toml::de::Error| ConfbindError::InvalidValue {
            key,
            reason: e.to_string().trim().to_string(),
        })
}

/// Extend `prefix` with `segment`. Used by the derive.
pub fn scoped(prefix: &str, segment: &str) -> String {
    join(prefix, segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{GlobalConfig, global_config};
    use crate::flags::FlagSet;
    use crate::store::Store;
    use crate::traverse::attach;
    use crate::value::{float, string};
    use crate::{Decode, Section, Value};

    #[derive(Section)]
    struct Tree {
        model: Value<String>,
        temperature: Value<f64>,
    }

    #[derive(Decode, Default, Debug, PartialEq)]
    struct Target {
        #[config(key = "model")]
        model: String,
        #[config(key = "temperature")]
        temperature: f64,
        untouched: i64,
    }

    fn attached_tree(store: &Store) -> Tree {
        let mut tree = Tree {
            model: string("model"),
            temperature: float("temperature"),
        };
        attach(store, &mut tree).unwrap();
        tree
    }

    fn attached_global(flags: &FlagSet, store: &Store) -> GlobalConfig {
        let mut config = global_config(flags);
        attach(store, &mut config).unwrap();
        config
    }

    #[derive(Decode, Default, Debug, PartialEq)]
    struct RequestBase {
        #[config(key = "openai.model")]
        model: String,
        #[config(key = "openai.temperature")]
        temperature: f64,
        #[config(key = "openai.maxtokens")]
        max_tokens: u32,
        #[config(key = "openai.topp")]
        top_p: f64,
    }

    #[derive(Decode, Default, Debug, PartialEq)]
    struct OpenAi {
        #[config(key = "openai.apikey")]
        api_key: String,
        #[config(squash)]
        base: RequestBase,
    }

    #[test]
    fn decodes_tagged_fields_and_leaves_untagged_at_default() {
        let store = Store::default();
        store.set("model", toml::Value::String("gpt-4".into()));
        store.set("temperature", toml::Value::Float(0.2));
        let tree = attached_tree(&store);

        let target: Target = decode(&tree).unwrap();
        assert_eq!(
            target,
            Target {
                model: "gpt-4".into(),
                temperature: 0.2,
                untouched: 0,
            }
        );
    }

    #[test]
    fn decode_is_idempotent() {
        let flags = FlagSet::new("aai");
        let store = Store::default();
        store.set("openai.model", toml::Value::String("gpt-4".into()));
        let config = attached_global(&flags, &store);

        let first: OpenAi = decode(&config).unwrap();
        let second: OpenAi = decode(&config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.base.model, "gpt-4");
        assert_eq!(first.base.max_tokens, 100);
        assert_eq!(first.base.top_p, 1.0);
    }

    #[test]
    fn decode_into_keeps_untagged_fields() {
        let store = Store::default();
        store.set("model", toml::Value::String("gpt-4".into()));
        let tree = attached_tree(&store);

        let mut target = Target {
            untouched: 7,
            ..Target::default()
        };
        decode_into(&tree, &mut target).unwrap();
        assert_eq!(target.model, "gpt-4");
        assert_eq!(target.untouched, 7);
    }

    #[test]
    fn prefix_scopes_nested_target() {
        #[derive(Decode, Default)]
        struct Model {
            #[config(key = "model")]
            name: String,
        }
        #[derive(Decode, Default)]
        struct Scoped {
            #[config(key = "provider")]
            provider: String,
            #[config(prefix = "openai")]
            openai: Model,
        }

        let flags = FlagSet::new("aai");
        let store = Store::default();
        store.set("openai.model", toml::Value::String("davinci".into()));
        let config = attached_global(&flags, &store);

        let scoped: Scoped = decode(&config).unwrap();
        assert_eq!(scoped.provider, "openai");
        assert_eq!(scoped.openai.name, "davinci");
    }

    #[test]
    fn missing_key_names_field_and_key() {
        #[derive(Decode, Default, Debug)]
        struct Wants {
            #[config(key = "openai.organization")]
            organization: String,
        }
        let store = Store::default();
        let tree = attached_tree(&store);

        let err = decode::<Wants, _>(&tree).unwrap_err();
        assert_eq!(err.field_path(), vec!["organization"]);
        match err.root_cause() {
            ConfbindError::MissingKey { key } => assert_eq!(key, "openai.organization"),
            other => panic!("Expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn uncoercible_value_is_invalid() {
        #[derive(Decode, Default, Debug)]
        struct Numeric {
            #[config(key = "model")]
            model: f64,
        }
        let store = Store::default();
        store.set("model", toml::Value::String("gpt-4".into()));
        let tree = attached_tree(&store);

        let err = decode::<Numeric, _>(&tree).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ConfbindError::InvalidValue { key, .. } if key == "model"
        ));
    }

    #[test]
    fn narrowing_is_range_checked() {
        let mut map = FlatMap::new();
        map.insert("n".into(), toml::Value::Integer(-1));
        assert!(field::<u32>(&map, "", "n").is_err());
        assert_eq!(field::<i32>(&map, "", "n").unwrap(), -1);
        assert_eq!(field::<f64>(&map, "", "n").unwrap(), -1.0);
    }

    #[test]
    fn flatten_rejects_duplicate_keys() {
        #[derive(Section)]
        struct Dup {
            a: Value<String>,
            b: Value<String>,
        }
        let mut dup = Dup {
            a: string("provider"),
            b: string("provider"),
        };
        attach(&Store::default(), &mut dup).unwrap();
        let err = flatten(&dup).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ConfbindError::DuplicateKey { key } if key == "provider"
        ));
        assert_eq!(err.field_path(), vec!["b"]);
    }

    #[test]
    fn flatten_before_attach_fails() {
        let tree = Tree {
            model: string("model"),
            temperature: float("temperature"),
        };
        let err = flatten(&tree).unwrap_err();
        assert!(matches!(err.root_cause(), ConfbindError::NotAttached { .. }));
    }

    #[test]
    fn decode_map_from_plain_map() {
        let mut map = FlatMap::new();
        map.insert("model".into(), toml::Value::String("m".into()));
        map.insert("temperature".into(), toml::Value::Integer(1));
        let target: Target = decode_map(&map).unwrap();
        assert_eq!(target.temperature, 1.0);
    }
}
