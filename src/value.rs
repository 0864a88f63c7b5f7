//! Typed configuration values and the declare → attach lifecycle.
//!
//! A [`Value<T>`] binds one dotted key to one typed accessor. It is built
//! while the configuration tree is declared, before any store exists, so that
//! its flag can be registered ahead of argument parsing. Once the host has
//! parsed arguments and read its config file, [`attach`](crate::attach)
//! supplies the [`Store`] and runs the value's queued post-attach actions
//! (binding its flag as an override source for its key).
//!
//! Reading a value that was never attached is a programming error: [`get`]
//! panics with a [`NotAttached`] message, [`try_get`] returns it.
//!
//! [`get`]: Value::get
//! [`try_get`]: Value::try_get
//! [`NotAttached`]: ConfbindError::NotAttached

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::ConfbindError;
use crate::flags::{FlagHandle, FlagSet, FlagSource};
use crate::kind::Kind;
use crate::store::Store;

/// Extracts a `T` from the store at a key.
pub type Getter<T> = fn(&Store, &str) -> T;

/// Registers a flag of kind `T` on a flag set: `(flags, name, shorthand,
/// default, usage)`.
pub type FlagSetter<T> = fn(&FlagSet, &str, Option<char>, T, &str) -> FlagHandle<T>;

type PostAttach = Rc<dyn Fn(&Store, &str) -> Result<(), ConfbindError>>;

#[derive(Clone)]
enum State {
    Declared,
    Attached(Store),
}

/// A typed configuration value bound to a dotted key.
#[derive(Clone)]
pub struct Value<T: Kind> {
    key: String,
    getter: Getter<T>,
    flag_setter: Option<FlagSetter<T>>,
    flag: Option<FlagHandle<T>>,
    post_attach: Vec<PostAttach>,
    state: State,
}

impl<T: Kind> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("key", &self.key)
            .field("kind", &T::NAME)
            .field("flag", &self.flag.as_ref().map(|h| h.name()))
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl<T: Kind> Value<T> {
    /// A declared value reading `key` through `getter` once attached.
    pub fn new(key: impl Into<String>, getter: Getter<T>) -> Self {
        Self {
            key: key.into(),
            getter,
            flag_setter: None,
            flag: None,
            post_attach: Vec::new(),
            state: State::Declared,
        }
    }

    /// Set the function [`with_flag`](Self::with_flag) registers flags with.
    pub fn with_flag_setter(mut self, setter: FlagSetter<T>) -> Self {
        self.flag_setter = Some(setter);
        self
    }

    /// Install `default` as the store default for the key on attach.
    ///
    /// Used for values without a flag; a flag's default already sits below
    /// the store defaults.
    pub fn with_default(mut self, default: T) -> Self {
        self.post_attach
            .push(Rc::new(move |store: &Store, key: &str| {
                store.set_default(key, default.clone().into_value());
                Ok(())
            }));
        self
    }

    /// Register a flag for this value and bind it to the key on attach.
    ///
    /// # Panics
    ///
    /// Panics if no flag setter is configured, or if the flag set already
    /// has a flag with this name or shorthand.
    pub fn with_flag(
        mut self,
        flags: &FlagSet,
        name: &str,
        shorthand: Option<char>,
        default: T,
        usage: &str,
    ) -> Self {
        let Some(setter) = self.flag_setter else {
            panic!(
                "confbind: value '{}' has no flag setter; call with_flag_setter() before with_flag()",
                self.key
            );
        };

        let handle = setter(flags, name, shorthand, default, usage);
        let source: Rc<dyn FlagSource> = Rc::new(handle.clone());
        self.post_attach
            .push(Rc::new(move |store: &Store, key: &str| {
                store.bind_flag(key, Rc::clone(&source))
            }));
        self.flag = Some(handle);
        self
    }

    /// The dotted key this value reads.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The flag registered by [`with_flag`](Self::with_flag), if any.
    pub fn flag(&self) -> Option<&FlagHandle<T>> {
        self.flag.as_ref()
    }

    /// True once [`attach`](crate::attach) has handed this value a store.
    pub fn is_attached(&self) -> bool {
        matches!(self.state, State::Attached(_))
    }

    /// The store this value reads through.
    pub fn store(&self) -> Result<&Store, ConfbindError> {
        match &self.state {
            State::Attached(store) => Ok(store),
            State::Declared => Err(ConfbindError::NotAttached {
                key: self.key.clone(),
            }),
        }
    }

    /// Current value. Unset keys yield `T::default()`.
    ///
    /// # Panics
    ///
    /// Panics if the value has not been attached.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(e) => panic!("confbind: {e}"),
        }
    }

    /// Like [`get`](Self::get), but returns `NotAttached` instead of panicking.
    pub fn try_get(&self) -> Result<T, ConfbindError> {
        let store = self.store()?;
        Ok((self.getter)(store, &self.key))
    }

    /// True iff the key has a file or explicit value, or the bound flag was
    /// given on the command line.
    ///
    /// # Panics
    ///
    /// Panics if the value has not been attached.
    pub fn is_set(&self) -> bool {
        match self.try_is_set() {
            Ok(set) => set,
            Err(e) => panic!("confbind: {e}"),
        }
    }

    /// Like [`is_set`](Self::is_set), but returns `NotAttached` instead of
    /// panicking.
    pub fn try_is_set(&self) -> Result<bool, ConfbindError> {
        Ok(self.store()?.is_set(&self.key))
    }
}

/// Type-erased view of a [`Value`], used by traversal and decode.
pub trait AnyValue {
    fn key(&self) -> &str;

    /// Name of the value's kind (`"string"`, `"int"`, ...).
    fn kind(&self) -> &'static str;

    fn is_set(&self) -> Result<bool, ConfbindError>;

    fn get_any(&self) -> Result<toml::Value, ConfbindError>;

    /// Write `value` into the store's explicit layer without type checking.
    fn set_any(&self, value: toml::Value) -> Result<(), ConfbindError>;

    /// Bind to `store` and run post-attach actions in registration order.
    /// Attaching again rebinds.
    fn attach(&mut self, store: &Store) -> Result<(), ConfbindError>;
}

impl<T: Kind> AnyValue for Value<T> {
    fn key(&self) -> &str {
        &self.key
    }

    fn kind(&self) -> &'static str {
        T::NAME
    }

    fn is_set(&self) -> Result<bool, ConfbindError> {
        self.try_is_set()
    }

    fn get_any(&self) -> Result<toml::Value, ConfbindError> {
        Ok(self.try_get()?.into_value())
    }

    fn set_any(&self, value: toml::Value) -> Result<(), ConfbindError> {
        self.store()?.set(&self.key, value);
        Ok(())
    }

    fn attach(&mut self, store: &Store) -> Result<(), ConfbindError> {
        if self.key.is_empty() {
            return Err(ConfbindError::EmptyKey);
        }

        self.state = State::Attached(store.clone());
        for action in &self.post_attach {
            action(store, &self.key)?;
        }
        debug!(key = %self.key, kind = T::NAME, "Attached config value");
        Ok(())
    }
}

/// A string value at `key`, ready for [`Value::with_flag`].
pub fn string(key: impl Into<String>) -> Value<String> {
    Value::new(key, Store::get_string).with_flag_setter(FlagSet::string_p)
}

/// An integer value at `key`.
pub fn int(key: impl Into<String>) -> Value<i64> {
    Value::new(key, Store::get_int).with_flag_setter(FlagSet::int_p)
}

/// A float value at `key`.
pub fn float(key: impl Into<String>) -> Value<f64> {
    Value::new(key, Store::get_float).with_flag_setter(FlagSet::float64_p)
}

/// A bool value at `key`.
pub fn boolean(key: impl Into<String>) -> Value<bool> {
    Value::new(key, Store::get_bool).with_flag_setter(FlagSet::bool_p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(flags: &FlagSet) -> Value<String> {
        string("provider").with_flag(
            flags,
            "provider",
            None,
            "openai".into(),
            "provider to use for suggestions",
        )
    }

    #[test]
    fn default_when_flag_not_given() {
        let flags = FlagSet::new("aai");
        let mut value = provider(&flags);
        flags.parse_from(["aai"]).unwrap();

        value.attach(&Store::default()).unwrap();
        assert_eq!(value.get(), "openai");
        assert!(!value.is_set());
    }

    #[test]
    fn flag_overrides_when_given() {
        let flags = FlagSet::new("aai");
        let mut value = provider(&flags);
        flags.parse_from(["aai", "--provider=anthropic"]).unwrap();

        let store = Store::default();
        store.set_default("provider", toml::Value::String("file".into()));
        value.attach(&store).unwrap();
        assert_eq!(value.get(), "anthropic");
        assert!(value.is_set());
    }

    #[test]
    fn second_attach_switches_store() {
        let flags = FlagSet::new("aai");
        let mut value = provider(&flags);
        let first = Store::default();
        first.set("provider", toml::Value::String("first".into()));
        let second = Store::default();
        second.set("provider", toml::Value::String("second".into()));

        value.attach(&first).unwrap();
        assert_eq!(value.get(), "first");
        value.attach(&second).unwrap();
        assert_eq!(value.get(), "second");
        assert!(value.store().unwrap().ptr_eq(&second));
        assert!(second.all_keys().contains(&"provider".to_string()));
    }

    #[test]
    fn reattach_same_store_is_harmless() {
        let flags = FlagSet::new("aai");
        let mut value = provider(&flags);
        let store = Store::default();
        value.attach(&store).unwrap();
        value.attach(&store).unwrap();
        assert_eq!(value.get(), "openai");
    }

    #[test]
    fn default_without_flag_lands_in_store_defaults() {
        let mut timeout = int("timeout").with_default(30);
        let store = Store::default();
        timeout.attach(&store).unwrap();

        assert_eq!(timeout.get(), 30);
        assert!(!timeout.is_set());

        store.set("timeout", toml::Value::Integer(5));
        assert_eq!(timeout.get(), 5);
    }

    #[test]
    fn try_get_before_attach_is_not_attached() {
        let value = string("provider");
        assert!(!value.is_attached());
        match value.try_get() {
            Err(ConfbindError::NotAttached { key }) => assert_eq!(key, "provider"),
            other => panic!("Expected NotAttached, got {other:?}"),
        }
        assert!(value.try_is_set().is_err());
        assert!(value.get_any().is_err());
        assert!(value.set_any(toml::Value::Integer(1)).is_err());
    }

    #[test]
    #[should_panic(expected = "used before attach")]
    fn get_before_attach_panics() {
        string("provider").get();
    }

    #[test]
    #[should_panic(expected = "no flag setter")]
    fn with_flag_without_setter_panics() {
        let flags = FlagSet::new("aai");
        Value::new("provider", Store::get_string).with_flag(
            &flags,
            "provider",
            None,
            String::new(),
            "",
        );
    }

    #[test]
    fn custom_getter_without_flag() {
        fn shouting(store: &Store, key: &str) -> String {
            store.get_string(key).to_uppercase()
        }
        let mut value = Value::new("provider", shouting);
        let store = Store::default();
        store.set("provider", toml::Value::String("openai".into()));
        value.attach(&store).unwrap();
        assert_eq!(value.get(), "OPENAI");
        assert!(value.flag().is_none());
    }

    #[test]
    fn empty_key_rejected_on_attach() {
        let mut value = string("");
        assert!(matches!(
            value.attach(&Store::default()),
            Err(ConfbindError::EmptyKey)
        ));
    }

    #[test]
    fn conflicting_flag_binding_fails_attach() {
        let flags = FlagSet::new("aai");
        let mut a = string("provider").with_flag(&flags, "provider", None, String::new(), "");
        let mut b = string("provider").with_flag(&flags, "backend", None, String::new(), "");
        let store = Store::default();
        a.attach(&store).unwrap();
        let err = b.attach(&store).unwrap_err();
        assert!(matches!(err, ConfbindError::Bind { .. }));
    }

    #[test]
    fn set_any_then_get_round_trips() {
        let store = Store::default();

        let mut s = string("openai.model");
        let mut i = int("openai.maxtokens");
        let mut f = float("openai.temperature");
        let mut b = boolean("verbose");
        s.attach(&store).unwrap();
        i.attach(&store).unwrap();
        f.attach(&store).unwrap();
        b.attach(&store).unwrap();

        s.set_any(toml::Value::String("gpt-4".into())).unwrap();
        i.set_any(toml::Value::Integer(-7)).unwrap();
        f.set_any(toml::Value::Float(0.75)).unwrap();
        b.set_any(toml::Value::Boolean(true)).unwrap();

        assert_eq!(s.get(), "gpt-4");
        assert_eq!(i.get(), -7);
        assert_eq!(f.get(), 0.75);
        assert!(b.get());
        assert_eq!(i.get_any().unwrap(), toml::Value::Integer(-7));
    }

    #[test]
    fn set_any_coerces_through_getter() {
        let store = Store::default();
        let mut i = int("openai.maxtokens");
        i.attach(&store).unwrap();
        i.set_any(toml::Value::String("42".into())).unwrap();
        assert_eq!(i.get(), 42);
    }

    #[test]
    fn unset_key_is_zero_value() {
        let mut f = float("openai.topp");
        f.attach(&Store::default()).unwrap();
        assert_eq!(f.get(), 0.0);
        assert!(!f.is_set());
    }

    #[test]
    fn promoting_flag_value_persists_it_as_explicit() {
        let flags = FlagSet::new("aai");
        let mut tokens =
            int("openai.maxtokens").with_flag(&flags, "openai-maxtokens", None, 100, "max tokens");
        flags.parse_from(["aai", "--openai-maxtokens", "20"]).unwrap();
        let store = Store::default();
        tokens.attach(&store).unwrap();

        let any: &dyn AnyValue = &tokens;
        assert!(any.is_set().unwrap());
        any.set_any(any.get_any().unwrap()).unwrap();
        assert_eq!(store.all_settings()["openai"]["maxtokens"].as_integer(), Some(20));
    }
}
