//! Typed configuration values for Rust command-line tools. Declare your
//! settings once, bind them to flags, read them from a file, and get them
//! back as plain types.
//!
//! Confbind unifies three configuration sources (a hierarchical TOML file,
//! command-line flags, and programmatic defaults) behind one strongly typed
//! accessor, [`Value<T>`]:
//!
//! ```ignore
//! let flags = FlagSet::persistent("aai");
//! let mut config: GlobalConfig = confbind::declare(&flags, "");
//!
//! let matches = flags.augment(Command::new("aai")).get_matches();
//! flags.set_matches(&matches);
//!
//! let store = Store::builder().app_name("aai").file_name("config.toml").build();
//! store.read_config()?;
//! confbind::attach(&store, &mut config)?;
//!
//! let provider: String = config.provider.get();
//! ```
//!
//! # Two phases: declare, then attach
//!
//! Flags must be registered before arguments are parsed, but the config file
//! can only be located after parsing (its path may itself be a flag). So a
//! [`Value`] is built in two steps:
//!
//! - **Declare.** The value knows its key and, optionally, registers a flag
//!   on a [`FlagSet`]. No store exists yet; reading the value now is a
//!   programming error and panics with a clear `NotAttached` message
//!   ([`Value::try_get`] returns it as an error instead).
//! - **Attach.** [`attach`] walks the whole tree, hands every value the
//!   [`Store`], and binds each flag as an override source for its key.
//!   Attaching again rebinds, to the same or a different store.
//!
//! # Layer precedence
//!
//! ```text
//! Flag default          FlagSet registration default
//!        ↑ overridden by
//! Store defaults        Store::set_default()
//!        ↑ overridden by
//! Config file           Store::read_config()
//!        ↑ overridden by
//! Changed flag          --flag on the command line
//!        ↑ overridden by
//! Explicit values       Store::set() / AnyValue::set_any()
//! ```
//!
//! [`Value::is_set`] is true only for the top three layers: a default is
//! never "set".
//!
//! # Configuration trees
//!
//! A configuration tree is any struct deriving [`Section`]. Values nested in
//! sub-sections are found by [`traverse`] wherever they sit; sections never
//! add a key prefix, the key is carried by the value itself. Fields that are
//! not values or sections (plain strings, numbers, flag handles) are
//! skipped, and `#[config(skip)]` excludes anything else.
//!
//! Rather than building every value by hand, derive [`Declare`] and describe
//! keys and flags with attributes:
//!
//! ```ignore
//! #[derive(Section, Declare)]
//! struct GlobalConfig {
//!     #[config(name = "provider", value = "openai", usage = "provider to use")]
//!     provider: Value<String>,
//!     #[config(name = "openai")]
//!     openai: OpenAiConfig,
//! }
//! ```
//!
//! `name` sets both the key segment (dot-joined: `openai.model`) and the
//! flag name (dash-joined: `--openai-model`). See [`declare`](mod@declare).
//!
//! # Decoding into plain structs
//!
//! Business code rarely wants configuration-shaped types. [`decode`]
//! flattens a tree into `{key: value}` and rehydrates any struct deriving
//! [`Decode`] from it, matching fields by their `#[config(key = "...")]`
//! tag. Untagged fields keep their default. See [`decode`](mod@decode).
//!
//! # Threading
//!
//! [`Store`] and [`FlagSet`] are `Rc<RefCell<..>>` handles: cheap to clone,
//! shared by every value in a tree, and `!Send`. Confbind targets
//! short-lived, single-threaded CLI processes.

extern crate self as confbind;

pub mod decode;
pub mod declare;
pub mod error;
pub mod flags;
pub mod kind;
pub mod store;
pub mod traverse;
pub mod types;
pub mod value;

mod file;
mod persist;
mod table;

#[cfg(test)]
mod fixtures;

pub use confbind_derive::{Declare, Decode, Section};

pub use decode::{Decode, FlatMap, decode, decode_into, decode_map, flatten};
pub use declare::{Declare, FieldSpec, Scope, declare};
pub use error::ConfbindError;
pub use flags::{FlagHandle, FlagInfo, FlagSet, FlagSource};
pub use kind::Kind;
pub use store::{Store, StoreBuilder};
pub use table::format_value;
pub use traverse::{Node, Visit, VisitMut, attach, keys, traverse, traverse_mut};
pub use types::SearchPath;
pub use value::{AnyValue, FlagSetter, Getter, Value, boolean, float, int, string};
