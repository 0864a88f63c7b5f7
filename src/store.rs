//! The backing store: a hierarchical, key-addressed configuration medium.
//!
//! A [`Store`] is a cheap, cloneable handle. Every attached
//! [`Value`](crate::Value) holds one, so a write through any of them is
//! visible to all. It is single-threaded by construction (`Rc<RefCell<..>>`).
//!
//! # Layer precedence
//!
//! ```text
//! Bound flag default      FlagSet registration default
//!        ↑ overridden by
//! Store defaults          .set_default()
//!        ↑ overridden by
//! Config file             read_config()
//!        ↑ overridden by
//! Changed flag            --flag given on the command line
//!        ↑ overridden by
//! Explicit values         .set() / AnyValue::set_any()
//! ```
//!
//! Only the last three layers count for [`Store::is_set`].
//!
//! # Persistence
//!
//! [`write_config`](Store::write_config) writes the explicit layer onto the
//! text of the file that was read, preserving its comments. Defaults and
//! flag values are never written unless promoted with `set` first.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use toml::{Table, Value};
use tracing::debug;

use crate::error::ConfbindError;
use crate::file;
use crate::flags::FlagSource;
use crate::kind::Kind;
use crate::persist;
use crate::table;
use crate::types::SearchPath;

/// Shared handle to a layered configuration store.
#[derive(Clone)]
pub struct Store {
    inner: Rc<RefCell<StoreInner>>,
}

struct StoreInner {
    app_name: String,
    file_name: String,
    search_paths: Vec<SearchPath>,
    config_file: Option<PathBuf>,
    /// Raw text of the file that was read, kept for comment-preserving writes.
    file_content: Option<String>,
    defaults: Table,
    file: Table,
    explicit: Table,
    flags: BTreeMap<String, Rc<dyn FlagSource>>,
}

/// Builder for a [`Store`].
pub struct StoreBuilder {
    app_name: String,
    file_name: Option<String>,
    search_paths: Vec<SearchPath>,
}

impl StoreBuilder {
    /// Set the application name, used for `SearchPath::Platform` and the
    /// default file name `"{app_name}.toml"`.
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = name.to_string();
        self
    }

    /// Override the config file name (default: `"{app_name}.toml"`).
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    /// Directories searched by [`Store::read_config`], in **priority-ascending**
    /// order: the last directory containing the file wins.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Append one search path with the highest priority so far.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths.push(path);
        self
    }

    pub fn build(self) -> Store {
        let file_name = self
            .file_name
            .unwrap_or_else(|| format!("{}.toml", self.app_name));
        Store::from_inner(StoreInner {
            app_name: self.app_name,
            file_name,
            search_paths: self.search_paths,
            config_file: None,
            file_content: None,
            defaults: Table::new(),
            file: Table::new(),
            explicit: Table::new(),
            flags: BTreeMap::new(),
        })
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::builder().build()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Store")
            .field("file_name", &inner.file_name)
            .field("config_file", &inner.config_file)
            .field("flags", &inner.flags.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Store {
    pub fn builder() -> StoreBuilder {
        StoreBuilder {
            app_name: "config".into(),
            file_name: None,
            search_paths: Vec::new(),
        }
    }

    fn from_inner(inner: StoreInner) -> Self {
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// True iff both handles point at the same store.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // --- reads ---

    /// Resolve `key` through every layer, highest precedence first.
    pub fn get(&self, key: &str) -> Option<Value> {
        let inner = self.inner.borrow();
        if let Some(v) = table::get(&inner.explicit, key) {
            return Some(v.clone());
        }
        let flag = inner.flags.get(key);
        if let Some(flag) = flag
            && flag.changed()
        {
            return Some(flag.value());
        }
        if let Some(v) = table::get(&inner.file, key) {
            return Some(v.clone());
        }
        if let Some(v) = table::get(&inner.defaults, key) {
            return Some(v.clone());
        }
        flag.map(|f| f.value())
    }

    /// Read `key` as kind `T`, yielding the zero value when unset or
    /// uncoercible.
    pub fn get_as<T: Kind>(&self, key: &str) -> T {
        self.get(key)
            .and_then(|v| T::cast(&v))
            .unwrap_or_default()
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get_as(key)
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.get_as(key)
    }

    pub fn get_float(&self, key: &str) -> f64 {
        self.get_as(key)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get_as(key)
    }

    /// True iff `key` has an explicit value, a file value, or a bound flag
    /// the user changed.
    pub fn is_set(&self, key: &str) -> bool {
        let inner = self.inner.borrow();
        table::get(&inner.explicit, key).is_some()
            || inner.flags.get(key).is_some_and(|f| f.changed())
            || table::get(&inner.file, key).is_some()
    }

    /// Every leaf key known to any layer, sorted.
    pub fn all_keys(&self) -> Vec<String> {
        let inner = self.inner.borrow();
        let mut keys: Vec<String> = [&inner.defaults, &inner.file, &inner.explicit]
            .into_iter()
            .flat_map(table::leaf_keys)
            .chain(inner.flags.keys().cloned())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// All resolved values as a nested table.
    pub fn all_settings(&self) -> Table {
        let mut settings = Table::new();
        for key in self.all_keys() {
            if let Some(value) = self.get(&key) {
                table::set(&mut settings, &key, value);
            }
        }
        settings
    }

    /// A detached store over the resolved subtree at `key`.
    ///
    /// Returns `None` when `key` does not resolve to a table. The sub-store
    /// shares nothing with `self`: writes to it stay local.
    pub fn sub(&self, key: &str) -> Option<Store> {
        let settings = self.all_settings();
        let subtree = table::get(&settings, key)?.as_table()?.clone();
        let inner = self.inner.borrow();
        Some(Store::from_inner(StoreInner {
            app_name: inner.app_name.clone(),
            file_name: inner.file_name.clone(),
            search_paths: Vec::new(),
            config_file: None,
            file_content: None,
            defaults: Table::new(),
            file: subtree,
            explicit: Table::new(),
            flags: BTreeMap::new(),
        }))
    }

    // --- writes ---

    /// Set an explicit value. It overrides every other layer and is what
    /// [`write_config`](Self::write_config) persists.
    pub fn set(&self, key: &str, value: Value) {
        table::set(&mut self.inner.borrow_mut().explicit, key, value);
    }

    pub fn set_default(&self, key: &str, value: Value) {
        table::set(&mut self.inner.borrow_mut().defaults, key, value);
    }

    /// Register `flag` as the override source for `key`.
    ///
    /// Rebinding the same flag name is allowed; binding a different flag to
    /// an already bound key is an error.
    pub fn bind_flag(&self, key: &str, flag: Rc<dyn FlagSource>) -> Result<(), ConfbindError> {
        if key.is_empty() {
            return Err(ConfbindError::Bind {
                flag: flag.name().to_string(),
                key: key.to_string(),
                reason: "key is empty".into(),
            });
        }

        let mut inner = self.inner.borrow_mut();
        if let Some(bound) = inner.flags.get(key)
            && bound.name() != flag.name()
        {
            return Err(ConfbindError::Bind {
                flag: flag.name().to_string(),
                key: key.to_string(),
                reason: format!("key is already bound to --{}", bound.name()),
            });
        }

        debug!(key, flag = flag.name(), "Bound flag to config key");
        inner.flags.insert(key.to_string(), flag);
        Ok(())
    }

    // --- file I/O ---

    /// Read a specific file on the next [`read_config`](Self::read_config)
    /// instead of searching.
    pub fn set_config_file(&self, path: impl Into<PathBuf>) {
        self.inner.borrow_mut().config_file = Some(path.into());
    }

    /// The file the store was read from (or will be written back to).
    pub fn config_file_used(&self) -> Option<PathBuf> {
        self.inner.borrow().config_file.clone()
    }

    /// Locate and parse the config file, replacing the file layer.
    ///
    /// With no explicit file set, the search paths are tried from the highest
    /// priority end. Nothing found is reported as
    /// [`ConfbindError::ConfigFileNotFound`]; hosts that treat that as "use
    /// defaults" can match on it.
    pub fn read_config(&self) -> Result<(), ConfbindError> {
        let (path, content) = self.locate()?;
        let parsed: Table = toml::from_str(&content).map_err(|e| ConfbindError::ParseError {
            path: path.clone(),
            source: e,
        })?;

        debug!(path = %path.display(), keys = parsed.len(), "Read config file");
        let mut inner = self.inner.borrow_mut();
        inner.file = parsed;
        inner.file_content = Some(content);
        inner.config_file = Some(path);
        Ok(())
    }

    fn locate(&self) -> Result<(PathBuf, String), ConfbindError> {
        let inner = self.inner.borrow();
        if let Some(path) = &inner.config_file {
            return match file::read_if_exists(path)? {
                Some(content) => Ok((path.clone(), content)),
                None => Err(ConfbindError::ConfigFileNotFound {
                    file_name: inner.file_name.clone(),
                    searched: vec![path.clone()],
                }),
            };
        }

        let dirs = file::expand_search_paths(&inner.search_paths, &inner.app_name);
        file::find_config_file(&dirs, &inner.file_name)?.ok_or_else(|| {
            ConfbindError::ConfigFileNotFound {
                file_name: inner.file_name.clone(),
                searched: dirs,
            }
        })
    }

    /// Persist explicit values to the file the store was read from.
    pub fn write_config(&self) -> Result<PathBuf, ConfbindError> {
        let path = self
            .config_file_used()
            .ok_or(ConfbindError::NoConfigFile)?;
        self.write_config_as(&path)?;
        Ok(path)
    }

    /// Persist explicit values to `path`, creating parent directories.
    ///
    /// When `path` is the file that was read, its original text is the base
    /// so comments survive; otherwise the existing file at `path` (if any) is
    /// patched, or a new one is written.
    pub fn write_config_as(&self, path: &Path) -> Result<(), ConfbindError> {
        let (base, entries) = {
            let inner = self.inner.borrow();
            let base = match (&inner.config_file, &inner.file_content) {
                (Some(used), Some(content)) if used == path => Some(content.clone()),
                _ => file::read_if_exists(path)?,
            };
            let entries: Vec<(String, Value)> = table::leaf_keys(&inner.explicit)
                .into_iter()
                .filter_map(|key| {
                    let value = table::get(&inner.explicit, &key)?.clone();
                    Some((key, value))
                })
                .collect();
            (base, entries)
        };

        let content = persist::apply_to_document(base.as_deref(), &entries)?;
        persist::write_document(path, &content)?;
        debug!(path = %path.display(), entries = entries.len(), "Wrote config file");
        Ok(())
    }
}
