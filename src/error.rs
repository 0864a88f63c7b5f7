use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfbindError {
    #[error("Input must be a struct or a reference to a struct, got {type_name}")]
    InvalidInput { type_name: &'static str },

    #[error("Value '{key}' used before attach — call confbind::attach() once the store exists")]
    NotAttached { key: String },

    #[error("Configuration value has an empty key")]
    EmptyKey,

    #[error("Failed to bind flag --{flag} to config key '{key}': {reason}")]
    Bind {
        flag: String,
        key: String,
        reason: String,
    },

    #[error("Duplicate config key '{key}' in configuration tree")]
    DuplicateKey { key: String },

    #[error("Key not found: {key}")]
    MissingKey { key: String },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("field '{field}': {source}")]
    Field {
        field: &'static str,
        source: Box<ConfbindError>,
    },

    #[error("No config file '{file_name}' found (searched {} directories)", searched.len())]
    ConfigFileNotFound {
        file_name: String,
        searched: Vec<PathBuf>,
    },

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No config file to write to — read one first or use write_config_as()")]
    NoConfigFile,

    #[error("{0}")]
    Visitor(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ConfbindError {
    /// Wrap `self` with the name of the struct field it surfaced from.
    pub fn in_field(self, field: &'static str) -> Self {
        ConfbindError::Field {
            field,
            source: Box::new(self),
        }
    }

    /// Wrap an arbitrary error raised by a traversal visitor.
    pub fn visitor<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ConfbindError::Visitor(err.into())
    }

    /// Strip `Field` wrappers and return the innermost error.
    pub fn root_cause(&self) -> &ConfbindError {
        match self {
            ConfbindError::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Field names from the outermost wrapper inwards, e.g. `["openai", "model"]`.
    pub fn field_path(&self) -> Vec<&'static str> {
        let mut path = Vec::new();
        let mut current = self;
        while let ConfbindError::Field { field, source } = current {
            path.push(*field);
            current = source;
        }
        path
    }
}
