//! Config persistence: patch values into TOML documents while preserving
//! formatting.
//!
//! Uses `toml_edit` so comments and layout of an existing file survive a
//! write. Only the entries handed in are touched; everything else in the
//! document is left as the user wrote it.

use std::path::Path;

use toml_edit::{DocumentMut, Item, Table};

use crate::error::ConfbindError;

/// Pure function: patch a TOML document string with dotted-key entries.
///
/// `content` is `None` when the target file doesn't exist yet; the result is
/// then a fresh document holding only `entries`.
pub fn apply_to_document(
    content: Option<&str>,
    entries: &[(String, toml::Value)],
) -> Result<String, ConfbindError> {
    let mut doc: DocumentMut = content.unwrap_or_default().parse().map_err(
        |e: toml_edit::TomlError| ConfbindError::InvalidValue {
            key: "<document>".into(),
            reason: e.to_string(),
        },
    )?;

    for (key, value) in entries {
        set_in_document(&mut doc, key, value)?;
    }

    Ok(doc.to_string())
}

fn set_in_document(
    doc: &mut DocumentMut,
    key: &str,
    value: &toml::Value,
) -> Result<(), ConfbindError> {
    let parsed = to_edit_value(key, value)?;

    let segments: Vec<&str> = key.split('.').collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(ConfbindError::EmptyKey);
    };

    // Navigate to the key, creating (or replacing) intermediate tables.
    let mut current: &mut Item = doc.as_item_mut();
    for segment in parents {
        if current.get(segment).is_none_or(|item| !item.is_table_like()) {
            current[*segment] = Item::Table(Table::new());
        }
        current = &mut current[*segment];
    }

    current[*leaf] = toml_edit::value(parsed);
    Ok(())
}

fn to_edit_value(key: &str, value: &toml::Value) -> Result<toml_edit::Value, ConfbindError> {
    value
        .to_string()
        .parse::<toml_edit::Value>()
        .map_err(|e| ConfbindError::InvalidValue {
            key: key.into(),
            reason: e.to_string(),
        })
}

/// I/O wrapper: write `content` to `file_path`, creating parent directories.
pub fn write_document(file_path: &Path, content: &str) -> Result<(), ConfbindError> {
    if let Some(parent) = file_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| ConfbindError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    std::fs::write(file_path, content).map_err(|e| ConfbindError::IoError {
        path: file_path.to_path_buf(),
        source: e,
    })
}
