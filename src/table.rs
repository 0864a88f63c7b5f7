//! Dotted-key helpers over `toml::Table`.
//!
//! The store keeps every layer as a nested table; these functions translate
//! between that shape and the dotted keys (`"openai.model"`) used everywhere
//! else.

use toml::{Table, Value};

/// Navigate a table by dotted key path (e.g. `"openai.model"`).
pub fn get<'a>(table: &'a Table, dotted_key: &str) -> Option<&'a Value> {
    let (path, leaf) = match dotted_key.rsplit_once('.') {
        Some((p, l)) => (Some(p), l),
        None => (None, dotted_key),
    };

    let tbl = match path {
        Some(path) => {
            let mut current = table;
            for segment in path.split('.') {
                current = current.get(segment)?.as_table()?;
            }
            current
        }
        None => table,
    };

    tbl.get(leaf)
}

/// Insert `value` at a dotted key, creating intermediate tables.
///
/// A scalar sitting where an intermediate table is needed is replaced.
pub fn set(table: &mut Table, dotted_key: &str, value: Value) {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    let (leaf, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = table;
    for segment in parents {
        let entry = current
            .entry(*segment)
            .or_insert_with(|| Value::Table(Table::new()));
        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }
        current = match entry {
            Value::Table(t) => t,
            _ => unreachable!("intermediate entry was just made a table"),
        };
    }

    current.insert(leaf.to_string(), value);
}

/// Collect dotted paths of every leaf (non-table value) in `table`.
pub fn leaf_keys(table: &Table) -> Vec<String> {
    let mut keys = Vec::new();
    collect_leaves(table, "", &mut keys);
    keys
}

fn collect_leaves(table: &Table, prefix: &str, keys: &mut Vec<String>) {
    for (key, value) in table {
        let dotted = join(prefix, key);
        match value {
            Value::Table(inner) => collect_leaves(inner, &dotted, keys),
            _ => keys.push(dotted),
        }
    }
}

/// Join two key segments with `.`, skipping an empty prefix.
pub fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Format a TOML value for display.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Array(a) => toml::to_string(&a).unwrap_or_else(|_| format!("{a:?}")),
        Value::Table(t) => toml::to_string(&t).unwrap_or_else(|_| format!("{t:?}")),
        _ => format!("{value:?}"),
    }
}
