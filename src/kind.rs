//! Value kinds: the closed set of primitive types a [`Value`](crate::Value)
//! or a flag can carry.
//!
//! Each kind knows three conversions:
//!
//! - **store → kind** ([`Kind::cast`]): lenient, like a config file reader
//!   would expect. `"42"` reads as `42`, `3` reads as `"3"`, `1` reads as
//!   `true`. Anything uncoercible yields `None` and the caller falls back to
//!   the zero value.
//! - **kind → store** ([`Kind::into_value`]).
//! - **text → kind** ([`Kind::parse`]): strict, used for stringified defaults
//!   in derive attributes.

use std::fmt::Debug;

use clap::Arg;
use clap::builder::ValueParser;
use toml::Value;

pub trait Kind: Clone + Default + Debug + Send + Sync + 'static {
    /// Name used in diagnostics.
    const NAME: &'static str;

    fn cast(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;

    fn parse(raw: &str) -> Result<Self, String>;

    /// Parser clap uses for flags of this kind.
    fn value_parser() -> ValueParser;

    /// Adjust the clap argument registered for a flag of this kind.
    fn configure_arg(arg: Arg) -> Arg {
        arg
    }
}

impl Kind for String {
    const NAME: &'static str = "string";

    fn cast(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Datetime(d) => Some(d.to_string()),
            Value::Array(_) | Value::Table(_) => None,
        }
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn parse(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }

    fn value_parser() -> ValueParser {
        ValueParser::string()
    }
}

impl Kind for i64 {
    const NAME: &'static str = "int";

    fn cast(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Value::String(s) => s.trim().parse().ok(),
            Value::Boolean(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Integer(self)
    }

    fn parse(raw: &str) -> Result<Self, String> {
        raw.trim()
            .parse()
            .map_err(|e| format!("'{raw}' is not an integer: {e}"))
    }

    fn value_parser() -> ValueParser {
        clap::value_parser!(i64).into()
    }

    fn configure_arg(arg: Arg) -> Arg {
        arg.allow_negative_numbers(true)
    }
}

impl Kind for f64 {
    const NAME: &'static str = "float";

    fn cast(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            Value::String(s) => s.trim().parse().ok(),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn parse(raw: &str) -> Result<Self, String> {
        raw.trim()
            .parse()
            .map_err(|e| format!("'{raw}' is not a float: {e}"))
    }

    fn value_parser() -> ValueParser {
        clap::value_parser!(f64).into()
    }

    fn configure_arg(arg: Arg) -> Arg {
        arg.allow_negative_numbers(true)
    }
}

impl Kind for bool {
    const NAME: &'static str = "bool";

    fn cast(value: &Value) -> Option<Self> {
        match value {
            Value::Boolean(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::String(s) => parse_bool(s.trim()),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Boolean(self)
    }

    fn parse(raw: &str) -> Result<Self, String> {
        parse_bool(raw.trim()).ok_or_else(|| format!("'{raw}' is not a bool"))
    }

    fn value_parser() -> ValueParser {
        ValueParser::bool()
    }

    // `--flag` means true; `--flag=false` must use the equals form.
    fn configure_arg(arg: Arg) -> Arg {
        arg.num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
