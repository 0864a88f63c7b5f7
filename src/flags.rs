//! Runtime flag registration on top of clap.
//!
//! A [`FlagSet`] collects clap [`Arg`]s while the configuration tree is being
//! declared, long before the host has built its `Command` or parsed
//! anything. Each registration returns a [`FlagHandle`], a live view that
//! yields the default until a parse result is recorded with
//! [`FlagSet::set_matches`], and the parsed value afterwards.
//!
//! The host decides how flags reach the command line:
//!
//! ```ignore
//! let flags = FlagSet::persistent("aai");
//! let provider = flags.string_p("provider", None, "openai".into(), "provider to use");
//! let cmd = flags.augment(Command::new("aai"));
//! flags.set_matches(&cmd.get_matches());
//! assert_eq!(provider.get(), "openai");
//! ```
//!
//! Registering the same name (or shorthand) twice is a programming error and
//! panics immediately, so the mistake surfaces on the first run.

use std::cell::RefCell;
use std::ffi::OsString;
use std::rc::Rc;

use clap::parser::ValueSource;
use clap::{Arg, ArgMatches, Command};
use toml::Value;

use crate::kind::Kind;
use crate::table::format_value;

/// A set of flags registered during configuration declaration.
///
/// Cloning is cheap; clones share the same registrations and parse result.
#[derive(Debug, Clone)]
pub struct FlagSet {
    inner: Rc<RefCell<FlagSetInner>>,
}

#[derive(Debug)]
struct FlagSetInner {
    name: String,
    persistent: bool,
    flags: Vec<Registered>,
    matches: Option<ArgMatches>,
}

#[derive(Debug)]
struct Registered {
    name: String,
    shorthand: Option<char>,
    default_value: String,
    usage: String,
    arg: Arg,
}

/// Descriptor of a registered flag, as returned by [`FlagSet::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagInfo {
    pub name: String,
    pub shorthand: Option<char>,
    pub default_value: String,
    pub usage: String,
    /// Whether the user supplied the flag on the parsed command line.
    pub changed: bool,
}

impl FlagSet {
    /// A flag set whose args belong only to the command they are added to.
    pub fn new(name: &str) -> Self {
        Self::with_scope(name, false)
    }

    /// A flag set whose args are clap `global`: visible to every subcommand
    /// of the command they are added to.
    pub fn persistent(name: &str) -> Self {
        Self::with_scope(name, true)
    }

    fn with_scope(name: &str, persistent: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(FlagSetInner {
                name: name.to_string(),
                persistent,
                flags: Vec::new(),
                matches: None,
            })),
        }
    }

    /// Name of the flag set, used in diagnostics.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Register a flag of kind `T` and return its live handle.
    ///
    /// # Panics
    ///
    /// Panics if `name` or `shorthand` is already registered on this set.
    pub fn register<T: Kind>(
        &self,
        name: &str,
        shorthand: Option<char>,
        default: T,
        usage: &str,
    ) -> FlagHandle<T> {
        let mut inner = self.inner.borrow_mut();

        if inner.flags.iter().any(|f| f.name == name) {
            panic!(
                "confbind: flag --{name} redefined on flag set '{}'",
                inner.name
            );
        }
        if let Some(short) = shorthand
            && let Some(taken) = inner.flags.iter().find(|f| f.shorthand == Some(short))
        {
            panic!(
                "confbind: shorthand -{short} for --{name} already used by --{} on flag set '{}'",
                taken.name, inner.name
            );
        }

        let default_value = format_value(&default.clone().into_value());
        let mut arg = Arg::new(name.to_string())
            .long(name.to_string())
            .help(usage.to_string())
            .value_parser(T::value_parser())
            .default_value(default_value.clone())
            .global(inner.persistent);
        if let Some(short) = shorthand {
            arg = arg.short(short);
        }
        let arg = T::configure_arg(arg);

        inner.flags.push(Registered {
            name: name.to_string(),
            shorthand,
            default_value,
            usage: usage.to_string(),
            arg,
        });

        FlagHandle {
            set: self.clone(),
            name: name.to_string(),
            default,
        }
    }

    /// Register a string flag.
    pub fn string_p(
        &self,
        name: &str,
        shorthand: Option<char>,
        default: String,
        usage: &str,
    ) -> FlagHandle<String> {
        self.register(name, shorthand, default, usage)
    }

    /// Register an integer flag.
    pub fn int_p(
        &self,
        name: &str,
        shorthand: Option<char>,
        default: i64,
        usage: &str,
    ) -> FlagHandle<i64> {
        self.register(name, shorthand, default, usage)
    }

    /// Register a float flag.
    pub fn float64_p(
        &self,
        name: &str,
        shorthand: Option<char>,
        default: f64,
        usage: &str,
    ) -> FlagHandle<f64> {
        self.register(name, shorthand, default, usage)
    }

    /// Register a bool flag: `--name` sets it, `--name=false` clears it.
    pub fn bool_p(
        &self,
        name: &str,
        shorthand: Option<char>,
        default: bool,
        usage: &str,
    ) -> FlagHandle<bool> {
        self.register(name, shorthand, default, usage)
    }

    /// Clap args for every registered flag, in registration order.
    pub fn args(&self) -> Vec<Arg> {
        self.inner
            .borrow()
            .flags
            .iter()
            .map(|f| f.arg.clone())
            .collect()
    }

    /// Add every registered flag to `cmd`.
    pub fn augment(&self, cmd: Command) -> Command {
        cmd.args(self.args())
    }

    /// Record the parse result the handles read from.
    ///
    /// Pass the top-level matches; subcommand levels are searched too, the
    /// deepest level that defines a flag taking precedence.
    pub fn set_matches(&self, matches: &ArgMatches) {
        self.inner.borrow_mut().matches = Some(matches.clone());
    }

    /// Parse `args` against a command containing only this set's flags.
    /// The first item is the binary name.
    pub fn parse_from<I, S>(&self, args: I) -> Result<(), clap::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString> + Clone,
    {
        let cmd = self.augment(Command::new(self.name()));
        let matches = cmd.try_get_matches_from(args)?;
        self.set_matches(&matches);
        Ok(())
    }

    /// Describe the flag registered as `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<FlagInfo> {
        let inner = self.inner.borrow();
        let flag = inner.flags.iter().find(|f| f.name == name)?;
        Some(FlagInfo {
            name: flag.name.clone(),
            shorthand: flag.shorthand,
            default_value: flag.default_value.clone(),
            usage: flag.usage.clone(),
            changed: changed_in(inner.matches.as_ref(), name),
        })
    }

    /// True iff `name` was supplied on the parsed command line.
    pub fn changed(&self, name: &str) -> bool {
        changed_in(self.inner.borrow().matches.as_ref(), name)
    }

    fn parsed<T: Kind>(&self, name: &str) -> Option<T> {
        let inner = self.inner.borrow();
        let matches = inner.matches.as_ref()?;
        levels(matches)
            .into_iter()
            .rev()
            .find_map(|level| match level.try_get_one::<T>(name) {
                Ok(value) => Some(value.cloned()),
                Err(_) => None,
            })
            .flatten()
    }
}

/// The matches of every subcommand level, top-level first.
fn levels(matches: &ArgMatches) -> Vec<&ArgMatches> {
    let mut out = vec![matches];
    let mut current = matches;
    while let Some((_, sub)) = current.subcommand() {
        out.push(sub);
        current = sub;
    }
    out
}

fn changed_in(matches: Option<&ArgMatches>, name: &str) -> bool {
    let Some(matches) = matches else {
        return false;
    };
    // `value_source` must only be asked about ids the level defines.
    levels(matches).into_iter().any(|level| {
        level.try_contains_id(name).is_ok()
            && level.value_source(name) == Some(ValueSource::CommandLine)
    })
}

/// Live handle to one registered flag.
#[derive(Debug, Clone)]
pub struct FlagHandle<T: Kind> {
    set: FlagSet,
    name: String,
    default: T,
}

impl<T: Kind> FlagHandle<T> {
    /// The parsed value, or the default before parsing.
    pub fn get(&self) -> T {
        self.set
            .parsed::<T>(&self.name)
            .unwrap_or_else(|| self.default.clone())
    }

    /// True iff the flag was supplied on the parsed command line.
    pub fn changed(&self) -> bool {
        self.set.changed(&self.name)
    }

    /// The flag's long name, without dashes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registration default.
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// The set this flag was registered on.
    pub fn flag_set(&self) -> &FlagSet {
        &self.set
    }
}

/// Type-erased view of a flag, as the store consumes it.
pub trait FlagSource {
    fn name(&self) -> &str;
    fn changed(&self) -> bool;
    /// Current value: parsed if supplied, default otherwise.
    fn value(&self) -> Value;
}

impl<T: Kind> FlagSource for FlagHandle<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn changed(&self) -> bool {
        FlagHandle::changed(self)
    }

    fn value(&self) -> Value {
        self.get().into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_before_parse() {
        let flags = FlagSet::new("test");
        let provider = flags.string_p("provider", None, "openai".into(), "provider");
        assert_eq!(provider.get(), "openai");
        assert!(!provider.changed());
    }

    #[test]
    fn parsed_value_and_changed() {
        let flags = FlagSet::new("test");
        let provider = flags.string_p("provider", Some('p'), "openai".into(), "provider");
        let tokens = flags.int_p("maxtokens", None, 100, "max tokens");
        flags
            .parse_from(["test", "-p", "anthropic"])
            .unwrap();

        assert_eq!(provider.get(), "anthropic");
        assert!(provider.changed());
        assert_eq!(tokens.get(), 100);
        assert!(!tokens.changed());
    }

    #[test]
    fn float_and_bool_flags() {
        let flags = FlagSet::new("test");
        let temp = flags.float64_p("temperature", None, 0.2, "temperature");
        let verbose = flags.bool_p("verbose", Some('v'), false, "verbose");
        let color = flags.bool_p("color", None, true, "color");
        flags
            .parse_from(["test", "--temperature", "0.7", "-v", "--color=false"])
            .unwrap();

        assert_eq!(temp.get(), 0.7);
        assert!(verbose.get());
        assert!(verbose.changed());
        assert!(!color.get());
    }

    #[test]
    fn numeric_flags_accept_negative_values() {
        let flags = FlagSet::new("test");
        let penalty = flags.float64_p("penalty", None, 0.0, "frequency penalty");
        let offset = flags.int_p("offset", Some('o'), 0, "offset");
        flags
            .parse_from(["test", "--penalty", "-0.5", "-o", "-3"])
            .unwrap();

        assert_eq!(penalty.get(), -0.5);
        assert!(penalty.changed());
        assert_eq!(offset.get(), -3);
    }

    #[test]
    fn invalid_value_is_a_parse_error() {
        let flags = FlagSet::new("test");
        flags.int_p("maxtokens", None, 100, "max tokens");
        assert!(flags.parse_from(["test", "--maxtokens", "many"]).is_err());
    }

    #[test]
    fn lookup_describes_flag() {
        let flags = FlagSet::new("test");
        flags.string_p("provider", Some('p'), "openai".into(), "provider to use");
        let info = flags.lookup("provider").unwrap();
        assert_eq!(info.name, "provider");
        assert_eq!(info.shorthand, Some('p'));
        assert_eq!(info.default_value, "openai");
        assert_eq!(info.usage, "provider to use");
        assert!(!info.changed);
        assert!(flags.lookup("nope").is_none());
    }

    #[test]
    #[should_panic(expected = "redefined")]
    fn duplicate_name_panics() {
        let flags = FlagSet::new("test");
        flags.string_p("provider", None, String::new(), "a");
        flags.string_p("provider", None, String::new(), "b");
    }

    #[test]
    #[should_panic(expected = "shorthand -p")]
    fn duplicate_shorthand_panics() {
        let flags = FlagSet::new("test");
        flags.string_p("provider", Some('p'), String::new(), "a");
        flags.string_p("prompt", Some('p'), String::new(), "b");
    }

    #[test]
    fn persistent_flags_reach_subcommands() {
        let flags = FlagSet::persistent("aai");
        let provider = flags.string_p("provider", None, "openai".into(), "provider");
        let cmd = flags.augment(Command::new("aai").subcommand(Command::new("explain")));
        let matches = cmd
            .try_get_matches_from(["aai", "explain", "--provider", "local"])
            .unwrap();
        flags.set_matches(&matches);

        assert_eq!(provider.get(), "local");
        assert!(provider.changed());
    }

    #[test]
    fn flag_source_erases_kind() {
        let flags = FlagSet::new("test");
        let tokens = flags.int_p("maxtokens", None, 100, "max tokens");
        let source: &dyn FlagSource = &tokens;
        assert_eq!(source.name(), "maxtokens");
        assert_eq!(source.value(), Value::Integer(100));
        assert!(!source.changed());
    }
}
