//! # aai demo application
//!
//! A command-suggestion CLI in the shape of `aai <query>`, wired end to end
//! with confbind. It makes no network calls: where a real client would POST
//! to a completion API, the demo prints the request body it would send.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example aai -- "show files larger than 1MB"
//! cargo run --example aai -- --openai-temperature=0.7 explain "ls -l"
//! cargo run --example aai -- --openai-model=gpt-4 config set --file ./config.toml
//! cargo run --example aai -- config view
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                       | How to exercise it                                        |
//! |-------------------------------|-----------------------------------------------------------|
//! | Declared defaults             | `cargo run --example aai -- "query"`                      |
//! | Config file                   | Put `config.toml` in `/etc/aai`, `~/.aai` or the cwd      |
//! | Flag overrides file           | `--openai-maxtokens=20` on any command                    |
//! | Log level from config         | `--loglevel=debug` or `loglevel = "debug"` in the file    |
//! | Decode into request struct    | Any query or `explain`: prints the JSON request body      |
//! | Promote flags and persist     | `config set [--file PATH]`                                |
//! | Render config file            | `config` or `config view`                                 |

mod config;

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Arg, ArgMatches, Command};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use confbind::{ConfbindError, FlagHandle, FlagSet, SearchPath, Store};

use config::{CompletionRequest, GlobalConfig, OpenAiSettings, RequestBase};

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

const ABOUT: &str = "\
ask-ai-cli (aai)
A command line tool that helps you find a command you need.
It uses AI to suggest a command based on your query.

It is advised to not use suggestions blindly,
but rather to read the documentation and understand
what the command does before running it.

Example:
    $ aai \"show files with size greater than 1MB\"
    find . -size +1M";

fn command(global: &FlagSet, set: &FlagSet) -> Command {
    let config_set =
        set.augment(Command::new("set").about("Set config values in config file using flags"));
    let config = Command::new("config")
        .about("Display or change current configuration")
        .subcommand(Command::new("view").about("Display config"))
        .subcommand(config_set);
    let explain = Command::new("explain")
        .about("Explain provided command")
        .arg(Arg::new("command").value_name("COMMAND").required(true));

    global.augment(
        Command::new("aai")
            .about("Ask AI to suggest a command")
            .long_about(ABOUT)
            .arg(Arg::new("query").value_name("QUERY"))
            .subcommand(explain)
            .subcommand(config),
    )
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

fn make_store() -> Store {
    Store::builder()
        .app_name("aai")
        .file_name("config.toml")
        .search_paths(vec![
            SearchPath::Path(PathBuf::from("/etc/aai")),
            SearchPath::Home(".aai"),
            SearchPath::Cwd,
        ])
        .build()
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level)
        .with_context(|| format!("failed to parse log level '{level}'"))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn request_settings(config: &GlobalConfig) -> anyhow::Result<OpenAiSettings> {
    match config.provider.get().as_str() {
        "openai" => confbind::decode(config).context("failed to decode config"),
        other => bail!("unknown provider: {other}"),
    }
}

fn print_request(
    settings: OpenAiSettings,
    build: impl FnOnce(RequestBase) -> CompletionRequest,
) -> anyhow::Result<()> {
    if settings.api_key.is_empty() {
        warn!("No OpenAI api key configured; set openai.apikey or pass --openai-apikey");
    }
    let request = build(settings.request);
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

fn config_set(
    config: &GlobalConfig,
    store: &Store,
    file: &FlagHandle<String>,
) -> anyhow::Result<()> {
    let mut changes = 0usize;
    confbind::traverse(config, |value| {
        if value.is_set()? {
            value.set_any(value.get_any()?)?;
            changes += 1;
        }
        Ok(())
    })
    .context("failed to traverse config")?;

    if changes == 0 {
        info!("Nothing to write");
        return Ok(());
    }

    let written = if file.changed() {
        let path = PathBuf::from(file.get());
        store.write_config_as(&path)?;
        path
    } else {
        match store.write_config() {
            Err(ConfbindError::NoConfigFile) => bail!(
                "No config file to write to.\n\
                 Use --file to choose one, e.g. --file ~/.aai/config.toml"
            ),
            other => other.context("failed to write config")?,
        }
    };
    info!(path = %written.display(), changes, "Wrote config file");
    Ok(())
}

fn config_view(store: &Store) -> anyhow::Result<()> {
    let Some(path) = store.config_file_used() else {
        println!("No config file found");
        return Ok(());
    };

    let readonly = Store::default();
    readonly.set_config_file(&path);
    readonly
        .read_config()
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    print!("{}", render(&readonly));
    Ok(())
}

/// Render a store as an indented tree, one section level per two spaces.
fn render(store: &Store) -> String {
    let keys = store.all_keys();
    render_level(store, &keys, 0)
}

fn render_level(store: &Store, keys: &[String], indent: usize) -> String {
    let pad = " ".repeat(indent);
    let mut out = String::new();

    let (leaves, nested): (Vec<&String>, Vec<&String>) =
        keys.iter().partition(|k| !k.contains('.'));
    for key in leaves {
        let value = store
            .get(key)
            .map(|v| confbind::format_value(&v))
            .unwrap_or_default();
        out.push_str(&format!("{pad}{key}: {value}\n"));
    }

    let mut sections: Vec<&str> = nested
        .iter()
        .filter_map(|k| k.split_once('.'))
        .map(|(section, _)| section)
        .collect();
    sections.dedup();
    for section in sections {
        let Some(sub) = store.sub(section) else {
            continue;
        };
        let inner: Vec<String> = nested
            .iter()
            .filter_map(|k| k.strip_prefix(section)?.strip_prefix('.'))
            .map(str::to_string)
            .collect();
        out.push_str(&format!("{pad}{section}:\n"));
        out.push_str(&render_level(&sub, &inner, indent + 2));
    }
    out
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn run() -> anyhow::Result<()> {
    let flags = FlagSet::persistent("aai");
    let mut config: GlobalConfig = confbind::declare(&flags, "");
    let set_flags = FlagSet::new("set");
    let file = set_flags.string_p("file", Some('f'), String::new(), "file to write config to");

    let matches: ArgMatches = command(&flags, &set_flags).get_matches();
    flags.set_matches(&matches);
    set_flags.set_matches(&matches);

    let store = make_store();
    let missing = match store.read_config() {
        Ok(()) => None,
        Err(ConfbindError::ConfigFileNotFound { searched, .. }) => Some(searched),
        Err(e) => return Err(e).context("failed to read config"),
    };

    confbind::attach(&store, &mut config).context("failed to attach config")?;

    // Logging is configured from config, so nothing is logged before this.
    init_logging(&config.loglevel.get())?;
    match (store.config_file_used(), missing) {
        (Some(path), _) => info!(path = %path.display(), "Using config file"),
        (None, searched) => warn!(
            searched = searched.map_or(0, |s| s.len()),
            "No config file found, using defaults"
        ),
    }
    debug!(keys = ?confbind::keys(&config)?, "Configuration attached");

    match matches.subcommand() {
        Some(("explain", sub)) => {
            let Some(command) = sub.get_one::<String>("command") else {
                bail!("Please provide a command to explain");
            };
            let settings = request_settings(&config)?;
            print_request(settings, |base| CompletionRequest::explain(base, command))
        }
        Some(("config", sub)) => match sub.subcommand() {
            Some(("set", _)) => config_set(&config, &store, &file),
            _ => config_view(&store),
        },
        _ => {
            let Some(query) = matches.get_one::<String>("query") else {
                bail!("Please provide a query argument");
            };
            let settings = request_settings(&config)?;
            print_request(settings, |base| CompletionRequest::suggest(base, query))
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
