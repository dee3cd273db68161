//! keynav - command-line host for key-bound actions
//!
//! Stands in for the pieces a desktop host would provide: a settings file,
//! a key source (the terminal, in `listen` mode) and an error display
//! (stderr).
//!
//! # Usage
//!
//! ```sh
//! # Bind F5 to two applications
//! keynav add default --name editors --key f5 --item code --item gvim
//!
//! # Bind ctrl+w to a couple of sites
//! keynav add web --name news --key ctrl+w --item news.ycombinator.com --item lwn.net
//!
//! # Fire whatever is bound to a key, once
//! keynav press f5
//!
//! # Capture keys from the terminal until Esc
//! keynav listen
//! ```

mod cli;

use std::error::Error;
use std::io::{self, Write};

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use keynav_core::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::cli::{AddArgs, Args, Command, KindArg};

type AppDispatcher = Dispatcher<JsonFileSettings, SystemLauncher, StderrReporter, LoggingMiddleware>;

/// Error display that writes to stderr
struct StderrReporter;

impl ErrorReporter for StderrReporter {
    fn report_error(&mut self, title: &str, message: &str) {
        // In raw mode a bare \n does not return the carriage
        eprint!("{title}\r\n{}\r\n", message.replace('\n', "\r\n"));
    }
}

/// Restores the terminal when dropped
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;
    if let Some(path) = args.settings {
        config.settings_path = path;
    }
    tracing::debug!(config = %config_path.display(), settings = %config.settings_path.display(), "Starting");

    let settings = JsonFileSettings::open(&config.settings_path)?;
    let executor = Executor::new(SystemLauncher, StderrReporter, config.script.clone());
    let mut dispatcher: AppDispatcher =
        Dispatcher::with_middleware(Store::new(settings), executor, LoggingMiddleware::new());
    dispatcher
        .store_mut()
        .load_with_embedded(&config.embedded_actions);

    match args.command {
        Command::List { restricted } => list(&dispatcher, &config.capabilities, restricted),
        Command::Show { id } => show(&dispatcher, &id)?,
        Command::Add(add_args) => add(&mut dispatcher, add_args),
        Command::Remove { id } => {
            let action = find(&dispatcher, &id)?.clone();
            dispatcher.store_mut().remove(&action)?;
            println!("Removed {action}");
        }
        Command::Clear => {
            dispatcher.store_mut().clear();
            println!("Cleared all stored actions");
        }
        Command::Press { key } => press(&mut dispatcher, &key),
        Command::Listen => listen(&mut dispatcher)?,
    }
    Ok(())
}

fn list(dispatcher: &AppDispatcher, flags: &CapabilityFlags, restricted: bool) {
    let store = dispatcher.store();
    let actions: Vec<&Action> = if restricted {
        store.restricted_view(flags)
    } else {
        store.actions().collect()
    };

    if actions.is_empty() {
        println!("No actions");
        return;
    }
    for action in actions {
        let keys: Vec<String> = action
            .keys()
            .iter()
            .map(|k| format_key_for_display(k))
            .collect();
        let lock = if action.is_locked() { " [locked]" } else { "" };
        println!(
            "{}  {:<7} {}  keys: {}{lock}",
            action.id(),
            action.kind(),
            action,
            keys.join(", ")
        );
    }
}

fn show(dispatcher: &AppDispatcher, id: &str) -> Result<(), Box<dyn Error>> {
    let action = find(dispatcher, id)?;
    println!("id:     {}", action.id());
    println!("name:   {}", action.name());
    println!("kind:   {}", action.kind());
    println!("locked: {}", action.is_locked());
    for (key, count) in action.keys().iter().zip(action.activation_counts()) {
        println!("key:    {} ({count} activations)", format_key_for_display(key));
    }
    match action.payload() {
        Payload::Default { applications } => {
            for (i, app) in applications.iter().enumerate() {
                println!("app {}:  {app}", i + 1);
            }
        }
        Payload::Cmd { command, is_hidden } => {
            println!("hidden: {is_hidden}");
            println!("command:\n{command}");
        }
        Payload::Web { websites } => {
            for (i, site) in websites.iter().enumerate() {
                println!("site {i}: {site}");
            }
        }
    }
    Ok(())
}

fn add(dispatcher: &mut AppDispatcher, args: AddArgs) {
    let payload = match args.kind {
        KindArg::Default => Payload::Default {
            applications: args.items,
        },
        KindArg::Cmd => Payload::Cmd {
            command: args.items.join("\n"),
            is_hidden: args.hidden,
        },
        KindArg::Web => Payload::Web {
            websites: args.items,
        },
    };
    let mut action = Action::with_payload(args.name, payload).bound_to(&args.keys);
    action.set_locked(args.locked);

    println!("Added {} {action}", action.id());
    dispatcher.store_mut().add(action);
}

fn press(dispatcher: &mut AppDispatcher, key: &str) {
    let result = dispatcher.on_key(key);
    if result.changed() {
        println!(
            "{}: {} fired, {} failed",
            normalize_key_name(key),
            result.matched.len(),
            result.failed.len()
        );
    } else {
        println!("Nothing bound to {}", normalize_key_name(key));
    }
}

fn listen(dispatcher: &mut AppDispatcher) -> Result<(), Box<dyn Error>> {
    println!("Listening for keys, Esc to stop");
    let _guard = RawModeGuard::enable()?;
    let mut stdout = io::stdout();

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.code == KeyCode::Esc {
            break;
        }
        let Some(name) = key_name_from_event(key) else {
            continue;
        };

        let result = dispatcher.on_key(&name);
        if result.changed() {
            write!(
                stdout,
                "{}: {} fired, {} failed\r\n",
                format_key_for_display(&name),
                result.matched.len(),
                result.failed.len()
            )?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn find<'a>(dispatcher: &'a AppDispatcher, id: &str) -> Result<&'a Action, Box<dyn Error>> {
    let id: ActionId = id.parse()?;
    dispatcher
        .store()
        .find(id)
        .ok_or_else(|| format!("no action with id {id}").into())
}
