//! Core types for keynav
//!
//! keynav binds key names to actions: launch applications, run a shell
//! script, or open websites. Pressing a bound key executes every action bound
//! to it and counts the activation.
//!
//! # Core Concepts
//!
//! - **Action**: identity, name, bound keys, per-key counters and a
//!   kind-specific payload (Default / Cmd / Web)
//! - **Codec**: actions to tag-prefixed tokens and back; a list of actions to
//!   one `|`-delimited string
//! - **Store**: the loaded action list and its persisted form in a settings
//!   store
//! - **Dispatcher**: fires the actions bound to a key
//! - **Executor**: the OS-facing side of execution, behind the [`Launcher`]
//!   and [`ErrorReporter`] seams
//! - **Access**: the subset of actions visible under a capability vector
//!
//! # Basic Example
//!
//! ```
//! use keynav_core::prelude::*;
//! use keynav_core::testing::{RecordingLauncher, RecordingReporter};
//!
//! let mut store = Store::new(MemorySettings::new());
//! store.add(Action::new_default("editor", vec!["vim".into()]).bound_to(["ctrl+e"]));
//!
//! let executor = Executor::new(
//!     RecordingLauncher::new(),
//!     RecordingReporter::new(),
//!     ScriptConfig::default(),
//! );
//! let mut dispatcher = Dispatcher::new(store, executor);
//! dispatcher.on_key("Ctrl+E");
//!
//! let editor = dispatcher.store().actions().next().unwrap();
//! assert_eq!(editor.activation_count("ctrl+e"), Some(1));
//! ```
//!
//! Real hosts use [`Executor::system`] (or [`SystemLauncher`] with their own
//! reporter) and a [`JsonFileSettings`] store.

pub mod access;
pub mod action;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod executor;
pub mod keys;
pub mod settings;
pub mod store;
pub mod testing;

// Core type exports
pub use action::{Action, ActionId, ActionKind, Payload};
pub use codec::{decode_list, decode_one, encode_list, encode_one, DecodeError, DELIMITER};
pub use config::{Config, ConfigError, ScriptConfig};
pub use store::{Store, StoreError};

// Dispatch exports
pub use dispatch::{
    ComposedMiddleware, DispatchResult, Dispatcher, LoggingMiddleware, Middleware, NoopMiddleware,
};
pub use executor::{ErrorReporter, Executor, LaunchRequest, Launcher, LogReporter, SystemLauncher};
pub use keys::{format_key_for_display, key_name_from_event, normalize_key_name};

// Access exports
pub use access::{restricted_view, CapabilityFlags};

// Settings exports
pub use settings::{
    JsonFileSettings, MemorySettings, SettingsError, SettingsStore, INTERNAL_ACTIONS_KEY,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::access::{restricted_view, CapabilityFlags};
    pub use crate::action::{Action, ActionId, ActionKind, Payload};
    pub use crate::config::{Config, ScriptConfig};
    pub use crate::dispatch::{
        ComposedMiddleware, DispatchResult, Dispatcher, LoggingMiddleware, Middleware,
        NoopMiddleware,
    };
    pub use crate::executor::{
        ErrorReporter, Executor, LaunchRequest, Launcher, LogReporter, SystemLauncher,
    };
    pub use crate::keys::{format_key_for_display, key_name_from_event, normalize_key_name};
    pub use crate::settings::{JsonFileSettings, MemorySettings, SettingsStore};
    pub use crate::store::{Store, StoreError};
}
