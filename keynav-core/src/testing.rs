//! Test utilities for keynav hosts and for keynav itself
//!
//! - [`RecordingLauncher`]: records launches and opened URLs instead of
//!   touching the OS, and can be told to fail
//! - [`RecordingReporter`]: collects reported errors
//! - [`TestHarness`]: a [`Dispatcher`] over in-memory settings wired to both
//!   recorders, with its scripts in a private temp dir
//! - Assertion macros for launches and reported errors
//!
//! # Example
//!
//! ```
//! use keynav_core::testing::TestHarness;
//! use keynav_core::Action;
//!
//! let mut harness = TestHarness::new();
//! harness.add(Action::new_default("editor", vec!["vim".into()]).bound_to(["e"]));
//!
//! let result = harness.press("E");
//! assert_eq!(result.matched.len(), 1);
//! keynav_core::assert_launched!(harness.launcher(), "vim");
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use url::Url;

use crate::action::Action;
use crate::config::ScriptConfig;
use crate::dispatch::{DispatchResult, Dispatcher};
use crate::executor::{ErrorReporter, Executor, LaunchRequest, Launcher};
use crate::settings::{MemorySettings, SettingsStore, INTERNAL_ACTIONS_KEY};
use crate::store::Store;

/// Launcher that records requests instead of running them
#[derive(Debug, Clone, Default)]
pub struct RecordingLauncher {
    launches: Vec<LaunchRequest>,
    opened: Vec<String>,
    script_contents: Vec<String>,
    fail_targets: HashSet<String>,
    fail_all: bool,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail launches whose program (or opened URL) equals `target`
    pub fn fail_on(&mut self, target: impl Into<String>) {
        self.fail_targets.insert(target.into());
    }

    /// Fail every launch and every URL open
    pub fn fail_all(&mut self) {
        self.fail_all = true;
    }

    /// Successful launches, in order
    pub fn launches(&self) -> &[LaunchRequest] {
        &self.launches
    }

    /// Successfully opened URLs, in order
    pub fn opened(&self) -> &[String] {
        &self.opened
    }

    /// Contents of every stdin file seen at launch time, failed launches included
    pub fn script_contents(&self) -> &[String] {
        &self.script_contents
    }

    fn should_fail(&self, target: &str) -> bool {
        self.fail_all || self.fail_targets.contains(target)
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&mut self, request: &LaunchRequest) -> io::Result<()> {
        if let Some(contents) = request
            .stdin
            .as_ref()
            .and_then(|path| fs::read_to_string(path).ok())
        {
            self.script_contents.push(contents);
        }
        if self.should_fail(&request.program) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", request.program),
            ));
        }
        self.launches.push(request.clone());
        Ok(())
    }

    fn open_url(&mut self, url: &Url) -> io::Result<()> {
        if self.should_fail(url.as_str()) {
            return Err(io::Error::other(format!("cannot open {url}")));
        }
        self.opened.push(url.to_string());
        Ok(())
    }
}

/// One reported error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub title: String,
    pub message: String,
}

/// Reporter that keeps every error it is given
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    errors: Vec<ReportedError>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[ReportedError] {
        &self.errors
    }

    /// Take the errors reported so far
    pub fn drain(&mut self) -> Vec<ReportedError> {
        std::mem::take(&mut self.errors)
    }
}

impl ErrorReporter for RecordingReporter {
    fn report_error(&mut self, title: &str, message: &str) {
        self.errors.push(ReportedError {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

/// Dispatcher over in-memory settings with recording collaborators
///
/// Scripts for Cmd actions go to a temp dir owned by the harness.
pub struct TestHarness {
    dispatcher: Dispatcher<MemorySettings, RecordingLauncher, RecordingReporter>,
    script_dir: tempfile::TempDir,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_settings(MemorySettings::new())
    }

    /// Start from an already-persisted action string
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self::with_settings(MemorySettings::with_value(INTERNAL_ACTIONS_KEY, raw))
    }

    /// # Panics
    ///
    /// Panics if the temp dir for Cmd scripts cannot be created.
    pub fn with_settings(settings: MemorySettings) -> Self {
        let script_dir = tempfile::tempdir().unwrap_or_else(|err| panic!("temp dir: {err}"));
        let script = ScriptConfig {
            temp_dir: Some(script_dir.path().to_path_buf()),
            ..ScriptConfig::default()
        };
        let executor = Executor::new(RecordingLauncher::new(), RecordingReporter::new(), script);
        Self {
            dispatcher: Dispatcher::new(Store::new(settings), executor),
            script_dir,
        }
    }

    /// Add an action through the store
    pub fn add(&mut self, action: Action) {
        self.dispatcher.store_mut().add(action);
    }

    /// Dispatch a key
    pub fn press(&mut self, key: &str) -> DispatchResult {
        self.dispatcher.on_key(key)
    }

    pub fn dispatcher(
        &mut self,
    ) -> &mut Dispatcher<MemorySettings, RecordingLauncher, RecordingReporter> {
        &mut self.dispatcher
    }

    pub fn store(&mut self) -> &mut Store<MemorySettings> {
        self.dispatcher.store_mut()
    }

    pub fn launcher(&self) -> &RecordingLauncher {
        self.dispatcher.executor().launcher()
    }

    pub fn launcher_mut(&mut self) -> &mut RecordingLauncher {
        self.dispatcher.executor_mut().launcher_mut()
    }

    pub fn reporter(&self) -> &RecordingReporter {
        self.dispatcher.executor().reporter()
    }

    /// The persisted action string
    pub fn raw(&self) -> String {
        self.dispatcher
            .store()
            .settings()
            .get(INTERNAL_ACTIONS_KEY)
            .unwrap_or_default()
    }

    pub fn script_dir(&self) -> &Path {
        self.script_dir.path()
    }
}

/// Assert that a launcher started (or opened) a target.
///
/// # Example
///
/// ```ignore
/// assert_launched!(harness.launcher(), "notepad.exe");
/// assert_launched!(harness.launcher(), "http://example.com/");
/// ```
#[macro_export]
macro_rules! assert_launched {
    ($launcher:expr, $target:expr) => {{
        let launcher = &$launcher;
        let target: &str = $target;
        assert!(
            launcher.launches().iter().any(|r| r.program == target)
                || launcher.opened().iter().any(|u| u == target),
            "Expected `{}` to be launched, but got launches {:?} and URLs {:?}",
            target,
            launcher.launches(),
            launcher.opened()
        );
    }};
}

/// Assert that a reported error's message contains some text.
///
/// # Example
///
/// ```ignore
/// assert_reported!(harness.reporter(), "ApplicationId:2");
/// ```
#[macro_export]
macro_rules! assert_reported {
    ($reporter:expr, $needle:expr) => {{
        let reporter = &$reporter;
        let needle: &str = $needle;
        assert!(
            reporter.errors().iter().any(|e| e.message.contains(needle)),
            "Expected an error mentioning `{}`, but got: {:?}",
            needle,
            reporter.errors()
        );
    }};
}

/// Assert that no error was reported.
#[macro_export]
macro_rules! assert_nothing_reported {
    ($reporter:expr) => {{
        let reporter = &$reporter;
        assert!(
            reporter.errors().is_empty(),
            "Expected no reported errors, but got: {:?}",
            reporter.errors()
        );
    }};
}
