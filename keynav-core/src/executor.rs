//! Per-kind execution of actions against the operating system
//!
//! The OS-facing parts are behind two seams so the behavior can be tested
//! without launching anything:
//!
//! - [`Launcher`]: start a process, open a URL with the default handler
//! - [`ErrorReporter`]: show an execution failure to the user
//!
//! [`Executor`] ties them together with the script settings and implements
//! the per-kind rules:
//!
//! - **Default** launches each application in order and stops at the first
//!   one that fails to start.
//! - **Cmd** writes the command to a fresh temporary script, hands it to the
//!   platform shell on standard input and always deletes the script again.
//!   The shell holds the file open, so the delete never races its read.
//!   Launch failures are logged, not shown.
//! - **Web** prefixes bare hosts with `http://` (and keeps the fix), checks
//!   that each entry is an absolute http(s) URL and opens it, stopping at the
//!   first invalid one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use url::Url;

use crate::action::{Action, Payload};
use crate::config::ScriptConfig;

/// A request to start a detached process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub program: String,
    pub args: Vec<String>,
    /// Start without a visible window where the platform supports it
    pub hidden: bool,
    /// File opened and connected to the process's standard input
    pub stdin: Option<PathBuf>,
}

impl LaunchRequest {
    /// Launch an application path or executable name as-is
    pub fn application(target: impl Into<String>) -> Self {
        Self {
            program: target.into(),
            args: Vec::new(),
            hidden: false,
            stdin: None,
        }
    }

    /// Run a script file through the platform shell, fed on standard input
    pub fn script(path: &Path, hidden: bool) -> Self {
        let (program, args) = if cfg!(windows) {
            ("cmd", vec!["/D".to_string(), "/Q".to_string()])
        } else {
            ("sh", vec!["-s".to_string()])
        };
        Self {
            program: program.to_string(),
            args,
            hidden,
            stdin: Some(path.to_path_buf()),
        }
    }
}

/// OS process-launch capability
pub trait Launcher {
    /// Start a process without waiting for it
    fn launch(&mut self, request: &LaunchRequest) -> io::Result<()>;

    /// Open a URL with the system's default handler
    fn open_url(&mut self, url: &Url) -> io::Result<()>;
}

/// User-facing error display
pub trait ErrorReporter {
    fn report_error(&mut self, title: &str, message: &str);
}

/// Launcher backed by `std::process` and the `open` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&mut self, request: &LaunchRequest) -> io::Result<()> {
        let stdin = match &request.stdin {
            Some(path) => Stdio::from(File::open(path)?),
            None => Stdio::null(),
        };
        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .stdin(stdin)
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            if request.hidden {
                command.creation_flags(CREATE_NO_WINDOW);
            }
        }

        let child = command.spawn()?;
        tracing::debug!(program = %request.program, pid = child.id(), "Process started");
        Ok(())
    }

    fn open_url(&mut self, url: &Url) -> io::Result<()> {
        open::that_detached(url.as_str())
    }
}

/// Reporter that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report_error(&mut self, title: &str, message: &str) {
        tracing::error!(title, message, "Action failed");
    }
}

/// Runs actions against a launcher, reporting failures to a reporter
#[derive(Debug)]
pub struct Executor<L: Launcher, R: ErrorReporter> {
    launcher: L,
    reporter: R,
    script: ScriptConfig,
}

impl Executor<SystemLauncher, LogReporter> {
    /// Executor for the real system with log-only error reporting
    pub fn system() -> Self {
        Self::new(SystemLauncher, LogReporter, ScriptConfig::default())
    }
}

impl<L: Launcher, R: ErrorReporter> Executor<L, R> {
    pub fn new(launcher: L, reporter: R, script: ScriptConfig) -> Self {
        Self {
            launcher,
            reporter,
            script,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn launcher_mut(&mut self) -> &mut L {
        &mut self.launcher
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    pub fn script_config(&self) -> &ScriptConfig {
        &self.script
    }

    /// Execute an action
    ///
    /// Returns `false` when a Default or Web action stopped on a failing
    /// item. Cmd actions always return `true`.
    pub fn run(&mut self, action: &mut Action) -> bool {
        let name = action.name().to_string();
        match action.payload_mut() {
            Payload::Default { applications } => self.run_applications(&name, applications),
            Payload::Cmd { command, is_hidden } => self.run_command(command, *is_hidden),
            Payload::Web { websites } => self.run_websites(&name, websites),
        }
    }

    fn run_applications(&mut self, name: &str, applications: &[String]) -> bool {
        for (index, application) in applications.iter().enumerate() {
            let request = LaunchRequest::application(application.as_str());
            if let Err(err) = self.launcher.launch(&request) {
                tracing::warn!(action = %name, application = %application, error = %err, "Launch failed");
                let message = format!(
                    "Action: {name}\tApplicationId:{}\n\
                     There was an error when opening {application} or it could not be executed.",
                    index + 1
                );
                self.reporter
                    .report_error("Application Execute Error", &message);
                return false;
            }
        }
        true
    }

    fn run_command(&mut self, command: &str, hidden: bool) -> bool {
        if let Err(err) = self.spawn_script(command, hidden) {
            tracing::error!(error = %err, "Failed to run command script");
        }
        true
    }

    fn spawn_script(&mut self, command: &str, hidden: bool) -> io::Result<()> {
        let script = ScriptFile::create(&self.script, command)?;
        tracing::debug!(path = %script.path().display(), hidden, "Running command script");
        self.launcher
            .launch(&LaunchRequest::script(script.path(), hidden))
    }

    fn run_websites(&mut self, name: &str, websites: &mut [String]) -> bool {
        for (index, website) in websites.iter_mut().enumerate() {
            if !has_http_scheme(website) {
                *website = format!("http://{website}");
            }

            let opened = match parse_web_url(website) {
                Some(url) => self.launcher.open_url(&url).map_err(|err| {
                    tracing::warn!(action = %name, url = %url, error = %err, "Failed to open URL");
                }),
                None => Err(()),
            };

            if opened.is_err() {
                let message = format!(
                    "Action: {name}\tWebsiteId:{index}\n\
                     There was an error with the format of {website} or it could not be executed.\n\
                     Example: www.example.com"
                );
                self.reporter.report_error("URL Execute Error", &message);
                return false;
            }
        }
        true
    }
}

impl Action {
    /// Execute this action; see [`Executor::run`]
    pub fn execute<L: Launcher, R: ErrorReporter>(&mut self, executor: &mut Executor<L, R>) -> bool {
        executor.run(self)
    }
}

/// Case-sensitive: `HTTP://host` is not recognized and gets a second `http://` prefix
fn has_http_scheme(website: &str) -> bool {
    website.starts_with("http://") || website.starts_with("https://")
}

/// Accept only well-formed absolute http(s) URLs with a host
pub fn parse_web_url(candidate: &str) -> Option<Url> {
    if candidate.chars().any(char::is_whitespace) {
        return None;
    }
    let url = Url::parse(candidate).ok()?;
    let web = matches!(url.scheme(), "http" | "https");
    (web && url.host_str().is_some_and(|h| !h.is_empty())).then_some(url)
}

/// A temporary script that is deleted when dropped
struct ScriptFile {
    path: PathBuf,
}

impl ScriptFile {
    /// Write `contents` to the first free `{prefix}{n}.{ext}`, probing from 0
    fn create(config: &ScriptConfig, contents: &str) -> io::Result<Self> {
        let mut n = 0u32;
        loop {
            let path = config.script_path(n);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    // Own the path before writing so a failed write still cleans up
                    let script = Self { path };
                    write_script(file, contents)?;
                    return Ok(script);
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    n = n.checked_add(1).ok_or(err)?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

fn write_script(mut file: File, contents: &str) -> io::Result<()> {
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

impl Drop for ScriptFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Failed to delete command script");
            }
        }
    }
}
