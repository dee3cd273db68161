//! Runtime configuration

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::CapabilityFlags;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level configuration, usually loaded from a JSON file
///
/// Every field has a default, so a partial (or missing) file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the settings store lives
    pub settings_path: PathBuf,
    /// Read-only, policy-provisioned actions in persisted form
    pub embedded_actions: String,
    /// Capability flag vector gating which kinds are visible
    pub capabilities: CapabilityFlags,
    /// How Cmd actions materialize their scripts
    pub script: ScriptConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            embedded_actions: String::new(),
            capabilities: CapabilityFlags::default(),
            script: ScriptConfig::default(),
        }
    }
}

impl Config {
    /// Load a config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Default location of the config file itself
    pub fn default_path() -> PathBuf {
        config_dir().join("config.json")
    }
}

/// Where and how temporary scripts for Cmd actions are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Directory for the scripts; the system temp dir when unset
    pub temp_dir: Option<PathBuf>,
    /// File name prefix, followed by a probe number
    pub prefix: String,
    /// File extension, without the dot
    pub extension: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            prefix: "KeyNav_CMD_".to_string(),
            extension: if cfg!(windows) { "bat" } else { "sh" }.to_string(),
        }
    }
}

impl ScriptConfig {
    pub fn dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Path of the script with probe number `n`
    pub fn script_path(&self, n: u32) -> PathBuf {
        self.dir()
            .join(format!("{}{}.{}", self.prefix, n, self.extension))
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keynav")
}

fn default_settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.settings_path.ends_with("settings.json"));
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "capabilities": [true, true, true, false, true, true],
                 "script": { "prefix": "test_" } }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.capabilities.can_view(crate::ActionKind::Cmd));
        assert_eq!(config.script.prefix, "test_");
        assert_eq!(config.script.extension, ScriptConfig::default().extension);
        assert!(config.embedded_actions.is_empty());
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_script_path() {
        let script = ScriptConfig {
            temp_dir: Some(PathBuf::from("/tmp/kn")),
            prefix: "KeyNav_CMD_".into(),
            extension: "bat".into(),
        };
        assert_eq!(script.script_path(3), PathBuf::from("/tmp/kn/KeyNav_CMD_3.bat"));
    }
}
