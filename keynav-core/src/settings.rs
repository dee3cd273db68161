//! Key/value settings stores the action store persists into

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Settings key holding the persisted action list
pub const INTERNAL_ACTIONS_KEY: &str = "InternalActions";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("settings file {path} is not a JSON object of strings: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A string-valued key/value store with an explicit save step
///
/// `set` only changes the in-memory value; nothing is durable until `save`.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String);

    /// Make all pending changes durable
    fn save(&mut self) -> Result<(), SettingsError>;
}

/// In-memory settings, mostly for tests
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: BTreeMap<String, String>,
    saves: usize,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with one value already present
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut settings = Self::new();
        settings.values.insert(key.into(), value.into());
        settings
    }

    /// How many times `save` has been called
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<(), SettingsError> {
        self.saves += 1;
        Ok(())
    }
}

/// Settings kept as a flat JSON object of strings in a file
///
/// The file is read once on open and rewritten whole on every save.
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileSettings {
    /// Open a settings file; a missing file starts out empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| SettingsError::Json {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(&self.values).map_err(|source| {
            SettingsError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, text).map_err(io_err)?;
        tracing::debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_settings() {
        let mut settings = MemorySettings::with_value("a", "1");
        assert_eq!(settings.get("a").as_deref(), Some("1"));
        assert_eq!(settings.get("b"), None);

        settings.set("b", "2".into());
        settings.save().unwrap();
        assert_eq!(settings.get("b").as_deref(), Some("2"));
        assert_eq!(settings.save_count(), 1);
    }

    #[test]
    fn test_json_file_settings_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = JsonFileSettings::open(&path).unwrap();
        assert_eq!(settings.get(INTERNAL_ACTIONS_KEY), None);
        settings.set(INTERNAL_ACTIONS_KEY, "0abc|1def".into());
        settings.save().unwrap();

        let reopened = JsonFileSettings::open(&path).unwrap();
        assert_eq!(
            reopened.get(INTERNAL_ACTIONS_KEY).as_deref(),
            Some("0abc|1def")
        );
    }

    #[test]
    fn test_json_file_settings_unsaved_changes_are_not_durable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = JsonFileSettings::open(&path).unwrap();
        settings.set("k", "v".into());

        let reopened = JsonFileSettings::open(&path).unwrap();
        assert_eq!(reopened.get("k"), None);
    }

    #[test]
    fn test_json_file_settings_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = JsonFileSettings::open(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Json { .. }));
    }
}
