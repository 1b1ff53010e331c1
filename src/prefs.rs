//! Persisted UI preferences.
//!
//! The browser build remembers filter/sort choices in local storage; this is
//! the same contract behind a trait. Nothing in the sync core depends on it
//! for correctness, so every failure path degrades to defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// In-memory store; the default for tests and headless use.
#[derive(Default)]
pub struct MemoryPrefs {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPrefs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPrefs {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .expect("preference map poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .expect("preference map poisoned")
            .insert(key.to_string(), value.to_string());
    }
}

/// JSON-file-backed store for desktop builds. Loads once at construction;
/// every `set` rewrites the file best-effort.
pub struct FilePrefs {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FilePrefs {
    /// Read preferences from `path`. A missing or unreadable file starts
    /// empty; a corrupt file is logged and discarded rather than surfaced.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "corrupt preference file; starting empty"
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn persist(&self, values: &HashMap<String, String>) {
        let raw = match serde_json::to_string_pretty(values) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize preferences");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&self.path, raw) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write preferences");
        }
    }
}

impl PreferenceStore for FilePrefs {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .expect("preference map poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values.lock().expect("preference map poisoned");
        values.insert(key.to_string(), value.to_string());
        self.persist(&values);
    }
}
