//! TOML-file-backed parameter store
//!
//! Parameters persist as a flat TOML table of string values. The file is
//! loaded once at startup; every accepted write goes back to disk before the
//! change is announced, so a restart always sees the latest values.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

use super::ParamStore;

/// Parameter store persisted as a TOML table of `key = "value"` pairs.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Load the store from `path`. A missing file is an empty store, so a
    /// factory-fresh device starts with every switch reading as no.
    pub fn load(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read parameter file {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("failed to parse parameter file {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        })
    }

    /// Update one parameter and persist the whole table.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let snapshot = {
            let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
            values.insert(key.to_string(), value.to_string());
            values.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create parameter directory {}", parent.display())
            })?;
        }
        let raw = toml::to_string(values).context("failed to serialize parameters")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write parameter file {}", self.path.display()))
    }
}

impl ParamStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_as_empty_store() {
        let dir = tempdir().unwrap();
        let store = FileStore::load(&dir.path().join("parameters.toml")).unwrap();
        assert_eq!(store.get("UseTLS"), None);
        assert!(!store.is_yes("UseTLS"));
    }

    #[test]
    fn set_persists_across_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("localdata/parameters.toml");

        let store = FileStore::load(&path).unwrap();
        store.set("UseTLS", "yes").unwrap();
        store.set("IPCSocket", "no").unwrap();

        let reloaded = FileStore::load(&path).unwrap();
        assert!(reloaded.is_yes("UseTLS"));
        assert_eq!(reloaded.get("IPCSocket").as_deref(), Some("no"));
    }

    #[test]
    fn malformed_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("parameters.toml");
        fs::write(&path, "UseTLS = [broken").unwrap();
        assert!(FileStore::load(&path).is_err());
    }
}
