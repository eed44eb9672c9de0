//! Key-value port for state handed from one run (or screen) to the next.
//!
//! The session never touches storage directly; callers save and load a
//! [`Handoff`] through whichever [`KeyValueStore`] they inject.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Minimal string key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk. Every write rewrites the
/// whole file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Results carried between runs: the latest composite image, the garment
/// shown in it, and the latest generated video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handoff {
    pub result_image: Option<String>,
    pub garment_image: Option<String>,
    pub video_url: Option<String>,
}

const RESULT_KEY: &str = "tryon_result";
const GARMENT_KEY: &str = "tryon_garment_image";
const VIDEO_KEY: &str = "tryon_video_url";

fn scoped(namespace: &str, key: &str) -> String {
    format!("{namespace}:{key}")
}

impl Handoff {
    /// Write every field under `namespace`; `None` fields are removed.
    pub fn save(&self, store: &impl KeyValueStore, namespace: &str) -> Result<(), StoreError> {
        for (key, value) in [
            (RESULT_KEY, &self.result_image),
            (GARMENT_KEY, &self.garment_image),
            (VIDEO_KEY, &self.video_url),
        ] {
            let key = scoped(namespace, key);
            match value {
                Some(v) => store.set(&key, v)?,
                None => store.remove(&key)?,
            }
        }
        Ok(())
    }

    pub fn load(store: &impl KeyValueStore, namespace: &str) -> Result<Self, StoreError> {
        Ok(Self {
            result_image: store.get(&scoped(namespace, RESULT_KEY))?,
            garment_image: store.get(&scoped(namespace, GARMENT_KEY))?,
            video_url: store.get(&scoped(namespace, VIDEO_KEY))?,
        })
    }

    pub fn clear(store: &impl KeyValueStore, namespace: &str) -> Result<(), StoreError> {
        Self::default().save(store, namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn json_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/session.json");

        JsonFileStore::new(&path).set("a", "1").unwrap();
        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("a").unwrap().as_deref(), Some("1"));

        reopened.remove("a").unwrap();
        assert_eq!(JsonFileStore::new(&path).get("a").unwrap(), None);
    }

    #[test]
    fn json_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get("anything").unwrap(), None);
        store.remove("anything").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn json_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        let err = JsonFileStore::new(&path).get("k").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn handoff_is_namespaced() {
        let store = MemoryStore::new();
        let handoff = Handoff {
            result_image: Some("r.jpg".into()),
            garment_image: Some("g.jpg".into()),
            video_url: None,
        };
        handoff.save(&store, "user-1").unwrap();

        assert_eq!(Handoff::load(&store, "user-1").unwrap(), handoff);
        assert_eq!(Handoff::load(&store, "user-2").unwrap(), Handoff::default());
        assert_eq!(
            store.get("user-1:tryon_result").unwrap().as_deref(),
            Some("r.jpg")
        );

        Handoff::clear(&store, "user-1").unwrap();
        assert_eq!(Handoff::load(&store, "user-1").unwrap(), Handoff::default());
    }
}
