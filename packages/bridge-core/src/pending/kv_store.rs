use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Mutex, MutexGuard},
};

use crate::{
    error::{BridgeError, BridgeResult},
    models::traits::KeyValueStore,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-process store, used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> BridgeResult<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// Single JSON document on disk holding every key. Writes go through a
/// temporary file and a rename so a crash never leaves a torn document.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            guard: Mutex::new(()),
        }
    }

    fn read_all(&self) -> BridgeResult<HashMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                BridgeError::Storage(format!("corrupt store {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(BridgeError::Storage(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> BridgeResult<()> {
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| BridgeError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BridgeError::Storage(e.to_string()))?;
        }
        std::fs::write(&tmp, contents).map_err(|e| BridgeError::Storage(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| BridgeError::Storage(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> BridgeResult<Option<String>> {
        let _guard = lock(&self.guard);
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
        let _guard = lock(&self.guard);
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> BridgeResult<()> {
        let _guard = lock(&self.guard);
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}
