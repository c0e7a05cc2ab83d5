//! Property stores, that keep the state of the sync engine across invocations

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::BoxError;
use crate::traits::PropertyStore;

/// A property store that lives in memory. Its content is lost when it is dropped
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryPropertyStore {
    data: BTreeMap<String, Value>,
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropertyStore for MemoryPropertyStore {
    fn get(&self, key: &str) -> Result<Option<Value>, BoxError> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), BoxError> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), BoxError> {
        self.data.remove(key);
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>, BoxError> {
        Ok(self.data.keys().cloned().collect())
    }
}



/// A property store that is backed by a JSON file.
///
/// The whole file is read at creation, and written again after every change.
#[derive(Debug, PartialEq)]
pub struct FilePropertyStore {
    backing_file: PathBuf,
    data: BTreeMap<String, Value>,
}

impl FilePropertyStore {
    /// Open a store from its backing file. A missing file is an empty store
    pub fn from_file(path: &Path) -> Result<Self, BoxError> {
        let data = match std::fs::File::open(path) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No property file at {:?} yet, starting empty", path);
                BTreeMap::new()
            },
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(std::io::BufReader::new(file))
                .map_err(|err| format!("Unable to parse property file {:?}: {}", path, err))?,
        };

        Ok(Self {
            backing_file: PathBuf::from(path),
            data,
        })
    }

    pub fn backing_file(&self) -> &Path {
        &self.backing_file
    }

    /// Store the current content to the backing file
    fn save_to_file(&self) -> Result<(), BoxError> {
        let path = &self.backing_file;
        if let Some(parent) = path.parent() {
            if parent.as_os_str().is_empty() == false {
                std::fs::create_dir_all(parent)?;
            }
        }
        // Write to a sibling file first, so that a crash never leaves a truncated store behind
        let temp_path = path.with_extension("json.tmp");
        let file = std::fs::File::create(&temp_path)
            .map_err(|err| format!("Unable to save file {:?}: {}", temp_path, err))?;
        serde_json::to_writer_pretty(file, &self.data)?;
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }
}

impl PropertyStore for FilePropertyStore {
    fn get(&self, key: &str) -> Result<Option<Value>, BoxError> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), BoxError> {
        self.data.insert(key.to_string(), value);
        self.save_to_file()
    }

    fn delete(&mut self, key: &str) -> Result<(), BoxError> {
        if self.data.remove(key).is_some() {
            self.save_to_file()?;
        }
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>, BoxError> {
        Ok(self.data.keys().cloned().collect())
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("properties.json");

        let mut store = FilePropertyStore::from_file(&path).unwrap();
        assert!(store.list_keys().unwrap().is_empty());
        store.set("github_commit_changes_count", json!("2")).unwrap();
        store.set("other", json!([1, 2])).unwrap();
        store.delete("other").unwrap();

        let reopened = FilePropertyStore::from_file(&path).unwrap();
        assert_eq!(reopened, store);
        assert_eq!(reopened.get("github_commit_changes_count").unwrap(), Some(json!("2")));
        assert_eq!(reopened.get("other").unwrap(), None);
    }

    #[test]
    fn test_corrupted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("properties.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(FilePropertyStore::from_file(&path).is_err());
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryPropertyStore::new();
        store.set("b", json!(1)).unwrap();
        store.set("a", json!(null)).unwrap();
        assert_eq!(store.list_keys().unwrap(), vec!["a", "b"]);
        store.delete("missing").unwrap();
        assert_eq!(store.get("b").unwrap(), Some(json!(1)));
    }
}
