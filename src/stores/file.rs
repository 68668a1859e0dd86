//! Directory-backed storage. Each key maps to `<dir>/<key>.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::Storage;
use crate::StorageError;

pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates the directory if it does not exist yet.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() || key == "." || key.contains("..") || key.contains(['/', '\\']) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        // Write-then-rename so a crash never leaves a half-written record
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> FileStorage {
        let dir = std::env::temp_dir().join(format!("gametrust-test-{}", uuid::Uuid::new_v4()));
        FileStorage::open(dir).unwrap()
    }

    #[test]
    fn test_open_creates_directory() {
        let storage = temp_storage();
        assert!(storage.dir().is_dir());
        fs::remove_dir_all(storage.dir()).unwrap();
    }

    #[test]
    fn test_set_get_remove() {
        let storage = temp_storage();
        assert_eq!(storage.get("escrow").unwrap(), None);

        storage.set("escrow", r#"{"a":1}"#).unwrap();
        assert_eq!(storage.get("escrow").unwrap().as_deref(), Some(r#"{"a":1}"#));
        assert!(storage.dir().join("escrow.json").is_file());

        storage.remove("escrow").unwrap();
        assert_eq!(storage.get("escrow").unwrap(), None);
        // Second remove is a no-op
        storage.remove("escrow").unwrap();

        fs::remove_dir_all(storage.dir()).unwrap();
    }

    #[test]
    fn test_values_survive_reopen() {
        let storage = temp_storage();
        storage.set("escrow", "persisted").unwrap();

        let reopened = FileStorage::open(storage.dir()).unwrap();
        assert_eq!(reopened.get("escrow").unwrap().as_deref(), Some("persisted"));

        fs::remove_dir_all(storage.dir()).unwrap();
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let storage = temp_storage();
        for key in ["", ".", "../escrow", "a/b", "a\\b"] {
            assert_eq!(
                storage.set(key, "v"),
                Err(StorageError::InvalidKey(key.to_string()))
            );
        }
        fs::remove_dir_all(storage.dir()).unwrap();
    }
}
