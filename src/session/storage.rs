//! Durable string-keyed storage for the authenticated identity.
//!
//! Two implementations: [`MemoryStorage`] (ephemeral, used by tests and
//! embedders that persist elsewhere) and [`FileStorage`], one file per key in a
//! state directory. Writes go to a temporary file first and are renamed into
//! place so a crash never leaves a half-written entry. On unix the state
//! directory is created owner-only (`0700`) and entries are `0600`: the session id is a
//! bearer credential.

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage key {key:?} is not a valid entry name")]
    InvalidKey { key: String },
    #[error("failed to encode storage entry {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to access storage entry {key:?}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// Key/value persistence with the semantics of browser local storage.
pub trait DurableStorage: Send + Sync {
    /// Reads an entry; `Ok(None)` when it does not exist.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Creates or replaces an entry.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes an entry; removing a missing entry is not an error.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per entry under `dir`.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(self.dir.join(format!("{key}.json")))
        } else {
            Err(StorageError::InvalidKey {
                key: key.to_string(),
            })
        }
    }
}

fn io_error(key: &str) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        key: key.to_string(),
        source,
    }
}

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn create_private_file(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_MODE)
        .open(path)?;
    // a stale temp file keeps its old mode
    file.set_permissions(fs::Permissions::from_mode(FILE_MODE))?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_private_file(path: &Path) -> io::Result<File> {
    File::create(path)
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(key)(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;
        create_private_dir(&self.dir).map_err(io_error(key))?;

        let tmp = path.with_extension("json.tmp");
        let mut file = create_private_file(&tmp).map_err(io_error(key))?;
        file.write_all(value.as_bytes()).map_err(io_error(key))?;
        file.sync_all().map_err(io_error(key))?;
        drop(file);
        fs::rename(&tmp, &path).map_err(io_error(key))?;

        debug!(path = %path.display(), "storage entry written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(key)(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("auth_user").unwrap(), None);

        storage.set("auth_user", "{}").unwrap();
        assert_eq!(storage.get("auth_user").unwrap().as_deref(), Some("{}"));
        assert_eq!(storage.len(), 1);

        storage.remove("auth_user").unwrap();
        storage.remove("auth_user").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn file_storage_creates_directory_and_replaces_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state"));

        storage.set("auth_session", r#"{"id":"a"}"#).unwrap();
        storage.set("auth_session", r#"{"id":"b"}"#).unwrap();

        assert_eq!(
            storage.get("auth_session").unwrap().as_deref(),
            Some(r#"{"id":"b"}"#)
        );
        assert!(dir.path().join("state/auth_session.json").exists());
        assert!(!dir.path().join("state/auth_session.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_storage_keeps_entries_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state");
        let storage = FileStorage::new(&state);

        storage.set("auth_session", r#"{"id":"s-1"}"#).unwrap();

        let file_mode = fs::metadata(state.join("auth_session.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o077, 0, "session file mode {file_mode:o}");

        let dir_mode = fs::metadata(&state).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o077, 0, "state dir mode {dir_mode:o}");
    }

    #[test]
    fn file_storage_missing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert_eq!(storage.get("auth_user").unwrap(), None);
        storage.remove("auth_user").unwrap();
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert!(matches!(
            storage.set("../escape", "x"),
            Err(StorageError::InvalidKey { .. })
        ));
        assert!(storage.get("").is_err());
    }
}
