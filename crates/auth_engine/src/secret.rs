use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use auth_logging::{auth_debug, auth_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{utc_now, Clock};
use crate::persist::{read_if_exists, AtomicFileWriter, PersistError};

/// Key under which the verified token is cached.
pub const API_KEY_SECRET: &str = "wanikani_api_key";
pub const SECRET_FILE_NAME: &str = "wanitabi_auth_prefs.ron";

#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
    #[error("secret file {path:?} is unreadable: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Local key-value store for credentials. Calls may block on disk I/O.
pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SecretStoreError>;
    fn put(&self, key: &str, value: &str) -> Result<(), SecretStoreError>;
    fn remove(&self, key: &str) -> Result<(), SecretStoreError>;
}

#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, SecretStoreError> {
        self.entries
            .lock()
            .map_err(|_| SecretStoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl SecretStore for InMemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretStoreError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), SecretStoreError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SecretStoreError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredSecret {
    value: String,
    stored_utc: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SecretFile {
    entries: BTreeMap<String, StoredSecret>,
}

/// Secret store backed by a single RON file written atomically.
///
/// The file is owner-readable only but not encrypted; hosts with a platform
/// keystore should implement [`SecretStore`] on top of it instead.
pub struct FileSecretStore {
    writer: AtomicFileWriter,
    clock: Clock,
    lock: Mutex<()>,
}

impl FileSecretStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
            clock: Arc::new(utc_now),
            lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> PathBuf {
        self.writer.dir().join(SECRET_FILE_NAME)
    }

    /// When `key` was last written, as reported by the store's clock.
    pub fn stored_at(&self, key: &str) -> Result<Option<String>, SecretStoreError> {
        let _guard = self.guard()?;
        Ok(self.load()?.entries.remove(key).map(|entry| entry.stored_utc))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, SecretStoreError> {
        self.lock
            .lock()
            .map_err(|_| SecretStoreError::Unavailable("lock poisoned".to_string()))
    }

    fn load(&self) -> Result<SecretFile, SecretStoreError> {
        let path = self.path();
        let Some(content) = read_if_exists(&path)? else {
            return Ok(SecretFile::default());
        };
        ron::from_str(&content).map_err(|err| SecretStoreError::Corrupt {
            path,
            message: err.to_string(),
        })
    }

    fn save(&self, file: &SecretFile) -> Result<(), SecretStoreError> {
        if file.entries.is_empty() {
            self.writer.remove(SECRET_FILE_NAME)?;
            return Ok(());
        }
        let content = ron::ser::to_string_pretty(file, ron::ser::PrettyConfig::new())
            .map_err(|err| SecretStoreError::Unavailable(err.to_string()))?;
        self.writer.write(SECRET_FILE_NAME, &content)?;
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretStoreError> {
        let _guard = self.guard()?;
        Ok(self.load()?.entries.remove(key).map(|entry| entry.value))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), SecretStoreError> {
        let _guard = self.guard()?;
        let mut file = match self.load() {
            Ok(file) => file,
            Err(SecretStoreError::Corrupt { path, message }) => {
                // The new value is authoritative; an unreadable file is replaced.
                auth_warn!("Replacing unreadable secret file {:?}: {}", path, message);
                SecretFile::default()
            }
            Err(err) => return Err(err),
        };
        file.entries.insert(
            key.to_string(),
            StoredSecret {
                value: value.to_string(),
                stored_utc: (self.clock)(),
            },
        );
        self.save(&file)?;
        auth_debug!("Stored secret {} in {:?}", key, self.path());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SecretStoreError> {
        let _guard = self.guard()?;
        let mut file = self.load()?;
        if file.entries.remove(key).is_some() {
            self.save(&file)?;
            auth_debug!("Removed secret {} from {:?}", key, self.path());
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSecretStore")
            .field("path", &self.path())
            .finish_non_exhaustive()
    }
}
