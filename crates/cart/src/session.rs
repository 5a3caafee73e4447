//! Per-session key/value storage.
//!
//! The merge protocol records that it has run in here so it never runs twice
//! for the same session.

#[cfg(test)]
#[path = "tests/session.rs"]
mod tests;

use std::collections::BTreeMap;
use std::io;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::RwLock;
use thiserror::Error as ThisError;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum SessionStoreError {
    #[error("session file {path} is not accessible: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Session-scoped string storage
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get a value, `None` if it was never set
    async fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError>;

    /// Set a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<(), SessionStoreError>;

    /// Delete a value; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> Result<(), SessionStoreError>;

    /// Check if a key has been set
    async fn exists(&self, key: &str) -> Result<bool, SessionStoreError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Session storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    data: RwLock<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SessionStoreError> {
        let _previous = self.data.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SessionStoreError> {
        let _previous = self.data.write().remove(key);
        Ok(())
    }
}

/// Session storage persisted as a JSON object in a single file.
///
/// A missing file reads as an empty session. Writes rewrite the whole file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: Utf8PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, SessionStoreError> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(SessionStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&content).map_err(|source| SessionStoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn store(&self, data: &BTreeMap<String, String>) -> Result<(), SessionStoreError> {
        let io_error = |source| SessionStoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(io_error)?;
            }
        }

        let content =
            serde_json::to_vec_pretty(data).map_err(|source| SessionStoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        fs::write(&self.path, content).await.map_err(io_error)?;

        debug!(path = %self.path, entries = data.len(), "Session saved");

        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionStoreError> {
        let _guard = self.lock.lock().await;

        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SessionStoreError> {
        let _guard = self.lock.lock().await;

        let mut data = self.load().await?;
        let _previous = data.insert(key.to_owned(), value.to_owned());

        self.store(&data).await
    }

    async fn delete(&self, key: &str) -> Result<(), SessionStoreError> {
        let _guard = self.lock.lock().await;

        let mut data = self.load().await?;
        if data.remove(key).is_none() {
            return Ok(());
        }

        self.store(&data).await
    }
}
