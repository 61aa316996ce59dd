//! Key-value persistence media
//!
//! The region store only needs two async string operations. Tests use
//! [`MemoryMedium`]; the CLI uses [`FileMedium`], which keeps one JSON file
//! per key under a data directory.

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Error, Debug)]
pub enum MediumError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("quota exceeded: {needed} bytes requested, limit is {limit}")]
    QuotaExceeded { needed: usize, limit: usize },
}

/// Async string storage addressed by key
pub trait KeyValueMedium: Send + Sync {
    /// `Ok(None)` when nothing has been stored under `key`.
    fn get_item(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, MediumError>> + Send;

    /// Replaces any previous value under `key`.
    fn set_item(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), MediumError>> + Send;
}

/// In-process medium with an optional per-value byte quota
#[derive(Debug, Default)]
pub struct MemoryMedium {
    items: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes whose value is longer than `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            quota_bytes: Some(bytes),
        }
    }

    /// Store `value` directly, bypassing the quota. Used to seed fixtures.
    pub async fn insert_raw(&self, key: &str, value: impl Into<String>) {
        self.items
            .write()
            .await
            .insert(key.to_string(), value.into());
    }
}

impl KeyValueMedium for MemoryMedium {
    async fn get_item(&self, key: &str) -> Result<Option<String>, MediumError> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), MediumError> {
        if let Some(limit) = self.quota_bytes {
            if value.len() > limit {
                return Err(MediumError::QuotaExceeded {
                    needed: value.len(),
                    limit,
                });
            }
        }

        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// One `<key>.json` file per key under `dir`
#[derive(Debug, Clone)]
pub struct FileMedium {
    dir: PathBuf,
}

impl FileMedium {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. ASCII letters, digits, dash and underscore are
    /// kept; every other byte becomes `%XX`, so "@offline_maps" maps to
    /// "%40offline_maps.json". Distinct keys always get distinct files.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut stem = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                stem.push(char::from(byte));
            } else {
                stem.push_str(&format!("%{byte:02X}"));
            }
        }
        self.dir.join(format!("{stem}.json"))
    }
}

impl KeyValueMedium for FileMedium {
    async fn get_item(&self, key: &str) -> Result<Option<String>, MediumError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), MediumError> {
        let path = self.path_for(key);
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write beside the target and rename over it so readers never see a
        // partially written collection.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("Wrote {} bytes to {:?}", value.len(), path);
        Ok(())
    }
}
