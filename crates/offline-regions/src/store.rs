//! Region store: the whole region collection under one storage key
//!
//! Every mutation reads the full collection, edits it and writes it back.
//! Mutations on one handle are serialised through an async mutex, so
//! overlapping `save`/`delete` calls cannot lose each other's updates.
//! Reads fail open: a missing, unreadable or corrupt collection is empty.
//!
//! Decoding is per entry. A region another writer stored in a shape this
//! crate cannot decode is hidden from reads but written back unchanged, so
//! one odd record never costs the rest of the collection.

use crate::medium::{KeyValueMedium, MediumError};
use crate::{OfflineMapRegion, RegionSummary, StorageWriteError, DEFAULT_STORAGE_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Why a stored collection could not be read. Never leaves this module.
#[derive(Error, Debug)]
enum StorageReadError {
    #[error("medium read failed: {0}")]
    Medium(#[from] MediumError),
    #[error("stored collection is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One element of the stored array
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum StoredEntry {
    Region(OfflineMapRegion),
    /// Kept verbatim; not visible through reads
    Raw(Value),
}

impl StoredEntry {
    fn decode(item: Value) -> Self {
        match OfflineMapRegion::deserialize(&item) {
            Ok(region) => Self::Region(region),
            Err(e) => {
                warn!(
                    "Keeping undecodable region {} as stored: {}",
                    item.get("id").unwrap_or(&serde_json::Value::Null),
                    e
                );
                Self::Raw(item)
            }
        }
    }

    fn id(&self) -> Option<&str> {
        match self {
            Self::Region(r) => Some(&r.id),
            Self::Raw(v) => v.get("id").and_then(Value::as_str),
        }
    }

    fn into_region(self) -> Option<OfflineMapRegion> {
        match self {
            Self::Region(r) => Some(r),
            Self::Raw(_) => None,
        }
    }
}

pub struct RegionStore<M> {
    medium: M,
    key: String,
    write_lock: Mutex<()>,
}

impl<M: KeyValueMedium> RegionStore<M> {
    /// Store under the app's default key
    pub fn new(medium: M) -> Self {
        Self::with_key(medium, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(medium: M, key: impl Into<String>) -> Self {
        Self {
            medium,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    /// Insert `region`, replacing any stored region with the same id.
    pub async fn save(&self, region: OfflineMapRegion) -> Result<(), StorageWriteError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.load().await;
        let before = entries.len();
        entries.retain(|e| e.id() != Some(region.id.as_str()));
        let replaced = entries.len() != before;

        info!(
            "Saving region {} ({} threats, replaced={})",
            region.id,
            region.threats.len(),
            replaced
        );

        entries.push(StoredEntry::Region(region));
        self.persist(&entries).await
    }

    /// All stored regions in storage order. Empty rather than an error when
    /// the stored collection cannot be read.
    pub async fn list_all(&self) -> Vec<OfflineMapRegion> {
        self.load()
            .await
            .into_iter()
            .filter_map(StoredEntry::into_region)
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<OfflineMapRegion> {
        self.list_all().await.into_iter().find(|r| r.id == id)
    }

    /// Remove the region with `id`; absent ids are a no-op.
    pub async fn delete(&self, id: &str) -> Result<(), StorageWriteError> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.load().await;
        let before = entries.len();
        entries.retain(|e| e.id() != Some(id));

        if entries.len() == before {
            debug!("Delete of unknown region {} is a no-op", id);
        } else {
            info!("Deleted region {}", id);
        }

        self.persist(&entries).await
    }

    pub async fn summaries(&self) -> Vec<RegionSummary> {
        self.list_all()
            .await
            .iter()
            .map(OfflineMapRegion::summary)
            .collect()
    }

    async fn load(&self) -> Vec<StoredEntry> {
        match self.try_load().await {
            Ok(entries) => {
                debug!("Loaded {} regions from {}", entries.len(), self.key);
                entries
            }
            Err(e) => {
                warn!("Treating offline regions as empty: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_load(&self) -> Result<Vec<StoredEntry>, StorageReadError> {
        let Some(data) = self.medium.get_item(&self.key).await? else {
            return Ok(Vec::new());
        };

        let items: Vec<Value> = serde_json::from_str(&data)?;
        Ok(items.into_iter().map(StoredEntry::decode).collect())
    }

    async fn persist(&self, entries: &[StoredEntry]) -> Result<(), StorageWriteError> {
        let data = serde_json::to_string(entries)?;
        self.medium.set_item(&self.key, data).await?;
        Ok(())
    }
}
