//! Store configuration

use crate::retention::RetentionPolicy;
use crate::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key the region collection lives under (default: "@offline_maps")
    pub storage_key: String,
    /// Directory for the file-backed medium (default: ".offline-regions")
    pub data_dir: PathBuf,
    /// Optional capacity bound; `None` keeps every region
    pub max_regions: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            data_dir: PathBuf::from(".offline-regions"),
            max_regions: None,
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by `OFFLINE_REGIONS_DIR`, `OFFLINE_REGIONS_KEY`
    /// and `OFFLINE_REGIONS_MAX`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("OFFLINE_REGIONS_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(key) = lookup("OFFLINE_REGIONS_KEY") {
            config.storage_key = key;
        }
        if let Some(max) = lookup("OFFLINE_REGIONS_MAX") {
            match max.parse::<usize>() {
                Ok(n) if n > 0 => config.max_regions = Some(n),
                _ => warn!("Ignoring OFFLINE_REGIONS_MAX={:?}: expected a positive integer", max),
            }
        }

        config
    }

    pub fn retention(&self) -> Option<RetentionPolicy> {
        self.max_regions
            .map(|max_regions| RetentionPolicy { max_regions })
    }
}
