//! Offline Map Region Cache
//!
//! Snapshots a rectangular map area together with the threats inside it so
//! the area can be viewed later without connectivity.
//!
//! # Data Flow
//!
//! ```text
//! capture:  live threats + viewport -> bounds filter -> OfflineMapRegion -> RegionStore
//! consume:  RegionStore -> summaries | single region (with threats) -> renderer
//! ```
//!
//! | Component | Module | State |
//! |-----------|--------|-------|
//! | Region Store | [`store`] | whole collection under one storage key |
//! | Bounds Filter | [`bounds`] | none (pure) |
//! | Region Assembler | [`assembler`] | none (calls the store) |
//! | Key-value medium | [`medium`] | memory or one JSON file per key |
//! | Threat feed | [`loader`] | none |
//! | Retention | [`retention`] | none (calls the store) |
//!
//! The persisted form is a single JSON array of regions whose field names
//! match the mobile app's `@offline_maps` collection byte for byte, so either
//! side can read what the other wrote.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod assembler;
pub mod bounds;
pub mod config;
pub mod display;
pub mod loader;
pub mod medium;
pub mod retention;
pub mod store;

pub use assembler::{CaptureReport, RegionAssembler, ThreatSource, ViewportProvider};
pub use bounds::filter_in_bounds;
pub use config::StoreConfig;
pub use display::{time_ago, Severity};
pub use medium::{FileMedium, KeyValueMedium, MediumError, MemoryMedium};
pub use retention::{BoundedRegionStore, RetentionPolicy};
pub use store::RegionStore;

/// Storage key used by the mobile app for the region collection
pub const DEFAULT_STORAGE_KEY: &str = "@offline_maps";

/// The region collection could not be persisted.
#[derive(Error, Debug)]
pub enum StorageWriteError {
    #[error("could not encode region collection: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage medium rejected write: {0}")]
    Medium(#[from] MediumError),
}

#[derive(Error, Debug)]
pub enum RegionError {
    #[error("failed to save map region: {0}")]
    StorageWrite(#[from] StorageWriteError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("threat feed is not a JSON array of threats")]
    NoThreats,
}

pub type Result<T> = std::result::Result<T, RegionError>;

/// Threat identifier as sent by the threat API: numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThreatId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for ThreatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// Severity label exactly as the threat API sent it.
///
/// The set of labels is open; use [`ThreatLevel::severity`] to classify.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreatLevel(pub String);

impl ThreatLevel {
    pub fn new(level: impl Into<String>) -> Self {
        Self(level.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn severity(&self) -> Severity {
        Severity::from_level(&self.0)
    }
}

/// A geotagged hazard record from the threat API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threat {
    pub id: ThreatId,
    pub lat: f64,
    pub lng: f64,
    pub threat_level: ThreatLevel,
    /// Category label, e.g. "airstrike"
    #[serde(rename = "type")]
    pub category: String,
    /// Report time as sent, normally an ISO-8601 string. `None` only when
    /// the key is absent; an explicit `null` is kept as `Value::Null`.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<serde_json::Value>,

    // Fields the API sends that this crate does not interpret. Kept so a
    // snapshot round-trips the record unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Threat {
    pub fn new(
        id: ThreatId,
        lat: f64,
        lng: f64,
        threat_level: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id,
            lat,
            lng,
            threat_level: ThreatLevel::new(threat_level),
            category: category.into(),
            timestamp: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(serde_json::Value::String(timestamp.into()));
        self
    }

    /// The report time when it was sent as a string
    pub fn timestamp_str(&self) -> Option<&str> {
        self.timestamp.as_ref().and_then(serde_json::Value::as_str)
    }
}

// Plain `Option` deserialisation folds `null` into `None`.
fn present_value<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Axis-aligned rectangle in degrees. `north >= south` is expected; bounds
/// crossing the antimeridian are not supported (see [`bounds`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Visible map area as reported by the map view: center plus full span on
/// each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub center: GeoPoint,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

/// A persisted, named snapshot of a map area and the threats inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineMapRegion {
    pub id: String,
    pub name: String,
    pub bounds: GeoBounds,
    /// Viewport center at capture time, not the geometric center of `bounds`
    pub center: GeoPoint,
    pub threats: Vec<Threat>,
    /// ISO-8601 capture time
    pub downloaded_at: String,
}

impl OfflineMapRegion {
    pub fn summary(&self) -> RegionSummary {
        RegionSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            threat_count: self.threats.len(),
            downloaded_at: self.downloaded_at.clone(),
        }
    }

    /// Capture time, if `downloaded_at` parses as RFC 3339.
    pub fn downloaded_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::parse_from_rfc3339(&self.downloaded_at)
            .ok()
            .map(|t| t.with_timezone(&chrono::Utc))
    }
}

/// List-row view of a region, without the embedded threats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    pub id: String,
    pub name: String,
    pub threat_count: usize,
    pub downloaded_at: String,
}
