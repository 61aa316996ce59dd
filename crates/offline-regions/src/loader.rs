//! Threat feed loading from JSON documents
//!
//! Accepts the body of the threat API's `/threats` endpoint: a JSON array of
//! threat records.

use crate::assembler::ThreatSource;
use crate::{RegionError, Result, Threat};
use std::path::{Path, PathBuf};
use tracing::info;

/// Validate latitude is in valid range
fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && lat.is_finite()
}

/// Validate longitude is in valid range
fn is_valid_longitude(lon: f64) -> bool {
    (-180.0..=180.0).contains(&lon) && lon.is_finite()
}

/// Parse a threat feed, dropping records that are malformed or have
/// out-of-range coordinates.
pub fn parse_threats(json: &str) -> Result<Vec<Threat>> {
    let raw: serde_json::Value = serde_json::from_str(json)?;
    let serde_json::Value::Array(items) = raw else {
        return Err(RegionError::NoThreats);
    };

    let total = items.len();
    let threats: Vec<Threat> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Threat>(item).ok())
        .filter(|t| is_valid_latitude(t.lat) && is_valid_longitude(t.lng))
        .collect();

    info!(
        "Loaded {} threats ({} skipped as malformed or out of range)",
        threats.len(),
        total - threats.len()
    );

    Ok(threats)
}

/// Load a threat feed from a JSON file
pub async fn load_threats(path: impl AsRef<Path>) -> Result<Vec<Threat>> {
    let path = path.as_ref();
    info!("Loading threats from {:?}", path);

    let json = tokio::fs::read_to_string(path).await?;
    parse_threats(&json)
}

/// [`ThreatSource`] backed by a JSON file on disk
#[derive(Debug, Clone)]
pub struct JsonFileThreatSource {
    path: PathBuf,
}

impl JsonFileThreatSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ThreatSource for JsonFileThreatSource {
    async fn fetch_threats(&self) -> Result<Vec<Threat>> {
        load_threats(&self.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ThreatId;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_skips_bad_records() {
        let json = r#"[
            {"id": 1, "lat": 31.5, "lng": 34.4, "threatLevel": "high", "type": "airstrike"},
            {"id": 2, "lat": 95.0, "lng": 34.4, "threatLevel": "low", "type": "checkpoint"},
            {"id": 3, "name": "no coords"},
            {"id": "t-4", "lat": -33.9, "lng": 18.4, "threatLevel": "safe", "type": "shelter", "timestamp": "2024-01-01T00:00:00Z"}
        ]"#;

        let threats = parse_threats(json).unwrap();
        assert_eq!(threats.len(), 2);
        assert_eq!(threats[0].id, ThreatId::Int(1));
        assert_eq!(threats[1].id, ThreatId::Text("t-4".to_string()));
        assert_eq!(threats[1].timestamp_str(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        let err = parse_threats(r#"{"error": "Failed to fetch threats"}"#).unwrap_err();
        assert!(matches!(err, RegionError::NoThreats));
    }

    #[tokio::test]
    async fn test_file_source() {
        let json = r#"[{"id": 1, "lat": 40.0, "lng": -74.0, "threatLevel": "medium", "type": "unrest"}]"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let source = JsonFileThreatSource::new(file.path());
        let threats = source.fetch_threats().await.unwrap();
        assert_eq!(threats.len(), 1);
        assert_eq!(threats[0].category, "unrest");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = load_threats("/nonexistent/threats.json").await.unwrap_err();
        assert!(matches!(err, RegionError::Io(_)));
    }
}
