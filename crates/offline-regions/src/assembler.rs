//! Capture of the visible map area into a stored region

use crate::bounds::filter_in_bounds;
use crate::medium::KeyValueMedium;
use crate::store::RegionStore;
use crate::{GeoBounds, OfflineMapRegion, Result, Threat, Viewport};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::info;
use uuid::Uuid;

/// Supplier of the current full threat set
pub trait ThreatSource: Send + Sync {
    fn fetch_threats(&self) -> impl Future<Output = Result<Vec<Threat>>> + Send;
}

/// Supplier of the map's visible area
pub trait ViewportProvider {
    fn current_viewport(&self) -> Viewport;
}

impl ViewportProvider for Viewport {
    fn current_viewport(&self) -> Viewport {
        *self
    }
}

/// What was captured, for user confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureReport {
    pub region_id: String,
    pub name: String,
    pub threat_count: usize,
}

pub struct RegionAssembler<'a, M> {
    store: &'a RegionStore<M>,
}

impl<'a, M: KeyValueMedium> RegionAssembler<'a, M> {
    pub fn new(store: &'a RegionStore<M>) -> Self {
        Self { store }
    }

    /// Snapshot the threats inside `viewport` and save them as a new region.
    ///
    /// `name` defaults to "Map <capture date>". An empty capture is still
    /// saved. Nothing is reported unless the save succeeded.
    pub async fn capture(
        &self,
        viewport: &Viewport,
        threats: &[Threat],
        name: Option<String>,
    ) -> Result<CaptureReport> {
        let region = build_region(viewport, threats, name, Utc::now());
        let report = CaptureReport {
            region_id: region.id.clone(),
            name: region.name.clone(),
            threat_count: region.threats.len(),
        };

        self.store.save(region).await?;

        info!(
            "Captured region {} with {} of {} threats",
            report.region_id,
            report.threat_count,
            threats.len()
        );

        Ok(report)
    }

    /// Pull the viewport and the live threat set from their collaborators,
    /// then capture.
    pub async fn capture_from<S, V>(
        &self,
        source: &S,
        viewport: &V,
        name: Option<String>,
    ) -> Result<CaptureReport>
    where
        S: ThreatSource,
        V: ViewportProvider,
    {
        let viewport = viewport.current_viewport();
        let threats = source.fetch_threats().await?;
        self.capture(&viewport, &threats, name).await
    }
}

/// Region for `viewport` as of `now`, with a fresh id
pub fn build_region(
    viewport: &Viewport,
    threats: &[Threat],
    name: Option<String>,
    now: DateTime<Utc>,
) -> OfflineMapRegion {
    let bounds = GeoBounds::from_viewport(viewport);

    OfflineMapRegion {
        id: Uuid::new_v4().to_string(),
        name: name.unwrap_or_else(|| default_region_name(now)),
        bounds,
        center: viewport.center,
        threats: filter_in_bounds(threats, &bounds),
        downloaded_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

pub fn default_region_name(now: DateTime<Utc>) -> String {
    format!("Map {}", now.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::MemoryMedium;
    use crate::{GeoPoint, RegionError, StorageWriteError, ThreatId};

    struct FixedSource(Vec<Threat>);

    impl ThreatSource for FixedSource {
        async fn fetch_threats(&self) -> Result<Vec<Threat>> {
            Ok(self.0.clone())
        }
    }

    fn viewport() -> Viewport {
        Viewport {
            center: GeoPoint::new(31.5, 34.4),
            latitude_delta: 0.2,
            longitude_delta: 0.2,
        }
    }

    fn threats() -> Vec<Threat> {
        vec![
            Threat::new(ThreatId::Int(1), 31.55, 34.45, "high", "airstrike"),
            Threat::new(ThreatId::Int(2), 32.5, 34.4, "medium", "shelling"),
            Threat::new(ThreatId::Int(3), 31.41, 34.31, "low", "checkpoint"),
        ]
    }

    #[test]
    fn test_build_region() {
        let now = DateTime::parse_from_rfc3339("2024-06-10T09:13:20Z")
            .unwrap()
            .with_timezone(&Utc);

        let region = build_region(&viewport(), &threats(), None, now);

        assert_eq!(region.name, "Map 2024-06-10");
        assert_eq!(region.downloaded_at, "2024-06-10T09:13:20.000Z");
        assert_eq!(region.center, GeoPoint::new(31.5, 34.4));
        let ids: Vec<_> = region.threats.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![ThreatId::Int(1), ThreatId::Int(3)]);
        assert!(Uuid::parse_str(&region.id).is_ok());
    }

    #[tokio::test]
    async fn test_capture_saves_region() {
        let store = RegionStore::new(MemoryMedium::new());
        let assembler = RegionAssembler::new(&store);

        let report = assembler
            .capture(&viewport(), &threats(), Some("Home".to_string()))
            .await
            .unwrap();

        assert_eq!(report.threat_count, 2);
        assert_eq!(report.name, "Home");
        let saved = store.get(&report.region_id).await.unwrap();
        assert_eq!(saved.threats.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_capture_is_saved() {
        let store = RegionStore::new(MemoryMedium::new());
        let assembler = RegionAssembler::new(&store);

        let report = assembler.capture(&viewport(), &[], None).await.unwrap();

        assert_eq!(report.threat_count, 0);
        assert!(store.get(&report.region_id).await.is_some());
    }

    #[tokio::test]
    async fn test_each_capture_gets_new_id() {
        let store = RegionStore::new(MemoryMedium::new());
        let assembler = RegionAssembler::new(&store);

        let a = assembler.capture(&viewport(), &threats(), None).await.unwrap();
        let b = assembler.capture(&viewport(), &threats(), None).await.unwrap();

        assert_ne!(a.region_id, b.region_id);
        assert_eq!(store.list_all().await.len(), 2);
    }

    #[tokio::test]
    async fn test_capture_from_collaborators() {
        let store = RegionStore::new(MemoryMedium::new());
        let assembler = RegionAssembler::new(&store);

        let report = assembler
            .capture_from(&FixedSource(threats()), &viewport(), None)
            .await
            .unwrap();

        assert_eq!(report.threat_count, 2);
    }

    #[tokio::test]
    async fn test_failed_save_reports_error() {
        let store = RegionStore::new(MemoryMedium::with_quota(16));
        let assembler = RegionAssembler::new(&store);

        let err = assembler
            .capture(&viewport(), &threats(), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RegionError::StorageWrite(StorageWriteError::Medium(_))
        ));
        assert!(store.list_all().await.is_empty());
    }
}
