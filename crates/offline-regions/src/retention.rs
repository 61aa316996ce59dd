//! Optional capacity bound over the region store
//!
//! [`RegionStore::save`] never evicts. Callers that want a bounded cache wrap
//! the store in a [`BoundedRegionStore`], which trims the oldest captures
//! after each successful save.

use crate::medium::KeyValueMedium;
use crate::store::RegionStore;
use crate::{OfflineMapRegion, StorageWriteError};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Most regions to keep; the most recently saved one is never evicted
    pub max_regions: usize,
}

pub struct BoundedRegionStore<'a, M> {
    store: &'a RegionStore<M>,
    policy: RetentionPolicy,
}

impl<'a, M: KeyValueMedium> BoundedRegionStore<'a, M> {
    pub fn new(store: &'a RegionStore<M>, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    /// Save, then delete the oldest regions by `downloadedAt` beyond the
    /// limit. Returns the ids evicted.
    pub async fn save(
        &self,
        region: OfflineMapRegion,
    ) -> Result<Vec<String>, StorageWriteError> {
        let keep_id = region.id.clone();
        self.store.save(region).await?;
        self.enforce(&keep_id).await
    }

    /// Trim the store to the limit without saving anything, sparing
    /// `keep_id`. Returns the ids evicted.
    pub async fn enforce(&self, keep_id: &str) -> Result<Vec<String>, StorageWriteError> {
        let evicted = eviction_candidates(&self.store.list_all().await, keep_id, self.policy);
        for id in &evicted {
            self.store.delete(id).await?;
        }

        if !evicted.is_empty() {
            info!(
                "Evicted {} regions over limit of {}",
                evicted.len(),
                self.policy.max_regions
            );
        }

        Ok(evicted)
    }
}

/// Ids to remove so at most `max_regions` remain, oldest first.
///
/// Unparseable capture times sort as oldest. `keep_id` is never chosen.
fn eviction_candidates(
    regions: &[OfflineMapRegion],
    keep_id: &str,
    policy: RetentionPolicy,
) -> Vec<String> {
    let max = policy.max_regions.max(1);
    if regions.len() <= max {
        return Vec::new();
    }

    let mut by_age: Vec<&OfflineMapRegion> =
        regions.iter().filter(|r| r.id != keep_id).collect();
    by_age.sort_by_key(|r| r.downloaded_at_utc());

    by_age
        .into_iter()
        .take(regions.len() - max)
        .map(|r| r.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::MemoryMedium;
    use crate::{GeoBounds, GeoPoint};

    fn region(id: &str, downloaded_at: &str) -> OfflineMapRegion {
        OfflineMapRegion {
            id: id.to_string(),
            name: id.to_string(),
            bounds: GeoBounds {
                north: 1.0,
                south: 0.0,
                east: 1.0,
                west: 0.0,
            },
            center: GeoPoint::new(0.5, 0.5),
            threats: Vec::new(),
            downloaded_at: downloaded_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_evicts_oldest_over_limit() {
        let store = RegionStore::new(MemoryMedium::new());
        let bounded = BoundedRegionStore::new(&store, RetentionPolicy { max_regions: 2 });

        bounded.save(region("b", "2024-02-01T00:00:00Z")).await.unwrap();
        bounded.save(region("a", "2024-01-01T00:00:00Z")).await.unwrap();
        let evicted = bounded
            .save(region("c", "2024-03-01T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(evicted, vec!["a".to_string()]);
        let ids: Vec<_> = store.list_all().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_newest_save_is_kept_even_if_dated_oldest() {
        let store = RegionStore::new(MemoryMedium::new());
        let bounded = BoundedRegionStore::new(&store, RetentionPolicy { max_regions: 1 });

        bounded.save(region("new", "2024-05-01T00:00:00Z")).await.unwrap();
        let evicted = bounded
            .save(region("backfill", "2020-01-01T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(evicted, vec!["new".to_string()]);
        assert!(store.get("backfill").await.is_some());
    }

    #[test]
    fn test_unparseable_dates_go_first() {
        let regions = vec![
            region("dated", "2024-01-01T00:00:00Z"),
            region("garbled", "last tuesday"),
            region("kept", "2024-02-01T00:00:00Z"),
        ];

        let ids = eviction_candidates(&regions, "kept", RetentionPolicy { max_regions: 2 });
        assert_eq!(ids, vec!["garbled".to_string()]);
    }

    #[test]
    fn test_under_limit_evicts_nothing() {
        let regions = vec![region("a", "2024-01-01T00:00:00Z")];
        assert!(eviction_candidates(&regions, "a", RetentionPolicy { max_regions: 5 }).is_empty());
    }
}
