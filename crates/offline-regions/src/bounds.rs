//! Rectangular containment and the bounds filter
//!
//! Bounds are plain lat/lng rectangles. There is no antimeridian or pole
//! handling: a rectangle with `west > east` contains nothing, and a
//! viewport near a pole yields latitudes outside [-90, 90] unchanged.

use crate::{GeoBounds, Threat, Viewport};

/// Viewer zoom-out factor applied to a region's span when it is reopened
pub const DISPLAY_PADDING: f64 = 1.2;

impl GeoBounds {
    /// Rectangle covering a viewport: half the span on either side of the
    /// center on each axis.
    pub fn from_viewport(viewport: &Viewport) -> Self {
        let half_lat = viewport.latitude_delta / 2.0;
        let half_lng = viewport.longitude_delta / 2.0;

        Self {
            north: viewport.center.latitude + half_lat,
            south: viewport.center.latitude - half_lat,
            east: viewport.center.longitude + half_lng,
            west: viewport.center.longitude - half_lng,
        }
    }

    /// Inclusive on every edge
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.south && lat <= self.north && lng >= self.west && lng <= self.east
    }

    /// Span to open a saved region with, as (latitude_delta, longitude_delta)
    pub fn display_span(&self) -> (f64, f64) {
        (
            (self.north - self.south).abs() * DISPLAY_PADDING,
            (self.east - self.west).abs() * DISPLAY_PADDING,
        )
    }
}

/// Threats whose coordinate lies inside `bounds`, in input order.
///
/// Returns owned copies so the result can be stored as a snapshot.
pub fn filter_in_bounds(threats: &[Threat], bounds: &GeoBounds) -> Vec<Threat> {
    threats
        .iter()
        .filter(|t| bounds.contains(t.lat, t.lng))
        .cloned()
        .collect()
}
