//! Spatial bucketing of clicks into nine screen regions

use crate::tracker::types::{HeatmapZone, ZoneCount};
use serde::{Deserialize, Serialize};

/// Percentage below which a coordinate falls in the first third
const LOW_BAND_PCT: f64 = 33.0;

/// Percentage at or above which a coordinate falls in the last third
const HIGH_BAND_PCT: f64 = 66.0;

#[derive(Clone, Copy)]
enum Band {
    Low,
    Mid,
    High,
}

fn band(pct: f64) -> Band {
    if pct < LOW_BAND_PCT {
        Band::Low
    } else if pct >= HIGH_BAND_PCT {
        Band::High
    } else {
        Band::Mid
    }
}

/// Map a viewport coordinate to its zone.
///
/// A degenerate viewport (zero or NaN dimension) yields a NaN percentage, which
/// lands in the middle band.
pub fn zone_for(x: f64, y: f64, viewport_width: f64, viewport_height: f64) -> HeatmapZone {
    let x_pct = 100.0 * x / viewport_width;
    let y_pct = 100.0 * y / viewport_height;

    match (band(y_pct), band(x_pct)) {
        (Band::Low, Band::Low) => HeatmapZone::TopLeft,
        (Band::Low, Band::Mid) => HeatmapZone::TopCenter,
        (Band::Low, Band::High) => HeatmapZone::TopRight,
        (Band::Mid, Band::Low) => HeatmapZone::MiddleLeft,
        (Band::Mid, Band::Mid) => HeatmapZone::MiddleCenter,
        (Band::Mid, Band::High) => HeatmapZone::MiddleRight,
        (Band::High, Band::Low) => HeatmapZone::BottomLeft,
        (Band::High, Band::Mid) => HeatmapZone::BottomCenter,
        (Band::High, Band::High) => HeatmapZone::BottomRight,
    }
}

/// Running per-zone click counts, kept sorted by descending count.
///
/// Zones appear in the order they were first hit; the stable sort keeps that
/// order among equal counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialBucketer {
    zones: Vec<ZoneCount>,
}

impl SpatialBucketer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a click and return the zone it fell in
    pub fn record(
        &mut self,
        x: f64,
        y: f64,
        viewport_width: f64,
        viewport_height: f64,
    ) -> HeatmapZone {
        let zone = zone_for(x, y, viewport_width, viewport_height);

        match self.zones.iter_mut().find(|z| z.zone == zone) {
            Some(entry) => entry.count += 1,
            None => self.zones.push(ZoneCount { zone, count: 1 }),
        }

        // Vec::sort_by is stable
        self.zones.sort_by(|a, b| b.count.cmp(&a.count));
        zone
    }

    /// Zones sorted by descending count
    pub fn zones(&self) -> &[ZoneCount] {
        &self.zones
    }

    /// Count for a single zone (0 if never hit)
    pub fn count(&self, zone: HeatmapZone) -> u32 {
        self.zones
            .iter()
            .find(|z| z.zone == zone)
            .map(|z| z.count)
            .unwrap_or(0)
    }

    /// Sum of all zone counts
    pub fn total(&self) -> u32 {
        self.zones.iter().map(|z| z.count).sum()
    }

    pub fn clear(&mut self) {
        self.zones.clear();
    }
}
