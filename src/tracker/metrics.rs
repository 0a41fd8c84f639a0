//! Session metrics derivation
//!
//! Metrics are never stored: they are a pure function of the buffered events,
//! recomputed on every read. The click heatmap is rebuilt from the buffered
//! clicks, so every field survives reconstruction after eviction.

use crate::tracker::buffer::EventBuffer;
use crate::tracker::heatmap::SpatialBucketer;
use crate::tracker::types::{ClickEvent, Metrics, PageVisit, ScrollSample};

/// Borrowed view of the state metrics are derived from
pub struct MetricsInput<'a> {
    pub clicks: &'a EventBuffer<ClickEvent>,
    pub scroll_samples: &'a EventBuffer<ScrollSample>,
    pub completed_visits: &'a EventBuffer<PageVisit>,
    pub open_visit: Option<&'a PageVisit>,
}

/// Metrics deriver for a session record
pub struct MetricsDeriver;

impl MetricsDeriver {
    /// Derive metrics from the current session state
    pub fn derive(input: MetricsInput<'_>) -> Metrics {
        let samples: Vec<&ScrollSample> = input.scroll_samples.iter().collect();
        let heatmap = compute_heatmap(input.clicks);

        Metrics {
            total_clicks: heatmap.total(),
            total_scroll_distance: compute_scroll_distance(&samples),
            max_scroll_depth: compute_max_depth(&samples),
            average_visit_duration_ms: compute_average_visit_duration(input.completed_visits),
            heatmap_zones: heatmap.zones().to_vec(),
            navigation_path: compute_navigation_path(input.completed_visits, input.open_visit),
        }
    }
}

/// Bucket the buffered clicks in arrival order
fn compute_heatmap(clicks: &EventBuffer<ClickEvent>) -> SpatialBucketer {
    let mut heatmap = SpatialBucketer::new();
    for click in clicks.iter() {
        heatmap.record(click.x, click.y, click.viewport_width, click.viewport_height);
    }
    heatmap
}

/// Compute total scroll distance
///
/// Formula: `sum(|y[i] - y[i-1]|)` over consecutive samples
fn compute_scroll_distance(samples: &[&ScrollSample]) -> f64 {
    samples
        .windows(2)
        .map(|pair| (pair[1].scroll_y - pair[0].scroll_y).abs())
        .sum()
}

/// Deepest scroll depth observed, 0 without samples
fn compute_max_depth(samples: &[&ScrollSample]) -> f64 {
    samples.iter().map(|s| s.depth).fold(0.0, f64::max)
}

/// Mean duration of completed visits in milliseconds
fn compute_average_visit_duration(visits: &EventBuffer<PageVisit>) -> f64 {
    let durations: Vec<i64> = visits.iter().filter_map(|v| v.duration_ms).collect();
    if durations.is_empty() {
        return 0.0;
    }
    durations.iter().sum::<i64>() as f64 / durations.len() as f64
}

/// Visited paths oldest first, with consecutive repeats collapsed
/// (a hide/show cycle on the same page is not navigation).
fn compute_navigation_path(
    completed: &EventBuffer<PageVisit>,
    open: Option<&PageVisit>,
) -> Vec<String> {
    let mut path: Vec<String> = Vec::new();
    for visit in completed.iter().chain(open) {
        if path.last() != Some(&visit.path) {
            path.push(visit.path.clone());
        }
    }
    path
}
