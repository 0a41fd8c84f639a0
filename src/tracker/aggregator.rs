//! Session behavior aggregator
//!
//! Owns one session record. Raw signals are routed through the sampling
//! policies into the per-category buffers; reads derive metrics (click
//! heatmap included) from those buffers on demand.
//!
//! The aggregator is an ordinary owned value: the host creates one per
//! tracking session and passes it by `&mut` to whatever forwards UI events.
//! All mutation goes through `&mut self`, so events are filed in call order.

use crate::clock::{elapsed_ms, Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::error::TelemetryError;
use crate::tracker::buffer::EventBuffer;
use crate::tracker::heatmap::zone_for;
use crate::tracker::metrics::{MetricsDeriver, MetricsInput};
use crate::tracker::sampler::{HoverTracker, PageVisitTracker, ScrollDebouncer};
use crate::tracker::types::{
    ClickEvent, CompactSummary, ElementInteraction, HoverEvent, InteractionKind, Metrics,
    PageLocation, PageVisit, ScrollSample, SessionRecord, Signal, TargetDescriptor,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

/// Behavior tracker for a single session
#[derive(Debug)]
pub struct BehaviorAggregator<C: Clock = SystemClock> {
    config: TrackerConfig,
    clock: C,
    session_id: String,
    user_id: String,
    started: bool,
    start_time: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    stopped_at: Option<DateTime<Utc>>,

    clicks: EventBuffer<ClickEvent>,
    scroll_samples: EventBuffer<ScrollSample>,
    hovers: EventBuffer<HoverEvent>,
    page_visits: EventBuffer<PageVisit>,
    interactions: EventBuffer<ElementInteraction>,

    scroll: ScrollDebouncer,
    hover: HoverTracker,
    pages: PageVisitTracker,
}

impl BehaviorAggregator<SystemClock> {
    /// Create a tracker on the wall clock with a fresh session id
    pub fn new(user_id: impl Into<String>, config: TrackerConfig) -> Result<Self, TelemetryError> {
        Self::with_clock(user_id, config, SystemClock)
    }
}

impl<C: Clock> BehaviorAggregator<C> {
    /// Create a tracker driven by `clock`
    pub fn with_clock(
        user_id: impl Into<String>,
        config: TrackerConfig,
        clock: C,
    ) -> Result<Self, TelemetryError> {
        config.validate()?;
        let now = clock.now();
        let capacity = config.buffer_capacity;

        Ok(Self {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            started: false,
            start_time: now,
            last_activity: now,
            stopped_at: None,
            clicks: EventBuffer::new(capacity),
            scroll_samples: EventBuffer::new(capacity),
            hovers: EventBuffer::new(capacity),
            page_visits: EventBuffer::new(capacity),
            interactions: EventBuffer::new(capacity),
            scroll: ScrollDebouncer::new(config.scroll_debounce_ms),
            hover: HoverTracker::new(config.hover_threshold_ms),
            pages: PageVisitTracker::new(),
            config,
            clock,
        })
    }

    /// Use a caller-supplied session id instead of a generated one
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Currently open page visit
    pub fn open_visit(&self) -> Option<&PageVisit> {
        self.pages.open_visit()
    }

    /// Begin capture at `location`. Calling this while started is a no-op.
    pub fn start(&mut self, location: PageLocation) {
        if self.started {
            debug!(session_id = %self.session_id, "start ignored, tracker already running");
            return;
        }
        let now = self.clock.now();
        self.started = true;
        self.start_time = now;
        self.last_activity = now;
        self.stopped_at = None;

        if self.config.track_page_visits {
            if let Some(closed) = self.pages.enter(location, now) {
                self.page_visits.append(closed);
            }
        } else {
            self.pages.set_location(location);
        }

        info!(session_id = %self.session_id, user_id = %self.user_id, "behavior tracking started");
    }

    /// Stop capture. Fires any due scroll timer, drops a still-pending one,
    /// abandons a hover in progress and closes the open page visit.
    /// Safe to call when not started.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        let now = self.clock.now();
        self.fire_due_timers(now);

        if self.scroll.cancel() {
            debug!(session_id = %self.session_id, "pending scroll sample dropped on stop");
        }
        if self.hover.cancel() {
            debug!(session_id = %self.session_id, "hover in progress abandoned on stop");
        }
        if let Some(closed) = self.pages.exit(now) {
            self.page_visits.append(closed);
        }

        self.started = false;
        self.stopped_at = Some(now);
        info!(session_id = %self.session_id, "behavior tracking stopped");
    }

    /// Route one raw signal through its sampling policy into the buffers.
    ///
    /// Signals arriving while stopped are dropped.
    pub fn record(&mut self, signal: Signal) {
        if !self.started {
            debug!(session_id = %self.session_id, "signal dropped, tracker not started");
            return;
        }
        let now = self.clock.now();
        self.fire_due_timers(now);
        self.last_activity = now;

        match signal {
            Signal::Click {
                x,
                y,
                viewport_width,
                viewport_height,
                target,
            } => {
                if self.config.track_clicks {
                    self.record_click(x, y, viewport_width, viewport_height, target, now);
                }
            }
            Signal::Scroll {
                scroll_y,
                viewport_height,
                document_height,
            } => {
                if self.config.track_scroll {
                    self.scroll
                        .signal(scroll_y, viewport_height, document_height, now);
                }
            }
            Signal::PointerEnter { target } => {
                if self.config.track_hovers {
                    self.hover.enter(target, now);
                }
            }
            Signal::PointerLeave { target } => {
                if self.config.track_hovers {
                    if let Some(event) = self.hover.leave(&target, now) {
                        self.hovers.append(event);
                    }
                }
            }
            Signal::VisibilityChange { visible } => {
                if self.config.track_page_visits {
                    if let Some(closed) = self.pages.visibility_changed(visible, now) {
                        self.page_visits.append(closed);
                    }
                }
            }
        }
    }

    /// Fire any timer whose deadline has passed. Returns the emitted sample.
    pub fn tick(&mut self) -> Option<ScrollSample> {
        let now = self.clock.now();
        self.fire_due_timers(now)
    }

    /// Explicit navigation: closes the open visit and opens one for `location`
    pub fn navigate(&mut self, location: PageLocation) {
        if !self.started || !self.config.track_page_visits {
            self.pages.set_location(location);
            return;
        }
        let now = self.clock.now();
        self.fire_due_timers(now);
        self.last_activity = now;

        if let Some(closed) = self.pages.enter(location, now) {
            self.page_visits.append(closed);
        }
    }

    /// Record a caller-declared interaction. Never thresholded or filtered.
    pub fn track_interaction(
        &mut self,
        element_id: impl Into<String>,
        element_type: impl Into<String>,
        kind: InteractionKind,
        metadata: Option<serde_json::Value>,
    ) {
        let now = self.clock.now();
        self.last_activity = now;
        self.interactions.append(ElementInteraction {
            element_id: element_id.into(),
            element_type: element_type.into(),
            interaction_type: kind,
            timestamp: now,
            metadata,
        });
    }

    /// Current metrics, derived from the buffers
    pub fn metrics(&self) -> Metrics {
        MetricsDeriver::derive(MetricsInput {
            clicks: &self.clicks,
            scroll_samples: &self.scroll_samples,
            completed_visits: &self.page_visits,
            open_visit: self.pages.open_visit(),
        })
    }

    /// The complete session record with freshly derived metrics
    pub fn full_record(&self) -> SessionRecord {
        let mut page_visits = self.page_visits.to_vec();
        page_visits.extend(self.pages.open_visit().cloned());

        SessionRecord {
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            start_time: self.start_time,
            last_activity: self.last_activity,
            clicks: self.clicks.to_vec(),
            scroll_samples: self.scroll_samples.to_vec(),
            page_visits,
            hovers: self.hovers.to_vec(),
            interactions: self.interactions.to_vec(),
            metrics: self.metrics(),
        }
    }

    /// Bounded projection for the transport boundary
    pub fn compact_summary(&self) -> CompactSummary {
        let metrics = self.metrics();
        let end = self.stopped_at.unwrap_or_else(|| self.clock.now());
        let pages_visited =
            self.page_visits.len() + usize::from(self.pages.open_visit().is_some());

        let nav = &metrics.navigation_path;
        let nav_skip = nav.len().saturating_sub(self.config.summary_navigation_limit);

        CompactSummary {
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            duration: elapsed_ms(self.start_time, end).max(0),
            click_count: metrics.total_clicks,
            max_scroll_depth: metrics.max_scroll_depth,
            pages_visited,
            recent_clicks: self.clicks.snapshot(self.config.summary_click_limit),
            recent_interactions: self
                .interactions
                .snapshot(self.config.summary_interaction_limit),
            navigation_path: nav[nav_skip..].to_vec(),
            heatmap_zones: metrics.heatmap_zones,
        }
    }

    /// Discard buffered events and counts, keeping the open page visit and
    /// the session identity.
    pub fn reset(&mut self) {
        let now = self.clock.now();
        self.clicks.clear();
        self.scroll_samples.clear();
        self.hovers.clear();
        self.page_visits.clear();
        self.interactions.clear();
        self.start_time = now;
        self.last_activity = now;
        debug!(session_id = %self.session_id, "session buffers reset");
    }

    fn record_click(
        &mut self,
        x: f64,
        y: f64,
        viewport_width: f64,
        viewport_height: f64,
        target: TargetDescriptor,
        now: DateTime<Utc>,
    ) {
        let zone = zone_for(x, y, viewport_width, viewport_height);

        if let Some(element_id) = target.id.clone() {
            self.interactions.append(ElementInteraction {
                element_id,
                element_type: target.tag.clone(),
                interaction_type: InteractionKind::Click,
                timestamp: now,
                metadata: Some(json!({ "x": x, "y": y, "zone": zone.as_str() })),
            });
        }

        self.clicks.append(ClickEvent {
            x,
            y,
            target,
            timestamp: now,
            viewport_width,
            viewport_height,
        });
    }

    fn fire_due_timers(&mut self, now: DateTime<Utc>) -> Option<ScrollSample> {
        let sample = self.scroll.poll(now)?;
        self.scroll_samples.append(sample.clone());
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::tracker::heatmap::SpatialBucketer;
    use crate::tracker::types::{HeatmapZone, ScrollDirection};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn tracker_with(config: TrackerConfig) -> (BehaviorAggregator<ManualClock>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
        let tracker = BehaviorAggregator::with_clock("user-1", config, clock.clone())
            .unwrap()
            .with_session_id("sess-1");
        (tracker, clock)
    }

    fn tracker() -> (BehaviorAggregator<ManualClock>, ManualClock) {
        tracker_with(TrackerConfig::default())
    }

    fn click(x: f64, y: f64, target: TargetDescriptor) -> Signal {
        Signal::Click {
            x,
            y,
            viewport_width: 100.0,
            viewport_height: 100.0,
            target,
        }
    }

    fn scroll(scroll_y: f64) -> Signal {
        Signal::Scroll {
            scroll_y,
            viewport_height: 800.0,
            document_height: 2800.0,
        }
    }

    #[test]
    fn test_enter_page_then_navigate() {
        let (mut tracker, clock) = tracker();
        tracker.start(PageLocation::new("/a", "A"));
        clock.advance_ms(1000);
        tracker.navigate(PageLocation::new("/b", "B"));

        let record = tracker.full_record();
        assert_eq!(record.page_visits.len(), 2);
        assert_eq!(record.page_visits[0].path, "/a");
        assert_eq!(record.page_visits[0].duration_ms, Some(1000));
        assert_eq!(record.page_visits[1].path, "/b");
        assert!(record.page_visits[1].is_open());
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut tracker, clock) = tracker();
        tracker.start(PageLocation::new("/a", "A"));
        let started_at = tracker.full_record().start_time;

        clock.advance_ms(500);
        tracker.start(PageLocation::new("/other", "Other"));

        let record = tracker.full_record();
        assert_eq!(record.start_time, started_at);
        assert_eq!(record.page_visits.len(), 1);
        assert_eq!(record.page_visits[0].path, "/a");
    }

    #[test]
    fn test_stop_without_start_is_safe() {
        let (mut tracker, _clock) = tracker();
        tracker.stop();
        tracker.stop();
        assert!(!tracker.is_started());
    }

    #[test]
    fn test_signals_before_start_are_dropped() {
        let (mut tracker, _clock) = tracker();
        tracker.record(click(10.0, 10.0, TargetDescriptor::tag("div")));
        assert_eq!(tracker.metrics().total_clicks, 0);
    }

    #[test]
    fn test_click_lands_in_heatmap() {
        let (mut tracker, _clock) = tracker();
        tracker.start(PageLocation::new("/", "Home"));
        tracker.record(click(10.0, 10.0, TargetDescriptor::tag("div")));

        let metrics = tracker.metrics();
        assert_eq!(metrics.total_clicks, 1);
        assert_eq!(metrics.heatmap_zones[0].zone, HeatmapZone::TopLeft);
        assert_eq!(metrics.heatmap_zones[0].count, 1);
        // No id, so no automatic interaction
        assert!(tracker.full_record().interactions.is_empty());
    }

    #[test]
    fn test_click_on_identified_element_records_interaction() {
        let (mut tracker, _clock) = tracker();
        tracker.start(PageLocation::new("/", "Home"));
        tracker.record(click(50.0, 50.0, TargetDescriptor::tag("button").with_id("buy")));

        let record = tracker.full_record();
        assert_eq!(record.interactions.len(), 1);
        let interaction = &record.interactions[0];
        assert_eq!(interaction.element_id, "buy");
        assert_eq!(interaction.element_type, "button");
        assert_eq!(interaction.interaction_type, InteractionKind::Click);
        assert_eq!(
            interaction.metadata.as_ref().unwrap()["zone"],
            "middle-center"
        );
    }

    #[test]
    fn test_scroll_debounced_through_tick() {
        let (mut tracker, clock) = tracker();
        tracker.start(PageLocation::new("/", "Home"));

        tracker.record(scroll(100.0));
        clock.advance_ms(50);
        tracker.record(scroll(400.0));
        clock.advance_ms(100);
        assert!(tracker.tick().is_none());

        clock.advance_ms(50);
        let sample = tracker.tick().unwrap();
        assert_eq!(sample.scroll_y, 400.0);
        assert_eq!(sample.direction, ScrollDirection::Down);

        let record = tracker.full_record();
        assert_eq!(record.scroll_samples.len(), 1);
        assert_eq!(record.metrics.max_scroll_depth, 20.0);
    }

    #[test]
    fn test_due_scroll_fires_before_next_signal() {
        let (mut tracker, clock) = tracker();
        tracker.start(PageLocation::new("/", "Home"));

        tracker.record(scroll(200.0));
        clock.advance_ms(1000);
        // No tick in between: the next signal flushes the expired window first
        tracker.record(scroll(0.0));
        clock.advance_ms(150);
        tracker.tick();

        let samples = tracker.full_record().scroll_samples;
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].scroll_y, 200.0);
        assert_eq!(samples[1].direction, ScrollDirection::Up);
        assert_eq!(tracker.metrics().total_scroll_distance, 200.0);
    }

    #[test]
    fn test_hover_recorded_only_above_threshold() {
        let (mut tracker, clock) = tracker();
        tracker.start(PageLocation::new("/", "Home"));
        let link = TargetDescriptor::tag("a").with_id("docs");

        tracker.record(Signal::PointerEnter { target: link.clone() });
        clock.advance_ms(499);
        tracker.record(Signal::PointerLeave { target: link.clone() });

        tracker.record(Signal::PointerEnter { target: link.clone() });
        clock.advance_ms(500);
        tracker.record(Signal::PointerLeave { target: link.clone() });

        let hovers = tracker.full_record().hovers;
        assert_eq!(hovers.len(), 1);
        assert_eq!(hovers[0].duration_ms, 500);
    }

    #[test]
    fn test_stop_abandons_hover_and_pending_scroll() {
        let (mut tracker, clock) = tracker();
        tracker.start(PageLocation::new("/a", "A"));
        let button = TargetDescriptor::tag("button");

        tracker.record(Signal::PointerEnter { target: button.clone() });
        tracker.record(scroll(300.0));
        clock.advance_ms(100);
        tracker.stop();

        clock.advance_ms(5000);
        tracker.record(Signal::PointerLeave { target: button });
        tracker.tick();

        let record = tracker.full_record();
        assert!(record.hovers.is_empty());
        assert!(record.scroll_samples.is_empty());
        assert_eq!(record.page_visits.len(), 1);
        assert_eq!(record.page_visits[0].duration_ms, Some(100));
        assert!(tracker.open_visit().is_none());
    }

    #[test]
    fn test_visibility_hidden_closes_visit() {
        let (mut tracker, clock) = tracker();
        tracker.start(PageLocation::new("/a", "A"));
        clock.advance_ms(3000);
        tracker.record(Signal::VisibilityChange { visible: false });
        clock.advance_ms(10_000);
        tracker.record(Signal::VisibilityChange { visible: true });

        let record = tracker.full_record();
        assert_eq!(record.page_visits.len(), 2);
        assert_eq!(record.page_visits[0].duration_ms, Some(3000));
        assert!(record.page_visits[1].is_open());
        assert_eq!(record.metrics.navigation_path, vec!["/a"]);
    }

    #[test]
    fn test_track_interaction_is_unconditional() {
        let (mut tracker, _clock) = tracker();
        tracker.track_interaction("faq", "section", InteractionKind::ScrollIntoView, None);
        tracker.start(PageLocation::new("/", "Home"));
        tracker.track_interaction(
            "search",
            "input",
            InteractionKind::Focus,
            Some(json!({ "source": "keyboard" })),
        );

        let interactions = tracker.full_record().interactions;
        assert_eq!(interactions.len(), 2);
        assert_eq!(interactions[1].interaction_type, InteractionKind::Focus);
    }

    #[test]
    fn test_full_record_is_a_pure_read() {
        let (mut tracker, clock) = tracker();
        tracker.start(PageLocation::new("/a", "A"));
        tracker.record(click(10.0, 90.0, TargetDescriptor::tag("div")));
        tracker.record(scroll(500.0));
        clock.advance_ms(1000);

        let first = tracker.full_record();
        let second = tracker.full_record();
        assert_eq!(first.metrics, second.metrics);
        // The due scroll timer is only fired by a mutating call
        assert!(first.scroll_samples.is_empty());
    }

    #[test]
    fn test_heatmap_reconstructs_from_buffered_clicks() {
        let (mut tracker, _clock) = tracker();
        tracker.start(PageLocation::new("/", "Home"));
        let points = [(10.0, 10.0), (90.0, 10.0), (90.0, 10.0), (50.0, 80.0)];
        for (x, y) in points {
            tracker.record(click(x, y, TargetDescriptor::tag("div")));
        }

        let record = tracker.full_record();
        let mut rebuilt = SpatialBucketer::new();
        for c in &record.clicks {
            rebuilt.record(c.x, c.y, c.viewport_width, c.viewport_height);
        }

        assert_eq!(record.metrics.heatmap_zones, rebuilt.zones().to_vec());
        assert_eq!(record.metrics.total_clicks as usize, record.clicks.len());
    }

    #[test]
    fn test_heatmap_reconstructs_after_eviction() {
        let (mut tracker, _clock) = tracker_with(TrackerConfig {
            buffer_capacity: 2,
            ..TrackerConfig::default()
        });
        tracker.start(PageLocation::new("/", "Home"));
        for (x, y) in [(10.0, 10.0), (90.0, 90.0), (90.0, 95.0)] {
            tracker.record(click(x, y, TargetDescriptor::tag("div")));
        }

        let record = tracker.full_record();
        assert_eq!(record.clicks.len(), 2);
        assert_eq!(record.metrics.total_clicks, 2);

        let mut rebuilt = SpatialBucketer::new();
        for c in &record.clicks {
            rebuilt.record(c.x, c.y, c.viewport_width, c.viewport_height);
        }
        assert_eq!(record.metrics.heatmap_zones, rebuilt.zones().to_vec());
        assert_eq!(tracker.compact_summary().click_count, 2);
    }

    #[test]
    fn test_degenerate_inputs_keep_invariants() {
        let (mut tracker, clock) = tracker_with(TrackerConfig {
            buffer_capacity: 3,
            scroll_debounce_ms: 50,
            ..TrackerConfig::default()
        });
        tracker.start(PageLocation::new("/", "Home"));

        let clicks = [
            (-20.0, -5.0, 100.0, 100.0),
            (10.0, 10.0, f64::NAN, 100.0),
            (10.0, 10.0, 0.0, 0.0),
            (f64::NAN, f64::NAN, 100.0, 100.0),
            (-1.0, 500.0, 100.0, 100.0),
            (95.0, 95.0, -100.0, 100.0),
        ];
        for (x, y, viewport_width, viewport_height) in clicks {
            tracker.record(Signal::Click {
                x,
                y,
                viewport_width,
                viewport_height,
                target: TargetDescriptor::tag("div").with_id("el"),
            });
        }
        for scroll_y in [-400.0, -10.0, 0.0, 5_000.0, -1.0] {
            tracker.record(Signal::Scroll {
                scroll_y,
                viewport_height: 800.0,
                document_height: 2800.0,
            });
            clock.advance_ms(100);
            tracker.tick();
        }
        tracker.record(Signal::Scroll {
            scroll_y: -50.0,
            viewport_height: 0.0,
            document_height: 0.0,
        });
        clock.advance_ms(100);
        tracker.tick();
        for i in 0..5 {
            tracker.navigate(PageLocation::new(format!("/p{i}"), "P"));
        }

        let record = tracker.full_record();
        assert!(record.clicks.len() <= 3);
        assert!(record.scroll_samples.len() <= 3);
        assert!(record.interactions.len() <= 3);
        // Completed visits are bounded; the open one is appended on read
        assert!(record.page_visits.len() <= 4);

        let zones = &record.metrics.heatmap_zones;
        assert!(zones.windows(2).all(|w| w[0].count >= w[1].count));
        let zone_total: u32 = zones.iter().map(|z| z.count).sum();
        assert_eq!(zone_total, record.metrics.total_clicks);
        assert_eq!(record.metrics.total_clicks as usize, record.clicks.len());

        for sample in &record.scroll_samples {
            assert!((0.0..=100.0).contains(&sample.depth));
        }
        assert!((0.0..=100.0).contains(&record.metrics.max_scroll_depth));
        assert!(record.metrics.total_scroll_distance.is_finite());
        assert!(record.metrics.total_scroll_distance >= 0.0);

        let summary = tracker.compact_summary();
        assert!(summary.recent_clicks.len() <= 3);
        assert!(summary
            .heatmap_zones
            .windows(2)
            .all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn test_compact_summary_bounds() {
        let (mut tracker, clock) = tracker();
        tracker.start(PageLocation::new("/p0", "P0"));
        for i in 0..15 {
            tracker.record(click(i as f64, 10.0, TargetDescriptor::tag("div")));
        }
        for i in 0..25 {
            tracker.track_interaction(format!("el-{i}"), "card", InteractionKind::Hover, None);
        }
        for i in 1..13 {
            clock.advance_ms(100);
            tracker.navigate(PageLocation::new(format!("/p{i}"), format!("P{i}")));
        }

        let summary = tracker.compact_summary();
        assert_eq!(summary.session_id, "sess-1");
        assert_eq!(summary.click_count, 15);
        assert_eq!(summary.recent_clicks.len(), 10);
        assert_eq!(summary.recent_clicks[0].x, 5.0);
        assert_eq!(summary.recent_interactions.len(), 20);
        assert_eq!(summary.recent_interactions[0].element_id, "el-5");
        assert_eq!(summary.navigation_path.len(), 10);
        assert_eq!(summary.navigation_path.last().map(String::as_str), Some("/p12"));
        assert_eq!(summary.pages_visited, 13);
        assert_eq!(summary.duration, 1200);
    }

    #[test]
    fn test_compact_summary_wire_names() {
        let (mut tracker, _clock) = tracker();
        tracker.start(PageLocation::new("/", "Home"));
        let value = serde_json::to_value(tracker.compact_summary()).unwrap();

        for key in [
            "sessionId",
            "duration",
            "clickCount",
            "maxScrollDepth",
            "pagesVisited",
            "recentClicks",
            "recentInteractions",
            "heatmapZones",
            "navigationPath",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_reset_keeps_open_visit() {
        let (mut tracker, clock) = tracker();
        tracker.start(PageLocation::new("/a", "A"));
        clock.advance_ms(1000);
        tracker.navigate(PageLocation::new("/b", "B"));
        tracker.record(click(10.0, 10.0, TargetDescriptor::tag("div")));
        let open_before = tracker.open_visit().cloned().unwrap();

        clock.advance_ms(500);
        tracker.reset();

        let record = tracker.full_record();
        assert!(record.clicks.is_empty());
        assert_eq!(record.metrics.total_clicks, 0);
        assert!(record.metrics.heatmap_zones.is_empty());
        assert_eq!(record.page_visits, vec![open_before.clone()]);

        clock.advance_ms(500);
        tracker.stop();
        let closed = &tracker.full_record().page_visits[0];
        assert_eq!(closed.enter_time, open_before.enter_time);
        assert_eq!(closed.duration_ms, Some(1000));
    }

    #[test]
    fn test_disabled_tracking_flags() {
        let config = TrackerConfig {
            track_clicks: false,
            track_page_visits: false,
            ..TrackerConfig::default()
        };
        let (mut tracker, _clock) = tracker_with(config);
        tracker.start(PageLocation::new("/a", "A"));
        tracker.record(click(10.0, 10.0, TargetDescriptor::tag("a").with_id("x")));
        tracker.navigate(PageLocation::new("/b", "B"));

        let record = tracker.full_record();
        assert!(record.clicks.is_empty());
        assert!(record.interactions.is_empty());
        assert!(record.page_visits.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrackerConfig {
            buffer_capacity: 0,
            ..TrackerConfig::default()
        };
        assert!(BehaviorAggregator::with_clock("u", config, ManualClock::default()).is_err());
    }
}
