//! Temporal sampling policies for raw UI signals
//!
//! Three independent state machines, each driven by explicit instants:
//!
//! - [`ScrollDebouncer`]: collapses a burst of scroll ticks into one sample
//! - [`HoverTracker`]: emits a hover only once dwell reaches the threshold
//! - [`PageVisitTracker`]: brackets page visits with enter/exit times
//!
//! Timers are stored as deadlines. Nothing here sleeps; the owner fires due
//! timers by calling [`ScrollDebouncer::poll`].

use crate::clock::{after_ms, elapsed_ms};
use crate::tracker::types::{
    HoverEvent, PageLocation, PageVisit, ScrollDirection, ScrollSample, TargetDescriptor,
};
use chrono::{DateTime, Utc};

/// Compute scroll depth as a percentage of the scrollable range.
///
/// A page that fits in the viewport is fully read (100).
pub fn scroll_depth(scroll_y: f64, viewport_height: f64, document_height: f64) -> f64 {
    let scrollable = document_height - viewport_height;
    if scrollable <= 0.0 {
        return 100.0;
    }
    let depth = (scroll_y / scrollable * 100.0).round();
    if depth.is_finite() {
        depth.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone)]
struct PendingScroll {
    scroll_y: f64,
    viewport_height: f64,
    document_height: f64,
    deadline: DateTime<Utc>,
}

/// Trailing-edge scroll debouncer
#[derive(Debug, Clone)]
pub struct ScrollDebouncer {
    window_ms: u64,
    pending: Option<PendingScroll>,
    last_position: f64,
    last_direction: ScrollDirection,
}

impl ScrollDebouncer {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            pending: None,
            last_position: 0.0,
            last_direction: ScrollDirection::Down,
        }
    }

    /// Register a raw scroll tick; (re)arms the timer
    pub fn signal(
        &mut self,
        scroll_y: f64,
        viewport_height: f64,
        document_height: f64,
        at: DateTime<Utc>,
    ) {
        self.pending = Some(PendingScroll {
            scroll_y,
            viewport_height,
            document_height,
            deadline: after_ms(at, self.window_ms),
        });
    }

    /// Fire the timer if its deadline has passed.
    ///
    /// The sample uses the latest raw position and is stamped with the
    /// deadline. Direction compares against the last emitted sample, not
    /// against intermediate ticks.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<ScrollSample> {
        let due = self.pending.as_ref().is_some_and(|p| p.deadline <= now);
        if !due {
            return None;
        }
        let pending = self.pending.take()?;

        let direction = if pending.scroll_y > self.last_position {
            ScrollDirection::Down
        } else if pending.scroll_y < self.last_position {
            ScrollDirection::Up
        } else {
            self.last_direction
        };

        self.last_position = pending.scroll_y;
        self.last_direction = direction;

        Some(ScrollSample {
            scroll_y: pending.scroll_y,
            depth: scroll_depth(
                pending.scroll_y,
                pending.viewport_height,
                pending.document_height,
            ),
            direction,
            timestamp: pending.deadline,
        })
    }

    /// Deadline of the armed timer, if any
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the armed timer without emitting. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

#[derive(Debug, Clone)]
struct ActiveHover {
    target: TargetDescriptor,
    started_at: DateTime<Utc>,
}

/// Single-slot hover dwell tracker
#[derive(Debug, Clone)]
pub struct HoverTracker {
    threshold_ms: u64,
    active: Option<ActiveHover>,
}

impl HoverTracker {
    pub fn new(threshold_ms: u64) -> Self {
        Self {
            threshold_ms,
            active: None,
        }
    }

    /// Pointer entered `target`. Insignificant elements are ignored; a new
    /// significant element replaces any hover in progress.
    ///
    /// Returns whether a hover is now being timed for `target`.
    pub fn enter(&mut self, target: TargetDescriptor, at: DateTime<Utc>) -> bool {
        if !target.is_significant() {
            return false;
        }
        self.active = Some(ActiveHover {
            target,
            started_at: at,
        });
        true
    }

    /// Pointer left `target`. Emits a hover when dwell reached the threshold.
    ///
    /// A leave for an element other than the one being timed is ignored.
    pub fn leave(&mut self, target: &TargetDescriptor, at: DateTime<Utc>) -> Option<HoverEvent> {
        if self.active.as_ref()?.target != *target {
            return None;
        }
        let active = self.active.take()?;
        let duration_ms = elapsed_ms(active.started_at, at);

        if duration_ms >= i64::try_from(self.threshold_ms).unwrap_or(i64::MAX) {
            Some(HoverEvent {
                target: active.target,
                duration_ms,
                start_time: active.started_at,
            })
        } else {
            None
        }
    }

    /// Target currently being timed
    pub fn active_target(&self) -> Option<&TargetDescriptor> {
        self.active.as_ref().map(|a| &a.target)
    }

    /// Abandon the hover in progress without emitting
    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }
}

/// Page-visit bracketing: at most one open visit at a time
#[derive(Debug, Clone, Default)]
pub struct PageVisitTracker {
    open: Option<PageVisit>,
    location: Option<PageLocation>,
}

impl PageVisitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a visit for `location`, closing the current one first.
    ///
    /// Returns the closed visit, if there was one.
    pub fn enter(&mut self, location: PageLocation, at: DateTime<Utc>) -> Option<PageVisit> {
        let closed = self.exit(at);

        let referrer = self
            .location
            .as_ref()
            .filter(|prev| prev.path != location.path)
            .map(|prev| prev.path.clone());

        self.open = Some(PageVisit::open(&location, referrer, at));
        self.location = Some(location);
        closed
    }

    /// Close the open visit, if any
    pub fn exit(&mut self, at: DateTime<Utc>) -> Option<PageVisit> {
        self.open.take().map(|visit| visit.close(at))
    }

    /// Hidden acts as an exit; visible re-enters the current location.
    pub fn visibility_changed(&mut self, visible: bool, at: DateTime<Utc>) -> Option<PageVisit> {
        if !visible {
            return self.exit(at);
        }
        match self.location.clone() {
            Some(location) => self.enter(location, at),
            None => None,
        }
    }

    /// Remember the current location without opening a visit
    pub fn set_location(&mut self, location: PageLocation) {
        self.location = Some(location);
    }

    pub fn open_visit(&self) -> Option<&PageVisit> {
        self.open.as_ref()
    }

    pub fn location(&self) -> Option<&PageLocation> {
        self.location.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn at(ms: i64) -> DateTime<Utc> {
        t0() + Duration::milliseconds(ms)
    }

    #[test]
    fn test_scroll_burst_emits_one_sample_at_last_position() {
        let mut debouncer = ScrollDebouncer::new(150);

        debouncer.signal(100.0, 800.0, 2800.0, at(0));
        debouncer.signal(200.0, 800.0, 2800.0, at(50));
        debouncer.signal(300.0, 800.0, 2800.0, at(100));

        // 150 ms after the first tick, the timer has been re-armed
        assert!(debouncer.poll(at(150)).is_none());

        let sample = debouncer.poll(at(250)).unwrap();
        assert_eq!(sample.scroll_y, 300.0);
        assert_eq!(sample.direction, ScrollDirection::Down);
        assert_eq!(sample.depth, 15.0);
        assert_eq!(sample.timestamp, at(250));

        assert!(debouncer.poll(at(1000)).is_none());
    }

    #[test]
    fn test_scroll_direction_against_last_emitted() {
        let mut debouncer = ScrollDebouncer::new(150);

        debouncer.signal(500.0, 800.0, 2800.0, at(0));
        debouncer.poll(at(150)).unwrap();

        // Intermediate tick goes further down, final position is above 500
        debouncer.signal(900.0, 800.0, 2800.0, at(1000));
        debouncer.signal(400.0, 800.0, 2800.0, at(1050));
        let sample = debouncer.poll(at(1200)).unwrap();

        assert_eq!(sample.direction, ScrollDirection::Up);
    }

    #[test]
    fn test_scroll_cancel() {
        let mut debouncer = ScrollDebouncer::new(150);
        debouncer.signal(100.0, 800.0, 2800.0, at(0));
        assert!(debouncer.cancel());
        assert!(debouncer.poll(at(500)).is_none());
        assert!(!debouncer.cancel());
    }

    #[test]
    fn test_scroll_depth() {
        assert_eq!(scroll_depth(0.0, 800.0, 2800.0), 0.0);
        assert_eq!(scroll_depth(2000.0, 800.0, 2800.0), 100.0);
        assert_eq!(scroll_depth(5000.0, 800.0, 2800.0), 100.0);
        assert_eq!(scroll_depth(-50.0, 800.0, 2800.0), 0.0);
        assert_eq!(scroll_depth(0.0, 800.0, 600.0), 100.0);
    }

    #[test]
    fn test_hover_threshold_is_inclusive() {
        let mut hover = HoverTracker::new(500);
        let button = TargetDescriptor::tag("button").with_id("cta");

        assert!(hover.enter(button.clone(), at(0)));
        let event = hover.leave(&button, at(500)).unwrap();
        assert_eq!(event.duration_ms, 500);
        assert_eq!(event.start_time, at(0));

        hover.enter(button.clone(), at(1000));
        assert!(hover.leave(&button, at(1499)).is_none());
    }

    #[test]
    fn test_huge_timers_do_not_overflow() {
        let mut debouncer = ScrollDebouncer::new(u64::MAX);
        debouncer.signal(100.0, 800.0, 2800.0, at(0));
        assert_eq!(debouncer.deadline(), Some(DateTime::<Utc>::MAX_UTC));
        assert!(debouncer.poll(at(10_000_000)).is_none());

        let mut hover = HoverTracker::new(u64::MAX);
        let button = TargetDescriptor::tag("button");
        hover.enter(button.clone(), at(0));
        assert!(hover.leave(&button, at(10_000_000)).is_none());
    }

    #[test]
    fn test_hover_ignores_insignificant_elements() {
        let mut hover = HoverTracker::new(500);
        let div = TargetDescriptor::tag("div");

        assert!(!hover.enter(div.clone(), at(0)));
        assert!(hover.leave(&div, at(5000)).is_none());
    }

    #[test]
    fn test_hover_last_enter_wins() {
        let mut hover = HoverTracker::new(500);
        let first = TargetDescriptor::tag("a").with_id("first");
        let second = TargetDescriptor::tag("a").with_id("second");

        hover.enter(first.clone(), at(0));
        hover.enter(second.clone(), at(100));
        assert_eq!(hover.active_target(), Some(&second));

        // Stale leave for the replaced element does nothing
        assert!(hover.leave(&first, at(900)).is_none());

        let event = hover.leave(&second, at(700)).unwrap();
        assert_eq!(event.target, second);
        assert_eq!(event.duration_ms, 600);
    }

    #[test]
    fn test_page_enter_closes_previous() {
        let mut pages = PageVisitTracker::new();

        assert!(pages.enter(PageLocation::new("/a", "A"), at(0)).is_none());
        let closed = pages.enter(PageLocation::new("/b", "B"), at(1000)).unwrap();

        assert_eq!(closed.path, "/a");
        assert_eq!(closed.duration_ms, Some(1000));

        let open = pages.open_visit().unwrap();
        assert_eq!(open.path, "/b");
        assert!(open.is_open());
        assert_eq!(open.referrer.as_deref(), Some("/a"));
    }

    #[test]
    fn test_visibility_brackets() {
        let mut pages = PageVisitTracker::new();
        pages.enter(PageLocation::new("/docs", "Docs"), at(0));

        let closed = pages.visibility_changed(false, at(2000)).unwrap();
        assert_eq!(closed.duration_ms, Some(2000));
        assert!(pages.open_visit().is_none());

        // Hidden twice closes nothing more
        assert!(pages.visibility_changed(false, at(2500)).is_none());

        assert!(pages.visibility_changed(true, at(3000)).is_none());
        let reopened = pages.open_visit().unwrap();
        assert_eq!(reopened.path, "/docs");
        assert_eq!(reopened.enter_time, at(3000));
        assert_eq!(reopened.referrer, None);
    }

    #[test]
    fn test_visible_without_location_is_noop() {
        let mut pages = PageVisitTracker::new();
        assert!(pages.visibility_changed(true, at(0)).is_none());
        assert!(pages.open_visit().is_none());
    }
}
