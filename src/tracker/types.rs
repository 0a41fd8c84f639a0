//! Behavior telemetry data types
//!
//! These types describe raw signals coming from the host UI, the events the
//! tracker files into its buffers, and the two read projections (full session
//! record and compact summary). Everything serializes with camelCase field
//! names, matching the shape the remote inference boundary reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tags that are always considered interactive for hover tracking
const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea", "summary", "label"];

/// ARIA roles that mark an element as interactive
const INTERACTIVE_ROLES: &[&str] = &["button", "link"];

/// Description of the DOM element a signal targeted
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
    /// Lowercase tag name (e.g. `button`)
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// ARIA role, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Element explicitly opted in to tracking by the host
    #[serde(default)]
    pub tracked: bool,
}

impl TargetDescriptor {
    /// Shorthand for a bare tag
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Builder-style id setter
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder-style role setter
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Mark the element as explicitly tracked
    pub fn tracked(mut self) -> Self {
        self.tracked = true;
        self
    }

    /// Whether hovering this element is worth measuring: an interactive tag,
    /// a button/link role, or an explicit opt-in.
    pub fn is_significant(&self) -> bool {
        if self.tracked {
            return true;
        }
        let tag = self.tag.to_ascii_lowercase();
        if INTERACTIVE_TAGS.contains(&tag.as_str()) {
            return true;
        }
        self.role
            .as_deref()
            .map(|r| INTERACTIVE_ROLES.contains(&r.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        if let Some(class_name) = &self.class_name {
            for class in class_name.split_whitespace() {
                write!(f, ".{class}")?;
            }
        }
        Ok(())
    }
}

/// Scroll direction relative to the previously emitted sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Kind of an element interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionKind {
    Click,
    Hover,
    Focus,
    ScrollIntoView,
}

/// A recorded click
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub x: f64,
    pub y: f64,
    pub target: TargetDescriptor,
    pub timestamp: DateTime<Utc>,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

/// One debounced scroll sample (a whole debounce window, not a raw tick)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollSample {
    /// Absolute scroll offset in pixels
    pub scroll_y: f64,
    /// Depth percentage, 0-100
    pub depth: f64,
    pub direction: ScrollDirection,
    pub timestamp: DateTime<Utc>,
}

/// A page visit bracket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageVisit {
    pub path: String,
    pub title: String,
    pub enter_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_time: Option<DateTime<Utc>>,
    /// `exit_time - enter_time` in milliseconds, once closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

impl PageVisit {
    /// Open a new visit
    pub fn open(
        location: &PageLocation,
        referrer: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            path: location.path.clone(),
            title: location.title.clone(),
            enter_time: at,
            exit_time: None,
            duration_ms: None,
            referrer,
        }
    }

    /// Whether the visit has not been closed yet
    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    /// Close the visit at `at`, computing its duration
    pub fn close(mut self, at: DateTime<Utc>) -> Self {
        self.exit_time = Some(at);
        self.duration_ms = Some((at - self.enter_time).num_milliseconds());
        self
    }
}

/// A hover whose dwell time reached the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoverEvent {
    pub target: TargetDescriptor,
    pub duration_ms: i64,
    pub start_time: DateTime<Utc>,
}

/// A generalized, tagged interaction with an identified element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInteraction {
    pub element_id: String,
    pub element_type: String,
    pub interaction_type: InteractionKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Current page location, as known to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLocation {
    pub path: String,
    #[serde(default)]
    pub title: String,
}

impl PageLocation {
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
        }
    }
}

/// Raw signal forwarded by the host UI's event hooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Signal {
    Click {
        x: f64,
        y: f64,
        viewport_width: f64,
        viewport_height: f64,
        target: TargetDescriptor,
    },
    Scroll {
        scroll_y: f64,
        viewport_height: f64,
        document_height: f64,
    },
    PointerEnter {
        target: TargetDescriptor,
    },
    PointerLeave {
        target: TargetDescriptor,
    },
    VisibilityChange {
        visible: bool,
    },
}

/// One of the nine fixed screen regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeatmapZone {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl HeatmapZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeatmapZone::TopLeft => "top-left",
            HeatmapZone::TopCenter => "top-center",
            HeatmapZone::TopRight => "top-right",
            HeatmapZone::MiddleLeft => "middle-left",
            HeatmapZone::MiddleCenter => "middle-center",
            HeatmapZone::MiddleRight => "middle-right",
            HeatmapZone::BottomLeft => "bottom-left",
            HeatmapZone::BottomCenter => "bottom-center",
            HeatmapZone::BottomRight => "bottom-right",
        }
    }

    /// Vertical band of the zone: `top`, `middle` or `bottom`
    pub fn vertical(&self) -> &'static str {
        match self {
            HeatmapZone::TopLeft | HeatmapZone::TopCenter | HeatmapZone::TopRight => "top",
            HeatmapZone::MiddleLeft | HeatmapZone::MiddleCenter | HeatmapZone::MiddleRight => {
                "middle"
            }
            HeatmapZone::BottomLeft | HeatmapZone::BottomCenter | HeatmapZone::BottomRight => {
                "bottom"
            }
        }
    }
}

impl fmt::Display for HeatmapZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running click count for one heatmap zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneCount {
    pub zone: HeatmapZone,
    pub count: u32,
}

/// Aggregates derived from the buffered events; recomputed on every read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Clicks currently held in the click buffer
    pub total_clicks: u32,
    /// Sum of absolute offsets between consecutive scroll samples
    pub total_scroll_distance: f64,
    pub max_scroll_depth: f64,
    /// Mean duration of completed page visits, 0 when none completed
    pub average_visit_duration_ms: f64,
    /// Heatmap zones, sorted by descending count
    pub heatmap_zones: Vec<ZoneCount>,
    /// Visited paths in visit order, oldest first
    pub navigation_path: Vec<String>,
}

/// Full in-memory behavioral log for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub clicks: Vec<ClickEvent>,
    pub scroll_samples: Vec<ScrollSample>,
    /// Completed visits followed by the open visit, if any
    pub page_visits: Vec<PageVisit>,
    pub hovers: Vec<HoverEvent>,
    pub interactions: Vec<ElementInteraction>,
    pub metrics: Metrics,
}

/// Bounded, transport-sized projection of a session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactSummary {
    pub session_id: String,
    pub user_id: String,
    /// Elapsed session time in milliseconds
    pub duration: i64,
    pub click_count: u32,
    pub max_scroll_depth: f64,
    pub pages_visited: usize,
    pub recent_clicks: Vec<ClickEvent>,
    pub recent_interactions: Vec<ElementInteraction>,
    pub heatmap_zones: Vec<ZoneCount>,
    pub navigation_path: Vec<String>,
}
