//! Behavior telemetry module
//!
//! Observes raw interaction signals in a running session and reduces them into
//! bounded aggregates.
//!
//! Flow: Signal → SignalSampler (debounce / dwell / visit bracketing)
//! → EventBuffer + SpatialBucketer → Metrics → CompactSummary

pub mod aggregator;
pub mod buffer;
pub mod heatmap;
pub mod insight;
pub mod metrics;
pub mod sampler;
pub mod types;

pub use aggregator::BehaviorAggregator;
pub use buffer::EventBuffer;
pub use heatmap::SpatialBucketer;
pub use insight::{AttentionPattern, QuickInsight, UserType};
pub use types::{
    ClickEvent, CompactSummary, ElementInteraction, HeatmapZone, HoverEvent, InteractionKind,
    Metrics, PageLocation, PageVisit, ScrollDirection, ScrollSample, SessionRecord, Signal,
    TargetDescriptor, ZoneCount,
};
