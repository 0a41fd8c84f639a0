//! Tracker configuration
//!
//! Every field has a default, so an empty JSON object (`{}`) is a valid
//! configuration. Values are checked by [`TrackerConfig::validate`] before a
//! tracker is built.

use crate::error::TelemetryError;
use serde::{Deserialize, Serialize};

/// Default capacity of each per-category event buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// Default scroll debounce window in milliseconds
pub const DEFAULT_SCROLL_DEBOUNCE_MS: u64 = 150;

/// Default minimum hover dwell in milliseconds
pub const DEFAULT_HOVER_THRESHOLD_MS: u64 = 500;

/// Clicks included in a compact summary
pub const DEFAULT_SUMMARY_CLICK_LIMIT: usize = 10;

/// Element interactions included in a compact summary
pub const DEFAULT_SUMMARY_INTERACTION_LIMIT: usize = 20;

/// Navigation path entries included in a compact summary
pub const DEFAULT_SUMMARY_NAVIGATION_LIMIT: usize = 10;

/// Upper bound for the debounce window and hover threshold (one hour)
pub const MAX_TIMER_MS: u64 = 3_600_000;

/// Messages kept per conversation
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Behavior tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Capacity of each event buffer (clicks, scrolls, hovers, visits, interactions)
    pub buffer_capacity: usize,
    /// Scroll debounce window
    pub scroll_debounce_ms: u64,
    /// Minimum hover dwell for a hover to be recorded (inclusive)
    pub hover_threshold_ms: u64,
    pub track_clicks: bool,
    pub track_scroll: bool,
    pub track_hovers: bool,
    pub track_page_visits: bool,
    pub summary_click_limit: usize,
    pub summary_interaction_limit: usize,
    pub summary_navigation_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            scroll_debounce_ms: DEFAULT_SCROLL_DEBOUNCE_MS,
            hover_threshold_ms: DEFAULT_HOVER_THRESHOLD_MS,
            track_clicks: true,
            track_scroll: true,
            track_hovers: true,
            track_page_visits: true,
            summary_click_limit: DEFAULT_SUMMARY_CLICK_LIMIT,
            summary_interaction_limit: DEFAULT_SUMMARY_INTERACTION_LIMIT,
            summary_navigation_limit: DEFAULT_SUMMARY_NAVIGATION_LIMIT,
        }
    }
}

impl TrackerConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, TelemetryError> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, TelemetryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations that would break buffer or timer invariants
    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.buffer_capacity == 0 {
            return Err(TelemetryError::InvalidConfig(
                "buffer_capacity must be at least 1".to_string(),
            ));
        }
        if self.scroll_debounce_ms == 0 {
            return Err(TelemetryError::InvalidConfig(
                "scroll_debounce_ms must be positive".to_string(),
            ));
        }
        if self.scroll_debounce_ms > MAX_TIMER_MS || self.hover_threshold_ms > MAX_TIMER_MS {
            return Err(TelemetryError::InvalidConfig(format!(
                "timer values must not exceed {} ms",
                MAX_TIMER_MS
            )));
        }
        if self.summary_click_limit == 0
            || self.summary_interaction_limit == 0
            || self.summary_navigation_limit == 0
        {
            return Err(TelemetryError::InvalidConfig(
                "summary limits must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
