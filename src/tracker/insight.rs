//! Offline heuristic insight over a compact summary
//!
//! A rule-based read of engagement, user type and attention pattern for when
//! no remote inference is available. The result can be turned into ordinary
//! proposed updates, which then pass the same confidence gate as remote ones.

use crate::profile::types::ProposedUpdate;
use crate::tracker::types::CompactSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Coarse browsing style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Explorer,
    Focused,
    Scanner,
    DeepReader,
    Casual,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Explorer => "explorer",
            UserType::Focused => "focused",
            UserType::Scanner => "scanner",
            UserType::DeepReader => "deep_reader",
            UserType::Casual => "casual",
        }
    }
}

/// Where on screen the user's clicks concentrate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttentionPattern {
    TopFocused,
    CenterFocused,
    BottomFocused,
    Balanced,
}

impl AttentionPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttentionPattern::TopFocused => "top-focused",
            AttentionPattern::CenterFocused => "center-focused",
            AttentionPattern::BottomFocused => "bottom-focused",
            AttentionPattern::Balanced => "balanced",
        }
    }
}

/// Heuristic read of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickInsight {
    /// 0-1
    pub engagement_score: f64,
    pub user_type: UserType,
    pub attention_pattern: AttentionPattern,
}

impl QuickInsight {
    /// Analyze a compact summary
    pub fn analyze(summary: &CompactSummary) -> Self {
        let duration_sec = summary.duration as f64 / 1000.0;

        Self {
            engagement_score: compute_engagement(
                duration_sec,
                summary.click_count,
                summary.max_scroll_depth,
                summary.pages_visited,
            ),
            user_type: classify_user_type(
                duration_sec,
                summary.click_count,
                summary.max_scroll_depth,
                summary.pages_visited,
            ),
            attention_pattern: summary
                .heatmap_zones
                .first()
                .map(|top| match top.zone.vertical() {
                    "top" => AttentionPattern::TopFocused,
                    "middle" => AttentionPattern::CenterFocused,
                    _ => AttentionPattern::BottomFocused,
                })
                .unwrap_or(AttentionPattern::Balanced),
        }
    }

    /// Express the insight as `behavior.*` updates at a fixed confidence
    pub fn to_updates(&self, confidence: f64, at: DateTime<Utc>) -> Vec<ProposedUpdate> {
        vec![
            ProposedUpdate::new(
                "behavior.user_type",
                json!(self.user_type.as_str()),
                confidence,
                at,
            ),
            ProposedUpdate::new(
                "behavior.attention_pattern",
                json!(self.attention_pattern.as_str()),
                confidence,
                at,
            ),
            ProposedUpdate::new(
                "behavior.engagement_score",
                json!(self.engagement_score),
                confidence,
                at,
            ),
        ]
    }
}

/// Five equally weighted engagement signals, 0.2 each
fn compute_engagement(duration_sec: f64, clicks: u32, depth: f64, pages: usize) -> f64 {
    let signals = [
        duration_sec > 30.0,
        duration_sec > 120.0,
        clicks > 5,
        depth > 50.0,
        pages > 2,
    ];
    let score = signals.iter().filter(|&&hit| hit).count() as f64 * 0.2;
    score.min(1.0)
}

/// First matching rule wins; `Casual` otherwise
fn classify_user_type(duration_sec: f64, clicks: u32, depth: f64, pages: usize) -> UserType {
    if pages > 5 && clicks > 10 {
        UserType::Explorer
    } else if depth > 80.0 && duration_sec > 60.0 {
        UserType::DeepReader
    } else if clicks > 15 && duration_sec < 60.0 {
        UserType::Scanner
    } else if pages <= 2 && depth > 50.0 {
        UserType::Focused
    } else {
        UserType::Casual
    }
}
