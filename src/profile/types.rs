//! User profile data types

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One category's entries, keyed by free-form preference key
pub type CategoryMap = BTreeMap<String, PreferenceEntry>;

/// The five fixed profile categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileCategory {
    Preferences,
    Interests,
    Context,
    Demographic,
    Behavior,
}

impl ProfileCategory {
    pub const ALL: [ProfileCategory; 5] = [
        ProfileCategory::Preferences,
        ProfileCategory::Interests,
        ProfileCategory::Context,
        ProfileCategory::Demographic,
        ProfileCategory::Behavior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileCategory::Preferences => "preferences",
            ProfileCategory::Interests => "interests",
            ProfileCategory::Context => "context",
            ProfileCategory::Demographic => "demographic",
            ProfileCategory::Behavior => "behavior",
        }
    }
}

impl fmt::Display for ProfileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown category name in a field path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown profile category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for ProfileCategory {
    type Err = UnknownCategory;

    /// Accepts the canonical names plus the singular forms inference prompts
    /// tend to emit (`preference.detail_level`, `interest.topic`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preferences" | "preference" => Ok(ProfileCategory::Preferences),
            "interests" | "interest" => Ok(ProfileCategory::Interests),
            "context" => Ok(ProfileCategory::Context),
            "demographic" | "demographics" => Ok(ProfileCategory::Demographic),
            "behavior" | "behaviour" => Ok(ProfileCategory::Behavior),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// A single `(value, confidence, timestamp)` fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub value: serde_json::Value,
    /// 0-1
    pub confidence: f64,
    pub updated_at: DateTime<Utc>,
}

/// Durable per-user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub preferences: CategoryMap,
    #[serde(default)]
    pub interests: CategoryMap,
    #[serde(default)]
    pub context: CategoryMap,
    #[serde(default)]
    pub demographic: CategoryMap,
    #[serde(default)]
    pub behavior: CategoryMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A profile with all five categories empty
    pub fn empty(user_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            preferences: CategoryMap::new(),
            interests: CategoryMap::new(),
            context: CategoryMap::new(),
            demographic: CategoryMap::new(),
            behavior: CategoryMap::new(),
            created_at: at,
            updated_at: at,
        }
    }

    pub fn category(&self, category: ProfileCategory) -> &CategoryMap {
        match category {
            ProfileCategory::Preferences => &self.preferences,
            ProfileCategory::Interests => &self.interests,
            ProfileCategory::Context => &self.context,
            ProfileCategory::Demographic => &self.demographic,
            ProfileCategory::Behavior => &self.behavior,
        }
    }

    pub fn category_mut(&mut self, category: ProfileCategory) -> &mut CategoryMap {
        match category {
            ProfileCategory::Preferences => &mut self.preferences,
            ProfileCategory::Interests => &mut self.interests,
            ProfileCategory::Context => &mut self.context,
            ProfileCategory::Demographic => &mut self.demographic,
            ProfileCategory::Behavior => &mut self.behavior,
        }
    }

    /// Look up an entry by category and key
    pub fn entry(&self, category: ProfileCategory, key: &str) -> Option<&PreferenceEntry> {
        self.category(category).get(key)
    }

    /// Total number of entries across all categories
    pub fn entry_count(&self) -> usize {
        ProfileCategory::ALL
            .iter()
            .map(|c| self.category(*c).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }
}

/// A field update proposed by the remote inference step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedUpdate {
    /// `category.key`
    pub field: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub confidence: f64,
    /// Source timestamp; merge time is used when absent or unparseable
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}

impl ProposedUpdate {
    pub fn new(
        field: impl Into<String>,
        value: serde_json::Value,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            field: field.into(),
            value,
            confidence,
            timestamp: Some(timestamp),
        }
    }

    /// Split `category.key`. Exactly two non-empty parts are required.
    pub fn split_field(&self) -> Option<(&str, &str)> {
        let mut parts = self.field.split('.');
        let category = parts.next()?;
        let key = parts.next()?;
        if parts.next().is_some() || category.is_empty() || key.is_empty() {
            return None;
        }
        Some((category, key))
    }
}

/// Flattened entry as sent to the inference boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEntry {
    pub value: serde_json::Value,
    pub confidence: f64,
    pub updated_at: DateTime<Utc>,
}

impl From<&PreferenceEntry> for ApiEntry {
    fn from(entry: &PreferenceEntry) -> Self {
        Self {
            value: entry.value.clone(),
            confidence: entry.confidence,
            updated_at: entry.updated_at,
        }
    }
}

/// Profile snapshot in the shape the remote inference service reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProfile {
    pub user_id: String,
    pub preferences: BTreeMap<String, ApiEntry>,
    pub interests: BTreeMap<String, ApiEntry>,
    pub context: BTreeMap<String, ApiEntry>,
    pub demographic: BTreeMap<String, ApiEntry>,
    pub behavior: BTreeMap<String, ApiEntry>,
    #[serde(rename = "history_summary")]
    pub history_summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of applying a batch of proposed updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    /// The merged (and persisted) profile
    pub profile: Profile,
    /// Updates that replaced or created an entry
    pub applied: usize,
    /// Updates that lost the confidence gate
    pub rejected: usize,
    /// Updates skipped for a malformed field path, unknown category or
    /// non-finite confidence
    pub malformed: usize,
}
