//! Confidence-gated profile merging
//!
//! An entry is only ever replaced by an update with strictly higher
//! confidence, so per key the profile is a high-water mark over time. Updates
//! come from a best-effort inference step; a malformed one is skipped and
//! counted, never surfaced as an error.

use crate::clock::{Clock, SystemClock};
use crate::profile::store::ProfileStore;
use crate::profile::types::{
    ApiEntry, ApiProfile, CategoryMap, MergeReport, PreferenceEntry, Profile, ProfileCategory,
    ProposedUpdate,
};
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Outcome of gating one update against a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    Rejected,
    Malformed,
}

/// Applies proposed updates to stored profiles
pub struct ProfileMerger<S: Storage, C: Clock = SystemClock> {
    store: ProfileStore<S, C>,
}

impl<S: Storage> ProfileMerger<S> {
    pub fn new(storage: S) -> Self {
        Self {
            store: ProfileStore::new(storage),
        }
    }
}

impl<S: Storage, C: Clock> ProfileMerger<S, C> {
    pub fn with_store(store: ProfileStore<S, C>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ProfileStore<S, C> {
        &self.store
    }

    /// Merge a batch of updates into the user's profile and persist it.
    ///
    /// The profile's `updated_at` is refreshed even if nothing was applied. A
    /// failed write is logged; the merged profile is still returned.
    pub fn apply_updates(&self, user_id: &str, updates: &[ProposedUpdate]) -> MergeReport {
        let mut profile = self.store.get(user_id);
        let now = self.store.clock().now();

        let mut report_counts = (0usize, 0usize, 0usize);
        for update in updates {
            match merge_update(&mut profile, update, now) {
                MergeOutcome::Applied => report_counts.0 += 1,
                MergeOutcome::Rejected => report_counts.1 += 1,
                MergeOutcome::Malformed => report_counts.2 += 1,
            }
        }
        profile.updated_at = now;

        if let Err(e) = self.store.put(&profile) {
            warn!(user_id, error = %e, "failed to persist merged profile");
        }

        let (applied, rejected, malformed) = report_counts;
        debug!(user_id, applied, rejected, malformed, "profile updates merged");

        MergeReport {
            profile,
            applied,
            rejected,
            malformed,
        }
    }

    /// Flattened profile for the inference boundary
    pub fn to_api_format(&self, profile: &Profile) -> ApiProfile {
        to_api_format(profile)
    }
}

/// Gate one update against a profile in memory.
///
/// `now` stamps updates that carry no timestamp of their own.
pub fn merge_update(
    profile: &mut Profile,
    update: &ProposedUpdate,
    now: DateTime<Utc>,
) -> MergeOutcome {
    let Some((category_name, key)) = update.split_field() else {
        debug!(field = %update.field, "skipping update with malformed field path");
        return MergeOutcome::Malformed;
    };

    let category: ProfileCategory = match category_name.parse() {
        Ok(category) => category,
        Err(e) => {
            debug!(field = %update.field, error = %e, "skipping update");
            return MergeOutcome::Malformed;
        }
    };

    if !update.confidence.is_finite() {
        debug!(field = %update.field, "skipping update with non-finite confidence");
        return MergeOutcome::Malformed;
    }
    let confidence = update.confidence.clamp(0.0, 1.0);

    let entries = profile.category_mut(category);
    // A missing entry counts as confidence 0
    let existing = entries.get(key).map_or(0.0, |e| e.confidence);
    if confidence <= existing {
        debug!(
            field = %update.field,
            existing,
            proposed = confidence,
            "update below confidence gate"
        );
        return MergeOutcome::Rejected;
    }

    entries.insert(
        key.to_string(),
        PreferenceEntry {
            value: update.value.clone(),
            confidence,
            updated_at: update.timestamp.unwrap_or(now),
        },
    );
    MergeOutcome::Applied
}

/// Flatten a profile and synthesize its free-text history summary.
///
/// Summary parts: `Interested in {key}: {value}` for each interest, then
/// `{key}: {value}` for each context entry, in key order, joined by `". "`.
pub fn to_api_format(profile: &Profile) -> ApiProfile {
    let mut parts: Vec<String> = profile
        .interests
        .iter()
        .map(|(key, entry)| format!("Interested in {}: {}", key, display_value(&entry.value)))
        .collect();
    parts.extend(
        profile
            .context
            .iter()
            .map(|(key, entry)| format!("{}: {}", key, display_value(&entry.value))),
    );

    ApiProfile {
        user_id: profile.user_id.clone(),
        preferences: flatten(&profile.preferences),
        interests: flatten(&profile.interests),
        context: flatten(&profile.context),
        demographic: flatten(&profile.demographic),
        behavior: flatten(&profile.behavior),
        history_summary: parts.join(". "),
        created_at: profile.created_at,
        updated_at: profile.updated_at,
    }
}

fn flatten(entries: &CategoryMap) -> BTreeMap<String, ApiEntry> {
    entries
        .iter()
        .map(|(key, entry)| (key.clone(), ApiEntry::from(entry)))
        .collect()
}

/// Strings render without quotes; everything else as compact JSON
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
