//! Payloads exchanged with the remote inference service
//!
//! The engine does no network I/O. It builds the request body from a compact
//! summary, a flattened profile and recent dialogue, and accepts the update
//! instruction that comes back. The response is read leniently: unknown fields
//! are ignored and update entries that do not parse are dropped.

use crate::clock::Clock;
use crate::conversation::{ConversationHistory, MessageRole};
use crate::profile::merge::ProfileMerger;
use crate::profile::types::{ApiProfile, MergeReport, ProposedUpdate};
use crate::storage::Storage;
use crate::tracker::types::CompactSummary;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Dialogue message as sent on the wire (no timestamp)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Request body for one inference round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub query: String,
    pub user_profile: ApiProfile,
    #[serde(default)]
    pub conversation_history: Vec<WireMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior_data: Option<CompactSummary>,
}

impl InferenceRequest {
    pub fn build(
        query: impl Into<String>,
        behavior: Option<&CompactSummary>,
        profile: &ApiProfile,
        history: &ConversationHistory,
    ) -> Self {
        Self {
            query: query.into(),
            user_profile: profile.clone(),
            conversation_history: history
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
            behavior_data: behavior.cloned(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Whether, and how, the client should update its stored profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdateInstruction {
    #[serde(default)]
    pub should_update: bool,
    #[serde(default, deserialize_with = "deserialize_updates")]
    pub updates: Vec<ProposedUpdate>,
}

/// The parts of an inference response this engine consumes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    #[serde(default)]
    pub profile_updates: ProfileUpdateInstruction,
}

impl InferenceResponse {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn deserialize_updates<'de, D>(deserializer: D) -> Result<Vec<ProposedUpdate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ProposedUpdate>(value) {
            Ok(update) => Some(update),
            Err(e) => {
                debug!(error = %e, "dropping unparseable profile update");
                None
            }
        })
        .collect())
}

/// Apply an instruction through the merger.
///
/// Returns `None` without touching storage when `should_update` is false.
pub fn apply_instruction<S: Storage, C: Clock>(
    merger: &ProfileMerger<S, C>,
    user_id: &str,
    instruction: &ProfileUpdateInstruction,
) -> Option<MergeReport> {
    if !instruction.should_update {
        debug!(user_id, "instruction declined profile update");
        return None;
    }
    Some(merger.apply_updates(user_id, &instruction.updates))
}
