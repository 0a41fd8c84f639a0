//! GenUI Telemetry - on-device behavior telemetry and confidence-gated user profiles
//!
//! The engine observes raw interaction signals during a session and reduces
//! them into bounded aggregates, then merges remotely inferred facts into a
//! durable per-user profile:
//! signal sampling → bounded buffers + click heatmap → metrics → compact
//! summary → (remote inference) → confidence-gated profile merge.
//!
//! ## Modules
//!
//! - **Tracker**: session capture, sampling policies, metrics and summaries
//! - **Profile**: durable profiles, the confidence gate, the inference-facing view
//! - **Conversation**: bounded per-session message history
//! - **Exchange**: request/response payloads for the inference boundary

pub mod clock;
pub mod config;
pub mod conversation;
pub mod error;
pub mod exchange;
pub mod profile;
pub mod storage;
pub mod tracker;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use conversation::{ChatMessage, ConversationHistory, ConversationStore, MessageRole};
pub use error::TelemetryError;
pub use exchange::{apply_instruction, InferenceRequest, InferenceResponse, ProfileUpdateInstruction};
pub use profile::{ApiProfile, MergeReport, Profile, ProfileCategory, ProfileMerger, ProfileStore, ProposedUpdate};
pub use storage::{MemoryStorage, SqliteStorage, Storage};
pub use tracker::{BehaviorAggregator, CompactSummary, QuickInsight, SessionRecord, Signal};

/// Engine version
pub const TELEMETRY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by embedding surfaces
pub const PRODUCER_NAME: &str = "genui-telemetry";
