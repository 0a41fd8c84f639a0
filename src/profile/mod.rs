//! User profile module
//!
//! Durable per-user facts, each carrying a confidence, merged from proposed
//! updates through a strictly-greater confidence gate.

pub mod merge;
pub mod store;
pub mod types;

pub use merge::{merge_update, to_api_format, MergeOutcome, ProfileMerger};
pub use store::ProfileStore;
pub use types::{
    ApiEntry, ApiProfile, CategoryMap, MergeReport, PreferenceEntry, Profile, ProfileCategory,
    ProposedUpdate, UnknownCategory,
};
