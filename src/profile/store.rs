//! Profile store
//!
//! Absence is never an error: `get` hands back a fresh empty profile for an
//! unknown user, and a storage failure is logged and treated the same way so
//! the session keeps going.

use crate::clock::{Clock, SystemClock};
use crate::error::TelemetryError;
use crate::profile::types::Profile;
use crate::storage::Storage;
use tracing::{debug, warn};

/// Keyed access to durable user profiles
pub struct ProfileStore<S: Storage, C: Clock = SystemClock> {
    storage: S,
    clock: C,
}

impl<S: Storage> ProfileStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: Storage, C: Clock> ProfileStore<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self { storage, clock }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Stored profile, or a new empty one.
    ///
    /// A newly created profile is persisted on a best-effort basis.
    pub fn get(&self, user_id: &str) -> Profile {
        match self.storage.load_profile(user_id) {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                let profile = Profile::empty(user_id, self.clock.now());
                if let Err(e) = self.storage.save_profile(&profile) {
                    warn!(user_id, error = %e, "failed to persist new profile");
                } else {
                    debug!(user_id, "created empty profile");
                }
                profile
            }
            Err(e) => {
                warn!(user_id, error = %e, "failed to load profile, using empty profile");
                Profile::empty(user_id, self.clock.now())
            }
        }
    }

    /// Replace the stored record wholesale
    pub fn put(&self, profile: &Profile) -> Result<(), TelemetryError> {
        self.storage.save_profile(profile)
    }

    /// Reset to an empty profile with refreshed timestamps. The user id stays
    /// known.
    pub fn clear(&self, user_id: &str) -> Result<Profile, TelemetryError> {
        let profile = Profile::empty(user_id, self.clock.now());
        self.storage.save_profile(&profile)?;
        debug!(user_id, "profile cleared");
        Ok(profile)
    }
}
