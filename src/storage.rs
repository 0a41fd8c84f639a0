//! Durable keyed storage
//!
//! Two keyed stores: user id → profile, session id → conversation history.
//! Records are kept as JSON documents. Writes are last-write-wins; there is no
//! versioning against concurrent writers sharing one key.

use crate::conversation::ConversationHistory;
use crate::error::TelemetryError;
use crate::profile::types::Profile;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Current on-disk schema version
pub const SCHEMA_VERSION: i64 = 1;

/// Backend for profile and conversation persistence
pub trait Storage {
    fn load_profile(&self, user_id: &str) -> Result<Option<Profile>, TelemetryError>;
    fn save_profile(&self, profile: &Profile) -> Result<(), TelemetryError>;
    fn load_conversation(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationHistory>, TelemetryError>;
    fn save_conversation(&self, history: &ConversationHistory) -> Result<(), TelemetryError>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn load_profile(&self, user_id: &str) -> Result<Option<Profile>, TelemetryError> {
        (**self).load_profile(user_id)
    }

    fn save_profile(&self, profile: &Profile) -> Result<(), TelemetryError> {
        (**self).save_profile(profile)
    }

    fn load_conversation(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationHistory>, TelemetryError> {
        (**self).load_conversation(session_id)
    }

    fn save_conversation(&self, history: &ConversationHistory) -> Result<(), TelemetryError> {
        (**self).save_conversation(history)
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local storage, mainly for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStorage {
    profiles: Mutex<HashMap<String, String>>,
    conversations: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(map: &Mutex<HashMap<String, String>>, key: &str) -> Result<Option<String>, TelemetryError> {
        let guard = map
            .lock()
            .map_err(|e| TelemetryError::LockPoisoned(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn put(map: &Mutex<HashMap<String, String>>, key: &str, json: String) -> Result<(), TelemetryError> {
        let mut guard = map
            .lock()
            .map_err(|e| TelemetryError::LockPoisoned(e.to_string()))?;
        guard.insert(key.to_string(), json);
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn load_profile(&self, user_id: &str) -> Result<Option<Profile>, TelemetryError> {
        match Self::get(&self.profiles, user_id)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_profile(&self, profile: &Profile) -> Result<(), TelemetryError> {
        Self::put(&self.profiles, &profile.user_id, serde_json::to_string(profile)?)
    }

    fn load_conversation(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationHistory>, TelemetryError> {
        match Self::get(&self.conversations, session_id)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_conversation(&self, history: &ConversationHistory) -> Result<(), TelemetryError> {
        Self::put(
            &self.conversations,
            &history.session_id,
            serde_json::to_string(history)?,
        )
    }
}

// ============================================================================
// SQLite backend
// ============================================================================

/// SQLite-backed storage (one file per local storage scope)
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self, TelemetryError> {
        let conn = Connection::open(path)?;
        initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, TelemetryError> {
        let conn = Connection::open_in_memory()?;
        initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Number of stored profiles
    pub fn profile_count(&self) -> Result<usize, TelemetryError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn initialize(conn: &Connection) -> Result<(), TelemetryError> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.busy_timeout(Duration::from_secs(5))?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profiles (
            user_id    TEXT PRIMARY KEY,
            data       TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS conversations (
            session_id TEXT PRIMARY KEY,
            data       TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        params![SCHEMA_VERSION.to_string()],
    )?;
    debug!(version = SCHEMA_VERSION, "storage schema ready");
    Ok(())
}

impl Storage for SqliteStorage {
    fn load_profile(&self, user_id: &str) -> Result<Option<Profile>, TelemetryError> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM profiles WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_profile(&self, profile: &Profile) -> Result<(), TelemetryError> {
        let data = serde_json::to_string(profile)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO profiles (user_id, data, updated_at) VALUES (?1, ?2, ?3)",
            params![profile.user_id, data, profile.updated_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn load_conversation(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationHistory>, TelemetryError> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM conversations WHERE session_id = ?1",
                [session_id],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_conversation(&self, history: &ConversationHistory) -> Result<(), TelemetryError> {
        let data = serde_json::to_string(history)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO conversations (session_id, data, updated_at) VALUES (?1, ?2, ?3)",
            params![history.session_id, data, history.updated_at.to_rfc3339()],
        )?;
        Ok(())
    }
}
