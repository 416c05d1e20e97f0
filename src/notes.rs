//! # Location Notes
//!
//! Free-text notes and an ordered list of links per location, stored as a
//! single JSON blob under one fixed key.
//!
//! Entries are keyed by the location display string, so two places that
//! share a name share notes. The blob is read once when the store opens
//! (missing or corrupt data gives an empty store) and rewritten after
//! every change. A failed write is reported to the caller but the change
//! stays in memory.

use std::collections::{BTreeMap, HashMap};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ItineraryError, Result};

/// Storage key holding the serialized notes map.
pub const NOTES_STORAGE_KEY: &str = "itinerary-notes";

/// A titled link attached to a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteLink {
    pub title: String,
    pub url: String,
}

/// Notes saved for one location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesEntry {
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub urls: Vec<NoteLink>,
}

impl NotesEntry {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.urls.is_empty()
    }
}

// ============================================================================
// Backends
// ============================================================================

/// Key-value storage for the notes blob.
pub trait NotesBackend {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process storage; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    values: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a key, e.g. with a blob written by an earlier session.
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut backend = Self::new();
        backend.values.insert(key.to_string(), value.to_string());
        backend
    }
}

impl NotesBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(feature = "persistence")]
pub use self::sqlite::SqliteBackend;

#[cfg(feature = "persistence")]
mod sqlite {
    use std::path::Path;

    use rusqlite::{params, Connection, OptionalExtension};

    use super::NotesBackend;
    use crate::error::Result;

    /// SQLite file with a single key-value table.
    pub struct SqliteBackend {
        db: Connection,
    }

    impl SqliteBackend {
        /// Open (or create) the database at `path`.
        pub fn open(path: impl AsRef<Path>) -> Result<Self> {
            let db = Connection::open(path)?;
            Self::init_schema(&db)?;
            Ok(Self { db })
        }

        /// Create an in-memory database (for testing).
        pub fn in_memory() -> Result<Self> {
            Self::open(":memory:")
        }

        fn init_schema(conn: &Connection) -> Result<()> {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS kv_store (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER DEFAULT (strftime('%s', 'now'))
                );
                "#,
            )?;
            Ok(())
        }
    }

    impl NotesBackend for SqliteBackend {
        fn read(&self, key: &str) -> Result<Option<String>> {
            let value = self
                .db
                .query_row(
                    "SELECT value FROM kv_store WHERE key = ?",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(value)
        }

        fn write(&mut self, key: &str, value: &str) -> Result<()> {
            self.db.execute(
                "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
                 VALUES (?, ?, strftime('%s', 'now'))",
                params![key, value],
            )?;
            Ok(())
        }
    }
}

// ============================================================================
// Notes Store
// ============================================================================

/// Per-location notes backed by a [`NotesBackend`].
pub struct NotesStore<B: NotesBackend> {
    backend: B,
    entries: BTreeMap<String, NotesEntry>,
}

impl<B: NotesBackend> NotesStore<B> {
    /// Open the store, loading whatever the backend holds.
    ///
    /// Unreadable or corrupt data is logged and treated as empty.
    pub fn open(backend: B) -> Self {
        let entries = match backend.read(NOTES_STORAGE_KEY) {
            Ok(Some(blob)) => match serde_json::from_str::<BTreeMap<String, NotesEntry>>(&blob) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("[NotesStore] Discarding corrupt notes blob: {}", e);
                    BTreeMap::new()
                }
            },
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!("[NotesStore] Could not read notes: {}", e);
                BTreeMap::new()
            }
        };
        info!("[NotesStore] Loaded notes for {} locations", entries.len());
        Self { backend, entries }
    }

    pub fn note(&self, location: &str) -> Option<&NotesEntry> {
        self.entries.get(location)
    }

    /// True if the location has a note or at least one link.
    pub fn has_notes(&self, location: &str) -> bool {
        self.entries.get(location).is_some_and(|e| !e.is_empty())
    }

    /// Locations with saved notes, sorted.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace a location's note text. An empty note on a location with
    /// no links removes the entry.
    pub fn set_note(&mut self, location: &str, text: &str) -> Result<()> {
        let entry = self.entries.entry(location.to_string()).or_default();
        entry.notes = text.to_string();
        if entry.is_empty() {
            self.entries.remove(location);
        }
        self.persist()
    }

    /// Append a link. A blank title falls back to the URL itself.
    pub fn add_link(&mut self, location: &str, title: &str, url: &str) -> Result<()> {
        let title = if title.trim().is_empty() { url } else { title };
        self.entries
            .entry(location.to_string())
            .or_default()
            .urls
            .push(NoteLink {
                title: title.to_string(),
                url: url.to_string(),
            });
        self.persist()
    }

    /// Remove the link at `index`. Returns `None` if there is no such link.
    pub fn remove_link(&mut self, location: &str, index: usize) -> Result<Option<NoteLink>> {
        let entry = self
            .entries
            .get_mut(location)
            .ok_or_else(|| ItineraryError::UnknownLocation(location.to_string()))?;
        if index >= entry.urls.len() {
            return Ok(None);
        }
        let removed = entry.urls.remove(index);
        if entry.is_empty() {
            self.entries.remove(location);
        }
        self.persist()?;
        Ok(Some(removed))
    }

    /// Delete everything saved for a location. Returns whether anything
    /// was there.
    pub fn clear_location(&mut self, location: &str) -> Result<bool> {
        if self.entries.remove(location).is_none() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Write the whole notes map to the backend.
    fn persist(&mut self) -> Result<()> {
        let blob = serde_json::to_string(&self.entries)?;
        self.backend.write(NOTES_STORAGE_KEY, &blob).map_err(|e| {
            warn!("[NotesStore] Notes not saved: {}", e);
            e
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}
