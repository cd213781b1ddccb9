//! Note store contract and implementations.
//!
//! # Responsibility
//! - Define the single persistence contract the editor needs:
//!   load one note, save one note's title and block array.
//! - Provide SQLite and in-memory implementations.
//!
//! # Invariants
//! - `save` replaces the whole stored block array (upsert by note id).
//! - Stored content is the persisted JSON block array, never the arena.
//! - Implementations are `Send + Sync` so the autosave worker can share them.
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::snapshot::BlockSnapshot;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence error for note load/save.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Block payload could not be encoded or decoded.
    Encoding(serde_json::Error),
    /// Connection is not migrated to the schema this binary expects.
    SchemaNotReady { found: u32, expected: u32 },
    /// A writer panicked while holding the store lock.
    LockPoisoned,
    /// Backend-specific failure with a message.
    Unavailable(String),
}

impl StoreError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Encoding(_) => "This note's content could not be read.",
            _ => "Your note could not be saved. Changes are kept and will be retried.",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encoding(err) => write!(f, "invalid note payload: {err}"),
            Self::SchemaNotReady { found, expected } => write!(
                f,
                "database schema version {found} does not match expected {expected}"
            ),
            Self::LockPoisoned => write!(f, "note store lock poisoned"),
            Self::Unavailable(message) => write!(f, "note store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encoding(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encoding(value)
    }
}

/// Title plus block array of one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub title: String,
    pub blocks: Vec<BlockSnapshot>,
}

/// Persistence contract used by the editor session and autosave worker.
pub trait NoteStore: Send + Sync {
    /// Loads one note; `None` when nothing was stored under `note_id`.
    fn load(&self, note_id: &str) -> StoreResult<Option<StoredNote>>;
    /// Replaces title and block array of one note.
    fn save(&self, note_id: &str, title: &str, blocks: &[BlockSnapshot]) -> StoreResult<()>;
}

/// SQLite-backed note store over the `notes` table.
pub struct SqliteNoteStore {
    conn: Mutex<Connection>,
}

impl SqliteNoteStore {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    ///
    /// # Errors
    /// - `SchemaNotReady` when migrations were not applied.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_schema_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored notes.
    pub fn count(&self) -> StoreResult<u64> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

impl NoteStore for SqliteNoteStore {
    fn load(&self, note_id: &str) -> StoreResult<Option<StoredNote>> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT title, content_json FROM notes WHERE note_id = ?1;",
                params![note_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(title, content_json)| -> StoreResult<StoredNote> {
            let blocks: Vec<BlockSnapshot> = serde_json::from_str(&content_json)?;
            Ok(StoredNote { title, blocks })
        })
        .transpose()
    }

    fn save(&self, note_id: &str, title: &str, blocks: &[BlockSnapshot]) -> StoreResult<()> {
        let content_json = serde_json::to_string(blocks)?;
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO notes (note_id, title, content_json, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(note_id) DO UPDATE SET
                title = excluded.title,
                content_json = excluded.content_json,
                updated_at = excluded.updated_at;",
            params![note_id, title, content_json, now_epoch_ms()],
        )?;
        Ok(())
    }
}

/// In-process note store keyed by note id.
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    notes: Mutex<HashMap<String, StoredNote>>,
    saves: Mutex<u64>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one note without counting it as a save.
    pub fn insert(&self, note_id: impl Into<String>, note: StoredNote) -> StoreResult<()> {
        let mut notes = self.notes.lock().map_err(|_| StoreError::LockPoisoned)?;
        notes.insert(note_id.into(), note);
        Ok(())
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> u64 {
        self.saves.lock().map_or(0, |saves| *saves)
    }
}

impl NoteStore for MemoryNoteStore {
    fn load(&self, note_id: &str) -> StoreResult<Option<StoredNote>> {
        let notes = self.notes.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(notes.get(note_id).cloned())
    }

    fn save(&self, note_id: &str, title: &str, blocks: &[BlockSnapshot]) -> StoreResult<()> {
        let mut notes = self.notes.lock().map_err(|_| StoreError::LockPoisoned)?;
        notes.insert(
            note_id.to_string(),
            StoredNote {
                title: title.to_string(),
                blocks: blocks.to_vec(),
            },
        );
        let mut saves = self.saves.lock().map_err(|_| StoreError::LockPoisoned)?;
        *saves += 1;
        Ok(())
    }
}

fn ensure_schema_ready(conn: &Connection) -> StoreResult<()> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected = latest_version();
    if found != expected {
        return Err(StoreError::SchemaNotReady { found, expected });
    }
    Ok(())
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
