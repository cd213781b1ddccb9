//! Core domain logic for the block note editor.
//! This crate is the single source of truth for document invariants; hosts
//! render blocks and forward input, everything else happens here.

pub mod autosave;
pub mod config;
pub mod db;
pub mod engine;
pub mod keyboard;
pub mod logging;
pub mod model;
pub mod repo;
pub mod restructure;
pub mod service;

pub use autosave::{AutosaveError, AutosaveScheduler, SaveRequest, SaveStatus};
pub use config::{load_config, save_config, ConfigError, EditorConfig};
pub use engine::{EditEffect, EditError, EditOutcome, EditResult, Violation};
pub use keyboard::{KeyEvent, KeyboardRouter, ListExitPolicy, RouteOutcome};
pub use logging::{
    default_log_level, init_logging, init_logging_with_config, logging_status, LoggingError,
};
pub use model::block::{Block, BlockContent, BlockId, BlockKind, MediaKind, MediaRef};
pub use model::catalog::{block_menu, filter_block_menu, MenuCategory, MenuItem};
pub use model::cursor::Cursor;
pub use model::document::{Document, Slot};
pub use model::snapshot::BlockSnapshot;
pub use repo::note_store::{
    MemoryNoteStore, NoteStore, SqliteNoteStore, StoreError, StoreResult, StoredNote,
};
pub use restructure::{
    Candidate, PendingRestructure, RestructureBridge, RestructureError, RestructureReply,
    StructureRequest, StructuringService,
};
pub use service::editor_service::{EditorSession, SessionError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
