//! Editor session use-case service.
//!
//! # Responsibility
//! - Open one note through a [`NoteStore`] and own its editing state.
//! - Route edits through the engine and keyboard router, then schedule
//!   autosave whenever the document changed.
//! - Drive AI restructuring through the bridge.
//!
//! # Invariants
//! - The session cursor always names a block of the current document.
//! - Every accepted mutation (and every title change) notifies autosave.
//! - `close` writes any pending snapshot before the session ends.
//!
//! # See also
//! - docs/architecture/editor-session.md

use crate::autosave::{AutosaveError, AutosaveScheduler, SaveRequest, SaveStatus};
use crate::config::{ConfigError, EditorConfig};
use crate::engine::{self, EditError, EditOutcome, EditResult};
use crate::keyboard::{KeyEvent, KeyboardRouter, RouteOutcome};
use crate::model::block::{BlockId, BlockKind, MediaKind, MediaRef};
use crate::model::cursor::Cursor;
use crate::model::document::Document;
use crate::repo::note_store::{NoteStore, StoreError};
use crate::restructure::{
    PendingRestructure, RestructureBridge, RestructureError, RestructureReply,
    StructuringService,
};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::watch;

/// Session-level error wrapping the component failures.
#[derive(Debug)]
pub enum SessionError {
    Config(ConfigError),
    Store(StoreError),
    Edit(EditError),
    Autosave(AutosaveError),
    Restructure(RestructureError),
}

impl SessionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Store(err) => err.user_message(),
            Self::Edit(err) => err.user_message(),
            Self::Autosave(err) => err.user_message(),
            Self::Restructure(err) => err.user_message(),
        }
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Edit(err) => write!(f, "{err}"),
            Self::Autosave(err) => write!(f, "{err}"),
            Self::Restructure(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Edit(err) => Some(err),
            Self::Autosave(err) => Some(err),
            Self::Restructure(err) => Some(err),
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<EditError> for SessionError {
    fn from(value: EditError) -> Self {
        Self::Edit(value)
    }
}

impl From<AutosaveError> for SessionError {
    fn from(value: AutosaveError) -> Self {
        Self::Autosave(value)
    }
}

impl From<RestructureError> for SessionError {
    fn from(value: RestructureError) -> Self {
        Self::Restructure(value)
    }
}

/// One open note: title, document, cursor and the per-note workers.
pub struct EditorSession<S>
where
    S: NoteStore + 'static,
{
    note_id: String,
    title: String,
    document: Document,
    cursor: Cursor,
    router: KeyboardRouter,
    autosave: AutosaveScheduler,
    restructure: RestructureBridge,
    _store: Arc<S>,
}

impl<S> EditorSession<S>
where
    S: NoteStore + 'static,
{
    /// Loads `note_id` from `store` and starts its autosave worker.
    ///
    /// A missing note or an empty block array opens as one empty text block.
    ///
    /// # Errors
    /// - `Config` when `config` fails validation.
    /// - `Store` when the stored note cannot be read.
    ///
    /// # Panics
    /// - When called outside a tokio runtime.
    pub fn open(
        store: Arc<S>,
        note_id: impl Into<String>,
        config: &EditorConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let note_id = note_id.into();
        let stored = store.load(&note_id)?;

        let (title, document) = match stored {
            Some(note) if !note.blocks.is_empty() => {
                (note.title, Document::from_snapshot(&note.blocks))
            }
            Some(note) => (note.title, Document::new()),
            None => (String::new(), Document::new()),
        };
        let cursor = first_block_cursor(&document);
        info!(
            "event=session_open module=service status=ok blocks={}",
            document.len()
        );

        Ok(Self {
            note_id,
            title,
            cursor,
            router: KeyboardRouter::new(config.list_exit_policy),
            autosave: AutosaveScheduler::spawn(Arc::clone(&store), config.autosave_quiet()),
            restructure: RestructureBridge::new(config.restructure_max_input_chars),
            document,
            _store: store,
        })
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn save_status(&self) -> SaveStatus {
        self.autosave.status()
    }

    pub fn subscribe_save_status(&self) -> watch::Receiver<SaveStatus> {
        self.autosave.subscribe()
    }

    /// Moves the cursor; unknown blocks fall back to the first block.
    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
        self.resolve_cursor();
    }

    /// Routes one key event at the current cursor.
    pub fn handle_key(&mut self, event: &KeyEvent) -> Result<RouteOutcome, SessionError> {
        self.resolve_cursor();
        match self.router.route(&mut self.document, &self.cursor, event) {
            Ok(outcome) => {
                self.cursor = outcome.cursor.clone();
                if outcome.document_changed {
                    self.schedule_save()?;
                }
                Ok(outcome)
            }
            Err(err) => {
                self.resolve_cursor();
                Err(err.into())
            }
        }
    }

    /// Renames the note; an unchanged title is not saved again.
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), SessionError> {
        let title = title.into();
        if title == self.title {
            return Ok(());
        }
        self.title = title;
        self.schedule_save()
    }

    pub fn transform_block(
        &mut self,
        id: &BlockId,
        kind: BlockKind,
    ) -> Result<EditOutcome, SessionError> {
        let result = engine::transform(&mut self.document, id, kind);
        self.commit(result)
    }

    pub fn insert_block_after(
        &mut self,
        anchor: &BlockId,
        kind: Option<BlockKind>,
    ) -> Result<EditOutcome, SessionError> {
        let result = engine::insert_after(&mut self.document, anchor, kind);
        self.commit(result)
    }

    pub fn remove_block(&mut self, id: &BlockId) -> Result<EditOutcome, SessionError> {
        let result = engine::remove_block(&mut self.document, id);
        self.commit(result)
    }

    pub fn toggle_collapsed(&mut self, id: &BlockId) -> Result<EditOutcome, SessionError> {
        let result = engine::toggle_collapsed(&mut self.document, id);
        self.commit(result)
    }

    pub fn set_checked(&mut self, id: &BlockId, value: bool) -> Result<EditOutcome, SessionError> {
        let result = engine::set_checked(&mut self.document, id, value);
        self.commit(result)
    }

    /// Appends an uploaded media block at the end of the document.
    pub fn attach_media(
        &mut self,
        kind: MediaKind,
        media: MediaRef,
    ) -> Result<EditOutcome, SessionError> {
        let outcome = engine::append_media(&mut self.document, kind, media);
        self.commit(Ok(outcome))
    }

    pub fn insert_media_after(
        &mut self,
        anchor: &BlockId,
        kind: MediaKind,
        media: MediaRef,
    ) -> Result<EditOutcome, SessionError> {
        let result = engine::insert_media(&mut self.document, anchor, kind, media);
        self.commit(result)
    }

    /// Writes the current snapshot now, bypassing the quiet interval.
    pub async fn save_now(&self) -> Result<(), SessionError> {
        self.autosave.flush_now(self.save_request()).await?;
        Ok(())
    }

    /// Captures the document for a restructure round-trip.
    ///
    /// `Ok(None)` means there is no text to restructure.
    pub fn begin_restructure(&self) -> Result<Option<PendingRestructure>, SessionError> {
        Ok(self.restructure.prepare(&self.document)?)
    }

    /// Applies a reply obtained from [`PendingRestructure::fetch`].
    pub fn finish_restructure(
        &mut self,
        reply: RestructureReply,
    ) -> Result<EditOutcome, SessionError> {
        let outcome = reply.apply(&mut self.document)?;
        self.cursor = outcome.focus.clone();
        self.schedule_save()?;
        Ok(outcome)
    }

    /// Runs a full restructure with no edits in between.
    ///
    /// Returns `Ok(None)` when the document has no text.
    pub async fn restructure_with<T>(
        &mut self,
        service: &T,
    ) -> Result<Option<EditOutcome>, SessionError>
    where
        T: StructuringService + ?Sized,
    {
        let Some(pending) = self.begin_restructure()? else {
            return Ok(None);
        };
        let reply = pending.fetch(service).await?;
        self.finish_restructure(reply).map(Some)
    }

    /// Writes any pending snapshot and stops the autosave worker.
    pub async fn close(mut self) -> Result<(), SessionError> {
        let result = self.autosave.shutdown().await;
        match &result {
            Ok(()) => info!("event=session_close module=service status=ok"),
            Err(err) => warn!(
                "event=session_close module=service status=error error={}",
                err
            ),
        }
        Ok(result?)
    }

    /// Applies an engine result to the session.
    ///
    /// Rejected edits come back as unchanged outcomes at the current cursor;
    /// only `BlockNotFound` reaches the caller.
    fn commit(&mut self, result: EditResult<EditOutcome>) -> Result<EditOutcome, SessionError> {
        match result {
            Ok(outcome) => {
                self.cursor = outcome.focus.clone();
                if outcome.changed {
                    self.schedule_save()?;
                }
                Ok(outcome)
            }
            Err(EditError::InvariantViolation(violation)) => {
                warn!(
                    "event=session_edit module=service status=rejected reason={}",
                    violation.code()
                );
                self.resolve_cursor();
                Ok(EditOutcome::unchanged(self.cursor.clone()))
            }
            Err(err) => {
                self.resolve_cursor();
                Err(err.into())
            }
        }
    }

    fn save_request(&self) -> SaveRequest {
        SaveRequest {
            note_id: self.note_id.clone(),
            title: self.title.clone(),
            blocks: self.document.to_snapshot(),
            generation: self.document.generation(),
        }
    }

    fn schedule_save(&self) -> Result<(), SessionError> {
        self.autosave.notify(self.save_request())?;
        Ok(())
    }

    fn resolve_cursor(&mut self) {
        if self.document.contains(&self.cursor.block_id) {
            return;
        }
        warn!("event=cursor_resolve module=service status=fallback reason=block_not_found");
        self.cursor = first_block_cursor(&self.document);
    }
}

fn first_block_cursor(document: &Document) -> Cursor {
    match document.first_block_id() {
        Some(id) => Cursor::start_of(id.clone()),
        None => Cursor::start_of(document.fresh_id()),
    }
}
