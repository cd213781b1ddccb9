//! Editing engine over the block document.
//!
//! # Responsibility
//! - Apply cursor-aware structural edits (insert, remove, split, merge,
//!   transform, collapse, check, renumber, markdown shortcuts).
//! - Report where focus should land after every operation.
//!
//! # Invariants
//! - Operations validate before mutating; a rejected operation leaves the
//!   document untouched.
//! - Every structural change renumbers the affected sibling list.
//! - Every mutation advances the document generation.
//! - No operation performs I/O.
//!
//! # See also
//! - docs/architecture/editing-engine.md

use crate::model::block::{Block, BlockId, BlockKind};
use crate::model::cursor::Cursor;
use crate::model::document::Document;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod ops;
mod shortcut;

pub use ops::{
    append_media, delete_backward, insert_after, insert_media, insert_text, merge_with_previous,
    remove_block, renumber, set_checked, split_at, toggle_collapsed, transform,
};
pub use shortcut::{apply_markdown_shortcut, shortcut_kind};

pub type EditResult<T> = Result<T, EditError>;

/// Structural rule an operation would have broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Removing the only top-level block.
    LastBlock,
    /// Text operation on a block without a text run.
    NotTextBearing(BlockKind),
    /// Media blocks are never transformed.
    MediaImmutable,
    /// Media kinds are created only from upload results.
    MediaRequiresUpload(BlockKind),
}

impl Violation {
    /// Stable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::LastBlock => "last_block",
            Self::NotTextBearing(_) => "not_text_bearing",
            Self::MediaImmutable => "media_immutable",
            Self::MediaRequiresUpload(_) => "media_requires_upload",
        }
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LastBlock => write!(f, "document must keep at least one block"),
            Self::NotTextBearing(kind) => write!(f, "`{kind}` blocks carry no text"),
            Self::MediaImmutable => write!(f, "media blocks cannot be changed"),
            Self::MediaRequiresUpload(kind) => {
                write!(f, "`{kind}` blocks can only be created from an upload")
            }
        }
    }
}

/// Engine error for block edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Target block id is not part of the document.
    BlockNotFound(BlockId),
    /// Operation rejected; the document is unchanged.
    InvariantViolation(Violation),
}

impl EditError {
    /// Short message suitable for a status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BlockNotFound(_) => "That block no longer exists.",
            Self::InvariantViolation(_) => "That edit is not possible here.",
        }
    }
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlockNotFound(id) => write!(f, "block not found: {id}"),
            Self::InvariantViolation(violation) => write!(f, "invariant violation: {violation}"),
        }
    }
}

impl Error for EditError {}

impl From<Violation> for EditError {
    fn from(value: Violation) -> Self {
        Self::InvariantViolation(value)
    }
}

/// Side effect the host must carry out; the engine never performs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditEffect {
    /// Create a child note for the given `page` request.
    CreateSubpage { block_id: BlockId },
}

/// Result of an accepted operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Where the cursor should land.
    pub focus: Cursor,
    /// Whether the document was mutated.
    pub changed: bool,
    pub effect: Option<EditEffect>,
}

impl EditOutcome {
    pub(crate) fn changed(focus: Cursor) -> Self {
        Self {
            focus,
            changed: true,
            effect: None,
        }
    }

    pub(crate) fn unchanged(focus: Cursor) -> Self {
        Self {
            focus,
            changed: false,
            effect: None,
        }
    }
}

pub(crate) fn require<'doc>(doc: &'doc Document, id: &BlockId) -> EditResult<&'doc Block> {
    doc.get(id)
        .ok_or_else(|| EditError::BlockNotFound(id.clone()))
}
