//! Markdown-style block shortcuts.
//!
//! A shortcut fires only when the whole block text equals one of the
//! triggers; the block is transformed and its text cleared.

use super::ops::transform;
use super::{require, EditOutcome, EditResult};
use crate::model::block::{Block, BlockId, BlockKind};
use crate::model::cursor::Cursor;
use crate::model::document::Document;

const SHORTCUTS: &[(&str, BlockKind)] = &[
    ("# ", BlockKind::Heading1),
    ("## ", BlockKind::Heading2),
    ("### ", BlockKind::Heading3),
    ("- ", BlockKind::Bullet),
    ("* ", BlockKind::Bullet),
    ("1. ", BlockKind::Numbered),
    ("[] ", BlockKind::Todo),
    ("[ ] ", BlockKind::Todo),
    ("> ", BlockKind::Quote),
    ("```", BlockKind::Code),
];

/// Kind triggered by `typed`, if it is an exact shortcut.
pub fn shortcut_kind(typed: &str) -> Option<BlockKind> {
    SHORTCUTS
        .iter()
        .find(|(trigger, _)| *trigger == typed)
        .map(|(_, kind)| *kind)
}

/// Applies the shortcut matching `typed` to block `id`.
///
/// Anything that is not an exact trigger leaves the block untouched.
pub fn apply_markdown_shortcut(
    doc: &mut Document,
    id: &BlockId,
    typed: &str,
) -> EditResult<EditOutcome> {
    let block = require(doc, id)?;
    let stay = Cursor::new(id.clone(), block.text_len());
    let Some(kind) = shortcut_kind(typed) else {
        return Ok(EditOutcome::unchanged(stay));
    };
    if !block.kind().is_text_bearing() {
        return Ok(EditOutcome::unchanged(stay));
    }

    transform(doc, id, kind)?;
    if let Some(text) = doc.get_mut(id).and_then(Block::text_mut) {
        text.clear();
    }
    doc.touch();
    Ok(EditOutcome::changed(Cursor::start_of(id.clone())))
}
