//! Structural edit operations.
//!
//! # Responsibility
//! - Implement every document mutation the keyboard router and the editor
//!   session can request.
//!
//! # Invariants
//! - Validation happens before the first mutation.
//! - The sibling list touched by a structural change is renumbered.

use super::{require, EditEffect, EditError, EditOutcome, EditResult, Violation};
use crate::model::block::{Block, BlockContent, BlockId, BlockKind, MediaKind, MediaRef};
use crate::model::cursor::{byte_index, char_len, Cursor};
use crate::model::document::{Document, Slot};
use log::debug;

fn position(doc: &Document, id: &BlockId) -> EditResult<(Slot, usize)> {
    doc.position(id)
        .ok_or_else(|| EditError::BlockNotFound(id.clone()))
}

/// Moves `ids` into `slot` right after `index`, keeping their order.
fn promote(doc: &mut Document, ids: &[BlockId], slot: &Slot, index: usize) {
    for (offset, child) in ids.iter().enumerate() {
        doc.move_to(child, slot.clone(), index + 1 + offset);
    }
}

/// Inserts an empty block right after `anchor` at the same nesting level.
///
/// Without an explicit kind a list-like anchor is continued, anything else
/// yields `text`. Focus lands at the start of the new block.
///
/// # Errors
/// - `BlockNotFound` for an unknown anchor.
/// - `InvariantViolation` for media kinds; use [`insert_media`].
pub fn insert_after(
    doc: &mut Document,
    anchor: &BlockId,
    kind: Option<BlockKind>,
) -> EditResult<EditOutcome> {
    let anchor_kind = require(doc, anchor)?.kind();
    let kind = kind.unwrap_or(if anchor_kind.is_list_like() {
        anchor_kind
    } else {
        BlockKind::Text
    });
    let content = BlockContent::empty(kind).ok_or(Violation::MediaRequiresUpload(kind))?;
    let (slot, index) = position(doc, anchor)?;

    let id = doc.fresh_id();
    doc.attach(Block::new(id.clone(), content), slot.clone(), index + 1);
    doc.renumber_slot(&slot);
    doc.touch();
    Ok(EditOutcome::changed(Cursor::start_of(id)))
}

/// Inserts an uploaded image or file right after `anchor`.
pub fn insert_media(
    doc: &mut Document,
    anchor: &BlockId,
    kind: MediaKind,
    media: MediaRef,
) -> EditResult<EditOutcome> {
    let (slot, index) = position(doc, anchor)?;
    let id = doc.fresh_id();
    doc.attach(
        Block::new(id.clone(), BlockContent::media(kind, media)),
        slot.clone(),
        index + 1,
    );
    doc.renumber_slot(&slot);
    doc.touch();
    Ok(EditOutcome::changed(Cursor::start_of(id)))
}

/// Appends an uploaded image or file at the end of the document.
pub fn append_media(doc: &mut Document, kind: MediaKind, media: MediaRef) -> EditOutcome {
    let id = doc.fresh_id();
    let end = doc.roots().len();
    doc.attach(
        Block::new(id.clone(), BlockContent::media(kind, media)),
        Slot::Root,
        end,
    );
    doc.touch();
    EditOutcome::changed(Cursor::start_of(id))
}

/// Deletes a block with its whole subtree.
///
/// Focus moves to the end of the preceding sibling, else the start of the
/// following sibling, else the parent container.
///
/// # Errors
/// - `InvariantViolation` when `id` is the only top-level block.
pub fn remove_block(doc: &mut Document, id: &BlockId) -> EditResult<EditOutcome> {
    let (slot, index) = position(doc, id)?;
    if slot == Slot::Root && doc.roots().len() <= 1 {
        debug!("event=block_remove module=engine status=rejected reason=last_block");
        return Err(Violation::LastBlock.into());
    }

    let siblings = doc.siblings(&slot);
    let focus = if let Some(prev) = index.checked_sub(1).and_then(|prev| siblings.get(prev)) {
        Some(Cursor::new(
            prev.clone(),
            doc.get(prev).map_or(0, Block::text_len),
        ))
    } else if let Some(next) = siblings.get(index + 1) {
        Some(Cursor::start_of(next.clone()))
    } else {
        slot.container().map(|parent| {
            Cursor::new(parent.clone(), doc.get(parent).map_or(0, Block::text_len))
        })
    };
    let focus = focus.ok_or(Violation::LastBlock)?;

    doc.remove_subtree(id);
    doc.renumber_slot(&slot);
    doc.touch();
    Ok(EditOutcome::changed(focus))
}

/// Splits a text-bearing block at a character offset (clamped to its length).
///
/// The block keeps `text[..offset]`; a new sibling after it receives the
/// rest. List-like blocks continue their kind, others produce `text`.
pub fn split_at(doc: &mut Document, id: &BlockId, offset: usize) -> EditResult<EditOutcome> {
    let block = require(doc, id)?;
    let kind = block.kind();
    let Some(text) = block.text() else {
        return Err(Violation::NotTextBearing(kind).into());
    };
    let cut = byte_index(text, offset);
    let tail = text[cut..].to_string();
    let new_kind = if kind.is_list_like() {
        kind
    } else {
        BlockKind::Text
    };
    let content =
        BlockContent::with_text(new_kind, tail).ok_or(Violation::NotTextBearing(new_kind))?;
    let (slot, index) = position(doc, id)?;

    if let Some(text) = doc.get_mut(id).and_then(Block::text_mut) {
        text.truncate(cut);
    }
    let new_id = doc.fresh_id();
    doc.attach(Block::new(new_id.clone(), content), slot.clone(), index + 1);
    doc.renumber_slot(&slot);
    doc.touch();
    Ok(EditOutcome::changed(Cursor::start_of(new_id)))
}

/// Appends a block's text to its previous sibling and removes it.
///
/// Returns an unchanged outcome when the block is first in its list, when it
/// or its previous sibling carries no text. Toggle children of the merged
/// block are promoted into its position.
pub fn merge_with_previous(doc: &mut Document, id: &BlockId) -> EditResult<EditOutcome> {
    let block = require(doc, id)?;
    let stay = Cursor::start_of(id.clone());
    if !block.kind().is_text_bearing() {
        return Ok(EditOutcome::unchanged(stay));
    }
    let text = block.text().unwrap_or_default().to_string();
    let children = block.children().to_vec();
    let (slot, index) = position(doc, id)?;

    let Some(prev_id) = index
        .checked_sub(1)
        .and_then(|prev| doc.siblings(&slot).get(prev))
        .cloned()
    else {
        return Ok(EditOutcome::unchanged(stay));
    };
    let prev_len = match doc.get(&prev_id) {
        Some(prev) if prev.kind().is_text_bearing() => prev.text_len(),
        _ => return Ok(EditOutcome::unchanged(stay)),
    };

    if let Some(prev_text) = doc.get_mut(&prev_id).and_then(Block::text_mut) {
        prev_text.push_str(&text);
    }
    promote(doc, &children, &slot, index);
    doc.remove_subtree(id);
    doc.renumber_slot(&slot);
    doc.touch();
    Ok(EditOutcome::changed(Cursor::new(prev_id, prev_len)))
}

/// Changes a block's kind in place.
///
/// - Into columns: the text moves to a new `text` block in column 0.
/// - Columns into columns: slots are resized, contents kept.
/// - Out of a container: owned blocks become following siblings. Toggle to
///   toggle keeps its children.
/// - Into `page`: nothing changes; the outcome carries a subpage effect.
///
/// # Errors
/// - `InvariantViolation` for media sources or media targets.
pub fn transform(doc: &mut Document, id: &BlockId, kind: BlockKind) -> EditResult<EditOutcome> {
    let block = require(doc, id)?;
    let current = block.kind();
    if current.is_media() {
        return Err(Violation::MediaImmutable.into());
    }
    if kind.is_media() {
        return Err(Violation::MediaRequiresUpload(kind).into());
    }
    let here = Cursor::new(id.clone(), block.text_len());
    if kind == BlockKind::Page {
        return Ok(EditOutcome {
            focus: here,
            changed: false,
            effect: Some(EditEffect::CreateSubpage {
                block_id: id.clone(),
            }),
        });
    }
    if kind == current {
        return Ok(EditOutcome::unchanged(here));
    }

    let text = block.text().unwrap_or_default().to_string();
    let owned = block.owned_ids();
    let (slot, index) = position(doc, id)?;

    if let (true, Some(count)) = (current.is_columns(), kind.column_count()) {
        doc.resize_columns(id, count);
        doc.touch();
        return Ok(EditOutcome::changed(Cursor::start_of(id.clone())));
    }

    let keeps_children = current.is_toggle_family() && kind.is_toggle_family();
    if current.is_container() && !keeps_children {
        promote(doc, &owned, &slot, index);
    }

    let content =
        BlockContent::with_text(kind, text.clone()).ok_or(Violation::MediaRequiresUpload(kind))?;
    let Some(target) = doc.get_mut(id) else {
        return Err(EditError::BlockNotFound(id.clone()));
    };
    let previous = target.replace_content(content);
    if let (BlockContent::Toggle { children: kept, .. }, BlockContent::Toggle { children, .. }) =
        (previous, target.content_mut())
    {
        *children = kept;
    }

    let focus = if kind.is_columns() {
        let child = doc.fresh_id();
        let len = char_len(&text);
        doc.attach(
            Block::new(
                child.clone(),
                BlockContent::with_text(BlockKind::Text, text)
                    .ok_or(Violation::NotTextBearing(BlockKind::Text))?,
            ),
            Slot::Column(id.clone(), 0),
            0,
        );
        Cursor::new(child, len)
    } else {
        Cursor::new(id.clone(), char_len(&text))
    };

    doc.renumber_slot(&slot);
    doc.touch();
    Ok(EditOutcome::changed(focus))
}

/// Flips `collapsed` on toggle-family blocks; other kinds are left alone.
pub fn toggle_collapsed(doc: &mut Document, id: &BlockId) -> EditResult<EditOutcome> {
    let focus = Cursor::new(id.clone(), require(doc, id)?.text_len());
    let flipped = match doc.get_mut(id).map(Block::content_mut) {
        Some(BlockContent::Toggle { collapsed, .. }) => {
            *collapsed = !*collapsed;
            true
        }
        _ => false,
    };
    if !flipped {
        return Ok(EditOutcome::unchanged(focus));
    }
    doc.touch();
    Ok(EditOutcome::changed(focus))
}

/// Sets the checkbox of a to-do block; other kinds are left alone.
pub fn set_checked(doc: &mut Document, id: &BlockId, value: bool) -> EditResult<EditOutcome> {
    let focus = Cursor::new(id.clone(), require(doc, id)?.text_len());
    let updated = match doc.get_mut(id).map(Block::content_mut) {
        Some(BlockContent::Todo { checked, .. }) if *checked != value => {
            *checked = value;
            true
        }
        _ => false,
    };
    if !updated {
        return Ok(EditOutcome::unchanged(focus));
    }
    doc.touch();
    Ok(EditOutcome::changed(focus))
}

/// Inserts `input` at a character offset (clamped); focus follows the input.
pub fn insert_text(
    doc: &mut Document,
    id: &BlockId,
    offset: usize,
    input: &str,
) -> EditResult<EditOutcome> {
    let kind = require(doc, id)?.kind();
    let Some(text) = doc.get_mut(id).and_then(Block::text_mut) else {
        return Err(Violation::NotTextBearing(kind).into());
    };
    let offset = offset.min(char_len(text));
    if input.is_empty() {
        return Ok(EditOutcome::unchanged(Cursor::new(id.clone(), offset)));
    }
    let at = byte_index(text, offset);
    text.insert_str(at, input);
    doc.touch();
    Ok(EditOutcome::changed(Cursor::new(
        id.clone(),
        offset + char_len(input),
    )))
}

/// Deletes the character before `offset`; no-op at offset 0.
pub fn delete_backward(doc: &mut Document, id: &BlockId, offset: usize) -> EditResult<EditOutcome> {
    let kind = require(doc, id)?.kind();
    let Some(text) = doc.get_mut(id).and_then(Block::text_mut) else {
        return Err(Violation::NotTextBearing(kind).into());
    };
    let offset = offset.min(char_len(text));
    if offset == 0 {
        return Ok(EditOutcome::unchanged(Cursor::start_of(id.clone())));
    }
    let start = byte_index(text, offset - 1);
    let end = byte_index(text, offset);
    text.replace_range(start..end, "");
    doc.touch();
    Ok(EditOutcome::changed(Cursor::new(id.clone(), offset - 1)))
}

/// Recomputes ordinals of one sibling list. Returns whether any changed.
pub fn renumber(doc: &mut Document, slot: &Slot) -> bool {
    let changed = doc.renumber_slot(slot);
    if changed {
        doc.touch();
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::snapshot::BlockSnapshot;

    fn id(value: &str) -> BlockId {
        BlockId::new(value)
    }

    fn doc_of(blocks: Vec<BlockSnapshot>) -> Document {
        Document::from_snapshot(&blocks)
    }

    fn text(doc: &Document, value: &str) -> String {
        doc.get(&id(value))
            .and_then(Block::text)
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn insert_after_continues_list_kind() {
        let mut doc = doc_of(vec![BlockSnapshot::new("a", BlockKind::Todo, "task")]);
        let outcome = insert_after(&mut doc, &id("a"), None).unwrap();
        let inserted = doc.get(&outcome.focus.block_id).unwrap();
        assert_eq!(inserted.kind(), BlockKind::Todo);
        assert_eq!(inserted.checked(), Some(false));
        assert_eq!(outcome.focus.offset, 0);
        assert_eq!(doc.roots()[1], outcome.focus.block_id);
    }

    #[test]
    fn insert_after_plain_anchor_defaults_to_text() {
        let mut doc = doc_of(vec![BlockSnapshot::new("a", BlockKind::Heading1, "Title")]);
        let outcome = insert_after(&mut doc, &id("a"), None).unwrap();
        assert_eq!(
            doc.get(&outcome.focus.block_id).unwrap().kind(),
            BlockKind::Text
        );
    }

    #[test]
    fn insert_after_rejects_media_kind() {
        let mut doc = doc_of(vec![BlockSnapshot::new("a", BlockKind::Text, "")]);
        let before = doc.clone();
        let err = insert_after(&mut doc, &id("a"), Some(BlockKind::Image)).unwrap_err();
        assert!(matches!(err, EditError::InvariantViolation(_)));
        assert_eq!(doc, before);
    }

    #[test]
    fn remove_sole_block_is_rejected_without_change() {
        let mut doc = Document::new();
        let only = doc.roots()[0].clone();
        let before = doc.clone();
        let err = remove_block(&mut doc, &only).unwrap_err();
        assert_eq!(err, EditError::InvariantViolation(Violation::LastBlock));
        assert_eq!(doc, before);
    }

    #[test]
    fn remove_focuses_previous_end_then_next_start() {
        let mut doc = doc_of(vec![
            BlockSnapshot::new("a", BlockKind::Text, "abc"),
            BlockSnapshot::new("b", BlockKind::Text, ""),
            BlockSnapshot::new("c", BlockKind::Text, "xyz"),
        ]);
        let outcome = remove_block(&mut doc, &id("b")).unwrap();
        assert_eq!(outcome.focus, Cursor::new(id("a"), 3));

        let outcome = remove_block(&mut doc, &id("a")).unwrap();
        assert_eq!(outcome.focus, Cursor::start_of(id("c")));
    }

    #[test]
    fn remove_last_child_focuses_parent() {
        let mut toggle = BlockSnapshot::new("t", BlockKind::Toggle, "Head");
        toggle.children = Some(vec![BlockSnapshot::new("c", BlockKind::Text, "")]);
        let mut doc = doc_of(vec![toggle]);
        let outcome = remove_block(&mut doc, &id("c")).unwrap();
        assert_eq!(outcome.focus, Cursor::new(id("t"), 4));
        assert!(doc.get(&id("t")).unwrap().children().is_empty());
    }

    #[test]
    fn split_handles_multibyte_offsets_and_clamps() {
        let mut doc = doc_of(vec![BlockSnapshot::new("a", BlockKind::Bullet, "héllo")]);
        let outcome = split_at(&mut doc, &id("a"), 2).unwrap();
        assert_eq!(text(&doc, "a"), "hé");
        let tail = doc.get(&outcome.focus.block_id).unwrap();
        assert_eq!(tail.text(), Some("llo"));
        assert_eq!(tail.kind(), BlockKind::Bullet);

        let outcome = split_at(&mut doc, &id("a"), 99).unwrap();
        assert_eq!(doc.get(&outcome.focus.block_id).unwrap().text(), Some(""));
    }

    #[test]
    fn split_rejects_media() {
        let mut doc = doc_of(vec![
            BlockSnapshot::new("a", BlockKind::Text, ""),
            BlockSnapshot::media("m", MediaKind::Image, "u", "f.png"),
        ]);
        let err = split_at(&mut doc, &id("m"), 0).unwrap_err();
        assert_eq!(
            err,
            EditError::InvariantViolation(Violation::NotTextBearing(BlockKind::Image))
        );
    }

    #[test]
    fn merge_first_block_is_noop() {
        let mut doc = doc_of(vec![BlockSnapshot::new("a", BlockKind::Text, "x")]);
        let generation = doc.generation();
        let outcome = merge_with_previous(&mut doc, &id("a")).unwrap();
        assert!(!outcome.changed);
        assert_eq!(doc.generation(), generation);
    }

    #[test]
    fn merge_into_media_is_noop() {
        let mut doc = doc_of(vec![
            BlockSnapshot::media("m", MediaKind::File, "u", "a.pdf"),
            BlockSnapshot::new("a", BlockKind::Text, "x"),
        ]);
        let outcome = merge_with_previous(&mut doc, &id("a")).unwrap();
        assert!(!outcome.changed);
        assert_eq!(doc.roots().len(), 2);
    }

    #[test]
    fn merge_promotes_toggle_children() {
        let mut toggle = BlockSnapshot::new("t", BlockKind::Toggle, "Tail");
        toggle.children = Some(vec![
            BlockSnapshot::new("c1", BlockKind::Text, "one"),
            BlockSnapshot::new("c2", BlockKind::Text, "two"),
        ]);
        let mut doc = doc_of(vec![BlockSnapshot::new("a", BlockKind::Text, "Head"), toggle]);

        let outcome = merge_with_previous(&mut doc, &id("t")).unwrap();
        assert_eq!(outcome.focus, Cursor::new(id("a"), 4));
        assert_eq!(text(&doc, "a"), "HeadTail");
        assert_eq!(doc.roots(), &[id("a"), id("c1"), id("c2")]);
        doc.validate().unwrap();
    }

    #[test]
    fn transform_to_columns_moves_text_into_first_column() {
        let mut doc = doc_of(vec![BlockSnapshot::new("a", BlockKind::Text, "Body")]);
        let outcome = transform(&mut doc, &id("a"), BlockKind::Columns3).unwrap();
        let columns = doc.get(&id("a")).unwrap().columns().unwrap().to_vec();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0], vec![outcome.focus.block_id.clone()]);
        assert!(columns[1].is_empty() && columns[2].is_empty());
        assert_eq!(
            doc.get(&outcome.focus.block_id).unwrap().text(),
            Some("Body")
        );
        doc.validate().unwrap();
    }

    #[test]
    fn transform_columns_to_fewer_columns_keeps_contents() {
        let mut cols = BlockSnapshot::new("cols", BlockKind::Columns3, "");
        cols.columns = Some(vec![
            vec![BlockSnapshot::new("a", BlockKind::Text, "a")],
            vec![BlockSnapshot::new("b", BlockKind::Text, "b")],
            vec![BlockSnapshot::new("c", BlockKind::Text, "c")],
        ]);
        let mut doc = doc_of(vec![cols]);
        transform(&mut doc, &id("cols"), BlockKind::Columns2).unwrap();
        let columns = doc.get(&id("cols")).unwrap().columns().unwrap();
        assert_eq!(columns[1], vec![id("b"), id("c")]);
        assert_eq!(
            doc.slot_of(&id("c")),
            Some(&Slot::Column(id("cols"), 1))
        );
        doc.validate().unwrap();
    }

    #[test]
    fn transform_columns_to_text_promotes_column_blocks() {
        let mut cols = BlockSnapshot::new("cols", BlockKind::Columns2, "");
        cols.columns = Some(vec![
            vec![BlockSnapshot::new("a", BlockKind::Text, "a")],
            vec![BlockSnapshot::new("b", BlockKind::Text, "b")],
        ]);
        let mut doc = doc_of(vec![cols]);
        let outcome = transform(&mut doc, &id("cols"), BlockKind::Text).unwrap();
        assert_eq!(outcome.focus, Cursor::start_of(id("cols")));
        assert_eq!(doc.roots(), &[id("cols"), id("a"), id("b")]);
        assert_eq!(text(&doc, "cols"), "");
        doc.validate().unwrap();
    }

    #[test]
    fn transform_toggle_to_toggle_keeps_children() {
        let mut toggle = BlockSnapshot::new("t", BlockKind::Toggle, "T");
        toggle.collapsed = Some(true);
        toggle.children = Some(vec![BlockSnapshot::new("c", BlockKind::Text, "c")]);
        let mut doc = doc_of(vec![toggle]);
        transform(&mut doc, &id("t"), BlockKind::ToggleHeading1).unwrap();
        let block = doc.get(&id("t")).unwrap();
        assert_eq!(block.kind(), BlockKind::ToggleHeading1);
        assert_eq!(block.children(), &[id("c")]);
        assert_eq!(block.collapsed(), Some(false));
    }

    #[test]
    fn transform_toggle_to_text_promotes_children() {
        let mut toggle = BlockSnapshot::new("t", BlockKind::Toggle, "T");
        toggle.children = Some(vec![BlockSnapshot::new("c", BlockKind::Text, "c")]);
        let mut doc = doc_of(vec![toggle, BlockSnapshot::new("z", BlockKind::Text, "")]);
        transform(&mut doc, &id("t"), BlockKind::Heading2).unwrap();
        assert_eq!(doc.roots(), &[id("t"), id("c"), id("z")]);
        doc.validate().unwrap();
    }

    #[test]
    fn transform_to_page_only_yields_effect() {
        let mut doc = doc_of(vec![BlockSnapshot::new("a", BlockKind::Text, "x")]);
        let before = doc.clone();
        let outcome = transform(&mut doc, &id("a"), BlockKind::Page).unwrap();
        assert_eq!(
            outcome.effect,
            Some(EditEffect::CreateSubpage { block_id: id("a") })
        );
        assert!(!outcome.changed);
        assert_eq!(doc, before);
    }

    #[test]
    fn transform_rejects_media_both_ways() {
        let mut doc = doc_of(vec![
            BlockSnapshot::new("a", BlockKind::Text, "x"),
            BlockSnapshot::media("m", MediaKind::Image, "u", "f.png"),
        ]);
        assert_eq!(
            transform(&mut doc, &id("m"), BlockKind::Text).unwrap_err(),
            EditError::InvariantViolation(Violation::MediaImmutable)
        );
        assert!(matches!(
            transform(&mut doc, &id("a"), BlockKind::File).unwrap_err(),
            EditError::InvariantViolation(Violation::MediaRequiresUpload(BlockKind::File))
        ));
    }

    #[test]
    fn transform_to_numbered_continues_run() {
        let mut doc = doc_of(vec![
            BlockSnapshot::new("n1", BlockKind::Numbered, "one"),
            BlockSnapshot::new("n2", BlockKind::Numbered, "two"),
            BlockSnapshot::new("a", BlockKind::Text, "three"),
            BlockSnapshot::new("n3", BlockKind::Numbered, "four"),
        ]);
        transform(&mut doc, &id("a"), BlockKind::Numbered).unwrap();
        let ordinals: Vec<Option<u32>> = doc.root_blocks().map(Block::ordinal).collect();
        assert_eq!(ordinals, vec![Some(1), Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn toggle_collapsed_ignores_non_toggles() {
        let mut doc = doc_of(vec![
            BlockSnapshot::new("a", BlockKind::Text, "x"),
            BlockSnapshot::new("t", BlockKind::Toggle, "t"),
        ]);
        assert!(!toggle_collapsed(&mut doc, &id("a")).unwrap().changed);
        assert!(toggle_collapsed(&mut doc, &id("t")).unwrap().changed);
        assert_eq!(doc.get(&id("t")).unwrap().collapsed(), Some(true));
    }

    #[test]
    fn set_checked_only_touches_todos() {
        let mut doc = doc_of(vec![
            BlockSnapshot::new("a", BlockKind::Bullet, "x"),
            BlockSnapshot::new("t", BlockKind::Todo, "t"),
        ]);
        assert!(!set_checked(&mut doc, &id("a"), true).unwrap().changed);
        assert!(set_checked(&mut doc, &id("t"), true).unwrap().changed);
        assert!(!set_checked(&mut doc, &id("t"), true).unwrap().changed);
        assert_eq!(doc.get(&id("t")).unwrap().checked(), Some(true));
    }

    #[test]
    fn unknown_ids_report_block_not_found() {
        let mut doc = Document::new();
        let missing = id("missing");
        assert_eq!(
            split_at(&mut doc, &missing, 0).unwrap_err(),
            EditError::BlockNotFound(missing.clone())
        );
        assert_eq!(
            remove_block(&mut doc, &missing).unwrap_err(),
            EditError::BlockNotFound(missing.clone())
        );
        assert_eq!(
            insert_after(&mut doc, &missing, None).unwrap_err(),
            EditError::BlockNotFound(missing)
        );
    }

    #[test]
    fn insert_and_delete_text_work_on_characters() {
        let mut doc = doc_of(vec![BlockSnapshot::new("a", BlockKind::Text, "ñu")]);
        let outcome = insert_text(&mut doc, &id("a"), 1, "é").unwrap();
        assert_eq!(text(&doc, "a"), "ñéu");
        assert_eq!(outcome.focus.offset, 2);

        let outcome = delete_backward(&mut doc, &id("a"), 2).unwrap();
        assert_eq!(text(&doc, "a"), "ñu");
        assert_eq!(outcome.focus.offset, 1);

        assert!(!delete_backward(&mut doc, &id("a"), 0).unwrap().changed);
    }

    #[test]
    fn append_media_lands_at_document_end() {
        let mut doc = doc_of(vec![BlockSnapshot::new("a", BlockKind::Text, "x")]);
        let outcome = append_media(
            &mut doc,
            MediaKind::Image,
            MediaRef::new("https://cdn/p.png", "p.png"),
        );
        assert_eq!(doc.roots().last(), Some(&outcome.focus.block_id));
        assert_eq!(
            doc.get(&outcome.focus.block_id).unwrap().media().unwrap().file_name,
            "p.png"
        );
    }
}
