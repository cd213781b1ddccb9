//! Keyboard router: key events plus cursor into engine operations.
//!
//! # Responsibility
//! - Map Enter, Backspace, arrow keys and text input at a cursor onto
//!   editing engine calls.
//! - Decide where focus lands and whether the document changed.
//!
//! # Invariants
//! - Navigation-only transitions never report `document_changed`.
//! - Rejected engine operations become unchanged outcomes, never errors.
//! - Unknown focused blocks surface as `BlockNotFound` so the caller can
//!   re-resolve focus.
//!
//! # See also
//! - docs/architecture/editing-engine.md

use crate::engine::{self, EditEffect, EditError, EditOutcome, EditResult, Violation};
use crate::model::block::{BlockId, BlockKind};
use crate::model::cursor::Cursor;
use crate::model::document::Document;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Input event delivered to the focused block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Enter { shift: bool },
    Backspace,
    ArrowUp,
    ArrowDown,
    /// Typed or pasted text.
    Text(String),
}

impl KeyEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Enter { shift: false } => "enter",
            Self::Enter { shift: true } => "shift_enter",
            Self::Backspace => "backspace",
            Self::ArrowUp => "arrow_up",
            Self::ArrowDown => "arrow_down",
            Self::Text(_) => "text",
        }
    }
}

/// When Enter on a list item leaves the list instead of splitting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListExitPolicy {
    /// The whole item is empty.
    #[default]
    WhenBlockEmpty,
    /// The text before the cursor is empty.
    WhenFirstHalfEmpty,
    /// Enter always splits.
    Never,
}

impl ListExitPolicy {
    fn exits(self, text: &str, offset: usize) -> bool {
        match self {
            Self::WhenBlockEmpty => text.is_empty(),
            Self::WhenFirstHalfEmpty => offset == 0,
            Self::Never => false,
        }
    }
}

/// Result of routing one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Cursor after the event.
    pub cursor: Cursor,
    /// Whether the document was mutated; drives autosave.
    pub document_changed: bool,
    /// `false` when the host should apply its default behavior.
    pub handled: bool,
    pub effect: Option<EditEffect>,
}

impl RouteOutcome {
    fn from_edit(outcome: EditOutcome) -> Self {
        Self {
            cursor: outcome.focus,
            document_changed: outcome.changed,
            handled: true,
            effect: outcome.effect,
        }
    }

    fn navigate(cursor: Cursor) -> Self {
        Self {
            cursor,
            document_changed: false,
            handled: true,
            effect: None,
        }
    }

    fn pass(cursor: Cursor) -> Self {
        Self {
            cursor,
            document_changed: false,
            handled: false,
            effect: None,
        }
    }
}

/// Stateless mapping from events to engine calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardRouter {
    list_exit: ListExitPolicy,
}

impl KeyboardRouter {
    pub fn new(list_exit: ListExitPolicy) -> Self {
        Self { list_exit }
    }

    pub fn list_exit_policy(&self) -> ListExitPolicy {
        self.list_exit
    }

    /// Routes `event` at `cursor`.
    ///
    /// # Errors
    /// - `BlockNotFound` when the cursor names a block that no longer exists.
    pub fn route(
        &self,
        doc: &mut Document,
        cursor: &Cursor,
        event: &KeyEvent,
    ) -> EditResult<RouteOutcome> {
        let block = engine::require(doc, &cursor.block_id)?;
        let kind = block.kind();
        let text = block.text().map(str::to_string);
        let len = block.text_len();
        let cursor = Cursor::new(cursor.block_id.clone(), cursor.offset.min(len));
        let id = &cursor.block_id;

        let result = match event {
            KeyEvent::Enter { shift: false } => match text.as_deref() {
                None => engine::insert_after(doc, id, None),
                Some(text) if kind.is_list_like() && self.list_exit.exits(text, cursor.offset) => {
                    engine::transform(doc, id, BlockKind::Text)
                        .map(|outcome| with_focus(outcome, Cursor::start_of(id.clone())))
                }
                Some(_) => engine::split_at(doc, id, cursor.offset),
            },
            KeyEvent::Enter { shift: true } => {
                if text.is_none() {
                    return Ok(RouteOutcome::pass(cursor));
                }
                engine::insert_text(doc, id, cursor.offset, "\n")
            }
            KeyEvent::Text(input) => {
                if text.is_none() {
                    return Ok(RouteOutcome::pass(cursor));
                }
                engine::insert_text(doc, id, cursor.offset, input)
                    .and_then(|typed| evaluate_shortcut(doc, typed))
            }
            KeyEvent::Backspace if cursor.offset > 0 => {
                engine::delete_backward(doc, id, cursor.offset)
                    .and_then(|deleted| evaluate_shortcut(doc, deleted))
            }
            KeyEvent::Backspace => self.backspace_at_start(doc, id, kind, text.as_deref()),
            KeyEvent::ArrowUp => {
                if cursor.offset > 0 {
                    return Ok(RouteOutcome::pass(cursor));
                }
                return Ok(match nearest_text_sibling(doc, id, Direction::Up) {
                    Some(prev) => {
                        let end = doc.get(&prev).map_or(0, |block| block.text_len());
                        RouteOutcome::navigate(Cursor::new(prev, end))
                    }
                    None => RouteOutcome::pass(cursor),
                });
            }
            KeyEvent::ArrowDown => {
                if cursor.offset < len {
                    return Ok(RouteOutcome::pass(cursor));
                }
                return Ok(match nearest_text_sibling(doc, id, Direction::Down) {
                    Some(next) => RouteOutcome::navigate(Cursor::start_of(next)),
                    None => RouteOutcome::pass(cursor),
                });
            }
        };

        match result {
            Ok(outcome) => {
                debug!(
                    "event=key_route module=keyboard status=ok key={} changed={}",
                    event.name(),
                    outcome.changed
                );
                Ok(RouteOutcome::from_edit(outcome))
            }
            Err(EditError::InvariantViolation(violation)) => {
                warn!(
                    "event=key_route module=keyboard status=rejected key={} reason={}",
                    event.name(),
                    violation.code()
                );
                Ok(RouteOutcome {
                    cursor,
                    document_changed: false,
                    handled: true,
                    effect: None,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Backspace with the cursor at the start of the block.
    ///
    /// Empty blocks are removed when removal is allowed, otherwise reset to
    /// `text`; non-empty blocks merge into their previous sibling.
    fn backspace_at_start(
        &self,
        doc: &mut Document,
        id: &BlockId,
        kind: BlockKind,
        text: Option<&str>,
    ) -> EditResult<EditOutcome> {
        let empty = text.map_or(true, str::is_empty);
        if !empty {
            return engine::merge_with_previous(doc, id);
        }
        match engine::remove_block(doc, id) {
            Err(EditError::InvariantViolation(Violation::LastBlock)) if kind != BlockKind::Text => {
                engine::transform(doc, id, BlockKind::Text)
                    .map(|outcome| with_focus(outcome, Cursor::start_of(id.clone())))
            }
            Err(EditError::InvariantViolation(Violation::LastBlock)) => {
                engine::merge_with_previous(doc, id)
            }
            other => other,
        }
    }
}

fn with_focus(mut outcome: EditOutcome, focus: Cursor) -> EditOutcome {
    outcome.focus = focus;
    outcome
}

/// Runs shortcut detection on the block text after a local text edit.
fn evaluate_shortcut(doc: &mut Document, edited: EditOutcome) -> EditResult<EditOutcome> {
    let id = edited.focus.block_id.clone();
    let current = doc
        .get(&id)
        .and_then(|block| block.text())
        .unwrap_or_default()
        .to_string();
    let shortcut = engine::apply_markdown_shortcut(doc, &id, &current)?;
    if shortcut.changed {
        return Ok(shortcut);
    }
    Ok(edited)
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

/// Closest sibling in `direction` that can hold a text cursor.
fn nearest_text_sibling(doc: &Document, id: &BlockId, direction: Direction) -> Option<BlockId> {
    let (slot, index) = doc.position(id)?;
    let siblings = doc.siblings(&slot);
    let is_text = |candidate: &&BlockId| {
        doc.get(candidate)
            .is_some_and(|block| block.kind().is_text_bearing())
    };
    match direction {
        Direction::Up => siblings[..index].iter().rev().find(is_text).cloned(),
        Direction::Down => siblings
            .get(index + 1..)
            .unwrap_or_default()
            .iter()
            .find(is_text)
            .cloned(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::block::MediaKind;
    use crate::model::snapshot::BlockSnapshot;

    fn id(value: &str) -> BlockId {
        BlockId::new(value)
    }

    fn at(value: &str, offset: usize) -> Cursor {
        Cursor::new(id(value), offset)
    }

    fn route(doc: &mut Document, cursor: Cursor, event: KeyEvent) -> RouteOutcome {
        KeyboardRouter::default().route(doc, &cursor, &event).unwrap()
    }

    #[test]
    fn enter_on_empty_bullet_exits_list_by_default() {
        let mut doc = Document::from_snapshot(&[BlockSnapshot::new("a", BlockKind::Bullet, "")]);
        let outcome = route(&mut doc, at("a", 0), KeyEvent::Enter { shift: false });
        assert!(outcome.document_changed);
        assert_eq!(doc.get(&id("a")).unwrap().kind(), BlockKind::Text);
        assert_eq!(doc.roots().len(), 1);
    }

    #[test]
    fn enter_at_start_of_filled_bullet_splits_under_default_policy() {
        let mut doc =
            Document::from_snapshot(&[BlockSnapshot::new("a", BlockKind::Bullet, "item")]);
        let outcome = route(&mut doc, at("a", 0), KeyEvent::Enter { shift: false });
        assert_eq!(doc.roots().len(), 2);
        assert_eq!(
            doc.get(&outcome.cursor.block_id).unwrap().kind(),
            BlockKind::Bullet
        );
    }

    #[test]
    fn first_half_policy_exits_when_cursor_at_start() {
        let mut doc =
            Document::from_snapshot(&[BlockSnapshot::new("a", BlockKind::Todo, "item")]);
        let router = KeyboardRouter::new(ListExitPolicy::WhenFirstHalfEmpty);
        router
            .route(&mut doc, &at("a", 0), &KeyEvent::Enter { shift: false })
            .unwrap();
        assert_eq!(doc.get(&id("a")).unwrap().kind(), BlockKind::Text);
        assert_eq!(doc.get(&id("a")).unwrap().text(), Some("item"));
    }

    #[test]
    fn never_policy_always_splits() {
        let mut doc = Document::from_snapshot(&[BlockSnapshot::new("a", BlockKind::Bullet, "")]);
        let router = KeyboardRouter::new(ListExitPolicy::Never);
        router
            .route(&mut doc, &at("a", 0), &KeyEvent::Enter { shift: false })
            .unwrap();
        assert_eq!(doc.roots().len(), 2);
    }

    #[test]
    fn shift_enter_inserts_line_break() {
        let mut doc = Document::from_snapshot(&[BlockSnapshot::new("a", BlockKind::Text, "ab")]);
        let outcome = route(&mut doc, at("a", 1), KeyEvent::Enter { shift: true });
        assert_eq!(doc.get(&id("a")).unwrap().text(), Some("a\nb"));
        assert_eq!(outcome.cursor, at("a", 2));
    }

    #[test]
    fn backspace_on_sole_empty_heading_resets_to_text() {
        let mut doc =
            Document::from_snapshot(&[BlockSnapshot::new("a", BlockKind::Heading1, "")]);
        let outcome = route(&mut doc, at("a", 0), KeyEvent::Backspace);
        assert!(outcome.document_changed);
        assert_eq!(doc.get(&id("a")).unwrap().kind(), BlockKind::Text);
    }

    #[test]
    fn backspace_on_sole_empty_text_changes_nothing() {
        let mut doc = Document::from_snapshot(&[BlockSnapshot::new("a", BlockKind::Text, "")]);
        let outcome = route(&mut doc, at("a", 0), KeyEvent::Backspace);
        assert!(!outcome.document_changed);
        assert_eq!(doc.roots().len(), 1);
    }

    #[test]
    fn backspace_inside_text_can_trigger_shortcut() {
        let mut doc = Document::from_snapshot(&[BlockSnapshot::new("a", BlockKind::Text, "- x")]);
        let outcome = route(&mut doc, at("a", 3), KeyEvent::Backspace);
        assert_eq!(doc.get(&id("a")).unwrap().kind(), BlockKind::Bullet);
        assert_eq!(outcome.cursor, at("a", 0));
    }

    #[test]
    fn arrows_skip_media_and_do_not_change_document() {
        let mut doc = Document::from_snapshot(&[
            BlockSnapshot::new("a", BlockKind::Text, "top"),
            BlockSnapshot::media("m", MediaKind::Image, "u", "p.png"),
            BlockSnapshot::new("b", BlockKind::Text, "bottom"),
        ]);
        let generation = doc.generation();

        let up = route(&mut doc, at("b", 0), KeyEvent::ArrowUp);
        assert_eq!(up.cursor, at("a", 3));
        assert!(!up.document_changed && up.handled);

        let down = route(&mut doc, at("a", 3), KeyEvent::ArrowDown);
        assert_eq!(down.cursor, at("b", 0));
        assert_eq!(doc.generation(), generation);
    }

    #[test]
    fn arrow_inside_text_is_left_to_host() {
        let mut doc = Document::from_snapshot(&[
            BlockSnapshot::new("a", BlockKind::Text, "top"),
            BlockSnapshot::new("b", BlockKind::Text, "bottom"),
        ]);
        let outcome = route(&mut doc, at("b", 2), KeyEvent::ArrowUp);
        assert!(!outcome.handled);
        assert_eq!(outcome.cursor, at("b", 2));
    }

    #[test]
    fn stale_cursor_reports_block_not_found() {
        let mut doc = Document::new();
        let err = KeyboardRouter::default()
            .route(&mut doc, &at("gone", 0), &KeyEvent::Backspace)
            .unwrap_err();
        assert_eq!(err, EditError::BlockNotFound(id("gone")));
    }
}
