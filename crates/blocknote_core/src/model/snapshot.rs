//! Persisted nested block shape and arena conversion.
//!
//! # Responsibility
//! - Define the JSON block object stored for every note.
//! - Convert between that nested shape and the `Document` arena.
//!
//! # Invariants
//! - Loading never fails: unknown types fall back to `text`, duplicate or
//!   blank ids get fresh ids, column lists are padded or truncated to the
//!   kind's count, ordinals are recomputed.
//! - An empty block array loads as the default one-block document.
//!
//! # See also
//! - docs/architecture/block-model.md

use super::block::{Block, BlockContent, BlockId, BlockKind, MediaKind, MediaRef, TextStyle};
use super::document::{Document, Slot};
use log::warn;
use serde::{Deserialize, Serialize};

/// One block object of the persisted note payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSnapshot {
    pub id: String,
    /// Wire type name, e.g. `heading1` or `toggle-h2`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BlockSnapshot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Vec<BlockSnapshot>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numbered: Option<u32>,
}

impl BlockSnapshot {
    /// Bare snapshot with only id, type and text.
    pub fn new(id: impl Into<String>, kind: BlockKind, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.wire_name().to_string(),
            content: content.into(),
            checked: None,
            collapsed: None,
            children: None,
            columns: None,
            url: None,
            file_name: None,
            numbered: None,
        }
    }

    pub fn media(
        id: impl Into<String>,
        kind: MediaKind,
        url: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        let wire = match kind {
            MediaKind::Image => BlockKind::Image,
            MediaKind::File => BlockKind::File,
        };
        Self {
            url: Some(url.into()),
            file_name: Some(file_name.into()),
            ..Self::new(id, wire, "")
        }
    }
}

impl Document {
    /// Nested snapshot of the whole document in order.
    pub fn to_snapshot(&self) -> Vec<BlockSnapshot> {
        self.roots()
            .iter()
            .filter_map(|id| self.get(id))
            .map(|block| self.snapshot_block(block))
            .collect()
    }

    fn snapshot_block(&self, block: &Block) -> BlockSnapshot {
        let mut snapshot = BlockSnapshot::new(
            block.id().as_str(),
            block.kind(),
            block.text().unwrap_or_default(),
        );
        match block.content() {
            BlockContent::Plain { .. } => {}
            BlockContent::Numbered { ordinal, .. } => snapshot.numbered = Some(*ordinal),
            BlockContent::Todo { checked, .. } => snapshot.checked = Some(*checked),
            BlockContent::Toggle {
                collapsed,
                children,
                ..
            } => {
                snapshot.collapsed = Some(*collapsed);
                snapshot.children = Some(self.snapshot_list(children));
            }
            BlockContent::Columns(set) => {
                snapshot.columns = Some(
                    set.slots()
                        .iter()
                        .map(|slot| self.snapshot_list(slot))
                        .collect(),
                );
            }
            BlockContent::Media { media, .. } => {
                snapshot.url = Some(media.url.clone());
                snapshot.file_name = Some(media.file_name.clone());
            }
        }
        snapshot
    }

    fn snapshot_list(&self, ids: &[BlockId]) -> Vec<BlockSnapshot> {
        ids.iter()
            .filter_map(|id| self.get(id))
            .map(|block| self.snapshot_block(block))
            .collect()
    }

    /// Rebuilds an arena from persisted blocks, repairing what it can.
    pub fn from_snapshot(blocks: &[BlockSnapshot]) -> Document {
        let mut doc = Document::empty_arena();
        for snapshot in blocks {
            attach_snapshot(&mut doc, snapshot, &Slot::Root);
        }
        if doc.roots().is_empty() {
            return Document::new();
        }
        doc.renumber_all();
        doc
    }
}

fn attach_snapshot(doc: &mut Document, snapshot: &BlockSnapshot, slot: &Slot) {
    let kind = BlockKind::from_wire_name(&snapshot.kind).unwrap_or_else(|| {
        warn!(
            "event=snapshot_load module=model status=fallback reason=unknown_type type_len={}",
            snapshot.kind.len()
        );
        BlockKind::Text
    });

    let stored_id = BlockId::new(snapshot.id.as_str());
    let id = if snapshot.id.trim().is_empty() || doc.contains(&stored_id) {
        doc.fresh_id()
    } else {
        stored_id
    };

    let content = match kind {
        BlockKind::Image | BlockKind::File => BlockContent::media(
            if kind == BlockKind::Image {
                MediaKind::Image
            } else {
                MediaKind::File
            },
            MediaRef::new(
                snapshot.url.clone().unwrap_or_default(),
                snapshot.file_name.clone().unwrap_or_default(),
            ),
        ),
        _ => match BlockContent::with_text(kind, snapshot.content.clone()) {
            Some(BlockContent::Todo { text, .. }) => BlockContent::Todo {
                text,
                checked: snapshot.checked.unwrap_or(false),
            },
            Some(BlockContent::Toggle {
                style,
                text,
                children,
                ..
            }) => BlockContent::Toggle {
                style,
                text,
                collapsed: snapshot.collapsed.unwrap_or(false),
                children,
            },
            Some(content) => content,
            None => BlockContent::Plain {
                style: TextStyle::Text,
                text: snapshot.content.clone(),
            },
        },
    };

    let end = doc.siblings(slot).len();
    if !doc.attach(Block::new(id.clone(), content), slot.clone(), end) {
        return;
    }

    let children = snapshot.children.as_deref().unwrap_or_default();
    if kind.is_toggle_family() {
        for child in children {
            attach_snapshot(doc, child, &Slot::Children(id.clone()));
        }
    } else {
        // Children stored on a non-toggle kind are kept as following siblings.
        for child in children {
            attach_snapshot(doc, child, slot);
        }
    }

    if let Some(count) = kind.column_count() {
        let stored = snapshot.columns.as_deref().unwrap_or_default();
        let last = count.get() - 1;
        for (index, column) in stored.iter().enumerate() {
            let target = Slot::Column(id.clone(), index.min(last));
            for child in column {
                attach_snapshot(doc, child, &target);
            }
        }
    } else if let Some(stored) = snapshot.columns.as_deref() {
        for child in stored.iter().flatten() {
            attach_snapshot(doc, child, slot);
        }
    }
}
