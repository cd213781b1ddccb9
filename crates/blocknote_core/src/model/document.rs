//! Document arena: blocks indexed by id plus ordered sibling lists.
//!
//! # Responsibility
//! - Own every block of one note and the tree shape that links them.
//! - Expose read-only navigation (siblings, parents, pre-order walk).
//! - Provide crate-internal structural primitives for the editing engine.
//!
//! # Invariants
//! - Every node appears in exactly one sibling list and records that list as
//!   its `Slot`.
//! - No block is its own ancestor.
//! - A document handed out of the crate holds at least one top-level block.
//! - `generation` only grows; the engine bumps it on every mutation.
//!
//! # See also
//! - docs/architecture/block-model.md

use super::block::{Block, BlockContent, BlockId, BlockKind, ColumnCount, TextStyle};
use std::collections::{HashMap, HashSet};

/// The sibling list a block lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Top-level sequence of the document.
    Root,
    /// Children of a toggle-family block.
    Children(BlockId),
    /// One column (zero-based) of a columns block.
    Column(BlockId, usize),
}

impl Slot {
    /// Owning container, `None` for the top level.
    pub fn container(&self) -> Option<&BlockId> {
        match self {
            Self::Root => None,
            Self::Children(id) | Self::Column(id, _) => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    block: Block,
    slot: Slot,
}

/// Ordered, possibly nested sequence of blocks for one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: HashMap<BlockId, Node>,
    roots: Vec<BlockId>,
    generation: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document holding one empty `text` block.
    pub fn new() -> Self {
        let mut doc = Self::empty_arena();
        let id = doc.fresh_id();
        doc.attach(
            Block::new(id, BlockContent::Plain {
                style: TextStyle::Text,
                text: String::new(),
            }),
            Slot::Root,
            0,
        );
        doc
    }

    /// Arena without blocks; callers must attach at least one root before
    /// handing the document out.
    pub(crate) fn empty_arena() -> Self {
        Self {
            nodes: HashMap::new(),
            roots: Vec::new(),
            generation: 0,
        }
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.nodes.get(id).map(|node| &node.block)
    }

    pub(crate) fn get_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.nodes.get_mut(id).map(|node| &mut node.block)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Total block count, nested blocks included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    pub fn root_blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.roots.iter().filter_map(|id| self.get(id))
    }

    pub fn first_block_id(&self) -> Option<&BlockId> {
        self.roots.first()
    }

    /// Edit generation; advances on every mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn touch(&mut self) {
        self.generation += 1;
    }

    pub fn slot_of(&self, id: &BlockId) -> Option<&Slot> {
        self.nodes.get(id).map(|node| &node.slot)
    }

    pub fn parent_of(&self, id: &BlockId) -> Option<&BlockId> {
        self.slot_of(id).and_then(Slot::container)
    }

    /// Ordered ids of one sibling list; empty when the slot does not exist.
    pub fn siblings(&self, slot: &Slot) -> &[BlockId] {
        match slot {
            Slot::Root => &self.roots,
            Slot::Children(parent) => self.get(parent).map_or(&[], Block::children),
            Slot::Column(parent, index) => self
                .get(parent)
                .and_then(Block::columns)
                .and_then(|columns| columns.get(*index))
                .map_or(&[], Vec::as_slice),
        }
    }

    pub(crate) fn siblings_mut(&mut self, slot: &Slot) -> Option<&mut Vec<BlockId>> {
        match slot {
            Slot::Root => Some(&mut self.roots),
            Slot::Children(parent) => match self.get_mut(parent)?.content_mut() {
                BlockContent::Toggle { children, .. } => Some(children),
                _ => None,
            },
            Slot::Column(parent, index) => match self.get_mut(parent)?.content_mut() {
                BlockContent::Columns(set) => set.slot_mut(*index),
                _ => None,
            },
        }
    }

    /// Slot and index of `id` within it.
    pub fn position(&self, id: &BlockId) -> Option<(Slot, usize)> {
        let slot = self.slot_of(id)?.clone();
        let index = self.siblings(&slot).iter().position(|candidate| candidate == id)?;
        Some((slot, index))
    }

    pub fn previous_sibling(&self, id: &BlockId) -> Option<&BlockId> {
        let (slot, index) = self.position(id)?;
        let prev = index.checked_sub(1)?;
        let prev_id = self.siblings(&slot).get(prev)?;
        self.nodes.get_key_value(prev_id).map(|(key, _)| key)
    }

    pub fn next_sibling(&self, id: &BlockId) -> Option<&BlockId> {
        let (slot, index) = self.position(id)?;
        let next_id = self.siblings(&slot).get(index + 1)?;
        self.nodes.get_key_value(next_id).map(|(key, _)| key)
    }

    /// True when `ancestor` appears on the parent chain of `id`.
    pub fn is_ancestor(&self, ancestor: &BlockId, id: &BlockId) -> bool {
        let mut current = self.parent_of(id);
        let mut hops = 0usize;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            hops += 1;
            if hops > self.nodes.len() {
                return false;
            }
            current = self.parent_of(parent);
        }
        false
    }

    /// `id` followed by all descendants, pre-order.
    pub fn subtree_ids(&self, id: &BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            let Some(block) = self.get(&current) else {
                continue;
            };
            let owned = block.owned_ids();
            out.push(current);
            stack.extend(owned.into_iter().rev());
        }
        out
    }

    /// Every block in document order: a block, then its children or columns.
    pub fn walk(&self) -> Vec<&Block> {
        self.roots
            .iter()
            .flat_map(|root| self.subtree_ids(root))
            .filter_map(|id| self.nodes.get(&id).map(|node| &node.block))
            .collect()
    }

    /// Draws a UUID v4 id not used by any block of this document.
    pub fn fresh_id(&self) -> BlockId {
        loop {
            let candidate = BlockId::generate();
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Inserts a block into `slot` at `index` (clamped).
    ///
    /// The block must not own ids yet; children are attached afterwards into
    /// the block's own slots. Returns `false` when the slot does not exist or
    /// the id is taken.
    pub(crate) fn attach(&mut self, block: Block, slot: Slot, index: usize) -> bool {
        if self.nodes.contains_key(block.id()) || !block.owned_ids().is_empty() {
            return false;
        }
        let id = block.id().clone();
        let Some(siblings) = self.siblings_mut(&slot) else {
            return false;
        };
        let index = index.min(siblings.len());
        siblings.insert(index, id.clone());
        self.nodes.insert(id, Node { block, slot });
        true
    }

    /// Moves an existing block (with its subtree) to `slot` at `index`.
    ///
    /// Rejects moves into the block itself or one of its descendants.
    pub(crate) fn move_to(&mut self, id: &BlockId, slot: Slot, index: usize) -> bool {
        if let Some(container) = slot.container() {
            if container == id || self.is_ancestor(id, container) || !self.contains(container) {
                return false;
            }
        }
        if self.siblings_mut(&slot).is_none() {
            return false;
        }
        let Some(from) = self.slot_of(id).cloned() else {
            return false;
        };
        if let Some(list) = self.siblings_mut(&from) {
            list.retain(|candidate| candidate != id);
        }
        if let Some(list) = self.siblings_mut(&slot) {
            let index = index.min(list.len());
            list.insert(index, id.clone());
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.slot = slot;
        }
        true
    }

    /// Removes a block and its whole subtree; returns removed blocks pre-order.
    pub(crate) fn remove_subtree(&mut self, id: &BlockId) -> Vec<Block> {
        let Some(slot) = self.slot_of(id).cloned() else {
            return Vec::new();
        };
        let ids = self.subtree_ids(id);
        if let Some(list) = self.siblings_mut(&slot) {
            list.retain(|candidate| candidate != id);
        }
        ids.into_iter()
            .filter_map(|removed| self.nodes.remove(&removed).map(|node| node.block))
            .collect()
    }

    /// Changes the column count of a columns block.
    ///
    /// Blocks of dropped columns move to the end of the last kept column.
    pub(crate) fn resize_columns(&mut self, id: &BlockId, count: ColumnCount) -> bool {
        let last = count.get() - 1;
        let moved = {
            let Some(block) = self.get_mut(id) else {
                return false;
            };
            let BlockContent::Columns(set) = block.content_mut() else {
                return false;
            };
            set.resize(count);
            set.slots().get(last).cloned().unwrap_or_default()
        };
        for child in moved {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.slot = Slot::Column(id.clone(), last);
            }
        }
        true
    }

    /// Swaps the whole arena for `other`, advancing the generation.
    pub(crate) fn replace_with(&mut self, other: Document) {
        let generation = self.generation + 1;
        *self = other;
        self.generation = generation;
    }

    /// Checks every structural invariant; returns the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.roots.is_empty() {
            return Err("document has no top-level block".to_string());
        }

        let mut seen: HashSet<&BlockId> = HashSet::new();
        let mut slots: Vec<Slot> = vec![Slot::Root];
        for node in self.nodes.values() {
            match node.block.content() {
                BlockContent::Toggle { .. } => {
                    slots.push(Slot::Children(node.block.id().clone()));
                }
                BlockContent::Columns(set) => {
                    for index in 0..set.slots().len() {
                        slots.push(Slot::Column(node.block.id().clone(), index));
                    }
                }
                _ => {}
            }
        }

        for slot in &slots {
            let mut previous_ordinal: Option<u32> = None;
            for id in self.siblings(slot) {
                let Some(node) = self.nodes.get(id) else {
                    return Err(format!("sibling list references unknown block {id}"));
                };
                if !seen.insert(id) {
                    return Err(format!("block {id} appears in more than one list"));
                }
                if &node.slot != slot {
                    return Err(format!("block {id} records a stale slot"));
                }
                if self.is_ancestor(id, id) {
                    return Err(format!("block {id} is its own ancestor"));
                }
                match node.block.content() {
                    BlockContent::Numbered { ordinal, .. } => {
                        let expected = previous_ordinal.map_or(1, |prev| prev + 1);
                        if *ordinal != expected {
                            return Err(format!(
                                "block {id} has ordinal {ordinal}, expected {expected}"
                            ));
                        }
                        previous_ordinal = Some(*ordinal);
                    }
                    _ => previous_ordinal = None,
                }
            }
        }

        if seen.len() != self.nodes.len() {
            return Err("arena holds blocks that no list references".to_string());
        }
        Ok(())
    }

    /// Recomputes numbered ordinals of one sibling list.
    ///
    /// A numbered block gets 1 + the ordinal of the immediately preceding
    /// numbered sibling, else 1. Returns `true` when any ordinal changed.
    pub(crate) fn renumber_slot(&mut self, slot: &Slot) -> bool {
        let ids = self.siblings(slot).to_vec();
        let mut previous: Option<u32> = None;
        let mut changed = false;
        for id in ids {
            let Some(block) = self.get_mut(&id) else {
                previous = None;
                continue;
            };
            match block.content_mut() {
                BlockContent::Numbered { ordinal, .. } => {
                    let expected = previous.map_or(1, |prev| prev + 1);
                    if *ordinal != expected {
                        *ordinal = expected;
                        changed = true;
                    }
                    previous = Some(expected);
                }
                _ => previous = None,
            }
        }
        changed
    }

    /// Renumbers every sibling list of the document.
    pub(crate) fn renumber_all(&mut self) -> bool {
        let mut slots = vec![Slot::Root];
        for node in self.nodes.values() {
            match node.block.content() {
                BlockContent::Toggle { .. } => slots.push(Slot::Children(node.block.id().clone())),
                BlockContent::Columns(set) => slots.extend(
                    (0..set.slots().len()).map(|index| Slot::Column(node.block.id().clone(), index)),
                ),
                _ => {}
            }
        }
        let mut changed = false;
        for slot in &slots {
            changed |= self.renumber_slot(slot);
        }
        changed
    }

    /// Count of blocks of `kind` anywhere in the document.
    pub fn count_kind(&self, kind: BlockKind) -> usize {
        self.nodes
            .values()
            .filter(|node| node.block.kind() == kind)
            .count()
    }
}
