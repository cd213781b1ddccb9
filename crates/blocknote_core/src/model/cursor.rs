//! Cursor position shared by the engine and the keyboard router.

use super::block::BlockId;

/// Transient `(block, offset)` pair.
///
/// `offset` counts characters (Unicode scalar values), not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub block_id: BlockId,
    pub offset: usize,
}

impl Cursor {
    pub fn new(block_id: BlockId, offset: usize) -> Self {
        Self { block_id, offset }
    }

    pub fn start_of(block_id: BlockId) -> Self {
        Self::new(block_id, 0)
    }
}

/// Byte index of the `chars`-th character of `text`, clamped to its end.
pub(crate) fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index)
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}
