//! Block document domain model.
//!
//! # Responsibility
//! - Define blocks, the document arena and the persisted snapshot shape.
//! - Keep kind-specific fields bound to the variant that owns them.
//!
//! # Invariants
//! - Every block is identified by a `BlockId` unique within its document.
//! - The tree shape lives only in sibling lists; blocks never point upward.
//!
//! # See also
//! - docs/architecture/block-model.md

pub mod block;
pub mod catalog;
pub mod cursor;
pub mod document;
pub mod snapshot;
