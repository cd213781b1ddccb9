//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the note load/save contract used by editor services.
//! - Isolate SQLite query details from session orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`SchemaNotReady`, `Encoding`)
//!   in addition to DB transport errors.
//!
//! # See also
//! - docs/architecture/data-model.md

pub mod note_store;
