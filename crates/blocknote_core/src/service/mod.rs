//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate engine, autosave and restructure calls per open note.
//! - Keep host UI layers decoupled from storage details.
//!
//! # See also
//! - docs/architecture/editor-session.md

pub mod editor_service;
