//! AI restructure bridge.
//!
//! # Responsibility
//! - Flatten a document's text for an external structuring service.
//! - Parse the service response into validated block candidates.
//! - Replace editable blocks with the candidates, keeping media blocks.
//!
//! # Invariants
//! - At most one restructure is in flight per bridge.
//! - A response is applied only if the document generation did not move
//!   since the request was issued.
//! - Any parse failure rejects the whole response; the document is untouched.
//! - Media blocks, nested ones included, survive unchanged at the end.
//!
//! # See also
//! - docs/architecture/ai-restructure.md

use crate::engine::EditOutcome;
use crate::model::block::{Block, BlockContent, BlockKind, TextStyle};
use crate::model::cursor::Cursor;
use crate::model::document::{Document, Slot};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Request body sent to the structuring service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureRequest {
    pub text: String,
}

/// External text-to-blocks collaborator.
///
/// Returns the raw response text, which may wrap the JSON array in prose.
pub trait StructuringService: Send + Sync {
    fn structure(
        &self,
        request: StructureRequest,
    ) -> impl Future<Output = Result<String, String>> + Send;
}

/// Restructure failure; the document is never modified when one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestructureError {
    /// Another restructure is still pending.
    Busy,
    /// Flattened text exceeds the configured limit.
    InputTooLarge { chars: usize, max: usize },
    /// The service call failed.
    Service(String),
    /// No well-formed JSON array of block objects in the response.
    Malformed(String),
    /// The response held an empty array.
    EmptyResponse,
    /// The document changed while the request was in flight.
    Stale { requested: u64, current: u64 },
}

impl RestructureError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Busy => "Restructuring is already in progress.",
            Self::InputTooLarge { .. } => "This note is too long to restructure.",
            Self::Service(_) | Self::Malformed(_) | Self::EmptyResponse => {
                "The note could not be restructured. Nothing was changed."
            }
            Self::Stale { .. } => {
                "The note changed while restructuring. Nothing was replaced."
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::InputTooLarge { .. } => "input_too_large",
            Self::Service(_) => "service_failed",
            Self::Malformed(_) => "malformed_response",
            Self::EmptyResponse => "empty_response",
            Self::Stale { .. } => "stale",
        }
    }
}

impl Display for RestructureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "restructure already in flight"),
            Self::InputTooLarge { chars, max } => {
                write!(f, "restructure input has {chars} chars, limit is {max}")
            }
            Self::Service(message) => write!(f, "structuring service failed: {message}"),
            Self::Malformed(details) => write!(f, "malformed structuring response: {details}"),
            Self::EmptyResponse => write!(f, "structuring response holds no blocks"),
            Self::Stale { requested, current } => write!(
                f,
                "document moved from generation {requested} to {current} during restructure"
            ),
        }
    }
}

impl Error for RestructureError {}

/// One validated block proposed by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: BlockKind,
    pub content: String,
    /// Meaningful only for `todo`.
    pub checked: bool,
}

impl Candidate {
    fn into_content(self) -> BlockContent {
        match BlockContent::with_text(self.kind, self.content.clone()) {
            Some(BlockContent::Todo { text, .. }) => BlockContent::Todo {
                text,
                checked: self.checked,
            },
            Some(content) => content,
            None => BlockContent::Plain {
                style: TextStyle::Text,
                text: self.content,
            },
        }
    }
}

/// Maps a service type name onto the kinds a restructure may produce.
fn candidate_kind(type_name: Option<&str>) -> BlockKind {
    match type_name {
        Some("heading1") => BlockKind::Heading1,
        Some("heading2") => BlockKind::Heading2,
        Some("bullet") | Some("list") => BlockKind::Bullet,
        Some("todo") => BlockKind::Todo,
        _ => BlockKind::Text,
    }
}

fn normalize_content(value: Option<&Value>) -> String {
    let raw = match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    };
    WHITESPACE_RE.replace_all(raw.trim(), " ").into_owned()
}

/// First well-formed JSON array in `response`, prose around it ignored.
fn extract_first_array(response: &str) -> Option<Vec<Value>> {
    response
        .char_indices()
        .filter(|(_, ch)| *ch == '[')
        .find_map(|(start, _)| {
            let mut values =
                serde_json::Deserializer::from_str(&response[start..]).into_iter::<Value>();
            match values.next() {
                Some(Ok(Value::Array(items))) => Some(items),
                _ => None,
            }
        })
}

/// Parses a raw service response into block candidates.
///
/// # Errors
/// - `Malformed` when no JSON array is found or an element is not an object.
/// - `EmptyResponse` when the array is empty.
pub fn parse_candidates(response: &str) -> Result<Vec<Candidate>, RestructureError> {
    let items = extract_first_array(response)
        .ok_or_else(|| RestructureError::Malformed("no JSON array found".to_string()))?;
    if items.is_empty() {
        return Err(RestructureError::EmptyResponse);
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let Value::Object(fields) = item else {
                return Err(RestructureError::Malformed(format!(
                    "element {index} is not an object"
                )));
            };
            let kind = candidate_kind(fields.get("type").and_then(Value::as_str));
            let checked = kind == BlockKind::Todo
                && fields
                    .get("checked")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
            Ok(Candidate {
                kind,
                content: normalize_content(fields.get("content")),
                checked,
            })
        })
        .collect()
}

/// Text of every non-media block, pre-order, blanks skipped, newline-joined.
pub fn flatten_text(doc: &Document) -> String {
    doc.walk()
        .into_iter()
        .filter(|block| !block.kind().is_media())
        .filter_map(Block::text)
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replaces all editable blocks with `candidates`; media blocks follow.
pub fn apply_candidates(doc: &mut Document, candidates: Vec<Candidate>) -> EditOutcome {
    let media: Vec<Block> = doc
        .walk()
        .into_iter()
        .filter(|block| block.kind().is_media())
        .cloned()
        .collect();

    let mut next = Document::empty_arena();
    for block in media {
        let end = next.roots().len();
        next.attach(block, Slot::Root, end);
    }
    for (index, candidate) in candidates.into_iter().enumerate() {
        let id = next.fresh_id();
        next.attach(Block::new(id, candidate.into_content()), Slot::Root, index);
    }
    if next.roots().is_empty() {
        next = Document::new();
    }
    next.renumber_all();

    doc.replace_with(next);
    let focus = doc
        .first_block_id()
        .cloned()
        .map(Cursor::start_of)
        .unwrap_or_else(|| Cursor::start_of(doc.fresh_id()));
    EditOutcome::changed(focus)
}

struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Issues restructure requests for one document, one at a time.
#[derive(Debug, Clone)]
pub struct RestructureBridge {
    in_flight: Arc<AtomicBool>,
    max_input_chars: usize,
}

impl RestructureBridge {
    pub fn new(max_input_chars: usize) -> Self {
        Self {
            in_flight: Arc::new(AtomicBool::new(false)),
            max_input_chars,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Captures the flattened text and generation of `doc`.
    ///
    /// Returns `Ok(None)` for blank documents; no round-trip is needed.
    ///
    /// # Errors
    /// - `Busy` while an earlier request is pending.
    /// - `InputTooLarge` when the text exceeds the configured limit.
    pub fn prepare(&self, doc: &Document) -> Result<Option<PendingRestructure>, RestructureError> {
        let text = flatten_text(doc);
        if text.trim().is_empty() {
            info!("event=restructure_request module=restructure status=skipped reason=blank");
            return Ok(None);
        }
        let chars = text.chars().count();
        if chars > self.max_input_chars {
            let err = RestructureError::InputTooLarge {
                chars,
                max: self.max_input_chars,
            };
            warn!(
                "event=restructure_request module=restructure status=rejected reason={} chars={}",
                err.code(),
                chars
            );
            return Err(err);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("event=restructure_request module=restructure status=rejected reason=busy");
            return Err(RestructureError::Busy);
        }

        info!(
            "event=restructure_request module=restructure status=start chars={} generation={}",
            chars,
            doc.generation()
        );
        Ok(Some(PendingRestructure {
            text,
            generation: doc.generation(),
            guard: InFlightGuard(Arc::clone(&self.in_flight)),
        }))
    }
}

/// Request captured by [`RestructureBridge::prepare`]; holds the in-flight slot.
pub struct PendingRestructure {
    text: String,
    generation: u64,
    guard: InFlightGuard,
}

impl PendingRestructure {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Calls the service and parses its response.
    pub async fn fetch<S>(self, service: &S) -> Result<RestructureReply, RestructureError>
    where
        S: StructuringService + ?Sized,
    {
        let request = StructureRequest {
            text: self.text.clone(),
        };
        let result = match service.structure(request).await {
            Ok(response) => parse_candidates(&response),
            Err(message) => Err(RestructureError::Service(message)),
        };
        match result {
            Ok(candidates) => Ok(RestructureReply {
                candidates,
                generation: self.generation,
                _guard: self.guard,
            }),
            Err(err) => {
                warn!(
                    "event=restructure_response module=restructure status=error reason={}",
                    err.code()
                );
                Err(err)
            }
        }
    }
}

/// Parsed service response waiting to be applied.
pub struct RestructureReply {
    candidates: Vec<Candidate>,
    generation: u64,
    _guard: InFlightGuard,
}

impl RestructureReply {
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Replaces the document content unless it changed since `prepare`.
    ///
    /// # Errors
    /// - `Stale` when the document generation moved.
    pub fn apply(self, doc: &mut Document) -> Result<EditOutcome, RestructureError> {
        if doc.generation() != self.generation {
            let err = RestructureError::Stale {
                requested: self.generation,
                current: doc.generation(),
            };
            warn!(
                "event=restructure_apply module=restructure status=rejected reason={}",
                err.code()
            );
            return Err(err);
        }
        let count = self.candidates.len();
        let outcome = apply_candidates(doc, self.candidates);
        info!(
            "event=restructure_apply module=restructure status=ok blocks={} generation={}",
            count,
            doc.generation()
        );
        Ok(outcome)
    }
}
