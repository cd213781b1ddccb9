//! Block domain model.
//!
//! # Responsibility
//! - Define the closed set of block kinds and their wire names.
//! - Bind kind-specific fields to the variant that owns them.
//!
//! # Invariants
//! - `checked` exists only on to-do content, `collapsed`/`children` only on
//!   toggle-family content, `ordinal` only on numbered content.
//! - A column set always holds between 2 and 5 slots.
//! - Media content is set at creation and never mutated afterwards.
//!
//! # See also
//! - docs/architecture/block-model.md

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one block inside a document.
///
/// Persisted notes carry arbitrary string ids, so this wraps a string rather
/// than a `Uuid`; freshly created blocks get a UUID v4 token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Draws a new random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Flat tag naming every block kind.
///
/// Serialized with the wire names used by the persisted note payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "bullet")]
    Bullet,
    #[serde(rename = "numbered")]
    Numbered,
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "toggle")]
    Toggle,
    #[serde(rename = "toggle-h1")]
    ToggleHeading1,
    #[serde(rename = "toggle-h2")]
    ToggleHeading2,
    #[serde(rename = "toggle-h3")]
    ToggleHeading3,
    #[serde(rename = "code")]
    Code,
    #[serde(rename = "quote")]
    Quote,
    #[serde(rename = "callout")]
    Callout,
    #[serde(rename = "columns-2")]
    Columns2,
    #[serde(rename = "columns-3")]
    Columns3,
    #[serde(rename = "columns-4")]
    Columns4,
    #[serde(rename = "columns-5")]
    Columns5,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "file")]
    File,
    #[serde(rename = "page")]
    Page,
    #[serde(rename = "synced")]
    SyncedReference,
}

impl BlockKind {
    pub const ALL: [BlockKind; 22] = [
        Self::Text,
        Self::Heading1,
        Self::Heading2,
        Self::Heading3,
        Self::Bullet,
        Self::Numbered,
        Self::Todo,
        Self::Toggle,
        Self::ToggleHeading1,
        Self::ToggleHeading2,
        Self::ToggleHeading3,
        Self::Code,
        Self::Quote,
        Self::Callout,
        Self::Columns2,
        Self::Columns3,
        Self::Columns4,
        Self::Columns5,
        Self::Image,
        Self::File,
        Self::Page,
        Self::SyncedReference,
    ];

    /// Name used in the persisted payload and in AI responses.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Heading1 => "heading1",
            Self::Heading2 => "heading2",
            Self::Heading3 => "heading3",
            Self::Bullet => "bullet",
            Self::Numbered => "numbered",
            Self::Todo => "todo",
            Self::Toggle => "toggle",
            Self::ToggleHeading1 => "toggle-h1",
            Self::ToggleHeading2 => "toggle-h2",
            Self::ToggleHeading3 => "toggle-h3",
            Self::Code => "code",
            Self::Quote => "quote",
            Self::Callout => "callout",
            Self::Columns2 => "columns-2",
            Self::Columns3 => "columns-3",
            Self::Columns4 => "columns-4",
            Self::Columns5 => "columns-5",
            Self::Image => "image",
            Self::File => "file",
            Self::Page => "page",
            Self::SyncedReference => "synced",
        }
    }

    pub fn from_wire_name(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.wire_name() == value)
    }

    pub fn is_media(self) -> bool {
        matches!(self, Self::Image | Self::File)
    }

    pub fn is_toggle_family(self) -> bool {
        matches!(
            self,
            Self::Toggle | Self::ToggleHeading1 | Self::ToggleHeading2 | Self::ToggleHeading3
        )
    }

    pub fn is_columns(self) -> bool {
        self.column_count().is_some()
    }

    /// Toggle-family or columns.
    pub fn is_container(self) -> bool {
        self.is_toggle_family() || self.is_columns()
    }

    /// Kinds for which Enter continues with the same kind.
    pub fn is_list_like(self) -> bool {
        matches!(self, Self::Bullet | Self::Numbered | Self::Todo)
    }

    /// Kinds that carry an editable text run and can hold the cursor.
    pub fn is_text_bearing(self) -> bool {
        !self.is_media() && !self.is_columns()
    }

    pub fn column_count(self) -> Option<ColumnCount> {
        match self {
            Self::Columns2 => Some(ColumnCount::Two),
            Self::Columns3 => Some(ColumnCount::Three),
            Self::Columns4 => Some(ColumnCount::Four),
            Self::Columns5 => Some(ColumnCount::Five),
            _ => None,
        }
    }
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Number of slots in a columns block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnCount {
    Two,
    Three,
    Four,
    Five,
}

impl ColumnCount {
    pub fn get(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
        }
    }

    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            5 => Some(Self::Five),
            _ => None,
        }
    }

    fn kind(self) -> BlockKind {
        match self {
            Self::Two => BlockKind::Columns2,
            Self::Three => BlockKind::Columns3,
            Self::Four => BlockKind::Columns4,
            Self::Five => BlockKind::Columns5,
        }
    }
}

/// Text-only kinds without extra fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextStyle {
    Text,
    Heading1,
    Heading2,
    Heading3,
    Bullet,
    Code,
    Quote,
    Callout,
    Page,
    SyncedReference,
}

/// Heading level of a toggle-family block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleStyle {
    Plain,
    Heading1,
    Heading2,
    Heading3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    File,
}

/// Upload result stored by media blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub url: String,
    pub file_name: String,
}

impl MediaRef {
    pub fn new(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
        }
    }
}

/// Ordered column slots of a columns block, each a list of child ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet {
    slots: Vec<Vec<BlockId>>,
}

impl ColumnSet {
    pub fn empty(count: ColumnCount) -> Self {
        Self {
            slots: vec![Vec::new(); count.get()],
        }
    }

    pub fn count(&self) -> ColumnCount {
        // Constructors only ever build 2..=5 slots.
        ColumnCount::from_len(self.slots.len()).unwrap_or(ColumnCount::Two)
    }

    pub fn slots(&self) -> &[Vec<BlockId>] {
        &self.slots
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Vec<BlockId>> {
        self.slots.get_mut(index)
    }

    /// Changes the slot count; ids from dropped slots move to the last kept one.
    pub(crate) fn resize(&mut self, count: ColumnCount) {
        let target = count.get();
        if self.slots.len() > target {
            let overflow: Vec<BlockId> = self.slots.drain(target..).flatten().collect();
            if let Some(last) = self.slots.last_mut() {
                last.extend(overflow);
            }
        } else {
            self.slots.resize(target, Vec::new());
        }
    }
}

/// Kind-specific payload of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockContent {
    Plain {
        style: TextStyle,
        text: String,
    },
    Numbered {
        text: String,
        ordinal: u32,
    },
    Todo {
        text: String,
        checked: bool,
    },
    Toggle {
        style: ToggleStyle,
        text: String,
        collapsed: bool,
        children: Vec<BlockId>,
    },
    Columns(ColumnSet),
    Media {
        kind: MediaKind,
        media: MediaRef,
    },
}

impl BlockContent {
    /// Builds fresh content of `kind` carrying `text`.
    ///
    /// Returns `None` for media kinds, which can only come from an upload.
    /// Columns ignore `text`; callers that need to keep it must place it in a
    /// child block themselves.
    pub fn with_text(kind: BlockKind, text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let plain = |style| Some(Self::Plain { style, text: text.clone() });
        match kind {
            BlockKind::Text => plain(TextStyle::Text),
            BlockKind::Heading1 => plain(TextStyle::Heading1),
            BlockKind::Heading2 => plain(TextStyle::Heading2),
            BlockKind::Heading3 => plain(TextStyle::Heading3),
            BlockKind::Bullet => plain(TextStyle::Bullet),
            BlockKind::Code => plain(TextStyle::Code),
            BlockKind::Quote => plain(TextStyle::Quote),
            BlockKind::Callout => plain(TextStyle::Callout),
            BlockKind::Page => plain(TextStyle::Page),
            BlockKind::SyncedReference => plain(TextStyle::SyncedReference),
            BlockKind::Numbered => Some(Self::Numbered { text, ordinal: 1 }),
            BlockKind::Todo => Some(Self::Todo {
                text,
                checked: false,
            }),
            BlockKind::Toggle
            | BlockKind::ToggleHeading1
            | BlockKind::ToggleHeading2
            | BlockKind::ToggleHeading3 => Some(Self::Toggle {
                style: toggle_style(kind),
                text,
                collapsed: false,
                children: Vec::new(),
            }),
            BlockKind::Columns2 | BlockKind::Columns3 | BlockKind::Columns4 | BlockKind::Columns5 => {
                kind.column_count().map(|count| Self::Columns(ColumnSet::empty(count)))
            }
            BlockKind::Image | BlockKind::File => None,
        }
    }

    pub fn empty(kind: BlockKind) -> Option<Self> {
        Self::with_text(kind, String::new())
    }

    pub fn media(kind: MediaKind, media: MediaRef) -> Self {
        Self::Media { kind, media }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Plain { style, .. } => match style {
                TextStyle::Text => BlockKind::Text,
                TextStyle::Heading1 => BlockKind::Heading1,
                TextStyle::Heading2 => BlockKind::Heading2,
                TextStyle::Heading3 => BlockKind::Heading3,
                TextStyle::Bullet => BlockKind::Bullet,
                TextStyle::Code => BlockKind::Code,
                TextStyle::Quote => BlockKind::Quote,
                TextStyle::Callout => BlockKind::Callout,
                TextStyle::Page => BlockKind::Page,
                TextStyle::SyncedReference => BlockKind::SyncedReference,
            },
            Self::Numbered { .. } => BlockKind::Numbered,
            Self::Todo { .. } => BlockKind::Todo,
            Self::Toggle { style, .. } => match style {
                ToggleStyle::Plain => BlockKind::Toggle,
                ToggleStyle::Heading1 => BlockKind::ToggleHeading1,
                ToggleStyle::Heading2 => BlockKind::ToggleHeading2,
                ToggleStyle::Heading3 => BlockKind::ToggleHeading3,
            },
            Self::Columns(set) => set.count().kind(),
            Self::Media { kind, .. } => match kind {
                MediaKind::Image => BlockKind::Image,
                MediaKind::File => BlockKind::File,
            },
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Plain { text, .. }
            | Self::Numbered { text, .. }
            | Self::Todo { text, .. }
            | Self::Toggle { text, .. } => Some(text.as_str()),
            Self::Columns(_) | Self::Media { .. } => None,
        }
    }

    pub(crate) fn text_mut(&mut self) -> Option<&mut String> {
        match self {
            Self::Plain { text, .. }
            | Self::Numbered { text, .. }
            | Self::Todo { text, .. }
            | Self::Toggle { text, .. } => Some(text),
            Self::Columns(_) | Self::Media { .. } => None,
        }
    }
}

fn toggle_style(kind: BlockKind) -> ToggleStyle {
    match kind {
        BlockKind::ToggleHeading1 => ToggleStyle::Heading1,
        BlockKind::ToggleHeading2 => ToggleStyle::Heading2,
        BlockKind::ToggleHeading3 => ToggleStyle::Heading3,
        _ => ToggleStyle::Plain,
    }
}

/// One content unit of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    content: BlockContent,
}

impl Block {
    pub fn new(id: BlockId, content: BlockContent) -> Self {
        Self { id, content }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }

    pub fn content(&self) -> &BlockContent {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut BlockContent {
        &mut self.content
    }

    pub(crate) fn replace_content(&mut self, content: BlockContent) -> BlockContent {
        std::mem::replace(&mut self.content, content)
    }

    /// Text run, `None` for media and columns.
    pub fn text(&self) -> Option<&str> {
        self.content.text()
    }

    pub(crate) fn text_mut(&mut self) -> Option<&mut String> {
        self.content.text_mut()
    }

    /// Text length in characters; 0 for blocks without text.
    pub fn text_len(&self) -> usize {
        self.text().map_or(0, |text| text.chars().count())
    }

    pub fn is_empty_text(&self) -> bool {
        self.text().map_or(true, str::is_empty)
    }

    pub fn checked(&self) -> Option<bool> {
        match &self.content {
            BlockContent::Todo { checked, .. } => Some(*checked),
            _ => None,
        }
    }

    pub fn collapsed(&self) -> Option<bool> {
        match &self.content {
            BlockContent::Toggle { collapsed, .. } => Some(*collapsed),
            _ => None,
        }
    }

    pub fn ordinal(&self) -> Option<u32> {
        match &self.content {
            BlockContent::Numbered { ordinal, .. } => Some(*ordinal),
            _ => None,
        }
    }

    pub fn media(&self) -> Option<&MediaRef> {
        match &self.content {
            BlockContent::Media { media, .. } => Some(media),
            _ => None,
        }
    }

    /// Toggle children; empty for every other kind.
    pub fn children(&self) -> &[BlockId] {
        match &self.content {
            BlockContent::Toggle { children, .. } => children,
            _ => &[],
        }
    }

    pub fn columns(&self) -> Option<&[Vec<BlockId>]> {
        match &self.content {
            BlockContent::Columns(set) => Some(set.slots()),
            _ => None,
        }
    }

    /// Every directly owned child id, toggle children or column slots in order.
    pub fn owned_ids(&self) -> Vec<BlockId> {
        match &self.content {
            BlockContent::Toggle { children, .. } => children.clone(),
            BlockContent::Columns(set) => set.slots().iter().flatten().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

pub fn is_media(block: &Block) -> bool {
    block.kind().is_media()
}

pub fn is_container(block: &Block) -> bool {
    block.kind().is_container()
}

pub fn is_list_like(block: &Block) -> bool {
    block.kind().is_list_like()
}
