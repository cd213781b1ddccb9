//! Block menu catalog offered by the type-picker.
//!
//! # Responsibility
//! - List transformable block kinds grouped by category with labels.
//! - Filter entries by a free-text query.
//!
//! # Invariants
//! - Media kinds never appear; they are created only from uploads.
//! - Category order and item order are stable.

use super::block::BlockKind;

/// One selectable menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub kind: BlockKind,
    pub label: &'static str,
    pub description: &'static str,
}

/// Named group of menu entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuCategory {
    pub name: &'static str,
    pub items: Vec<MenuItem>,
}

const fn item(kind: BlockKind, label: &'static str, description: &'static str) -> MenuItem {
    MenuItem {
        kind,
        label,
        description,
    }
}

const BASIC: &[MenuItem] = &[
    item(BlockKind::Text, "Text", "Plain text"),
    item(BlockKind::Heading1, "Heading 1", "Large heading"),
    item(BlockKind::Heading2, "Heading 2", "Medium heading"),
    item(BlockKind::Heading3, "Heading 3", "Small heading"),
];

const PAGES: &[MenuItem] = &[
    item(BlockKind::Page, "Page", "Create subpage"),
    item(BlockKind::SyncedReference, "Synced block", "Synced content"),
];

const LISTS: &[MenuItem] = &[
    item(BlockKind::Bullet, "Bulleted list", "Simple list"),
    item(BlockKind::Numbered, "Numbered list", "Ordered list"),
    item(BlockKind::Todo, "To-do list", "Checkboxes"),
    item(BlockKind::Toggle, "Toggle list", "Collapsible"),
];

const ADVANCED: &[MenuItem] = &[
    item(BlockKind::Code, "Code", "Code block"),
    item(BlockKind::Quote, "Quote", "Quotation"),
    item(BlockKind::Callout, "Callout", "Highlight"),
];

const TOGGLE_HEADINGS: &[MenuItem] = &[
    item(BlockKind::ToggleHeading1, "Toggle H1", "Collapsible H1"),
    item(BlockKind::ToggleHeading2, "Toggle H2", "Collapsible H2"),
    item(BlockKind::ToggleHeading3, "Toggle H3", "Collapsible H3"),
];

const LAYOUT: &[MenuItem] = &[
    item(BlockKind::Columns2, "2 Columns", "Two columns"),
    item(BlockKind::Columns3, "3 Columns", "Three columns"),
    item(BlockKind::Columns4, "4 Columns", "Four columns"),
    item(BlockKind::Columns5, "5 Columns", "Five columns"),
];

const CATEGORIES: &[(&str, &[MenuItem])] = &[
    ("Basic", BASIC),
    ("Pages", PAGES),
    ("Lists", LISTS),
    ("Advanced", ADVANCED),
    ("Toggle Headings", TOGGLE_HEADINGS),
    ("Layout", LAYOUT),
];

/// Full menu in display order.
pub fn block_menu() -> Vec<MenuCategory> {
    filter_block_menu("")
}

/// Menu entries whose label (case-insensitive) or wire type contains `query`.
///
/// Categories left without entries are omitted.
pub fn filter_block_menu(query: &str) -> Vec<MenuCategory> {
    let needle = query.trim().to_lowercase();
    CATEGORIES
        .iter()
        .filter_map(|(name, items)| {
            let items: Vec<MenuItem> = items
                .iter()
                .copied()
                .filter(|item| {
                    needle.is_empty()
                        || item.label.to_lowercase().contains(&needle)
                        || item.kind.wire_name().contains(&needle)
                })
                .collect();
            (!items.is_empty()).then_some(MenuCategory { name, items })
        })
        .collect()
}
