//! Core editor types: selection, view mode, tracked images, list kinds.
//!
//! These types are engine-agnostic; positions are whatever coordinate space
//! the editing engine reports (for tree-based engines, the flat token
//! position between nodes).

use serde::{Deserialize, Serialize};

/// Text selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the caret is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    /// Where selection started
    pub anchor: usize,
    /// Where the caret is now
    pub head: usize,
}

impl Selection {
    /// Create a new selection.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (caret position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    /// Get the start (lower bound) of the selection.
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Get the end (upper bound) of the selection.
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Check if the selection is collapsed (caret only).
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }
}

/// Which surface the user is editing.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    /// WYSIWYG surface backed by the editing engine.
    #[default]
    Rendered,
    /// Raw HTML text buffer.
    Source,
}

/// One embedded image at a point in time.
///
/// Identity for diffing is `src`: the `id` is only assigned once the upload
/// service has confirmed the image, and local previews never get one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub src: String,
    pub id: Option<String>,
    #[serde(default)]
    pub is_local: bool,
}

impl ImageRef {
    /// An image confirmed by the upload service (or found in the document).
    pub fn remote(src: impl Into<String>, id: Option<String>) -> Self {
        Self {
            src: src.into(),
            id,
            is_local: false,
        }
    }

    /// A client-side preview that has never been persisted.
    pub fn local(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            id: None,
            is_local: true,
        }
    }
}

/// List flavours the toolbar can toggle.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    Bullet,
    Ordered,
}

impl ListKind {
    /// Node type name of the list container.
    pub fn node_name(self) -> &'static str {
        match self {
            ListKind::Bullet => "bulletList",
            ListKind::Ordered => "orderedList",
        }
    }
}

/// Paragraph alignment.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}
