//! Boundary to the rich-text editing engine.
//!
//! The engine owns the document schema, rendering, history and selection.
//! This crate only needs a small capability surface from it, defined by
//! [`EditingEngine`]. Any engine that can export its tree, accept HTML and
//! run the commands in [`EditorCommand`] can back the editor.

use crate::error::EngineError;
use crate::tree::{Attrs, DocumentTree, NodeKind};
use crate::types::{ListKind, Selection, TextAlign};

/// Semantic commands dispatched to the engine.
///
/// These mirror the toolbar and keyboard operations, decoupled from how the
/// engine actually implements them.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    // === Marks ===
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    /// Apply a link mark to the selection.
    SetLink { href: String },
    /// Set the text color mark.
    SetColor(String),

    // === Blocks ===
    ToggleHeading { level: u8 },
    SetParagraph,
    SetTextAlign(TextAlign),
    /// The engine's built-in list toggle, applied to the current selection.
    ToggleList(ListKind),

    // === Insertion ===
    /// Insert an image node at the selection.
    SetImage { src: String, title: Option<String> },
    /// Split the parent block at a position.
    SplitBlock { pos: usize },
    /// Replace the selection with a hard line break.
    InsertHardBreak,

    // === Focus/selection ===
    Focus,
    SetTextSelection(Selection),
}

/// A position resolved against the current document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPosition {
    pub pos: usize,
    /// Node types from the root down to the innermost parent of `pos`.
    pub path: Vec<NodeKind>,
    /// Start of the parent node's content.
    pub parent_start: usize,
    /// End of the parent node's content.
    pub parent_end: usize,
}

impl ResolvedPosition {
    /// The node directly containing the position.
    pub fn parent(&self) -> Option<&NodeKind> {
        self.path.last()
    }

    /// Ancestors from the innermost outwards.
    pub fn ancestors(&self) -> impl Iterator<Item = &NodeKind> {
        self.path.iter().rev()
    }

    /// Whether any ancestor is a list container or list item.
    pub fn in_list(&self) -> bool {
        self.ancestors().any(NodeKind::is_list)
    }
}

/// Capability interface of the external editing engine.
///
/// The engine fires its own change events; the host forwards each one to
/// [`GlobalEditor::handle_update`](crate::GlobalEditor::handle_update).
/// Content replaced through [`set_content`](Self::set_content) does not
/// count as a change event.
pub trait EditingEngine {
    /// Current document as a tree.
    fn document(&self) -> DocumentTree;

    /// Current document serialized by the engine itself.
    fn get_html(&self) -> String;

    /// Replace the whole document from HTML.
    ///
    /// Must leave the document untouched when it returns an error.
    fn set_content(&mut self, html: &str) -> Result<(), EngineError>;

    /// Run a command. Returns true if the engine applied it.
    fn dispatch(&mut self, command: EditorCommand) -> bool;

    /// Whether a mark or node type is active at the selection, optionally
    /// requiring specific attributes.
    fn is_active(&self, name: &str, attrs: Option<&Attrs>) -> bool;

    /// Current selection.
    fn selection(&self) -> Selection;

    /// Resolve a position to its ancestry and parent bounds.
    fn resolve(&self, pos: usize) -> ResolvedPosition;
}
