//! Editing behaviors layered over the engine's built-in commands.

use crate::engine::{EditingEngine, EditorCommand};
use crate::tree::NodeKind;
use crate::types::{ListKind, Selection};

/// Result of handling a keydown event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Let the engine's default binding run.
    NotHandled,
}

/// Toggle a list, affecting only the caret's paragraph when nothing is
/// selected.
///
/// The engine's own toggle grows a collapsed selection to every adjacent
/// block it can join. Outside a list we therefore select exactly the
/// enclosing paragraph first and put the caret back afterwards. Returns
/// whether the engine applied the toggle.
pub fn toggle_list<E>(engine: &mut E, kind: ListKind) -> bool
where
    E: EditingEngine + ?Sized,
{
    let selection = engine.selection();
    let in_list = engine.is_active(ListKind::Bullet.node_name(), None)
        || engine.is_active(ListKind::Ordered.node_name(), None);

    if !selection.is_collapsed() || in_list {
        engine.dispatch(EditorCommand::Focus);
        return engine.dispatch(EditorCommand::ToggleList(kind));
    }

    let caret = selection.head;
    let resolved = engine.resolve(caret);
    tracing::trace!(
        caret,
        from = resolved.parent_start,
        to = resolved.parent_end,
        "isolating paragraph for list toggle"
    );

    engine.dispatch(EditorCommand::Focus);
    engine.dispatch(EditorCommand::SetTextSelection(Selection::new(
        resolved.parent_start,
        resolved.parent_end,
    )));
    let applied = engine.dispatch(EditorCommand::ToggleList(kind));
    engine.dispatch(EditorCommand::Focus);
    engine.dispatch(EditorCommand::SetTextSelection(Selection::collapsed(caret)));
    applied
}

/// Enter and Shift-Enter.
///
/// Shift-Enter always inserts a hard break. Plain Enter inside any list
/// is left to the engine so list items split and exit the way it expects;
/// in a bare paragraph it splits the block at the caret.
pub fn handle_enter<E>(engine: &mut E, shift: bool) -> KeydownResult
where
    E: EditingEngine + ?Sized,
{
    if shift {
        engine.dispatch(EditorCommand::InsertHardBreak);
        return KeydownResult::Handled;
    }

    let pos = engine.selection().start();
    let resolved = engine.resolve(pos);
    if resolved.in_list() {
        return KeydownResult::NotHandled;
    }

    match resolved.parent() {
        Some(NodeKind::Paragraph) => {
            engine.dispatch(EditorCommand::SplitBlock { pos });
            KeydownResult::Handled
        }
        _ => KeydownResult::NotHandled,
    }
}
