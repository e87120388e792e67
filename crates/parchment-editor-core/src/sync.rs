//! Authoritative HTML and the rendered/source view state machine.

use crate::engine::EditingEngine;
use crate::error::EditorError;
use crate::sanitize::sanitize;
use crate::tree::DocumentTree;
use crate::types::ViewMode;

/// Baseline stylesheet embedded in full-document output.
pub const DEFAULT_STYLESHEET: &str = "
        body {
            font-family: Arial, sans-serif;
            line-height: 1.6;
            margin: 40px;
            color: #333;
        }
        h1, h2, h3, h4, h5, h6 {
            margin-top: 24px;
            margin-bottom: 12px;
        }
        p {
            margin-bottom: 12px;
        }
        ul, ol {
            margin: 12px 0;
            padding-left: 24px;
        }
        li {
            margin-bottom: 6px;
        }
        a {
            color: #0066cc;
            text-decoration: none;
        }
        img {
            max-width: 100%;
            height: auto;
            display: block;
            margin: 12px 0;
        }
        .hard-break {
            display: block;
            content: \"\";
            margin-top: 0.5em;
        }";

/// Settings for wrapping the fragment in a standalone HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentShell {
    /// Appended after [`DEFAULT_STYLESHEET`] inside the same `<style>`.
    pub custom_styles: String,
}

impl DocumentShell {
    pub fn new(custom_styles: impl Into<String>) -> Self {
        Self {
            custom_styles: custom_styles.into(),
        }
    }

    /// Wrap a body fragment. Purely textual; the fragment is not parsed.
    pub fn wrap(&self, fragment: &str) -> String {
        self.wrap_with(DEFAULT_STYLESHEET, fragment)
    }

    fn wrap_with(&self, stylesheet: &str, fragment: &str) -> String {
        let mut out = String::with_capacity(
            fragment.len() + stylesheet.len() + self.custom_styles.len() + 256,
        );
        out.push_str("<!DOCTYPE html><html lang=\"en\"><head>");
        out.push_str("<meta charset=\"UTF-8\">");
        out.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">",
        );
        out.push_str("<title>Document</title><style>");
        out.push_str(stylesheet);
        out.push_str(&self.custom_styles);
        out.push_str("</style></head><body>");
        out.push_str(fragment);
        out.push_str("</body></html>");
        out
    }
}

/// Owns the authoritative content string and the current view.
///
/// In [`ViewMode::Rendered`] the content is derived from engine change events.
/// In [`ViewMode::Source`] the user edits a raw buffer that only re-enters the
/// engine through [`commit_source_mode`](Self::commit_source_mode).
#[derive(Debug, Clone, Default)]
pub struct ContentSync {
    content: String,
    view: ViewMode,
    source_buffer: String,
    shell: Option<DocumentShell>,
}

impl ContentSync {
    pub fn new(initial: impl Into<String>, shell: Option<DocumentShell>) -> Self {
        Self {
            content: initial.into(),
            view: ViewMode::Rendered,
            source_buffer: String::new(),
            shell,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    pub fn source_buffer(&self) -> &str {
        &self.source_buffer
    }

    pub fn shell(&self) -> Option<&DocumentShell> {
        self.shell.as_ref()
    }

    /// Derive the content string from a new document snapshot.
    ///
    /// Deterministic in the tree: the same snapshot always yields the same
    /// content.
    pub fn on_document_changed(&mut self, tree: &DocumentTree) -> &str {
        let fragment = tree.to_html();
        self.content = match &self.shell {
            Some(shell) => shell.wrap(&fragment),
            None => fragment,
        };
        tracing::trace!(len = self.content.len(), "content synced from tree");
        &self.content
    }

    /// Rendered -> Source. Copies the content verbatim into the raw buffer.
    pub fn enter_source_mode(&mut self) -> Result<(), EditorError> {
        self.expect_view(ViewMode::Rendered)?;
        self.source_buffer.clone_from(&self.content);
        self.view = ViewMode::Source;
        tracing::debug!("entered source view");
        Ok(())
    }

    /// Replace the raw buffer while in source view.
    pub fn edit_source(&mut self, text: impl Into<String>) -> Result<(), EditorError> {
        self.expect_view(ViewMode::Source)?;
        self.source_buffer = text.into();
        Ok(())
    }

    /// Source -> Rendered. Sanitizes the buffer and hands it to the engine.
    ///
    /// If the engine refuses the HTML, the view stays in source mode with the
    /// buffer exactly as the user left it.
    pub fn commit_source_mode<E>(&mut self, engine: &mut E) -> Result<(), EditorError>
    where
        E: EditingEngine + ?Sized,
    {
        self.expect_view(ViewMode::Source)?;
        let sanitized = sanitize(&self.source_buffer);
        if let Err(err) = engine.set_content(&sanitized) {
            tracing::warn!(%err, "engine rejected source HTML");
            return Err(EditorError::Commit(err));
        }
        self.content = sanitized;
        self.view = ViewMode::Rendered;
        tracing::debug!("committed source view");
        Ok(())
    }

    /// Enter source view from rendered, or commit it back.
    pub fn toggle_source_view<E>(&mut self, engine: &mut E) -> Result<ViewMode, EditorError>
    where
        E: EditingEngine + ?Sized,
    {
        match self.view {
            ViewMode::Rendered => self.enter_source_mode()?,
            ViewMode::Source => self.commit_source_mode(engine)?,
        }
        Ok(self.view)
    }

    /// Overwrite the content after the engine was reloaded externally.
    pub(crate) fn reset(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.source_buffer.clear();
        self.view = ViewMode::Rendered;
    }

    fn expect_view(&self, expected: ViewMode) -> Result<(), EditorError> {
        if self.view == expected {
            Ok(())
        } else {
            Err(EditorError::WrongMode {
                expected,
                actual: self.view,
            })
        }
    }
}
