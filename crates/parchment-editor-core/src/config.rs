use serde::{Deserialize, Serialize};

use crate::sync::DocumentShell;

pub const DEFAULT_INITIAL_CONTENT: &str = "<p>Start writing...</p>";
pub const DEFAULT_BUTTON_TEXT: &str = "Save";

/// Presentation and behavior settings for one editor instance.
///
/// Every field is optional when deserializing; missing ones take the
/// [`Default`] values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// HTML loaded into the engine at mount.
    pub initial_content: String,
    pub read_only: bool,
    /// Wrap the content in a standalone HTML document.
    pub generate_full_html: bool,
    /// Appended after the default stylesheet in full-document mode.
    pub custom_styles: String,
    /// Render inside card chrome.
    pub show_in_card: bool,
    pub show_bottom_buttons: bool,
    pub button_text: String,
    /// CSS height of the editing surface, e.g. `"480px"`.
    pub height: Option<String>,
    pub dropdown: Option<DropdownConfig>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            initial_content: DEFAULT_INITIAL_CONTENT.to_owned(),
            read_only: false,
            generate_full_html: false,
            custom_styles: String::new(),
            show_in_card: true,
            show_bottom_buttons: true,
            button_text: DEFAULT_BUTTON_TEXT.to_owned(),
            height: None,
            dropdown: None,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Shell settings, if full-document output is on.
    pub fn document_shell(&self) -> Option<DocumentShell> {
        self.generate_full_html
            .then(|| DocumentShell::new(self.custom_styles.clone()))
    }

    /// The dropdown is only shown when it has something to offer.
    pub fn show_dropdown(&self) -> bool {
        self.dropdown
            .as_ref()
            .is_some_and(|dropdown| dropdown.show && !dropdown.options.is_empty())
    }
}

/// One entry of the auxiliary dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Auxiliary dropdown shown above the editing surface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DropdownConfig {
    pub show: bool,
    pub options: Vec<SelectOption>,
    pub selected: Option<String>,
    /// Show a search box that filters options by label.
    pub searchable: bool,
}

impl DropdownConfig {
    pub fn new(options: Vec<SelectOption>) -> Self {
        Self {
            show: true,
            options,
            ..Default::default()
        }
    }

    /// Label of the selected option, if it matches one.
    pub fn selected_label(&self) -> Option<&str> {
        let selected = self.selected.as_deref()?;
        self.options
            .iter()
            .find(|opt| opt.value == selected)
            .map(|opt| opt.label.as_str())
    }

    /// Options whose label contains `query`, ignoring case.
    pub fn filter<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a SelectOption> + 'a {
        let query = query.trim().to_lowercase();
        self.options
            .iter()
            .filter(move |opt| query.is_empty() || opt.label.to_lowercase().contains(&query))
    }
}
