//! The template editor page.
//!
//! Saving writes the editor HTML into the template form's `body` field,
//! attaches the default media and submits the form. Cancelling goes back
//! one history entry.

use std::sync::Arc;

use n0_future::task::{self, JoinHandle};
use parchment_common::{ApiClient, ApiRequest, Navigator};
use parchment_editor_core::{
    EditingEngine, EditorConfig, EditorError, EditorHost, GlobalEditor,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::app::App;

pub const TEMPLATE_PLACEHOLDER: &str = "Template Content...";
pub const SAVE_TEMPLATE_TEXT: &str = "Save Template";
pub const TEMPLATE_EDITOR_HEIGHT: &str = "480px";
/// Media attachment id sent with every saved template.
pub const DEFAULT_MEDIA_ATTACHMENT: u64 = 41;
pub const TEMPLATES_ENDPOINT: &str = "/templates";

pub const BODY_FIELD: &str = "body";
pub const MEDIA_FIELD: &str = "media_attachment";

/// State passed along when navigating to the page, e.g. from a template list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TemplateState {
    pub body: Option<String>,
}

/// Editor configuration for the page. A state without a body falls back
/// to the editor's own default content.
pub fn template_editor_config(state: Option<&TemplateState>) -> EditorConfig {
    let defaults = EditorConfig::default();
    let initial_content = match state {
        None => TEMPLATE_PLACEHOLDER.to_owned(),
        Some(TemplateState { body: Some(body) }) => body.clone(),
        Some(TemplateState { body: None }) => defaults.initial_content.clone(),
    };
    EditorConfig {
        initial_content,
        generate_full_html: true,
        show_in_card: false,
        button_text: SAVE_TEMPLATE_TEXT.to_owned(),
        height: Some(TEMPLATE_EDITOR_HEIGHT.to_owned()),
        ..defaults
    }
}

/// The form the page saves through.
pub trait TemplateForm {
    fn set_field_value(&mut self, field: &str, value: Value);
    fn handle_submit(&mut self);
}

/// Form that posts its fields to the templates endpoint.
#[derive(Debug)]
pub struct ApiTemplateForm {
    client: Arc<ApiClient>,
    endpoint: String,
    fields: Map<String, Value>,
    pending: Option<JoinHandle<()>>,
}

impl ApiTemplateForm {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            endpoint: TEMPLATES_ENDPOINT.to_owned(),
            fields: Map::new(),
            pending: None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Handle of the last submission, if one was started.
    pub fn take_pending(&mut self) -> Option<JoinHandle<()>> {
        self.pending.take()
    }
}

impl TemplateForm for ApiTemplateForm {
    fn set_field_value(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_owned(), value);
    }

    fn handle_submit(&mut self) {
        let client = self.client.clone();
        let request = ApiRequest::post(&self.endpoint).json(self.fields.clone());
        self.pending = Some(task::spawn(async move {
            match client.request(request).await {
                Ok(Some(_)) => tracing::info!("template saved"),
                Ok(None) => tracing::warn!("template save rejected"),
                Err(err) => tracing::error!(%err, "template save failed"),
            }
        }));
    }
}

/// Editor host for the page.
pub struct TemplateHost<F> {
    form: Option<F>,
    navigator: Arc<dyn Navigator>,
}

impl<F> TemplateHost<F> {
    /// `form` may be absent while the page is still mounting; saves are
    /// dropped until it is there.
    pub fn new(form: Option<F>, navigator: Arc<dyn Navigator>) -> Self {
        Self { form, navigator }
    }

    pub fn form(&self) -> Option<&F> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut F> {
        self.form.as_mut()
    }

    pub fn attach_form(&mut self, form: F) {
        self.form = Some(form);
    }
}

impl<F: TemplateForm> EditorHost for TemplateHost<F> {
    fn on_submit(&mut self, html: &str) {
        let Some(form) = self.form.as_mut() else {
            tracing::debug!("save without a form, ignoring");
            return;
        };
        form.set_field_value(MEDIA_FIELD, Value::from(DEFAULT_MEDIA_ATTACHMENT));
        form.set_field_value(BODY_FIELD, Value::from(html));
        form.handle_submit();
    }

    fn on_cancel(&mut self) {
        self.navigator.back();
    }
}

pub type TemplateEditor<E, F> = GlobalEditor<E, TemplateHost<F>>;

/// Mount the template editor with the app's image services and notifier.
pub fn open_template_editor<E, F>(
    app: &App,
    engine: E,
    state: Option<&TemplateState>,
    form: Option<F>,
) -> Result<TemplateEditor<E, F>, EditorError>
where
    E: EditingEngine,
    F: TemplateForm,
{
    let host = TemplateHost::new(form, app.navigator().clone());
    let editor = GlobalEditor::new(engine, host, template_editor_config(state))?
        .with_uploader(app.image_service().clone())
        .with_deleter(app.image_service().clone())
        .with_notifier(app.notifier().clone());
    Ok(editor)
}
