//! parchment-app: the application shell around the editor.
//!
//! - `routing` - route table and the protected-route gate
//! - `app` - bootstrap of session, API client and image services
//! - `template_page` - the template editor page

pub mod app;
pub mod routing;
pub mod template_page;

pub use app::{App, AppConfig, InitialAuth, Platform, init_logging};
pub use routing::{Resolution, RouteEntry, RouteTable, View, Viewer};
pub use template_page::{
    ApiTemplateForm, TemplateForm, TemplateHost, TemplateState, open_template_editor,
    template_editor_config,
};
