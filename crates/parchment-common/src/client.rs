//! HTTP client for the backend API.

use std::sync::Arc;

use parchment_editor_core::{LogNotifier, Notifier};
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::navigation::{MemoryNavigator, Navigator};
use crate::request::{ApiRequest, Body, FormValue, normalize_body, normalize_form, normalize_query};
use crate::response::{FailureAction, classify_failure};
use crate::storage::SessionStore;

/// Sends [`ApiRequest`]s and turns error responses into notifications,
/// redirects and token cleanup.
pub struct ApiClient {
    pub http: reqwest::Client,
    config: ApiConfig,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(ApiConfig::from_env())
    }
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            session: SessionStore::default(),
            navigator: Arc::new(MemoryNavigator::default()),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = session;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Build the outgoing request without sending it.
    pub fn prepare(&self, req: &ApiRequest) -> Result<reqwest::Request, ApiError> {
        let full_url = req.full_url(&self.config.base_url);
        let url = Url::parse(&full_url).map_err(|_| ApiError::InvalidUrl(full_url.clone()))?;

        let mut builder = self.http.request(req.method.clone(), url);
        let query = normalize_query(&req.query_params);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        for (name, value) in req.headers(self.session.token()) {
            builder = builder.header(name, value);
        }
        builder = match &req.body {
            Body::Empty => builder,
            Body::Json(body) => builder.json(&normalize_body(body)),
            Body::Form(parts) => builder.multipart(multipart(&normalize_form(parts))?),
        };
        Ok(builder.build()?)
    }

    /// Send a request.
    ///
    /// Returns the JSON body on success. Error responses are handled here
    /// and yield `Ok(None)`, except the backend's "empty result" 404s, which
    /// come back as data. Only transport failures are errors.
    pub async fn request(&self, req: ApiRequest) -> Result<Option<Value>, ApiError> {
        let request = self.prepare(&req)?;
        tracing::debug!(method = %request.method(), url = %request.url(), "api request");

        let response = self.http.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                return Ok(Some(Value::Null));
            }
            return serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(ApiError::Body);
        }

        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        tracing::warn!(status = status.as_u16(), "api request failed");
        Ok(self.handle_failure(status.as_u16(), status.canonical_reason(), &body))
    }

    /// Apply the side effects for an error response.
    pub fn handle_failure(
        &self,
        status: u16,
        status_text: Option<&str>,
        body: &Value,
    ) -> Option<Value> {
        let action = classify_failure(status, status_text, body, &self.navigator.current_path());
        self.apply(&action);
        action.data
    }

    fn apply(&self, action: &FailureAction) {
        if action.clear_tokens {
            self.session.clear_tokens();
        }
        if let Some(path) = action.redirect {
            self.navigator.replace(path);
        }
        for notice in &action.notices {
            self.notifier.notify(notice.clone());
        }
    }
}

fn multipart(parts: &[(String, FormValue)]) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for (name, value) in parts {
        form = match value {
            FormValue::Text(text) => form.text(name.clone(), text.clone()),
            FormValue::File { name: file_name, mime, bytes } => {
                let part = Part::bytes(bytes.to_vec())
                    .file_name(file_name.clone())
                    .mime_str(mime)?;
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}
