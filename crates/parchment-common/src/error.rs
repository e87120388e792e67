//! Error types for parchment - API transport plus editor errors

use miette::Diagnostic;
use parchment_editor_core::{EditorError, ServiceError};

/// Failures talking to the backend API.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ApiError {
    /// No response at all: DNS, TLS, connection reset, timeout.
    #[error("request failed: {0}")]
    #[diagnostic(code(parchment::api::transport))]
    Transport(#[from] reqwest::Error),

    /// Base URL and path did not form a valid URL.
    #[error("invalid request url {0:?}")]
    #[diagnostic(
        code(parchment::api::url),
        help("check PARCHMENT_API_BASE_URL and the endpoint path")
    )]
    InvalidUrl(String),

    /// Response body was not what the endpoint promises.
    #[error("unexpected response body")]
    #[diagnostic(code(parchment::api::body))]
    Body(#[source] serde_json::Error),
}

impl From<ApiError> for ServiceError {
    fn from(err: ApiError) -> Self {
        ServiceError::Request(err.to_string())
    }
}

/// Main error type for parchment operations
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ParchmentError {
    /// Backend API error
    #[error(transparent)]
    #[diagnostic_source]
    Api(#[from] ApiError),

    /// Editor state transition error
    #[error(transparent)]
    #[diagnostic(code(parchment::editor))]
    Editor(#[from] EditorError),

    /// Image service error
    #[error(transparent)]
    #[diagnostic(code(parchment::service))]
    Service(#[from] ServiceError),

    /// Configuration could not be read
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(parchment::config))]
    Config(String),

    /// Serialization/deserialization error
    #[error(transparent)]
    #[diagnostic(code(parchment::serde))]
    Serde(#[from] serde_json::Error),
}
