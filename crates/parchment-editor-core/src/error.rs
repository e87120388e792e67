//! Error types for editor operations.

use thiserror::Error;

use crate::types::ViewMode;

/// The editing engine refused an operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineError {
    /// Content could not be parsed into the engine's schema.
    #[error("engine rejected content: {0}")]
    Rejected(String),
}

/// Errors surfaced synchronously by editor state transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditorError {
    /// The operation is only valid in the other view mode.
    #[error("operation requires {expected:?} view, editor is in {actual:?}")]
    WrongMode { expected: ViewMode, actual: ViewMode },

    /// The initial content could not be loaded at mount.
    #[error("could not load initial content")]
    Load(#[source] EngineError),

    /// Reapplying source HTML failed; the raw buffer was kept as is.
    #[error("could not apply source HTML")]
    Commit(#[source] EngineError),

    /// Editing is disabled.
    #[error("editor is read-only")]
    ReadOnly,
}

/// Failures from the upload/delete/blob services.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServiceError {
    /// Non-2xx response or transport failure.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered without a usable file reference.
    #[error("upload response missing file reference")]
    MissingFileUrl,

    /// The file is not an image.
    #[error("unsupported file type {0:?}")]
    NotAnImage(String),
}
