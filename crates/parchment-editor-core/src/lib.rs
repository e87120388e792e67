//! parchment-editor-core: engine-agnostic state for the rich-text editor.
//!
//! This crate provides:
//! - `EditingEngine` trait for the external rich-text engine
//! - `ContentSync` - rendered/source view state and full-document output
//! - `sanitize` - cleanup of source-view HTML before it re-enters the engine
//! - `ImageTracker` - image diffing and fire-and-forget server deletes
//! - `GlobalEditor<E, H>` - all of the above wired to host callbacks

pub mod behaviors;
pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod html;
pub mod images;
pub mod sanitize;
pub mod service;
pub mod sync;
pub mod tree;
pub mod types;

pub use behaviors::{KeydownResult, handle_enter, toggle_list};
pub use config::{DropdownConfig, EditorConfig, SelectOption};
pub use editor::{GlobalEditor, ImageChanges, PendingImage, ToolbarState};
pub use engine::{EditingEngine, EditorCommand, ResolvedPosition};
pub use error::{EditorError, EngineError, ServiceError};
pub use images::{ImageTracker, LocalPreviews, Reconciled, extract_images};
pub use sanitize::sanitize;
pub use service::{
    BackgroundTask, BlobUrls, DeleteService, EditorHost, ImageFile, LogNotifier, MemoryBlobUrls,
    Notice, Notifier, RuntimeSpawner, Spawner, UploadGuard, UploadIndicator, UploadService,
    UploadedImage,
};
pub use smol_str::SmolStr;
pub use sync::{ContentSync, DEFAULT_STYLESHEET, DocumentShell};
pub use tree::{Attrs, DocumentTree, Mark, Node, NodeKind};
pub use types::{ImageRef, ListKind, Selection, TextAlign, ViewMode};
