//! Host-side collaborators: callbacks, notifications, and image services.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use n0_future::boxed::BoxFuture;
use n0_future::task::JoinHandle;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ServiceError;

/// A file picked by the user for insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    /// MIME type as reported by the picker, e.g. `image/png`.
    pub mime: String,
    pub bytes: Bytes,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// Upload service response.
///
/// Only `file_url` is required for an upload to count as successful.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

impl UploadedImage {
    /// The file reference, if non-empty.
    pub fn file_url(&self) -> Option<&str> {
        self.file_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Accept ids as strings or numbers; backends disagree.
fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Persists an image and returns its reference.
pub trait UploadService: Send + Sync + 'static {
    fn upload(&self, file: ImageFile) -> BoxFuture<Result<UploadedImage, ServiceError>>;
}

/// Deletes a previously uploaded image by id.
pub trait DeleteService: Send + Sync + 'static {
    fn delete(&self, id: String) -> BoxFuture<Result<(), ServiceError>>;
}

/// Creates and revokes client-side preview URLs for files that were never
/// uploaded.
pub trait BlobUrls {
    fn create(&self, file: &ImageFile) -> Result<String, ServiceError>;
    fn revoke(&self, url: &str);
}

/// In-process preview URLs (`blob:parchment/<n>`) for hosts without a
/// browser object-URL store.
#[derive(Debug, Default)]
pub struct MemoryBlobUrls {
    next: AtomicU64,
}

impl BlobUrls for MemoryBlobUrls {
    fn create(&self, _file: &ImageFile) -> Result<String, ServiceError> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Ok(format!("blob:parchment/{n}"))
    }

    fn revoke(&self, url: &str) {
        tracing::trace!(url, "revoked preview url");
    }
}

/// User-visible notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Info(String),
}

impl Notice {
    pub fn error(msg: impl Into<String>) -> Self {
        Notice::Error(msg.into())
    }
}

/// Notification side channel (toasts, snackbars, log lines).
///
/// Shared with fire-and-forget tasks, so it must be thread-safe.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notice: Notice);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Error(msg) => tracing::error!("{msg}"),
            Notice::Info(msg) => tracing::info!("{msg}"),
        }
    }
}

/// Callbacks into the host application. All default to no-ops.
pub trait EditorHost {
    /// Content changed; receives the new authoritative HTML.
    fn on_change(&mut self, _html: &str) {}
    /// Bottom "save" button.
    fn on_submit(&mut self, _html: &str) {}
    /// Bottom "cancel" button.
    fn on_cancel(&mut self) {}
    /// A file was picked for insertion. Fire-and-forget.
    fn on_image_upload(&mut self, _file: &ImageFile) {}
    /// The auxiliary dropdown changed.
    fn on_dropdown_change(&mut self, _value: &str) {}
}

/// Host that ignores every callback.
impl EditorHost for () {}

/// Background work handed off by synchronous editor callbacks.
pub type BackgroundTask = BoxFuture<()>;

/// Starts background tasks on behalf of the editor.
///
/// Change events arrive from UI callbacks that may run outside any async
/// runtime, so spawning must be able to refuse. A refused task is handed
/// back untouched.
pub trait Spawner: Send + Sync + 'static {
    fn spawn(&self, task: BackgroundTask) -> Result<JoinHandle<()>, BackgroundTask>;
}

/// Spawns onto the Tokio runtime of the calling thread, if it has one.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeSpawner;

impl Spawner for RuntimeSpawner {
    fn spawn(&self, task: BackgroundTask) -> Result<JoinHandle<()>, BackgroundTask> {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Ok(handle.spawn(task)),
            Err(_) => Err(task),
        }
    }
}

/// Shared "an upload is in flight" flag for the UI.
#[derive(Clone, Debug, Default)]
pub struct UploadIndicator(Arc<AtomicBool>);

impl UploadIndicator {
    pub fn is_uploading(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Raise the flag until the returned guard is dropped.
    pub fn begin(&self) -> UploadGuard {
        self.0.store(true, Ordering::Release);
        UploadGuard(self.0.clone())
    }
}

/// Clears the upload flag on drop, whichever way the upload ends.
#[must_use = "the indicator is cleared as soon as the guard is dropped"]
#[derive(Debug)]
pub struct UploadGuard(Arc<AtomicBool>);

impl Drop for UploadGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
