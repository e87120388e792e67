//! The editor component: engine, content sync, image lifecycle and host
//! callbacks wired together.

use std::sync::Arc;

use n0_future::boxed::BoxFuture;
use n0_future::task::JoinHandle;

use crate::behaviors::{self, KeydownResult};
use crate::config::EditorConfig;
use crate::engine::{EditingEngine, EditorCommand};
use crate::error::{EditorError, ServiceError};
use crate::images::{ImageTracker, LocalPreviews, Reconciled, extract_images};
use crate::service::{
    BackgroundTask, BlobUrls, DeleteService, EditorHost, ImageFile, LogNotifier, MemoryBlobUrls,
    Notice, Notifier, RuntimeSpawner, Spawner, UploadGuard, UploadIndicator, UploadService,
    UploadedImage,
};
use crate::sync::ContentSync;
use crate::tree::{Attrs, DocumentTree};
use crate::types::{ImageRef, ListKind, TextAlign, ViewMode};

pub const NOT_AN_IMAGE: &str = "Only image files allowed.";
pub const UPLOAD_FAILED: &str = "Failed to upload image";

/// Snapshot of what the toolbar should show as active or enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolbarState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub align: Option<TextAlign>,
    pub bullet_list: bool,
    pub ordered_list: bool,
    /// The image button is only offered while the document has no images.
    pub can_insert_image: bool,
    pub uploading: bool,
    pub view: ViewMode,
}

/// What a change event did to the tracked images.
#[derive(Debug, Default)]
pub struct ImageChanges {
    pub removed: Vec<ImageRef>,
    /// Deletes started in the background. Dropping a handle does not cancel
    /// its delete.
    pub deletions: Vec<JoinHandle<()>>,
}

/// An image insert between its two halves.
///
/// While it is pending the editor is free to take change events. The
/// upload indicator stays raised until [`PendingImage::resolve`] returns or
/// the value is dropped.
#[must_use = "the image is only inserted once the result reaches finish_image_insert"]
pub struct PendingImage {
    state: PendingState,
}

enum PendingState {
    Ready(ImageRef),
    Uploading {
        upload: BoxFuture<Result<UploadedImage, ServiceError>>,
        guard: UploadGuard,
    },
}

impl std::fmt::Debug for PendingImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            PendingState::Ready(image) => f.debug_tuple("PendingImage::Ready").field(image).finish(),
            PendingState::Uploading { .. } => f.write_str("PendingImage::Uploading"),
        }
    }
}

impl PendingImage {
    /// Wait for the upload, if any. Touches no editor state.
    pub async fn resolve(self) -> Result<ImageRef, ServiceError> {
        match self.state {
            PendingState::Ready(image) => Ok(image),
            PendingState::Uploading { upload, guard } => {
                let uploaded = upload.await;
                drop(guard);
                let uploaded = uploaded?;
                let src = uploaded.file_url().ok_or(ServiceError::MissingFileUrl)?;
                tracing::debug!(src, id = ?uploaded.id, "image uploaded");
                Ok(ImageRef::remote(src, uploaded.id.clone()))
            }
        }
    }
}

/// A rich-text editor instance bound to one engine and one host.
pub struct GlobalEditor<E, H = ()> {
    engine: E,
    host: H,
    config: EditorConfig,
    sync: ContentSync,
    images: ImageTracker,
    previews: LocalPreviews,
    uploading: UploadIndicator,
    uploader: Option<Arc<dyn UploadService>>,
    blob_urls: Arc<dyn BlobUrls>,
    notifier: Arc<dyn Notifier>,
    spawner: Arc<dyn Spawner>,
    /// Deletes no executor would take yet.
    deferred: Vec<BackgroundTask>,
}

impl<E, H> std::fmt::Debug for GlobalEditor<E, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalEditor")
            .field("config", &self.config)
            .field("sync", &self.sync)
            .field("images", &self.images)
            .field("previews", &self.previews)
            .field("uploading", &self.uploading.is_uploading())
            .field("uploader", &self.uploader.is_some())
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}

impl<E, H> GlobalEditor<E, H>
where
    E: EditingEngine,
    H: EditorHost,
{
    /// Mount the editor, loading the configured initial content.
    ///
    /// The known image set starts empty regardless of what the initial
    /// content contains.
    pub fn new(mut engine: E, host: H, config: EditorConfig) -> Result<Self, EditorError> {
        engine
            .set_content(&config.initial_content)
            .map_err(EditorError::Load)?;
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
        let sync = ContentSync::new(config.initial_content.clone(), config.document_shell());
        tracing::debug!(
            read_only = config.read_only,
            full_html = config.generate_full_html,
            "editor mounted"
        );
        Ok(Self {
            engine,
            host,
            sync,
            images: ImageTracker::new(None, notifier.clone()),
            previews: LocalPreviews::default(),
            uploading: UploadIndicator::default(),
            uploader: None,
            blob_urls: Arc::new(MemoryBlobUrls::default()),
            notifier,
            spawner: Arc::new(RuntimeSpawner),
            deferred: Vec::new(),
            config,
        })
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn UploadService>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn with_deleter(mut self, deleter: Arc<dyn DeleteService>) -> Self {
        self.images.set_deleter(deleter);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.images.set_notifier(notifier.clone());
        self.notifier = notifier;
        self
    }

    pub fn with_blob_urls(mut self, blob_urls: Arc<dyn BlobUrls>) -> Self {
        self.blob_urls = blob_urls;
        self
    }

    /// Executor for image deletes. Defaults to the calling thread's Tokio
    /// runtime.
    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Authoritative content.
    pub fn content(&self) -> &str {
        self.sync.content()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.sync.view_mode()
    }

    pub fn source_buffer(&self) -> &str {
        self.sync.source_buffer()
    }

    pub fn known_images(&self) -> Arc<[ImageRef]> {
        self.images.known()
    }

    pub fn upload_indicator(&self) -> &UploadIndicator {
        &self.uploading
    }

    pub fn previews(&self) -> &LocalPreviews {
        &self.previews
    }

    /// Number of deletes waiting for an executor.
    pub fn pending_deletes(&self) -> usize {
        self.deferred.len()
    }

    /// Hand the waiting deletes to the caller to drive.
    pub fn take_pending_deletes(&mut self) -> Vec<BackgroundTask> {
        std::mem::take(&mut self.deferred)
    }

    /// Engine change event.
    ///
    /// Re-derives the content, tells the host, then reconciles images.
    /// Ignored entirely in read-only mode.
    pub fn handle_update(&mut self) -> ImageChanges {
        if self.config.read_only {
            return ImageChanges::default();
        }
        let tree = self.engine.document();
        let html = self.sync.on_document_changed(&tree);
        self.host.on_change(html);
        self.reconcile_with(&tree)
    }

    fn reconcile_with(&mut self, tree: &DocumentTree) -> ImageChanges {
        let Reconciled { removed, deletions } = self.images.reconcile(tree);
        let known = self.images.known();
        self.previews
            .release_unreferenced(&known, self.blob_urls.as_ref());
        let deletions = self.start_deletes(deletions);
        ImageChanges { removed, deletions }
    }

    /// Spawn `tasks` along with any earlier deferred ones. Whatever the
    /// spawner refuses waits for the next change event.
    fn start_deletes(&mut self, tasks: Vec<BackgroundTask>) -> Vec<JoinHandle<()>> {
        let queued = std::mem::take(&mut self.deferred);
        let mut started = Vec::new();
        for task in queued.into_iter().chain(tasks) {
            match self.spawner.spawn(task) {
                Ok(handle) => started.push(handle),
                Err(task) => self.deferred.push(task),
            }
        }
        if !self.deferred.is_empty() {
            tracing::warn!(pending = self.deferred.len(), "no executor for image deletes");
        }
        started
    }

    /// Switch between rendered and source view.
    pub fn toggle_source_view(&mut self) -> Result<ViewMode, EditorError> {
        self.ensure_editable()?;
        let view = self.sync.toggle_source_view(&mut self.engine)?;
        if view == ViewMode::Rendered {
            self.after_commit();
        }
        Ok(view)
    }

    /// Source-view save button: commit the buffer back into the engine.
    pub fn save_source(&mut self) -> Result<(), EditorError> {
        self.ensure_editable()?;
        self.sync.commit_source_mode(&mut self.engine)?;
        self.after_commit();
        Ok(())
    }

    /// Source editor change handler.
    pub fn edit_source(&mut self, text: impl Into<String>) -> Result<(), EditorError> {
        self.ensure_editable()?;
        self.sync.edit_source(text)
    }

    /// Loading content does not fire a change event, so catch the image set
    /// up with what the engine now holds.
    fn after_commit(&mut self) {
        let tree = self.engine.document();
        self.reconcile_with(&tree);
    }

    /// Insert a picked file as an image.
    ///
    /// With an upload service the file is uploaded first and inserted with
    /// the returned reference; without one a local preview URL is used.
    /// Failures are reported through the notifier and insert nothing.
    ///
    /// This borrows the editor for the whole upload. Hosts that must keep
    /// delivering change events meanwhile use [`Self::begin_image_insert`]
    /// and [`Self::finish_image_insert`] directly.
    pub async fn insert_image(&mut self, file: ImageFile) -> Option<ImageRef> {
        let pending = self.begin_image_insert(file)?;
        let result = pending.resolve().await;
        self.finish_image_insert(result)
    }

    /// Validate the file, tell the host, and start the upload.
    ///
    /// Returns `None` when nothing is left to wait for: the editor is
    /// read-only or the file was rejected.
    pub fn begin_image_insert(&mut self, file: ImageFile) -> Option<PendingImage> {
        if self.config.read_only {
            tracing::debug!("ignoring image insert in read-only editor");
            return None;
        }
        self.host.on_image_upload(&file);
        if !file.is_image() {
            tracing::warn!(name = %file.name, "rejected non-image file");
            self.report(&ServiceError::NotAnImage(file.mime));
            return None;
        }

        let state = match self.uploader.clone() {
            Some(uploader) => {
                let guard = self.uploading.begin();
                PendingState::Uploading {
                    upload: uploader.upload(file),
                    guard,
                }
            }
            None => match self.local_preview(&file) {
                Ok(image) => PendingState::Ready(image),
                Err(err) => {
                    self.report(&err);
                    return None;
                }
            },
        };
        Some(PendingImage { state })
    }

    /// Insert and register a resolved image, or report why there is none.
    pub fn finish_image_insert(
        &mut self,
        result: Result<ImageRef, ServiceError>,
    ) -> Option<ImageRef> {
        let image = match result {
            Ok(image) => image,
            Err(err) => {
                self.report(&err);
                return None;
            }
        };
        self.engine.dispatch(EditorCommand::Focus);
        self.engine.dispatch(EditorCommand::SetImage {
            src: image.src.clone(),
            title: image.id.clone(),
        });
        self.images.register_uploaded(image.clone());
        Some(image)
    }

    fn report(&self, err: &ServiceError) {
        let message = match err {
            ServiceError::NotAnImage(_) => NOT_AN_IMAGE,
            _ => {
                tracing::error!(%err, "image insert failed");
                UPLOAD_FAILED
            }
        };
        self.notifier.notify(Notice::error(message));
    }

    fn local_preview(&mut self, file: &ImageFile) -> Result<ImageRef, ServiceError> {
        let url = self.blob_urls.create(file)?;
        self.previews.track(url.clone());
        Ok(ImageRef::local(url))
    }

    /// List toolbar buttons.
    pub fn toggle_list(&mut self, kind: ListKind) -> bool {
        if self.config.read_only {
            return false;
        }
        behaviors::toggle_list(&mut self.engine, kind)
    }

    /// Enter key. Read-only editors leave everything to the engine.
    pub fn handle_enter(&mut self, shift: bool) -> KeydownResult {
        if self.config.read_only {
            return KeydownResult::NotHandled;
        }
        behaviors::handle_enter(&mut self.engine, shift)
    }

    /// Run a toolbar command with focus restored first.
    pub fn run(&mut self, command: EditorCommand) -> bool {
        if self.config.read_only {
            return false;
        }
        self.engine.dispatch(EditorCommand::Focus);
        self.engine.dispatch(command)
    }

    /// Heading dropdown. Level 0 means "Normal".
    pub fn set_heading(&mut self, level: u8) -> bool {
        match level {
            0 => self.run(EditorCommand::SetParagraph),
            level => self.run(EditorCommand::ToggleHeading { level }),
        }
    }

    /// Link button. Blank input is ignored.
    pub fn set_link(&mut self, href: &str) -> bool {
        let href = href.trim();
        if href.is_empty() {
            return false;
        }
        self.run(EditorCommand::SetLink {
            href: href.to_owned(),
        })
    }

    pub fn toolbar_state(&self) -> ToolbarState {
        let align = [TextAlign::Left, TextAlign::Center, TextAlign::Right]
            .into_iter()
            .find(|align| {
                let mut attrs = Attrs::new();
                attrs.insert("textAlign".into(), align.as_str().into());
                self.engine.is_active("paragraph", Some(&attrs))
            });
        ToolbarState {
            bold: self.engine.is_active("bold", None),
            italic: self.engine.is_active("italic", None),
            underline: self.engine.is_active("underline", None),
            align,
            bullet_list: self.engine.is_active(ListKind::Bullet.node_name(), None),
            ordered_list: self.engine.is_active(ListKind::Ordered.node_name(), None),
            can_insert_image: !self.config.read_only && self.images.known().is_empty(),
            uploading: self.uploading.is_uploading(),
            view: self.sync.view_mode(),
        }
    }

    /// Bottom save button. In source view the raw buffer is what the user
    /// sees, so that is what gets submitted.
    pub fn submit(&mut self) {
        let html = match self.sync.view_mode() {
            ViewMode::Rendered => self.sync.content(),
            ViewMode::Source => self.sync.source_buffer(),
        };
        self.host.on_submit(html);
    }

    pub fn cancel(&mut self) {
        self.host.on_cancel();
    }

    /// Dropdown change. Unknown values are ignored.
    pub fn select_dropdown(&mut self, value: &str) -> bool {
        let Some(dropdown) = self.config.dropdown.as_mut() else {
            return false;
        };
        if !dropdown.options.iter().any(|opt| opt.value == value) {
            tracing::warn!(value, "unknown dropdown value");
            return false;
        }
        dropdown.selected = Some(value.to_owned());
        self.host.on_dropdown_change(value);
        true
    }

    /// Replace the document with new initial content from the host.
    ///
    /// Resets the view and forgets the known images; nothing is deleted on
    /// the server. Previews the new document does not use are revoked.
    pub fn reload(&mut self, content: impl Into<String>) -> Result<(), EditorError> {
        let content = content.into();
        self.engine
            .set_content(&content)
            .map_err(EditorError::Load)?;
        self.sync.reset(content.clone());
        self.images.clear();
        let referenced = extract_images(&self.engine.document());
        self.previews
            .release_unreferenced(&referenced, self.blob_urls.as_ref());
        self.config.initial_content = content;
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), EditorError> {
        if self.config.read_only {
            Err(EditorError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

impl<E, H> Drop for GlobalEditor<E, H> {
    fn drop(&mut self) {
        self.previews.revoke_all(self.blob_urls.as_ref());
        for task in self.deferred.drain(..) {
            if self.spawner.spawn(task).is_err() {
                tracing::warn!("dropping image delete with no executor");
            }
        }
    }
}
