//! Tracks which images the document references and drives server-side
//! deletion when one disappears.

use std::collections::HashSet;
use std::sync::Arc;

use crate::service::{BackgroundTask, BlobUrls, DeleteService, LogNotifier, Notice, Notifier};
use crate::tree::DocumentTree;
use crate::types::ImageRef;

pub const DELETE_FAILED: &str = "Failed to delete image from server";

/// Every image in the tree, in document order.
pub fn extract_images(tree: &DocumentTree) -> Vec<ImageRef> {
    tree.images()
}

/// Outcome of one reconciliation pass.
#[derive(Default)]
pub struct Reconciled {
    /// Known images missing from the new tree.
    pub removed: Vec<ImageRef>,
    /// One delete per removed image that had an id. Nothing happens until
    /// the task is spawned or polled.
    pub deletions: Vec<BackgroundTask>,
}

impl std::fmt::Debug for Reconciled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciled")
            .field("removed", &self.removed)
            .field("deletions", &self.deletions.len())
            .finish()
    }
}

/// The known image set plus the collaborators needed to act on changes.
pub struct ImageTracker {
    known: Arc<[ImageRef]>,
    deleter: Option<Arc<dyn DeleteService>>,
    notifier: Arc<dyn Notifier>,
}

impl Default for ImageTracker {
    fn default() -> Self {
        Self::new(None, Arc::new(LogNotifier))
    }
}

impl std::fmt::Debug for ImageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageTracker")
            .field("known", &self.known)
            .field("deleter", &self.deleter.is_some())
            .finish_non_exhaustive()
    }
}

impl ImageTracker {
    pub fn new(deleter: Option<Arc<dyn DeleteService>>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            known: Arc::from(Vec::new()),
            deleter,
            notifier,
        }
    }

    pub fn set_deleter(&mut self, deleter: Arc<dyn DeleteService>) {
        self.deleter = Some(deleter);
    }

    pub fn set_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifier = notifier;
    }

    /// Current snapshot. Never mutated in place.
    pub fn known(&self) -> Arc<[ImageRef]> {
        self.known.clone()
    }

    /// Diff the known set against a new tree and replace it.
    ///
    /// Identity is `src`. Each removed image with an id gets its own delete
    /// task; failures are reported through the notifier and never retried.
    pub fn reconcile(&mut self, tree: &DocumentTree) -> Reconciled {
        let next = extract_images(tree);
        let present: HashSet<&str> = next.iter().map(|img| img.src.as_str()).collect();

        let removed: Vec<ImageRef> = self
            .known
            .iter()
            .filter(|img| !present.contains(img.src.as_str()))
            .cloned()
            .collect();

        if !removed.is_empty() {
            tracing::warn!(count = removed.len(), ?removed, "images removed");
        }

        let deletions = match &self.deleter {
            Some(deleter) => removed
                .iter()
                .filter_map(|img| img.id.clone())
                .map(|id| self.delete_task(deleter.clone(), id))
                .collect(),
            None => Vec::new(),
        };

        self.known = Arc::from(next);
        Reconciled { removed, deletions }
    }

    /// Append a freshly inserted image before the next change event arrives.
    pub fn register_uploaded(&mut self, image: ImageRef) {
        let mut next = Vec::with_capacity(self.known.len() + 1);
        next.extend(self.known.iter().cloned());
        next.push(image);
        self.known = Arc::from(next);
    }

    /// Forget everything, e.g. after the content was reloaded.
    pub fn clear(&mut self) {
        self.known = Arc::from(Vec::new());
    }

    fn delete_task(&self, deleter: Arc<dyn DeleteService>, id: String) -> BackgroundTask {
        let notifier = self.notifier.clone();
        Box::pin(async move {
            match deleter.delete(id.clone()).await {
                Ok(()) => tracing::debug!(%id, "deleted image"),
                Err(err) => {
                    tracing::error!(%id, %err, "failed to delete image");
                    notifier.notify(Notice::error(DELETE_FAILED));
                }
            }
        })
    }
}

/// Client-side preview URLs created for images that were never uploaded.
#[derive(Debug, Default)]
pub struct LocalPreviews {
    urls: Vec<String>,
}

impl LocalPreviews {
    pub fn track(&mut self, url: impl Into<String>) {
        self.urls.push(url.into());
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Revoke every preview the given image set no longer references.
    pub fn release_unreferenced(&mut self, known: &[ImageRef], blobs: &dyn BlobUrls) {
        let live: HashSet<&str> = known.iter().map(|img| img.src.as_str()).collect();
        self.urls.retain(|url| {
            let keep = live.contains(url.as_str());
            if !keep {
                blobs.revoke(url);
            }
            keep
        });
    }

    /// Revoke everything. Called at teardown.
    pub fn revoke_all(&mut self, blobs: &dyn BlobUrls) {
        for url in self.urls.drain(..) {
            blobs.revoke(&url);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use n0_future::boxed::BoxFuture;

    use super::*;
    use crate::error::ServiceError;
    use crate::tree::Node;

    #[derive(Default)]
    struct RecordingDeleter {
        ids: Mutex<Vec<String>>,
        fail: bool,
    }

    impl DeleteService for RecordingDeleter {
        fn delete(&self, id: String) -> BoxFuture<Result<(), ServiceError>> {
            self.ids.lock().unwrap().push(id);
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(ServiceError::Request("500".into()))
                } else {
                    Ok(())
                }
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<Notice>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: Notice) {
            self.0.lock().unwrap().push(notice);
        }
    }

    #[derive(Default)]
    struct RecordingBlobs(Mutex<Vec<String>>);

    impl BlobUrls for RecordingBlobs {
        fn create(&self, _file: &crate::service::ImageFile) -> Result<String, ServiceError> {
            Ok("blob:x".into())
        }

        fn revoke(&self, url: &str) {
            self.0.lock().unwrap().push(url.to_owned());
        }
    }

    fn doc(images: &[(&str, Option<&str>)]) -> DocumentTree {
        DocumentTree::new(
            images
                .iter()
                .map(|(src, title)| Node::image(src, *title))
                .collect(),
        )
    }

    #[test]
    fn test_extract_images_skips_missing_src() {
        let tree = DocumentTree::new(vec![
            Node::image("a.png", Some("")),
            Node::image("", Some("3")),
            Node::paragraph(vec![Node::image("b.png", Some("4"))]),
        ]);
        assert_eq!(
            extract_images(&tree),
            vec![
                ImageRef::remote("a.png", None),
                ImageRef::remote("b.png", Some("4".into())),
            ]
        );
    }

    #[tokio::test]
    async fn test_removed_image_is_deleted_once() {
        let deleter = Arc::new(RecordingDeleter::default());
        let mut tracker = ImageTracker::new(Some(deleter.clone()), Arc::new(LogNotifier));
        tracker.reconcile(&doc(&[("a", None), ("b", Some("2"))]));

        let outcome = tracker.reconcile(&doc(&[("a", None)]));
        assert_eq!(outcome.removed, vec![ImageRef::remote("b", Some("2".into()))]);
        for task in outcome.deletions {
            task.await;
        }
        assert_eq!(*deleter.ids.lock().unwrap(), vec!["2".to_owned()]);
        assert_eq!(&*tracker.known(), &[ImageRef::remote("a", None)]);
    }

    #[tokio::test]
    async fn test_registered_upload_not_deleted() {
        let deleter = Arc::new(RecordingDeleter::default());
        let mut tracker = ImageTracker::new(Some(deleter.clone()), Arc::new(LogNotifier));
        tracker.reconcile(&doc(&[("a", None)]));
        tracker.register_uploaded(ImageRef::remote("c", Some("7".into())));
        assert_eq!(tracker.known().len(), 2);

        let outcome = tracker.reconcile(&doc(&[("a", None), ("c", Some("7"))]));
        assert!(outcome.removed.is_empty());
        assert!(outcome.deletions.is_empty());
        assert!(deleter.ids.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_image_without_id_is_not_deleted() {
        let deleter = Arc::new(RecordingDeleter::default());
        let mut tracker = ImageTracker::new(Some(deleter.clone()), Arc::new(LogNotifier));
        tracker.register_uploaded(ImageRef::local("blob:1"));
        let outcome = tracker.reconcile(&doc(&[]));
        assert_eq!(outcome.removed.len(), 1);
        assert!(outcome.deletions.is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_notifies() {
        let deleter = Arc::new(RecordingDeleter {
            fail: true,
            ..Default::default()
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let mut tracker = ImageTracker::new(Some(deleter), notifier.clone());
        tracker.reconcile(&doc(&[("a", Some("1")), ("b", Some("2"))]));

        let outcome = tracker.reconcile(&doc(&[]));
        assert_eq!(outcome.deletions.len(), 2);
        for task in outcome.deletions {
            task.await;
        }
        assert_eq!(
            *notifier.0.lock().unwrap(),
            vec![Notice::error(DELETE_FAILED), Notice::error(DELETE_FAILED)]
        );
    }

    #[test]
    fn test_snapshots_are_replaced_not_mutated() {
        let mut tracker = ImageTracker::default();
        let before = tracker.known();
        tracker.register_uploaded(ImageRef::remote("a", None));
        assert!(before.is_empty());
        assert_eq!(tracker.known().len(), 1);
    }

    #[test]
    fn test_previews_released_when_unreferenced() {
        let blobs = RecordingBlobs::default();
        let mut previews = LocalPreviews::default();
        previews.track("blob:1");
        previews.track("blob:2");

        previews.release_unreferenced(&[ImageRef::remote("blob:2", None)], &blobs);
        assert_eq!(previews.urls(), ["blob:2".to_owned()]);
        assert_eq!(*blobs.0.lock().unwrap(), vec!["blob:1".to_owned()]);

        previews.revoke_all(&blobs);
        assert!(previews.urls().is_empty());
        assert_eq!(blobs.0.lock().unwrap().len(), 2);
    }
}
