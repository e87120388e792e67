//! In-memory engine and recording collaborators shared by the integration
//! tests.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use n0_future::boxed::BoxFuture;
use parchment_editor_core::html::{self, HtmlNode};
use parchment_editor_core::{
    Attrs, BlobUrls, DeleteService, DocumentTree, EditingEngine, EditorCommand, EditorHost,
    EngineError, ImageFile, ListKind, Node, NodeKind, Notice, Notifier, ResolvedPosition,
    Selection, ServiceError, UploadIndicator, UploadService, UploadedImage,
};

/// Marker that makes [`MemoryEngine::set_content`] fail.
pub const REJECTED_MARKUP: &str = "<invalid";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `\n` stands for a hard break.
    Paragraph(String),
    List(ListKind, Vec<String>),
    Image { src: String, title: Option<String> },
}

impl Block {
    pub fn para(text: &str) -> Self {
        Block::Paragraph(text.to_owned())
    }

    /// Size in document positions: one token per node boundary, one per
    /// character, one per leaf.
    fn size(&self) -> usize {
        match self {
            Block::Paragraph(text) => text.len() + 2,
            Block::List(_, items) => 2 + items.iter().map(|t| t.len() + 4).sum::<usize>(),
            Block::Image { .. } => 1,
        }
    }
}

/// A block-structured document with positions counted the way tree-based
/// engines count them, so paragraph bounds and list nesting resolve
/// realistically.
///
/// Its list toggle over-reaches on a collapsed caret and wraps every
/// adjacent paragraph, which is exactly what the editor must work around.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    pub blocks: Vec<Block>,
    pub selection: Selection,
    pub log: Vec<EditorCommand>,
    pub loaded: Vec<String>,
}

enum Located {
    Paragraph { index: usize, start: usize },
    Item { index: usize, item: usize, start: usize },
    Outside,
}

impl MemoryEngine {
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Default::default()
        }
    }

    /// Start of the text content of block `index`.
    pub fn content_start(&self, index: usize) -> usize {
        self.blocks[..index].iter().map(Block::size).sum::<usize>() + 1
    }

    fn doc_size(&self) -> usize {
        self.blocks.iter().map(Block::size).sum()
    }

    fn locate(&self, pos: usize) -> Located {
        let mut offset = 0;
        for (index, block) in self.blocks.iter().enumerate() {
            match block {
                Block::Paragraph(text) => {
                    let start = offset + 1;
                    if (start..=start + text.len()).contains(&pos) {
                        return Located::Paragraph { index, start };
                    }
                }
                Block::List(_, items) => {
                    let mut item_offset = offset + 1;
                    for (item, text) in items.iter().enumerate() {
                        let start = item_offset + 2;
                        if (start..=start + text.len()).contains(&pos) {
                            return Located::Item { index, item, start };
                        }
                        item_offset += text.len() + 4;
                    }
                }
                Block::Image { .. } => {}
            }
            offset += block.size();
        }
        Located::Outside
    }

    fn block_at(&self, pos: usize) -> Option<usize> {
        match self.locate(pos) {
            Located::Paragraph { index, .. } | Located::Item { index, .. } => Some(index),
            Located::Outside => None,
        }
    }

    fn toggle_list(&mut self, kind: ListKind) -> bool {
        let sel = self.selection;
        if let Located::Item { index, item, .. } = self.locate(sel.start()) {
            let Block::List(current, items) = &mut self.blocks[index] else {
                return false;
            };
            if *current != kind {
                *current = kind;
                return true;
            }
            let mut items = std::mem::take(items);
            let after: Vec<String> = items.split_off(item + 1);
            let Some(lifted) = items.pop() else {
                return false;
            };
            let mut replacement = Vec::new();
            if !items.is_empty() {
                replacement.push(Block::List(kind, items));
            }
            replacement.push(Block::Paragraph(lifted));
            if !after.is_empty() {
                replacement.push(Block::List(kind, after));
            }
            self.blocks.splice(index..=index, replacement);
            return true;
        }

        let Some(first) = self.block_at(sel.start()) else {
            return false;
        };
        let last = self.block_at(sel.end()).unwrap_or(first);
        let (mut from, mut to) = (first, last);
        if sel.is_collapsed() {
            while from > 0 && matches!(self.blocks[from - 1], Block::Paragraph(_)) {
                from -= 1;
            }
            while to + 1 < self.blocks.len() && matches!(self.blocks[to + 1], Block::Paragraph(_)) {
                to += 1;
            }
        }
        let items: Vec<String> = self.blocks[from..=to]
            .iter()
            .filter_map(|block| match block {
                Block::Paragraph(text) => Some(text.clone()),
                _ => None,
            })
            .collect();
        if items.is_empty() {
            return false;
        }
        self.blocks.splice(from..=to, [Block::List(kind, items)]);
        true
    }

    fn insert_image(&mut self, src: String, title: Option<String>) -> bool {
        let at = self
            .block_at(self.selection.head)
            .map_or(self.blocks.len(), |index| index + 1);
        self.blocks.insert(at, Block::Image { src, title });
        true
    }

    fn edit_text(&mut self, pos: usize, f: impl FnOnce(&mut String, usize) -> Option<Block>) -> bool {
        match self.locate(pos) {
            Located::Paragraph { index, start } => {
                let Block::Paragraph(text) = &mut self.blocks[index] else {
                    return false;
                };
                if let Some(next) = f(text, pos - start) {
                    self.blocks.insert(index + 1, next);
                }
                true
            }
            Located::Item { index, item, start } => {
                let Block::List(_, items) = &mut self.blocks[index] else {
                    return false;
                };
                f(&mut items[item], pos - start);
                true
            }
            Located::Outside => false,
        }
    }

    fn parse(html: &str) -> Vec<Block> {
        let mut blocks = Vec::new();
        for node in html::parse_fragment(html) {
            match node {
                HtmlNode::Element(el) => match el.name.as_str() {
                    "ul" | "ol" => {
                        let kind = if el.name == "ul" {
                            ListKind::Bullet
                        } else {
                            ListKind::Ordered
                        };
                        let items = el
                            .children
                            .iter()
                            .filter_map(|child| match child {
                                HtmlNode::Element(li) if li.name == "li" => Some(li.text_content()),
                                _ => None,
                            })
                            .collect();
                        blocks.push(Block::List(kind, items));
                    }
                    "img" => blocks.push(Block::Image {
                        src: el.attr("src").unwrap_or_default().to_owned(),
                        title: el.attr("title").map(str::to_owned),
                    }),
                    "style" | "script" => {}
                    _ => blocks.push(Block::Paragraph(el.text_content())),
                },
                HtmlNode::Text(text) if !text.trim().is_empty() => {
                    blocks.push(Block::Paragraph(text))
                }
                _ => {}
            }
        }
        blocks
    }
}

fn paragraph_node(text: &str) -> Node {
    let mut content = Vec::new();
    for (i, part) in text.split('\n').enumerate() {
        if i > 0 {
            content.push(Node::new(NodeKind::HardBreak));
        }
        if !part.is_empty() {
            content.push(Node::text(part));
        }
    }
    Node::paragraph(content)
}

impl EditingEngine for MemoryEngine {
    fn document(&self) -> DocumentTree {
        DocumentTree::new(
            self.blocks
                .iter()
                .map(|block| match block {
                    Block::Paragraph(text) => paragraph_node(text),
                    Block::List(kind, items) => {
                        let container = match kind {
                            ListKind::Bullet => NodeKind::BulletList,
                            ListKind::Ordered => NodeKind::OrderedList,
                        };
                        Node::new(container).with_content(
                            items
                                .iter()
                                .map(|text| {
                                    Node::new(NodeKind::ListItem)
                                        .with_content(vec![paragraph_node(text)])
                                })
                                .collect(),
                        )
                    }
                    Block::Image { src, title } => Node::image(src, title.as_deref()),
                })
                .collect(),
        )
    }

    fn get_html(&self) -> String {
        self.document().to_html()
    }

    fn set_content(&mut self, html: &str) -> Result<(), EngineError> {
        if html.contains(REJECTED_MARKUP) {
            return Err(EngineError::Rejected("unparseable markup".into()));
        }
        self.blocks = Self::parse(html);
        self.selection = Selection::collapsed(1);
        self.loaded.push(html.to_owned());
        Ok(())
    }

    fn dispatch(&mut self, command: EditorCommand) -> bool {
        self.log.push(command.clone());
        match command {
            EditorCommand::Focus => true,
            EditorCommand::SetTextSelection(sel) => {
                self.selection = sel;
                true
            }
            EditorCommand::ToggleList(kind) => self.toggle_list(kind),
            EditorCommand::SetImage { src, title } => self.insert_image(src, title),
            EditorCommand::SplitBlock { pos } => self.edit_text(pos, |text, at| {
                let tail = text.split_off(at);
                Some(Block::Paragraph(tail))
            }),
            EditorCommand::InsertHardBreak => {
                let pos = self.selection.head;
                self.edit_text(pos, |text, at| {
                    text.insert(at, '\n');
                    None
                })
            }
            _ => true,
        }
    }

    fn is_active(&self, name: &str, _attrs: Option<&Attrs>) -> bool {
        let kind = match name {
            "bulletList" => ListKind::Bullet,
            "orderedList" => ListKind::Ordered,
            _ => return false,
        };
        match self.locate(self.selection.start()) {
            Located::Item { index, .. } => {
                matches!(&self.blocks[index], Block::List(k, _) if *k == kind)
            }
            _ => false,
        }
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn resolve(&self, pos: usize) -> ResolvedPosition {
        match self.locate(pos) {
            Located::Paragraph { index, start } => {
                let Block::Paragraph(text) = &self.blocks[index] else {
                    unreachable!()
                };
                ResolvedPosition {
                    pos,
                    path: vec![NodeKind::Doc, NodeKind::Paragraph],
                    parent_start: start,
                    parent_end: start + text.len(),
                }
            }
            Located::Item { index, item, start } => {
                let Block::List(kind, items) = &self.blocks[index] else {
                    unreachable!()
                };
                let container = match kind {
                    ListKind::Bullet => NodeKind::BulletList,
                    ListKind::Ordered => NodeKind::OrderedList,
                };
                ResolvedPosition {
                    pos,
                    path: vec![
                        NodeKind::Doc,
                        container,
                        NodeKind::ListItem,
                        NodeKind::Paragraph,
                    ],
                    parent_start: start,
                    parent_end: start + items[item].len(),
                }
            }
            Located::Outside => ResolvedPosition {
                pos,
                path: vec![NodeKind::Doc],
                parent_start: 0,
                parent_end: self.doc_size(),
            },
        }
    }
}

/// Records every host callback.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub changes: Vec<String>,
    pub submits: Vec<String>,
    pub cancels: usize,
    pub picked: Vec<String>,
    pub dropdown: Vec<String>,
}

impl EditorHost for RecordingHost {
    fn on_change(&mut self, html: &str) {
        self.changes.push(html.to_owned());
    }

    fn on_submit(&mut self, html: &str) {
        self.submits.push(html.to_owned());
    }

    fn on_cancel(&mut self) {
        self.cancels += 1;
    }

    fn on_image_upload(&mut self, file: &ImageFile) {
        self.picked.push(file.name.clone());
    }

    fn on_dropdown_change(&mut self, value: &str) {
        self.dropdown.push(value.to_owned());
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier(pub Mutex<Vec<Notice>>);

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.0.lock().unwrap().push(notice);
    }
}

#[derive(Debug, Default)]
pub struct RecordingDeleter {
    pub ids: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingDeleter {
    pub fn ids(&self) -> Vec<String> {
        self.ids.lock().unwrap().clone()
    }
}

impl DeleteService for RecordingDeleter {
    fn delete(&self, id: String) -> BoxFuture<Result<(), ServiceError>> {
        self.ids.lock().unwrap().push(id);
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                Err(ServiceError::Request("500 Internal Server Error".into()))
            } else {
                Ok(())
            }
        })
    }
}

/// Upload service answering with a canned response.
#[derive(Debug)]
pub struct FakeUploader {
    pub response: Result<UploadedImage, ServiceError>,
    pub calls: AtomicUsize,
    /// Indicator to sample when the upload starts.
    pub watch: Mutex<Option<UploadIndicator>>,
    pub uploading_seen: Mutex<Option<bool>>,
}

impl FakeUploader {
    pub fn ok(id: &str, file_url: &str) -> Self {
        Self::new(Ok(UploadedImage {
            id: Some(id.to_owned()),
            file_url: Some(file_url.to_owned()),
        }))
    }

    pub fn new(response: Result<UploadedImage, ServiceError>) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
            watch: Mutex::new(None),
            uploading_seen: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl UploadService for FakeUploader {
    fn upload(&self, _file: ImageFile) -> BoxFuture<Result<UploadedImage, ServiceError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(indicator) = self.watch.lock().unwrap().as_ref() {
            *self.uploading_seen.lock().unwrap() = Some(indicator.is_uploading());
        }
        let response = self.response.clone();
        Box::pin(async move {
            tokio::task::yield_now().await;
            response
        })
    }
}

#[derive(Debug, Default)]
pub struct RecordingBlobs {
    pub created: AtomicUsize,
    pub revoked: Mutex<Vec<String>>,
}

impl RecordingBlobs {
    pub fn revoked(&self) -> Vec<String> {
        self.revoked.lock().unwrap().clone()
    }
}

impl BlobUrls for RecordingBlobs {
    fn create(&self, _file: &ImageFile) -> Result<String, ServiceError> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("blob:test/{n}"))
    }

    fn revoke(&self, url: &str) {
        self.revoked.lock().unwrap().push(url.to_owned());
    }
}

pub fn png(name: &str) -> ImageFile {
    ImageFile::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
}
