//! Read-only snapshot of the engine's structured document.
//!
//! The shape mirrors the JSON most tree-based rich-text engines export:
//! `{ "type": ..., "attrs": {...}, "content": [...], "text": ..., "marks": [...] }`.
//! Nothing in this crate mutates a tree; edits always go through
//! [`EditingEngine::dispatch`](crate::EditingEngine::dispatch).

use std::collections::BTreeMap;

use pulldown_cmark_escape::{StrWrite, escape_href, escape_html, escape_html_body_text};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::types::ImageRef;

/// Attribute map of a node or mark.
pub type Attrs = BTreeMap<SmolStr, serde_json::Value>;

/// Node type tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SmolStr", into = "SmolStr")]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading,
    Text,
    Image,
    HardBreak,
    BulletList,
    OrderedList,
    ListItem,
    Blockquote,
    CodeBlock,
    HorizontalRule,
    Other(SmolStr),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::Text => "text",
            NodeKind::Image => "image",
            NodeKind::HardBreak => "hardBreak",
            NodeKind::BulletList => "bulletList",
            NodeKind::OrderedList => "orderedList",
            NodeKind::ListItem => "listItem",
            NodeKind::Blockquote => "blockquote",
            NodeKind::CodeBlock => "codeBlock",
            NodeKind::HorizontalRule => "horizontalRule",
            NodeKind::Other(name) => name.as_str(),
        }
    }

    /// List containers and list items.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            NodeKind::BulletList | NodeKind::OrderedList | NodeKind::ListItem
        )
    }
}

impl From<SmolStr> for NodeKind {
    fn from(name: SmolStr) -> Self {
        match name.as_str() {
            "doc" => NodeKind::Doc,
            "paragraph" => NodeKind::Paragraph,
            "heading" => NodeKind::Heading,
            "text" => NodeKind::Text,
            "image" => NodeKind::Image,
            "hardBreak" => NodeKind::HardBreak,
            "bulletList" => NodeKind::BulletList,
            "orderedList" => NodeKind::OrderedList,
            "listItem" => NodeKind::ListItem,
            "blockquote" => NodeKind::Blockquote,
            "codeBlock" => NodeKind::CodeBlock,
            "horizontalRule" => NodeKind::HorizontalRule,
            _ => NodeKind::Other(name),
        }
    }
}

impl From<NodeKind> for SmolStr {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Other(name) => name,
            known => SmolStr::new(known.as_str()),
        }
    }
}

/// Inline mark on a text node (bold, link, textStyle, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: SmolStr,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.into(),
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    fn attr_str(&self, name: &str) -> Option<&str> {
        attr_str(&self.attrs, name)
    }
}

/// One node of the document tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: Attrs::new(),
            content: Vec::new(),
            text: None,
            marks: Vec::new(),
        }
    }

    pub fn with_content(mut self, content: Vec<Node>) -> Self {
        self.content = content;
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_mark(mut self, mark: Mark) -> Self {
        self.marks.push(mark);
        self
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(NodeKind::Text)
        }
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Self::new(NodeKind::Paragraph).with_content(content)
    }

    pub fn image(src: &str, title: Option<&str>) -> Self {
        let node = Self::new(NodeKind::Image).with_attr("src", src);
        match title {
            Some(title) => node.with_attr("title", title),
            None => node,
        }
    }

    /// A string attribute, if present and a non-null string.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        attr_str(&self.attrs, name)
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in self.descendants() {
            if let Some(text) = &node.text {
                out.push_str(text);
            }
        }
        out
    }

    /// Pre-order walk over this node and everything beneath it.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

fn attr_str<'a>(attrs: &'a Attrs, name: &str) -> Option<&'a str> {
    attrs.get(name).and_then(|v| v.as_str())
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.content.iter().rev());
        Some(node)
    }
}

/// Snapshot of the whole document as reported by a change event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentTree {
    root: Node,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl DocumentTree {
    /// Build a `doc` root holding the given top-level blocks.
    pub fn new(blocks: Vec<Node>) -> Self {
        Self {
            root: Node::new(NodeKind::Doc).with_content(blocks),
        }
    }

    /// Parse the engine's JSON export.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn blocks(&self) -> &[Node] {
        &self.root.content
    }

    /// Pre-order walk in document order, root included.
    pub fn walk(&self) -> Descendants<'_> {
        self.root.descendants()
    }

    /// Every embedded image in document order.
    ///
    /// `src` comes from the `src` attribute, the id from `title` (the schema
    /// has no dedicated id attribute, so uploads stash it there). Images
    /// without a `src` are skipped.
    pub fn images(&self) -> Vec<ImageRef> {
        self.walk()
            .filter(|node| node.kind == NodeKind::Image)
            .filter_map(|node| {
                let src = node.attr_str("src").filter(|s| !s.is_empty())?;
                let id = node
                    .attr_str("title")
                    .filter(|t| !t.is_empty())
                    .map(str::to_owned);
                Some(ImageRef::remote(src, id))
            })
            .collect()
    }

    /// Serialize to an HTML fragment.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        // Writes into a `String` only fail if a `Display` impl lies.
        if let Err(err) = write_children(&mut out, &self.root.content) {
            tracing::error!(%err, "html serialization failed");
        }
        out
    }
}

fn write_children<W: StrWrite>(w: &mut W, nodes: &[Node]) -> Result<(), W::Error> {
    for node in nodes {
        write_node(w, node)?;
    }
    Ok(())
}

fn write_node<W: StrWrite>(w: &mut W, node: &Node) -> Result<(), W::Error> {
    match &node.kind {
        NodeKind::Doc => write_children(w, &node.content),
        NodeKind::Text => write_text(w, node),
        NodeKind::Paragraph => {
            w.write_str("<p")?;
            write_style(w, &paragraph_style(node))?;
            w.write_str(">")?;
            write_children(w, &node.content)?;
            w.write_str("</p>")
        }
        NodeKind::Heading => {
            let level = node
                .attrs
                .get("level")
                .and_then(|v| v.as_u64())
                .unwrap_or(1)
                .clamp(1, 6);
            write!(w, "<h{level}")?;
            write_style(w, &paragraph_style(node))?;
            w.write_str(">")?;
            write_children(w, &node.content)?;
            write!(w, "</h{level}>")
        }
        NodeKind::Image => {
            w.write_str("<img")?;
            for name in ["src", "alt", "title", "style"] {
                if let Some(value) = node.attr_str(name) {
                    write_attr(w, name, value)?;
                }
            }
            w.write_str(">")
        }
        NodeKind::HardBreak => w.write_str("<br class=\"hard-break\">"),
        NodeKind::HorizontalRule => w.write_str("<hr>"),
        NodeKind::BulletList => wrap(w, "ul", &node.content),
        NodeKind::OrderedList => {
            let start = node.attrs.get("start").and_then(|v| v.as_u64());
            match start {
                Some(start) if start != 1 => {
                    write!(w, "<ol start=\"{start}\">")?;
                    write_children(w, &node.content)?;
                    w.write_str("</ol>")
                }
                _ => wrap(w, "ol", &node.content),
            }
        }
        NodeKind::ListItem => wrap(w, "li", &node.content),
        NodeKind::Blockquote => wrap(w, "blockquote", &node.content),
        NodeKind::CodeBlock => {
            w.write_str("<pre><code>")?;
            escape_html_body_text(&mut *w, &node.text_content())?;
            w.write_str("</code></pre>")
        }
        // Unknown node types are transparent.
        NodeKind::Other(_) => write_children(w, &node.content),
    }
}

fn wrap<W: StrWrite>(w: &mut W, tag: &str, children: &[Node]) -> Result<(), W::Error> {
    write!(w, "<{tag}>")?;
    write_children(w, children)?;
    write!(w, "</{tag}>")
}

fn paragraph_style(node: &Node) -> Vec<String> {
    let mut style = Vec::new();
    if let Some(align) = node.attr_str("textAlign") {
        style.push(format!("text-align: {align}"));
    }
    if let Some(margin) = node.attr_str("marginLeft") {
        style.push(format!("margin-left: {margin}"));
    }
    style
}

fn write_style<W: StrWrite>(w: &mut W, parts: &[String]) -> Result<(), W::Error> {
    if parts.is_empty() {
        return Ok(());
    }
    write_attr(w, "style", &parts.join("; "))
}

fn write_attr<W: StrWrite>(w: &mut W, name: &str, value: &str) -> Result<(), W::Error> {
    write!(w, " {name}=\"")?;
    if name == "src" || name == "href" {
        escape_href(&mut *w, value)?;
    } else {
        escape_html(&mut *w, value)?;
    }
    w.write_str("\"")
}

fn write_text<W: StrWrite>(w: &mut W, node: &Node) -> Result<(), W::Error> {
    let text = node.text.as_deref().unwrap_or_default();
    for mark in &node.marks {
        open_mark(w, mark)?;
    }
    escape_html_body_text(&mut *w, text)?;
    for mark in node.marks.iter().rev() {
        close_mark(w, mark)?;
    }
    Ok(())
}

fn open_mark<W: StrWrite>(w: &mut W, mark: &Mark) -> Result<(), W::Error> {
    match mark.kind.as_str() {
        "bold" => w.write_str("<strong>"),
        "italic" => w.write_str("<em>"),
        "underline" => w.write_str("<u>"),
        "strike" => w.write_str("<s>"),
        "code" => w.write_str("<code>"),
        "link" => {
            w.write_str("<a")?;
            if let Some(href) = mark.attr_str("href") {
                write_attr(w, "href", href)?;
            }
            w.write_str(" target=\"_blank\" rel=\"noopener noreferrer\">")
        }
        "textStyle" => {
            let mut parts = Vec::new();
            if let Some(color) = mark.attr_str("color") {
                parts.push(format!("color: {color}"));
            }
            if let Some(style) = mark.attr_str("style") {
                parts.push(style.trim_end_matches(';').to_owned());
            }
            w.write_str("<span")?;
            write_style(w, &parts)?;
            w.write_str(">")
        }
        _ => Ok(()),
    }
}

fn close_mark<W: StrWrite>(w: &mut W, mark: &Mark) -> Result<(), W::Error> {
    match mark.kind.as_str() {
        "bold" => w.write_str("</strong>"),
        "italic" => w.write_str("</em>"),
        "underline" => w.write_str("</u>"),
        "strike" => w.write_str("</s>"),
        "code" => w.write_str("</code>"),
        "link" => w.write_str("</a>"),
        "textStyle" => w.write_str("</span>"),
        _ => Ok(()),
    }
}
