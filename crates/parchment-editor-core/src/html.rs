//! Minimal HTML fragment parser and serializer.
//!
//! Good enough to round-trip what users paste into the source view: tags,
//! quoted/unquoted/boolean attributes, comments, doctype, raw-text elements
//! (`style`, `script`, `textarea`, `title`), void elements, and the two
//! implied-end-tag rules that matter for editor content (`<p>` closed by a
//! following block, `<li>` closed by the next `<li>`).
//!
//! Text and attribute values are kept exactly as written. Character
//! references are never decoded, so serializing a parsed fragment does not
//! re-escape anything and the output stays stable across repeated passes.

use smol_str::SmolStr;

/// One parsed node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HtmlNode {
    Element(Element),
    Text(String),
    Comment(String),
    /// Contents between `<!` and `>`, e.g. `DOCTYPE html`.
    Doctype(String),
}

/// An element with its attributes in source order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    /// Lowercased tag name.
    pub name: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
    pub children: Vec<HtmlNode>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: SmolStr::new(name.to_ascii_lowercase()),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value,
            None => self.attrs.push((SmolStr::new(name), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self
            .attrs
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(idx).1)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }

    /// Remove one class token, dropping the attribute once it is empty.
    pub fn remove_class(&mut self, class: &str) {
        let Some(current) = self.attr("class") else {
            return;
        };
        let remaining: Vec<&str> = current
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect();
        if remaining.is_empty() {
            self.remove_attr("class");
        } else {
            let joined = remaining.join(" ");
            self.set_attr("class", joined);
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[HtmlNode], out: &mut String) {
    for node in nodes {
        match node {
            HtmlNode::Text(t) => out.push_str(t),
            HtmlNode::Element(el) => collect_text(&el.children, out),
            _ => {}
        }
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Start tags that implicitly close an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p",
    "pre", "section", "table", "ul",
];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Parse an HTML fragment into a node list.
///
/// Never fails: stray end tags are ignored, unclosed elements are closed at
/// the end of input, and a `<` that doesn't start a tag is kept as text.
pub fn parse_fragment(input: &str) -> Vec<HtmlNode> {
    let mut builder = TreeBuilder::default();
    let mut rest = input;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            builder.text(rest);
            break;
        };
        if lt > 0 {
            builder.text(&rest[..lt]);
            rest = &rest[lt..];
        }

        if let Some(after) = rest.strip_prefix("<!--") {
            let (comment, tail) = match after.find("-->") {
                Some(end) => (&after[..end], &after[end + 3..]),
                None => (after, ""),
            };
            builder.push(HtmlNode::Comment(comment.to_owned()));
            rest = tail;
        } else if let Some(after) = rest.strip_prefix("<!") {
            let (decl, tail) = split_at_gt(after);
            builder.push(HtmlNode::Doctype(decl.trim().to_owned()));
            rest = tail;
        } else if let Some(after) = rest.strip_prefix("</") {
            if !after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                builder.text("</");
                rest = after;
                continue;
            }
            let (tag, tail) = split_at_gt(after);
            let name = tag
                .split(|c: char| c.is_ascii_whitespace() || c == '/')
                .next()
                .unwrap_or_default();
            builder.close(&name.to_ascii_lowercase());
            rest = tail;
        } else {
            let after = &rest[1..];
            if !after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                builder.text("<");
                rest = after;
                continue;
            }
            let (tag, tail) = read_start_tag(after);
            rest = tail;
            let name = tag.element.name.clone();
            if RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !tag.self_closing {
                let (raw, tail) = read_raw_text(rest, &name);
                let mut element = tag.element;
                if !raw.is_empty() {
                    element.children.push(HtmlNode::Text(raw.to_owned()));
                }
                builder.open_start(&name);
                builder.push(HtmlNode::Element(element));
                rest = tail;
            } else {
                builder.start(tag.element, tag.self_closing);
            }
        }
    }

    builder.finish()
}

fn split_at_gt(s: &str) -> (&str, &str) {
    match s.find('>') {
        Some(end) => (&s[..end], &s[end + 1..]),
        None => (s, ""),
    }
}

struct StartTag {
    element: Element,
    self_closing: bool,
}

/// Read a start tag after its `<`, returning the tag and the remaining input.
fn read_start_tag(input: &str) -> (StartTag, &str) {
    let name_end = input
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(input.len());
    let mut element = Element::new(&input[..name_end]);
    let mut rest = &input[name_end..];
    let mut self_closing = false;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        if let Some(tail) = rest.strip_prefix("/>") {
            self_closing = true;
            rest = tail;
            break;
        }
        if let Some(tail) = rest.strip_prefix('>') {
            rest = tail;
            break;
        }
        if let Some(tail) = rest.strip_prefix('/') {
            rest = tail;
            continue;
        }

        let name_end = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(rest.len())
            .max(1);
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let value = if let Some(tail) = rest.strip_prefix('=') {
            let tail = tail.trim_start();
            let (value, tail) = read_attr_value(tail);
            rest = tail;
            value
        } else {
            String::new()
        };

        if element.attr(&name).is_none() {
            element.attrs.push((SmolStr::new(name), value));
        }
    }

    (
        StartTag {
            element,
            self_closing,
        },
        rest,
    )
}

fn read_attr_value(input: &str) -> (String, &str) {
    match input.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let body = &input[1..];
            match body.find(quote) {
                Some(end) => (body[..end].to_owned(), &body[end + 1..]),
                None => (body.to_owned(), ""),
            }
        }
        _ => {
            let end = input
                .find(|c: char| c.is_ascii_whitespace() || c == '>')
                .unwrap_or(input.len());
            (input[..end].to_owned(), &input[end..])
        }
    }
}

/// Read raw text up to the matching end tag (case-insensitive).
fn read_raw_text<'a>(input: &'a str, name: &str) -> (&'a str, &'a str) {
    let closing = format!("</{name}");
    let lower = input.to_ascii_lowercase();
    match lower.find(&closing) {
        Some(idx) => {
            let (_, tail) = split_at_gt(&input[idx..]);
            (&input[..idx], tail)
        }
        None => (input, ""),
    }
}

#[derive(Default)]
struct TreeBuilder {
    roots: Vec<HtmlNode>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn push(&mut self, node: HtmlNode) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn text(&mut self, text: &str) {
        let siblings = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        };
        if let Some(HtmlNode::Text(prev)) = siblings.last_mut() {
            prev.push_str(text);
        } else {
            siblings.push(HtmlNode::Text(text.to_owned()));
        }
    }

    /// Apply implied end tags for a start tag about to be inserted.
    fn open_start(&mut self, name: &str) {
        if CLOSES_PARAGRAPH.contains(&name) && self.in_scope("p") {
            self.close("p");
        }
        if name == "li" {
            let list_boundary = self
                .open
                .iter()
                .rposition(|el| matches!(el.name.as_str(), "ul" | "ol"));
            let open_li = self.open.iter().rposition(|el| el.name == "li");
            if let Some(li) = open_li {
                if list_boundary.is_none_or(|list| li > list) {
                    self.close("li");
                }
            }
        }
    }

    fn start(&mut self, element: Element, self_closing: bool) {
        let name = element.name.clone();
        self.open_start(&name);
        if is_void(&name) || self_closing {
            self.push(HtmlNode::Element(element));
        } else {
            self.open.push(element);
        }
    }

    fn in_scope(&self, name: &str) -> bool {
        for el in self.open.iter().rev() {
            if el.name == name {
                return true;
            }
            // Block containers bound the search, approximating button scope.
            if matches!(el.name.as_str(), "div" | "li" | "td" | "th" | "table" | "blockquote") {
                return false;
            }
        }
        false
    }

    fn close(&mut self, name: &str) {
        let Some(idx) = self.open.iter().rposition(|el| el.name == name) else {
            return;
        };
        while self.open.len() > idx {
            self.pop();
        }
    }

    fn pop(&mut self) {
        if let Some(el) = self.open.pop() {
            self.push(HtmlNode::Element(el));
        }
    }

    fn finish(mut self) -> Vec<HtmlNode> {
        while !self.open.is_empty() {
            self.pop();
        }
        self.roots
    }
}

/// Serialize a node list back to HTML.
pub fn serialize(nodes: &[HtmlNode]) -> String {
    let mut out = String::new();
    write_nodes(&mut out, nodes);
    out
}

fn write_nodes(out: &mut String, nodes: &[HtmlNode]) {
    for node in nodes {
        match node {
            HtmlNode::Text(text) => out.push_str(text),
            HtmlNode::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            HtmlNode::Doctype(decl) => {
                out.push_str("<!");
                out.push_str(decl);
                out.push('>');
            }
            HtmlNode::Element(el) => write_element(out, el),
        }
    }
}

fn write_element(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.name);
    for (name, value) in &el.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&value.replace('"', "&quot;"));
        out.push('"');
    }
    out.push('>');
    if is_void(&el.name) {
        return;
    }
    write_nodes(out, &el.children);
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

/// Visit every element in document order, parents before children.
pub fn for_each_element_mut(nodes: &mut [HtmlNode], f: &mut impl FnMut(&mut Element)) {
    for node in nodes {
        if let HtmlNode::Element(el) = node {
            f(el);
            for_each_element_mut(&mut el.children, f);
        }
    }
}
