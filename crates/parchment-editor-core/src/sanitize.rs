//! Cleanup applied to raw HTML before it goes back into the editing engine.
//!
//! The engine's paragraph schema drops arbitrary `style` attributes on block
//! nodes but keeps them on inline spans, and it ignores `<style>` blocks
//! entirely. Running source-view HTML through [`sanitize`] moves that styling
//! somewhere the engine will preserve it.
//!
//! CSS handling is deliberately shallow: only simple class selectors
//! (`.name`) are inlined. Element, id, compound and pseudo selectors are
//! dropped with their rules.

use crate::html::{self, Element, HtmlNode};

/// Block containers whose inline style is pushed down into a span.
const STYLED_BLOCKS: &[&str] = &["p", "div"];

/// Elements of a full document shell that are unwrapped (children kept).
const SHELL_ELEMENTS: &[&str] = &["html", "head", "body"];

/// Head-only metadata that has no place in editor content.
const HEAD_METADATA: &[&str] = &["meta", "title", "link", "base"];

/// Run the full pipeline: flatten any document shell, move block styles
/// into spans, then inline class rules from `<style>` blocks.
pub fn sanitize(input: &str) -> String {
    let mut nodes = flatten_document_shell(html::parse_fragment(input));
    extract_block_styles_in(&mut nodes);
    inline_style_tags_in(&mut nodes);
    html::serialize(&nodes)
}

/// Stage 1 on its own: wrap the children of every styled `<p>`/`<div>` in a
/// `<span>` carrying the style and clear the block's own style.
pub fn extract_block_styles(input: &str) -> String {
    let mut nodes = html::parse_fragment(input);
    extract_block_styles_in(&mut nodes);
    html::serialize(&nodes)
}

/// Stage 2 on its own: inline simple class rules from `<style>` blocks and
/// remove the blocks.
pub fn inline_style_tags(input: &str) -> String {
    let mut nodes = html::parse_fragment(input);
    inline_style_tags_in(&mut nodes);
    html::serialize(&nodes)
}

/// Drop the doctype, unwrap `<html>`/`<head>`/`<body>` and discard head-only
/// metadata, leaving the fragment a container's `innerHTML` would hold.
fn flatten_document_shell(nodes: Vec<HtmlNode>) -> Vec<HtmlNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            HtmlNode::Doctype(_) => {}
            HtmlNode::Element(el) if SHELL_ELEMENTS.contains(&el.name.as_str()) => {
                out.extend(flatten_document_shell(el.children));
            }
            HtmlNode::Element(el) if HEAD_METADATA.contains(&el.name.as_str()) => {}
            HtmlNode::Element(mut el) => {
                el.children = flatten_document_shell(std::mem::take(&mut el.children));
                out.push(HtmlNode::Element(el));
            }
            other => out.push(other),
        }
    }
    out
}

fn extract_block_styles_in(nodes: &mut [HtmlNode]) {
    html::for_each_element_mut(nodes, &mut |el: &mut Element| {
        if !STYLED_BLOCKS.contains(&el.name.as_str()) {
            return;
        }
        let Some(style) = el.attr("style").filter(|s| !s.is_empty()) else {
            return;
        };
        let mut span = Element::new("span");
        span.set_attr("style", style);
        span.children = std::mem::take(&mut el.children);
        el.children.push(HtmlNode::Element(span));
        el.remove_attr("style");
    });
}

fn inline_style_tags_in(nodes: &mut Vec<HtmlNode>) {
    let mut css = String::new();
    let found = take_style_blocks(nodes, &mut css);
    if !found {
        return;
    }

    let rules = parse_rules(&css);
    tracing::debug!(rules = rules.len(), "inlining <style> rules");

    for rule in &rules {
        let Some(class) = simple_class(rule.selector) else {
            tracing::debug!(selector = rule.selector, "dropping non-class CSS rule");
            continue;
        };
        html::for_each_element_mut(nodes, &mut |el: &mut Element| {
            if !el.has_class(class) {
                return;
            }
            if !rule.declarations.is_empty() {
                let merged = merge_style(el.attr("style"), rule.declarations);
                el.set_attr("style", merged);
            }
            el.remove_class(class);
        });
    }
}

/// Remove every `<style>` element, appending its text to `css`.
fn take_style_blocks(nodes: &mut Vec<HtmlNode>, css: &mut String) -> bool {
    let mut found = false;
    nodes.retain_mut(|node| match node {
        HtmlNode::Element(el) if el.name == "style" => {
            css.push_str(&el.text_content());
            css.push('\n');
            found = true;
            false
        }
        HtmlNode::Element(el) => {
            found |= take_style_blocks(&mut el.children, css);
            true
        }
        _ => true,
    });
    found
}

struct CssRule<'a> {
    selector: &'a str,
    declarations: &'a str,
}

/// Split stylesheet text into `selector { declarations }` pairs.
///
/// This is a flat split on braces, not a CSS parser: nested at-rule blocks
/// come out as rules with an `@` selector and are dropped later.
fn parse_rules(css: &str) -> Vec<CssRule<'_>> {
    css.split('}')
        .map(str::trim)
        .filter(|rule| !rule.is_empty())
        .filter_map(|rule| {
            let (selector, declarations) = rule.split_once('{')?;
            Some(CssRule {
                selector: strip_comments(selector.trim()),
                declarations: declarations.trim(),
            })
        })
        .collect()
}

/// Drop a leading `/* ... */` comment from a selector.
fn strip_comments(selector: &str) -> &str {
    let mut selector = selector;
    while let Some(rest) = selector.strip_prefix("/*") {
        match rest.find("*/") {
            Some(end) => selector = rest[end + 2..].trim_start(),
            None => return "",
        }
    }
    selector
}

/// `.name` with nothing else attached.
fn simple_class(selector: &str) -> Option<&str> {
    let name = selector.strip_prefix('.')?;
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(name)
}

fn merge_style(existing: Option<&str>, declarations: &str) -> String {
    match existing.map(str::trim).filter(|s| !s.is_empty()) {
        Some(existing) if existing.ends_with(';') => format!("{existing}{declarations}"),
        Some(existing) => format!("{existing};{declarations}"),
        None => declarations.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_style_moves_into_span() {
        let once = extract_block_styles(r#"<p style="color:red">hi</p>"#);
        assert_eq!(once, r#"<p><span style="color:red">hi</span></p>"#);
        assert_eq!(extract_block_styles(&once), once);
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn test_block_style_keeps_children_and_other_attrs() {
        let out = extract_block_styles(
            r#"<div class="box" style="margin:0"><b>a</b> b</div><h1 style="x">t</h1>"#,
        );
        assert_eq!(
            out,
            r#"<div class="box"><span style="margin:0"><b>a</b> b</span></div><h1 style="x">t</h1>"#
        );
    }

    #[test]
    fn test_nested_styled_blocks() {
        let out = extract_block_styles(r#"<div style="a"><p style="b">x</p></div>"#);
        assert_eq!(
            out,
            r#"<div><span style="a"><p><span style="b">x</span></p></span></div>"#
        );
    }

    #[test]
    fn test_empty_style_is_ignored() {
        assert_eq!(extract_block_styles(r#"<p style="">x</p>"#), r#"<p style="">x</p>"#);
    }

    #[test]
    fn test_style_tag_inlined() {
        let out = sanitize(r#"<style>.btn{color:blue}</style><div class="btn">X</div>"#);
        assert_eq!(out, r#"<div style="color:blue">X</div>"#);
    }

    #[test]
    fn test_style_tag_non_class_rules_dropped() {
        let out = inline_style_tags(
            r#"<style>p{color:red} #main{x:y} .a .b{z:w} .c:hover{q:r} .ok{font-weight:bold}</style><p class="ok c a b" id="main">t</p>"#,
        );
        assert_eq!(
            out,
            r#"<p class="c a b" id="main" style="font-weight:bold">t</p>"#
        );
    }

    #[test]
    fn test_style_tag_appends_to_existing_style() {
        let out = inline_style_tags(
            r#"<style>.x{margin:0} .y{padding:1px;}</style><span class="x y" style="color:red">t</span>"#,
        );
        assert_eq!(out, r#"<span style="color:red;margin:0;padding:1px;">t</span>"#);
    }

    #[test]
    fn test_without_style_tag_inlining_is_noop() {
        let html = r#"<p class="btn">X</p>"#;
        assert_eq!(inline_style_tags(html), html);
    }

    #[test]
    fn test_document_shell_flattened() {
        let html = "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\"><title>Document</title>\
                    <style>.lead{font-size:20px}</style></head><body><p class=\"lead\">x</p></body></html>";
        assert_eq!(sanitize(html), r#"<p style="font-size:20px">x</p>"#);
    }

    #[test]
    fn test_sanitize_order_inlines_after_block_extraction() {
        let out = sanitize(r#"<style>.c{color:green}</style><p style="margin:0" class="c">t</p>"#);
        assert_eq!(
            out,
            r#"<p style="color:green"><span style="margin:0">t</span></p>"#
        );
    }

    #[test]
    fn test_css_comments_and_at_rules() {
        let out = inline_style_tags(
            "<style>/* brand */ .a{color:red} @media print { .a{color:black} }</style><i class=\"a\">t</i>",
        );
        assert_eq!(out, r#"<i style="color:red">t</i>"#);
    }
}
