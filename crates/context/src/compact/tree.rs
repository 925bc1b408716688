//! Owned markup tree used by the compaction stages.
//!
//! The `scraper` parse tree is read-only, so it is converted once into this
//! small mutable tree (element, text, comment) and serialized back without
//! indentation.

use std::ops::ControlFlow;

use scraper::{ElementRef, Html};

/// Subtrees deeper than this are flattened to their text content.
const MAX_DEPTH: usize = 512;

/// Elements whose text content is serialized without escaping.
const RAW_TEXT_ELEMENTS: &[&str] =
    &["script", "style", "xmp", "iframe", "noembed", "noframes", "noscript", "plaintext"];

/// Elements serialized without an end tag or children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "frame", "hr", "img", "input", "keygen", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Everything after this start tag is text to the parser, so no end tags follow it.
const PLAINTEXT: &str = "plaintext";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_child_element(&self) -> bool {
        self.children.iter().any(|c| matches!(c, Node::Element(_)))
    }

    pub fn has_visible_text(&self) -> bool {
        self.children
            .iter()
            .any(|c| matches!(c, Node::Text(t) if !t.trim().is_empty()))
    }

    /// Remove the first direct child element named `name` and return it.
    pub fn take_child(&mut self, name: &str) -> Option<Element> {
        let idx = self
            .children
            .iter()
            .position(|c| matches!(c, Node::Element(e) if e.name == name))?;
        match self.children.remove(idx) {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Join adjacent text nodes, recursively.
    pub fn merge_text_nodes(&mut self) {
        let mut merged: Vec<Node> = Vec::with_capacity(self.children.len());
        for child in self.children.drain(..) {
            match child {
                Node::Text(next) => {
                    if let Some(Node::Text(prev)) = merged.last_mut() {
                        prev.push_str(&next);
                    } else {
                        merged.push(Node::Text(next));
                    }
                }
                Node::Element(mut el) => {
                    el.merge_text_nodes();
                    merged.push(Node::Element(el));
                }
                other => merged.push(other),
            }
        }
        self.children = merged;
    }

    /// Serialize the children of this element (its inner HTML).
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        let _ = write_children(self, &mut out);
        out
    }
}

/// Parse a full document. Never fails; html5ever recovers from any input.
pub(crate) fn parse_document(markup: &str) -> Element {
    let document = Html::parse_document(markup);
    convert(document.root_element(), 0)
}

fn convert(element: ElementRef<'_>, depth: usize) -> Element {
    let value = element.value();
    let mut converted = Element {
        name: value.name().to_string(),
        attrs: value.attrs().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        children: Vec::new(),
    };

    if depth >= MAX_DEPTH {
        let text: String = element.text().collect();
        if !text.is_empty() {
            converted.children.push(Node::Text(text));
        }
        return converted;
    }

    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            converted.children.push(Node::Element(convert(child_el, depth + 1)));
            continue;
        }
        match child.value() {
            scraper::Node::Text(text) => converted.children.push(Node::Text(text.to_string())),
            scraper::Node::Comment(comment) => converted.children.push(Node::Comment(comment.to_string())),
            _ => {}
        }
    }

    converted
}

/// Breaks once a `<plaintext>` element has been written.
fn write_children(el: &Element, out: &mut String) -> ControlFlow<()> {
    let raw = RAW_TEXT_ELEMENTS.contains(&el.name.as_str());
    for child in &el.children {
        write_node(child, raw, out)?;
    }
    ControlFlow::Continue(())
}

fn write_node(node: &Node, raw_text: bool, out: &mut String) -> ControlFlow<()> {
    match node {
        Node::Text(text) if raw_text => out.push_str(text),
        Node::Text(text) => escape_into(text, false, out),
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (key, value) in &el.attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&el.name.as_str()) {
                return ControlFlow::Continue(());
            }
            write_children(el, out)?;
            if el.name == PLAINTEXT {
                return ControlFlow::Break(());
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
    ControlFlow::Continue(())
}

fn escape_into(text: &str, attr_mode: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attr_mode => out.push_str("&quot;"),
            '<' if !attr_mode => out.push_str("&lt;"),
            '>' if !attr_mode => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(markup: &str) -> Element {
        let mut html = parse_document(markup);
        html.take_child("body").unwrap()
    }

    #[test]
    fn test_parse_document_structure() {
        let html = parse_document("<p>hello</p>");
        assert_eq!(html.name, "html");
        let names: Vec<_> = html
            .children
            .iter()
            .filter_map(|c| match c {
                Node::Element(e) => Some(e.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["head", "body"]);
    }

    #[test]
    fn test_inner_html_round_trip() {
        let el = body(r#"<div class="b c"><span>x &amp; y</span><br><img src="i.png"></div>"#);
        assert_eq!(el.inner_html(), r#"<div class="b c"><span>x &amp; y</span><br><img src="i.png"></div>"#);
    }

    #[test]
    fn test_escaping() {
        let el = body(r#"<p title="say &quot;hi&quot;">a &lt; b&nbsp;c</p>"#);
        assert_eq!(el.inner_html(), r#"<p title="say &quot;hi&quot;">a &lt; b&nbsp;c</p>"#);
    }

    #[test]
    fn test_comments_preserved_in_tree() {
        let el = body("<div><!-- note --><p>x</p></div>");
        assert_eq!(el.inner_html(), "<div><!-- note --><p>x</p></div>");
    }

    #[test]
    fn test_merge_text_nodes() {
        let mut el = Element {
            name: "div".into(),
            attrs: Vec::new(),
            children: vec![Node::Text("a".into()), Node::Text("b".into()), Node::Comment("c".into())],
        };
        el.merge_text_nodes();
        assert_eq!(el.children, vec![Node::Text("ab".into()), Node::Comment("c".into())]);
    }

    #[test]
    fn test_frame_is_void() {
        let mut html = parse_document(r#"<frameset><frame src="a.html"></frameset>"#);
        let frameset = html.take_child("frameset").unwrap();
        assert_eq!(frameset.inner_html(), r#"<frame src="a.html">"#);
    }

    #[test]
    fn test_plaintext_has_no_end_tags() {
        let el = body("<div><plaintext>abc</div>");
        let serialized = el.inner_html();
        assert_eq!(serialized, "<div><plaintext>abc</div>");
        assert_eq!(body(&serialized).inner_html(), serialized);
    }

    #[test]
    fn test_deep_nesting_is_flattened() {
        let markup = format!("{}deep{}", "<div>".repeat(MAX_DEPTH + 50), "</div>".repeat(MAX_DEPTH + 50));
        let el = body(&markup);
        assert!(el.inner_html().contains("deep"));
    }
}
