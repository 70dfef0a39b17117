//! HTML parsing into, and serialization out of, the arena document

use anyhow::{Context, Result};
use html5ever::tendril::TendrilSink;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::bridge::{BridgeStats, MutationBridge};
use crate::config::Config;
use crate::dom::{Attribute, Document, NodeId, NodeKind};

/// Elements that never have an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is written out unescaped
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script",
    "style",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "plaintext",
];

/// Parse a full HTML document with browser error recovery
pub fn parse_document(source: &str) -> Result<Document> {
    let dom = html5ever::parse_document(RcDom::default(), ParseOpts::default()).one(source);

    let mut doc = Document::new();
    let root = doc.root();
    for node in import_children(&mut doc, &dom.document)? {
        doc.append_child(root, node)
            .context("Failed to attach parsed node")?;
    }
    Ok(doc)
}

/// Parse a body fragment into detached nodes owned by `doc`
///
/// The returned nodes are in source order and ready to be inserted anywhere.
pub fn parse_fragment(doc: &mut Document, source: &str) -> Result<Vec<NodeId>> {
    let dom = html5ever::parse_document(RcDom::default(), ParseOpts::default())
        .one(format!("<body>{source}"));
    let body = find_body(&dom.document).context("Parsed fragment has no body")?;
    import_children(doc, &body)
}

fn find_body(handle: &Handle) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &handle.data {
        if &*name.local == "body" {
            return Some(handle.clone());
        }
    }
    handle.children.borrow().iter().find_map(find_body)
}

/// Copy every child subtree of `parent` into `doc`, returning the detached tops
fn import_children(doc: &mut Document, parent: &Handle) -> Result<Vec<NodeId>> {
    let mut tops = Vec::new();
    // (source node, arena parent); None marks a top-level node
    let mut stack: Vec<(Handle, Option<NodeId>)> = parent
        .children
        .borrow()
        .iter()
        .rev()
        .map(|c| (c.clone(), None))
        .collect();

    while let Some((handle, arena_parent)) = stack.pop() {
        let Some(id) = import_node(doc, &handle) else {
            continue;
        };
        match arena_parent {
            Some(p) => doc
                .append_child(p, id)
                .with_context(|| format!("Failed to attach imported node {id}"))?,
            None => tops.push(id),
        }
        stack.extend(
            handle
                .children
                .borrow()
                .iter()
                .rev()
                .map(|c| (c.clone(), Some(id))),
        );
    }
    Ok(tops)
}

fn import_node(doc: &mut Document, handle: &Handle) -> Option<NodeId> {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let attrs = attrs
                .borrow()
                .iter()
                .map(|a| Attribute {
                    name: match &a.name.prefix {
                        Some(prefix) => format!("{}:{}", prefix, a.name.local),
                        None => a.name.local.to_string(),
                    },
                    value: a.value.to_string(),
                })
                .collect();
            Some(doc.create_element_with_attrs(&name.local, attrs))
        }
        NodeData::Text { contents } => Some(doc.create_text(contents.borrow().to_string())),
        NodeData::Comment { contents } => Some(doc.create_comment(contents.to_string())),
        NodeData::Doctype { name, .. } => Some(doc.create_doctype(name.to_string())),
        NodeData::Document | NodeData::ProcessingInstruction { .. } => None,
    }
}

/// Serialize the whole document
pub fn serialize(doc: &Document) -> String {
    inner_html(doc, doc.root())
}

/// Serialize the children of `id`
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    let raw = doc.tag(id).is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
    for &child in doc.children(id) {
        write_node(doc, child, raw, &mut out);
    }
    out
}

/// Serialize `id` itself, including its own tags
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    let raw = doc
        .parent(id)
        .and_then(|p| doc.tag(p))
        .is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
    write_node(doc, id, raw, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, raw_text: bool, out: &mut String) {
    let Some(kind) = doc.kind(id) else {
        return;
    };
    match kind {
        NodeKind::Document => {
            for &child in doc.children(id) {
                write_node(doc, child, false, out);
            }
        }
        NodeKind::Doctype(name) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                out.push_str(&html_escape::encode_text(text));
            }
        }
        NodeKind::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for attr in &element.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(&attr.value));
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&element.tag.as_str());
            for &child in doc.children(id) {
                write_node(doc, child, raw, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

/// Parse `source`, run the initial sweep over `<body>` and serialize the result
pub fn highlight(source: &str, config: &Config) -> Result<(String, BridgeStats)> {
    let mut doc = parse_document(source)?;
    let mut bridge = MutationBridge::from_config(config)?;
    let root = doc.body().unwrap_or_else(|| doc.root());
    let stats = bridge.start(&mut doc, root);
    Ok((serialize(&doc), stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_builds_html_skeleton() {
        let doc = parse_document("<p>Hello</p>").unwrap();
        let body = doc.body().unwrap();
        assert_eq!(inner_html(&doc, body), "<p>Hello</p>");
        assert_eq!(doc.elements_by_tag(doc.root(), "head").len(), 1);
    }

    #[test]
    fn test_serialize_round_trip_keeps_structure() {
        let source = "<!DOCTYPE html><html><head><title>T</title></head>\
                      <body><p class=\"a\">x &amp; y</p><br><!--c--></body></html>";
        let doc = parse_document(source).unwrap();
        assert_eq!(serialize(&doc), source);
    }

    #[test]
    fn test_text_escaped_but_script_raw() {
        let doc = parse_document("<p>1 &lt; 2</p><script>if (a < b) {}</script>").unwrap();
        let body = doc.body().unwrap();
        assert_eq!(
            inner_html(&doc, body),
            "<p>1 &lt; 2</p><script>if (a < b) {}</script>"
        );
    }

    #[test]
    fn test_attribute_quotes_escaped() {
        let mut doc = parse_document("<p>x</p>").unwrap();
        let p = doc.elements_by_tag(doc.root(), "p")[0];
        doc.set_attribute(p, "title", "say \"hi\"").unwrap();
        assert_eq!(outer_html(&doc, p), "<p title=\"say &quot;hi&quot;\">x</p>");
    }

    #[test]
    fn test_parse_fragment_returns_detached_nodes() {
        let mut doc = parse_document("<p>x</p>").unwrap();
        let nodes = parse_fragment(&mut doc, "<div>new\u{2014}content</div>tail").unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(doc.tag(nodes[0]), Some("div"));
        assert_eq!(doc.text(nodes[1]), Some("tail"));
        assert!(nodes.iter().all(|&n| doc.parent(n).is_none()));
        assert_eq!(doc.text_content(nodes[0]), "new\u{2014}content");
    }

    #[test]
    fn test_highlight_end_to_end() {
        let (output, stats) = highlight(
            "<html><body><p>a\u{2014}b</p><code>c\u{2014}d</code></body></html>",
            &Config::default(),
        )
        .unwrap();

        assert_eq!(stats.highlighted, 1);
        assert!(output.contains(
            "<p><span class=\"emdash-highlight\" data-emdash-processed=\"true\">a\u{2014}b</span></p>"
        ));
        assert!(output.contains("<code>c\u{2014}d</code>"));
    }
}
