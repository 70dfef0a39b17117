//! Computed display role of elements
//!
//! The block-mark strategy needs to know whether an element occupies its own
//! line or row. Browsers answer that from computed style; here it is a trait
//! so callers can plug in whatever layout information they have.

use crate::dom::{Document, NodeId};

/// Outer display role of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    ListItem,
    TableCell,
    TableRow,
    Inline,
    None,
    Other,
}

impl Display {
    /// Block, list-item, table-cell and table-row all start their own line or row
    pub fn is_block_like(self) -> bool {
        matches!(
            self,
            Display::Block | Display::ListItem | Display::TableCell | Display::TableRow
        )
    }

    /// Parse the value of a CSS `display` declaration
    pub fn parse(value: &str) -> Self {
        let value = value.trim().to_ascii_lowercase();
        let value = value.trim_end_matches("!important").trim();
        match value {
            "block" | "flow-root" | "block flow" => Display::Block,
            "list-item" | "block list-item" => Display::ListItem,
            "table-cell" => Display::TableCell,
            "table-row" => Display::TableRow,
            "inline" | "inline flow" => Display::Inline,
            "none" => Display::None,
            _ => Display::Other,
        }
    }
}

/// Host-provided layout query
pub trait LayoutQuery {
    fn display(&self, doc: &Document, element: NodeId) -> Display;
}

/// Reads an inline `style="display: …"` and falls back to user-agent defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineStyleLayout;

/// Tags rendered as `display: block` by the default user-agent stylesheet
const UA_BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "center", "dd", "details", "dialog",
    "dir", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "html", "legend", "listing", "main",
    "menu", "nav", "ol", "p", "plaintext", "pre", "search", "section", "summary", "ul", "xmp",
];

impl InlineStyleLayout {
    fn inline_display(doc: &Document, element: NodeId) -> Option<Display> {
        let style = doc.attribute(element, "style")?;
        // Later declarations win, as in the cascade
        style
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .filter(|(prop, _)| prop.trim().eq_ignore_ascii_case("display"))
            .map(|(_, value)| Display::parse(value))
            .last()
    }

    fn default_display(tag: &str) -> Display {
        match tag {
            "li" => Display::ListItem,
            "td" | "th" => Display::TableCell,
            "tr" => Display::TableRow,
            "head" | "script" | "style" | "template" | "title" | "meta" | "link" => Display::None,
            _ if UA_BLOCK_TAGS.contains(&tag) => Display::Block,
            _ => Display::Inline,
        }
    }
}

impl LayoutQuery for InlineStyleLayout {
    fn display(&self, doc: &Document, element: NodeId) -> Display {
        let Some(tag) = doc.tag(element) else {
            return Display::None;
        };
        Self::inline_display(doc, element).unwrap_or_else(|| Self::default_display(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("block", Display::Block)]
    #[case(" List-Item ", Display::ListItem)]
    #[case("table-cell", Display::TableCell)]
    #[case("table-row", Display::TableRow)]
    #[case("inline", Display::Inline)]
    #[case("none", Display::None)]
    #[case("flex", Display::Other)]
    #[case("block !important", Display::Block)]
    fn test_parse_display(#[case] value: &str, #[case] expected: Display) {
        assert_eq!(Display::parse(value), expected);
    }

    #[test]
    fn test_block_like_roles() {
        assert!(Display::Block.is_block_like());
        assert!(Display::ListItem.is_block_like());
        assert!(Display::TableCell.is_block_like());
        assert!(Display::TableRow.is_block_like());
        assert!(!Display::Inline.is_block_like());
        assert!(!Display::Other.is_block_like());
    }

    #[test]
    fn test_user_agent_defaults() {
        let mut doc = Document::new();
        let li = doc.create_element("li");
        let td = doc.create_element("td");
        let em = doc.create_element("em");
        let section = doc.create_element("section");

        let layout = InlineStyleLayout;
        assert_eq!(layout.display(&doc, li), Display::ListItem);
        assert_eq!(layout.display(&doc, td), Display::TableCell);
        assert_eq!(layout.display(&doc, em), Display::Inline);
        assert_eq!(layout.display(&doc, section), Display::Block);
    }

    #[test]
    fn test_inline_style_overrides_default() {
        let mut doc = Document::new();
        let span = doc.create_element("span");
        doc.set_attribute(span, "style", "color: red; display: block").unwrap();
        let div = doc.create_element("div");
        doc.set_attribute(div, "style", "display: block; display: inline").unwrap();

        let layout = InlineStyleLayout;
        assert_eq!(layout.display(&doc, span), Display::Block);
        assert_eq!(layout.display(&doc, div), Display::Inline);
    }

    #[test]
    fn test_text_node_has_no_display() {
        let mut doc = Document::new();
        let text = doc.create_text("x");
        assert_eq!(InlineStyleLayout.display(&doc, text), Display::None);
    }
}
