//! Which parts of the tree are off limits
//!
//! Two kinds of element stop traversal: elements whose tag is in the excluded
//! set (code, form fields, scripts, embedded graphics) and elements that are
//! already highlight markers, recognised by the highlight class or by the
//! processed attribute every created marker carries.

use std::collections::HashSet;

use crate::config::Config;
use crate::dom::{Document, NodeId};

#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    excluded_tags: HashSet<String>,
    highlight_class: String,
    processed_attribute: String,
}

impl ExclusionPolicy {
    pub fn new(
        excluded_tags: impl IntoIterator<Item = impl Into<String>>,
        highlight_class: impl Into<String>,
        processed_attribute: impl Into<String>,
    ) -> Self {
        Self {
            excluded_tags: excluded_tags
                .into_iter()
                .map(|t| t.into().to_ascii_lowercase())
                .collect(),
            highlight_class: highlight_class.into(),
            processed_attribute: processed_attribute.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.excluded_tags.iter().cloned(),
            config.highlight_class.clone(),
            config.processed_attribute.clone(),
        )
    }

    pub fn highlight_class(&self) -> &str {
        &self.highlight_class
    }

    pub fn processed_attribute(&self) -> &str {
        &self.processed_attribute
    }

    /// Element whose tag is never descended into
    pub fn is_excluded_element(&self, doc: &Document, id: NodeId) -> bool {
        doc.tag(id).is_some_and(|tag| self.excluded_tags.contains(tag))
    }

    /// Element that is already a highlight unit
    pub fn is_marked_element(&self, doc: &Document, id: NodeId) -> bool {
        doc.element(id).is_some_and(|e| {
            e.has_class(&self.highlight_class) || e.attribute(&self.processed_attribute).is_some()
        })
    }

    pub fn blocks_descent(&self, doc: &Document, id: NodeId) -> bool {
        self.is_excluded_element(doc, id) || self.is_marked_element(doc, id)
    }

    /// Whether any ancestor of `node`, up to the document root, blocks descent
    pub fn inside_blocked_region(&self, doc: &Document, node: NodeId) -> bool {
        doc.ancestors(node).any(|a| self.blocks_descent(doc, a))
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_tags_block_descent() {
        let mut doc = Document::new();
        let pre = doc.create_element("PRE");
        let p = doc.create_element("p");
        let policy = ExclusionPolicy::default();

        assert!(policy.is_excluded_element(&doc, pre));
        assert!(policy.blocks_descent(&doc, pre));
        assert!(!policy.blocks_descent(&doc, p));
    }

    #[test]
    fn test_marked_by_class_or_attribute() {
        let mut doc = Document::new();
        let by_class = doc.create_element("p");
        doc.add_class(by_class, "emdash-highlight").unwrap();
        let by_attr = doc.create_element("span");
        doc.set_attribute(by_attr, "data-emdash-processed", "true").unwrap();
        let plain = doc.create_element("span");
        doc.set_attribute(plain, "class", "emdash-highlighted").unwrap();

        let policy = ExclusionPolicy::default();
        assert!(policy.is_marked_element(&doc, by_class));
        assert!(policy.is_marked_element(&doc, by_attr));
        assert!(!policy.is_marked_element(&doc, plain));
    }

    #[test]
    fn test_inside_blocked_region_walks_all_ancestors() {
        let mut doc = Document::new();
        let code = doc.create_element("code");
        let b = doc.create_element("b");
        let text = doc.create_text("x\u{2014}y");
        doc.append_child(doc.root(), code).unwrap();
        doc.append_child(code, b).unwrap();
        doc.append_child(b, text).unwrap();

        let policy = ExclusionPolicy::default();
        assert!(policy.inside_blocked_region(&doc, text));
        assert!(!policy.inside_blocked_region(&doc, code));
    }

    #[test]
    fn test_custom_tag_set() {
        let mut doc = Document::new();
        let kbd = doc.create_element("kbd");
        let pre = doc.create_element("pre");
        let policy = ExclusionPolicy::new(["KBD"], "hl", "data-hl");

        assert!(policy.is_excluded_element(&doc, kbd));
        assert!(!policy.is_excluded_element(&doc, pre));
    }
}
