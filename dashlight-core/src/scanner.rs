//! Discovery of eligible text nodes beneath a subtree root
//!
//! Traversal is depth-first pre-order over an explicit stack of pending
//! nodes. Children are read from the tree only when their parent is popped,
//! so the walker tolerates the tree being rewritten between steps: a text
//! node replaced by the annotator simply drops out, and the nodes that replace
//! it are never pushed.

use crate::dom::{Document, NodeId, NodeKind};
use crate::policy::ExclusionPolicy;
use crate::processed::ProcessedSet;

/// Step-wise text node walker that holds no borrow of the document
///
/// Each call to [`TextWalker::next_text`] takes the document afresh, which is
/// what lets a sweep annotate (and mutate) between steps.
#[derive(Debug, Clone)]
pub struct TextWalker {
    stack: Vec<NodeId>,
}

impl TextWalker {
    /// Start a walk at `root`. A root that already sits inside an excluded or
    /// marked region yields nothing.
    pub fn new(doc: &Document, root: NodeId, policy: &ExclusionPolicy) -> Self {
        let stack = if policy.inside_blocked_region(doc, root) {
            log::trace!("scan root {root} is inside a blocked region");
            Vec::new()
        } else {
            vec![root]
        };
        Self { stack }
    }

    /// Advance to the next eligible text node in document order
    ///
    /// With `processed` given, text nodes already in the set are skipped too.
    pub fn next_text(
        &mut self,
        doc: &Document,
        policy: &ExclusionPolicy,
        processed: Option<&ProcessedSet>,
    ) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            match doc.kind(id) {
                Some(NodeKind::Text(text)) => {
                    if text.trim().is_empty() {
                        continue;
                    }
                    if processed.is_some_and(|set| set.contains(id)) {
                        log::trace!("skipping processed text node {id}");
                        continue;
                    }
                    return Some(id);
                }
                Some(NodeKind::Element(_)) => {
                    if policy.blocks_descent(doc, id) {
                        continue;
                    }
                    self.stack.extend(doc.children(id).iter().rev().copied());
                }
                Some(NodeKind::Document) => {
                    self.stack.extend(doc.children(id).iter().rev().copied());
                }
                Some(NodeKind::Comment(_) | NodeKind::Doctype(_)) | None => {}
            }
        }
        None
    }
}

/// Lazy, read-only sequence of eligible text nodes
pub struct Scan<'a> {
    doc: &'a Document,
    policy: &'a ExclusionPolicy,
    processed: Option<&'a ProcessedSet>,
    walker: TextWalker,
}

impl<'a> Scan<'a> {
    /// Also skip text nodes already recorded in `processed`
    pub fn skip_processed(mut self, processed: &'a ProcessedSet) -> Self {
        self.processed = Some(processed);
        self
    }
}

impl Iterator for Scan<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.walker.next_text(self.doc, self.policy, self.processed)
    }
}

/// Fresh traversal of the text nodes under `root` that pass `policy`
pub fn scan<'a>(doc: &'a Document, root: NodeId, policy: &'a ExclusionPolicy) -> Scan<'a> {
    Scan {
        doc,
        policy,
        processed: None,
        walker: TextWalker::new(doc, root, policy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html;

    fn texts(doc: &Document, ids: impl Iterator<Item = NodeId>) -> Vec<String> {
        ids.map(|id| doc.text(id).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_document_order() {
        let doc = html::parse_document(
            "<p>one <em>two</em> three</p><ul><li>four</li><li>five</li></ul>",
        )
        .unwrap();
        let policy = ExclusionPolicy::default();

        let found = texts(&doc, scan(&doc, doc.root(), &policy));
        assert_eq!(found, vec!["one ", "two", " three", "four", "five"]);
    }

    #[test]
    fn test_whitespace_only_rejected() {
        let doc = html::parse_document("<div>\n   <p>text</p>\n\u{a0}</div>").unwrap();
        let policy = ExclusionPolicy::default();

        let found = texts(&doc, scan(&doc, doc.root(), &policy));
        assert_eq!(found, vec!["text"]);
    }

    #[test]
    fn test_excluded_tags_not_descended() {
        let doc = html::parse_document(
            "<p>a</p><pre>b<b>c</b></pre><code>d</code><script>e</script>\
             <style>f</style><textarea>g</textarea><svg><text>h</text></svg><p>i</p>",
        )
        .unwrap();
        let policy = ExclusionPolicy::default();

        let found = texts(&doc, scan(&doc, doc.root(), &policy));
        assert_eq!(found, vec!["a", "i"]);
    }

    #[test]
    fn test_marked_elements_not_descended() {
        let doc = html::parse_document(
            "<p>a<span class=\"emdash-highlight\">b</span>\
             <span data-emdash-processed=\"true\">c</span>d</p>",
        )
        .unwrap();
        let policy = ExclusionPolicy::default();

        let found = texts(&doc, scan(&doc, doc.root(), &policy));
        assert_eq!(found, vec!["a", "d"]);
    }

    #[test]
    fn test_root_inside_excluded_region_yields_nothing() {
        let doc = html::parse_document("<pre><span>x\u{2014}y</span></pre>").unwrap();
        let policy = ExclusionPolicy::default();
        let span = doc.elements_by_tag(doc.root(), "span")[0];

        assert_eq!(scan(&doc, span, &policy).count(), 0);
    }

    #[test]
    fn test_scan_rooted_at_text_node() {
        let doc = html::parse_document("<p>solo</p>").unwrap();
        let policy = ExclusionPolicy::default();
        let p = doc.elements_by_tag(doc.root(), "p")[0];
        let text = doc.children(p)[0];

        let found: Vec<_> = scan(&doc, text, &policy).collect();
        assert_eq!(found, vec![text]);
    }

    #[test]
    fn test_skip_processed() {
        let doc = html::parse_document("<p>a</p><p>b</p>").unwrap();
        let policy = ExclusionPolicy::default();
        let first = scan(&doc, doc.root(), &policy).next().unwrap();

        let mut processed = ProcessedSet::new();
        processed.insert(first);

        let found = texts(
            &doc,
            scan(&doc, doc.root(), &policy).skip_processed(&processed),
        );
        assert_eq!(found, vec!["b"]);
    }

    #[test]
    fn test_each_call_is_a_fresh_traversal() {
        let doc = html::parse_document("<p>a</p><p>b</p>").unwrap();
        let policy = ExclusionPolicy::default();

        let first: Vec<_> = scan(&doc, doc.root(), &policy).collect();
        let second: Vec<_> = scan(&doc, doc.root(), &policy).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_walker_survives_replacement_mid_walk() {
        let mut doc = html::parse_document("<p>a</p><p>b</p><p>c</p>").unwrap();
        let policy = ExclusionPolicy::default();
        let mut walker = TextWalker::new(&doc, doc.root(), &policy);

        let a = walker.next_text(&doc, &policy, None).unwrap();
        let replacement = doc.create_text("A");
        doc.replace_with(a, &[replacement]).unwrap();

        let rest: Vec<_> = std::iter::from_fn(|| walker.next_text(&doc, &policy, None))
            .map(|id| doc.text(id).unwrap().to_string())
            .collect();
        assert_eq!(rest, vec!["b", "c"]);
    }
}
