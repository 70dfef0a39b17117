//! Arena-backed document tree with mutation records
//!
//! Every node lives in a single `Vec` and is addressed by a [`NodeId`]. Nodes
//! are never freed: a removed node keeps its id (and can be re-inserted), so
//! identity-keyed bookkeeping such as the processed set stays valid for the
//! lifetime of the document.
//!
//! Writes that land inside an observed subtree are queued as
//! [`MutationRecord`]s, in the order they happened, and handed out in batches
//! by [`Document::take_records`].

use std::collections::VecDeque;
use std::fmt;

use crate::error::DomError;

/// Stable handle to a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single `name="value"` pair on an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Tag and attributes of an element node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lower-cased local name
    pub tag: String,
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    /// Look up an attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Check the whitespace-separated `class` list for `class`
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }
}

/// What a node is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Which kinds of change an observer wants to hear about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserveOptions {
    /// Child insertions and removals
    pub child_list: bool,
    /// Watch the whole subtree rather than just the root's own children
    pub subtree: bool,
    /// Edits to text node contents
    pub character_data: bool,
}

/// One observed change to the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children were inserted into or removed from `target`
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// The contents of a text or comment node changed
    CharacterData { target: NodeId },
}

impl MutationRecord {
    /// The node whose children or contents changed
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::ChildList { target, .. } => *target,
            MutationRecord::CharacterData { target } => *target,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Observer {
    root: NodeId,
    options: ObserveOptions,
}

/// Mutable tree of element and text nodes
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    observer: Option<Observer>,
    records: VecDeque<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only its root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            observer: None,
            records: VecDeque::new(),
        }
    }

    /// The document node itself
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Total number of nodes ever created, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.index()).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(DomError::UnknownNode(id))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    // ---- reads -------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).ok().map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id)? {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Lower-cased tag name, for element nodes only
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    /// Contents of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Walk from the parent of `id` up to the document root
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    /// Whether `id` is reachable from the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root() || self.ancestors(id).any(|a| a == self.root())
    }

    /// Whether `node` is `ancestor` or sits somewhere beneath it
    pub fn is_inclusive_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Concatenated text of every text node beneath `id`, in document order
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(text) = self.text(current) {
                out.push_str(text);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Every element named `tag` under `root`, in document order
    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if self.tag(current) == Some(tag) {
                found.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        found
    }

    /// The first `<body>` element, if the document has one
    pub fn body(&self) -> Option<NodeId> {
        self.elements_by_tag(self.root(), "body").into_iter().next()
    }

    // ---- node creation -----------------------------------------------------

    /// Create a detached element; the tag is lower-cased
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }))
    }

    /// Create a detached element with attributes already set
    pub fn create_element_with_attrs(&mut self, tag: &str, attrs: Vec<Attribute>) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attrs,
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::Doctype(name.into()))
    }

    // ---- structural writes -------------------------------------------------

    fn check_container(&self, parent: NodeId) -> Result<(), DomError> {
        match self.node(parent)?.kind {
            NodeKind::Document | NodeKind::Element(_) => Ok(()),
            _ => Err(DomError::NotAContainer(parent)),
        }
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_container(parent)?;
        self.node(child)?;
        if self.is_inclusive_descendant(parent, child) {
            return Err(DomError::Cycle { parent, child });
        }
        Ok(())
    }

    /// Unhook `child` from its current parent, recording the removal
    fn detach(&mut self, child: NodeId) -> Result<(), DomError> {
        if let Some(old_parent) = self.node(child)?.parent {
            self.remove_child(old_parent, child)?;
        }
        Ok(())
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        self.detach(child)?;

        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.record_child_list(parent, vec![child], Vec::new());
        Ok(())
    }

    /// Insert `child` into `parent` directly before `reference`
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        if self.node(reference)?.parent != Some(parent) {
            return Err(DomError::NotAChild {
                parent,
                child: reference,
            });
        }
        self.detach(child)?;

        // Position is looked up after the detach, which may have shifted it
        let parent_node = self.node_mut(parent)?;
        let position = parent_node
            .children
            .iter()
            .position(|&c| c == reference)
            .ok_or(DomError::NotAChild {
                parent,
                child: reference,
            })?;
        parent_node.children.insert(position, child);
        self.node_mut(child)?.parent = Some(parent);
        self.record_child_list(parent, vec![child], Vec::new());
        Ok(())
    }

    /// Remove `child` from `parent`; the node stays in the arena, detached
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_node = self.node_mut(parent)?;
        let position = parent_node
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(DomError::NotAChild { parent, child })?;
        parent_node.children.remove(position);
        self.node_mut(child)?.parent = None;
        self.record_child_list(parent, Vec::new(), vec![child]);
        Ok(())
    }

    /// Replace `node` in its parent with `replacements`, in order, as one change
    ///
    /// Every replacement must be detached. Fails without touching the tree if
    /// `node` has no parent or its parent no longer lists it.
    pub fn replace_with(&mut self, node: NodeId, replacements: &[NodeId]) -> Result<(), DomError> {
        let parent = self.node(node)?.parent.ok_or(DomError::Detached(node))?;
        let position = self
            .node(parent)?
            .children
            .iter()
            .position(|&c| c == node)
            .ok_or(DomError::NotAChild {
                parent,
                child: node,
            })?;

        for &replacement in replacements {
            if self.node(replacement)?.parent.is_some() {
                return Err(DomError::AlreadyAttached(replacement));
            }
            if replacement == node || self.is_inclusive_descendant(parent, replacement) {
                return Err(DomError::Cycle {
                    parent,
                    child: replacement,
                });
            }
        }

        self.node_mut(parent)?
            .children
            .splice(position..=position, replacements.iter().copied());
        for &replacement in replacements {
            self.node_mut(replacement)?.parent = Some(parent);
        }
        self.node_mut(node)?.parent = None;
        self.record_child_list(parent, replacements.to_vec(), vec![node]);
        Ok(())
    }

    /// Overwrite the contents of a text or comment node
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<(), DomError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Text(contents) | NodeKind::Comment(contents) => *contents = text.into(),
            _ => return Err(DomError::NotCharacterData(id)),
        }
        if self.observes(id, |o| o.character_data) {
            self.records
                .push_back(MutationRecord::CharacterData { target: id });
        }
        Ok(())
    }

    /// Set or overwrite an attribute on an element
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let NodeKind::Element(data) = &mut self.node_mut(id)?.kind else {
            return Err(DomError::NotAnElement(id));
        };
        match data.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => data.attrs.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    /// Add `class` to an element's class list if it is not already there
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        let element = self.element(id).ok_or(DomError::NotAnElement(id))?;
        if element.has_class(class) {
            return Ok(());
        }
        let list = match element.attribute("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attribute(id, "class", &list)
    }

    /// Point `child` at `parent` without touching either child list
    #[cfg(test)]
    pub(crate) fn set_parent_unchecked(&mut self, child: NodeId, parent: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
    }

    // ---- change notification -----------------------------------------------

    /// Start queueing records for changes at or beneath `root`
    ///
    /// Replaces any previous registration. Records already queued are kept.
    pub fn observe(&mut self, root: NodeId, options: ObserveOptions) {
        self.observer = Some(Observer { root, options });
    }

    /// Stop queueing records and drop the ones not yet taken
    pub fn disconnect(&mut self) {
        self.observer = None;
        self.records.clear();
    }

    pub fn is_observed(&self) -> bool {
        self.observer.is_some()
    }

    /// Number of records waiting to be taken
    pub fn pending_records(&self) -> usize {
        self.records.len()
    }

    /// Hand out every queued record as one batch, oldest first
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.records.drain(..).collect()
    }

    fn observes(&self, target: NodeId, wants: impl Fn(&ObserveOptions) -> bool) -> bool {
        let Some(observer) = self.observer else {
            return false;
        };
        if !wants(&observer.options) {
            return false;
        }
        if observer.options.subtree {
            self.is_inclusive_descendant(target, observer.root)
        } else {
            target == observer.root
        }
    }

    fn record_child_list(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        if self.observes(target, |o| o.child_list) {
            self.records.push_back(MutationRecord::ChildList {
                target,
                added,
                removed,
            });
        }
    }
}

/// Iterator over the ancestors of a node, nearest first
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}
