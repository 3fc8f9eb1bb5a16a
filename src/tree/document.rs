//! Arena-backed document tree.

use std::collections::HashSet;

use super::node::{Content, ElementNode, NodeId, XML_NAMESPACE};

/// The evolving in-memory tree of a document being parsed.
///
/// Elements live in an arena of slots. Evicting a subtree frees its slots
/// for reuse, so the arena only grows with the number of elements retained
/// at the same time.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Option<ElementNode>>,
    free: Vec<usize>,
    root: Option<NodeId>,
    live: usize,
}

impl Document {
    /// Creates an empty document with no root bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an element and appends it to `parent`'s content.
    pub fn create_element(
        &mut self,
        name: String,
        attributes: Vec<(String, String)>,
        parent: Option<NodeId>,
    ) -> NodeId {
        let node = ElementNode::new(name, attributes, parent);
        let id = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };
        self.live += 1;

        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.content.push(Content::Element(id));
        }
        id
    }

    /// Returns the element behind a handle.
    pub fn node(&self, id: NodeId) -> Option<&ElementNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut ElementNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Appends character data to an element, merging with preceding text.
    pub fn append_text(&mut self, parent: NodeId, text: String) {
        if let Some(node) = self.node_mut(parent) {
            match node.content.last_mut() {
                Some(Content::Text(existing)) => existing.push_str(&text),
                _ => node.content.push(Content::Text(text)),
            }
        }
    }

    /// Appends a non-element content item to an element.
    pub fn append(&mut self, parent: NodeId, item: Content) {
        match item {
            Content::Text(text) => self.append_text(parent, text),
            other => {
                if let Some(node) = self.node_mut(parent) {
                    node.content.push(other);
                }
            }
        }
    }

    pub(crate) fn mark_closed(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.closed = true;
        }
    }

    /// The root element, once bound.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Binds the root element. Only the first call has an effect.
    pub fn bind_root(&mut self, id: NodeId) -> bool {
        if self.root.is_some() || self.node(id).is_none() {
            return false;
        }
        self.root = Some(id);
        true
    }

    /// Whether the element's parent handle is the root handle.
    pub fn is_direct_child(&self, id: NodeId) -> bool {
        match (self.root, self.node(id)) {
            (Some(root), Some(node)) => node.parent() == Some(root),
            _ => false,
        }
    }

    /// Handles of an element's child elements, in document order.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|node| node.element_children().collect())
            .unwrap_or_default()
    }

    /// Resolves the namespace URI of an element's tag name.
    ///
    /// Declarations are looked up on the element and then on its ancestors.
    /// Returns `None` for names in no namespace.
    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        let prefix = self.node(id)?.prefix();
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }

        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.node(c)) {
            if let Some((_, uri)) = node
                .namespace_declarations()
                .find(|(declared, _)| *declared == prefix)
            {
                return if uri.is_empty() { None } else { Some(uri) };
            }
            current = node.parent();
        }
        None
    }

    /// Removes closed child elements of `parent` together with their subtrees.
    ///
    /// Non-element content of `parent` that precedes the last evicted child
    /// is dropped as well. Children that are still open, or that do not
    /// belong to `parent`, are left alone. Returns the number of elements
    /// freed.
    pub fn evict(&mut self, parent: NodeId, children: &[NodeId]) -> usize {
        let doomed: HashSet<NodeId> = children
            .iter()
            .copied()
            .filter(|&id| {
                self.node(id)
                    .is_some_and(|node| node.parent() == Some(parent) && node.is_closed())
            })
            .collect();
        if doomed.is_empty() {
            return 0;
        }

        let Some(node) = self.node_mut(parent) else {
            return 0;
        };
        let last = node
            .content
            .iter()
            .rposition(|item| matches!(item, Content::Element(id) if doomed.contains(id)))
            .unwrap_or(0);
        let mut position = 0;
        node.content.retain(|item| {
            let keep = match item {
                Content::Element(id) => !doomed.contains(id),
                _ => position > last,
            };
            position += 1;
            keep
        });

        doomed.into_iter().map(|id| self.release(id)).sum()
    }

    /// Frees an element and all of its descendants.
    fn release(&mut self, id: NodeId) -> usize {
        let mut stack = vec![id];
        let mut freed = 0;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                stack.extend(node.element_children());
                self.free.push(current.0);
                freed += 1;
            }
        }
        self.live -= freed;
        freed
    }

    /// Number of elements currently retained.
    pub fn live_count(&self) -> usize {
        self.live
    }
}
