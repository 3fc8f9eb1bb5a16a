//! Element nodes and their content.

use std::fmt;

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Handle to an element stored in a [`Document`](super::Document).
///
/// Handles of evicted elements may be reused for elements created later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the arena index of this handle.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One item of element content, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// A child element
    Element(NodeId),
    /// Character data, entity references already resolved
    Text(String),
    /// Contents of a CDATA section
    CData(String),
    /// Comment body, without the `<!--` and `-->` delimiters
    Comment(String),
    /// Processing instruction body (target and data)
    ProcessingInstruction(String),
}

/// A single XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    name: String,
    attributes: Vec<(String, String)>,
    pub(crate) content: Vec<Content>,
    parent: Option<NodeId>,
    pub(crate) closed: bool,
}

impl ElementNode {
    pub(crate) fn new(
        name: String,
        attributes: Vec<(String, String)>,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            name,
            attributes,
            content: Vec::new(),
            parent,
            closed: false,
        }
    }

    /// Qualified tag name as written in the source (e.g. `rdf:Description`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace prefix of the tag name, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Tag name without its prefix.
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Attributes in source order, namespace declarations included.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Looks up an attribute value by its qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Namespace declarations made on this element.
    ///
    /// Yields `(None, uri)` for a default namespace declaration and
    /// `(Some(prefix), uri)` for a prefixed one.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.attributes.iter().filter_map(|(key, value)| {
            if key == "xmlns" {
                Some((None, value.as_str()))
            } else {
                key.strip_prefix("xmlns:")
                    .map(|prefix| (Some(prefix), value.as_str()))
            }
        })
    }

    /// Content items in document order.
    pub fn content(&self) -> &[Content] {
        &self.content
    }

    /// Handles of the child elements, in document order.
    pub fn element_children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.content.iter().filter_map(|item| match item {
            Content::Element(id) => Some(*id),
            _ => None,
        })
    }

    /// Concatenated character data directly inside this element.
    pub fn text(&self) -> Option<String> {
        let mut text: Option<String> = None;
        for item in &self.content {
            if let Content::Text(s) | Content::CData(s) = item {
                text.get_or_insert_with(String::new).push_str(s);
            }
        }
        text
    }

    /// Parent element handle. Set once when the element is created.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether the element's end tag has been parsed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
