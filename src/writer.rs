//! Chunk serialization.
//!
//! This module turns the root element and a subset of its children into a
//! standalone XML document. The root start tag is reproduced with all of
//! its attributes, namespace declarations included, so prefixes used by
//! the children stay bound.
//!
//! # Example
//!
//! ```rust
//! use xml_burst::reader::{IncrementalParser, ParseEvent};
//! use xml_burst::writer::{ChunkWriter, WriterConfig};
//!
//! let mut parser = IncrementalParser::new();
//! parser.feed(br#"<list xmlns:x="urn:x"><x:a>1</x:a><x:b>2</x:b></list>"#).unwrap();
//! parser.finish().unwrap();
//!
//! let root = match parser.drain_events()[0] {
//!     ParseEvent::Opened(id) => id,
//!     ParseEvent::Closed(_) => unreachable!(),
//! };
//! let doc = parser.document();
//! let children = doc.element_children(root);
//!
//! let writer = ChunkWriter::with_config(WriterConfig::compact().with_xml_declaration(false));
//! let xml = writer.write_to_string(doc, root, &children[1..]).unwrap();
//! assert_eq!(xml, r#"<list xmlns:x="urn:x"><x:b>2</x:b></list>"#);
//! ```

use std::borrow::Cow;
use std::io::Write;

use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Writer;

use crate::error::{Error, Result};
use crate::tree::{Content, Document, ElementNode, NodeId};

/// Configuration options for the chunk writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Whether to put each root-level child on its own indented line
    pub indent: bool,
    /// Indentation string (default: two spaces)
    pub indent_string: String,
    /// Whether to include the XML declaration
    pub xml_declaration: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            indent: true,
            indent_string: "  ".to_string(),
            xml_declaration: true,
        }
    }
}

impl WriterConfig {
    /// Creates a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a compact configuration (no whitespace between children).
    pub fn compact() -> Self {
        Self {
            indent: false,
            indent_string: String::new(),
            xml_declaration: true,
        }
    }

    /// Sets whether to indent root-level children.
    pub fn with_indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the indentation string.
    pub fn with_indent_string(mut self, s: impl Into<String>) -> Self {
        self.indent_string = s.into();
        self
    }

    /// Sets whether to write the XML declaration.
    pub fn with_xml_declaration(mut self, declaration: bool) -> Self {
        self.xml_declaration = declaration;
        self
    }
}

/// Serializes chunks of a [`Document`].
///
/// Only whitespace between root-level children is affected by the
/// configuration. Everything inside a child is written as parsed.
#[derive(Debug, Clone, Default)]
pub struct ChunkWriter {
    config: WriterConfig,
}

impl ChunkWriter {
    /// Creates a new writer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new writer with the specified configuration.
    pub fn with_config(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Returns the writer configuration.
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Writes `root` with only `children` as its content.
    ///
    /// The children are written in the order given and need not be all of
    /// the root's current children. The document itself is not modified.
    pub fn write<W: Write>(
        &self,
        doc: &Document,
        root: NodeId,
        children: &[NodeId],
        writer: W,
    ) -> Result<()> {
        let root_node = doc.node(root).ok_or(Error::UnknownNode(root))?;
        let mut xml_writer = Writer::new(writer);

        if self.config.xml_declaration {
            xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
            if self.config.indent {
                xml_writer.get_mut().write_all(b"\n")?;
            }
        }

        xml_writer.write_event(Event::Start(start_tag(root_node)))?;
        for &child in children {
            if self.config.indent {
                let out = xml_writer.get_mut();
                out.write_all(b"\n")?;
                out.write_all(self.config.indent_string.as_bytes())?;
            }
            self.write_element(&mut xml_writer, doc, child)?;
        }
        if self.config.indent && !children.is_empty() {
            xml_writer.get_mut().write_all(b"\n")?;
        }
        xml_writer.write_event(Event::End(BytesEnd::new(root_node.name())))?;

        if self.config.indent {
            xml_writer.get_mut().write_all(b"\n")?;
        }
        Ok(())
    }

    /// Writes a chunk to a string.
    pub fn write_to_string(
        &self,
        doc: &Document,
        root: NodeId,
        children: &[NodeId],
    ) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(doc, root, children, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Utf8(e.utf8_error()))
    }

    /// Serializes a single element and its subtree, without declaration.
    pub fn element_to_string(&self, doc: &Document, id: NodeId) -> Result<String> {
        let mut xml_writer = Writer::new(Vec::new());
        self.write_element(&mut xml_writer, doc, id)?;
        String::from_utf8(xml_writer.into_inner()).map_err(|e| Error::Utf8(e.utf8_error()))
    }

    /// Writes an element and its content.
    fn write_element<W: Write>(
        &self,
        writer: &mut Writer<W>,
        doc: &Document,
        id: NodeId,
    ) -> Result<()> {
        let node = doc.node(id).ok_or(Error::UnknownNode(id))?;
        if node.content().is_empty() {
            writer.write_event(Event::Empty(start_tag(node)))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start_tag(node)))?;
        for item in node.content() {
            match item {
                Content::Element(child) => self.write_element(writer, doc, *child)?,
                Content::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
                Content::CData(text) => {
                    writer.write_event(Event::CData(BytesCData::new(text.as_str())))?
                }
                Content::Comment(text) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
                }
                Content::ProcessingInstruction(text) => {
                    writer.write_event(Event::PI(BytesPI::new(text.as_str())))?
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(node.name())))?;
        Ok(())
    }
}

/// Builds a start tag carrying the element's name and attributes.
fn start_tag(node: &ElementNode) -> BytesStart<'_> {
    let mut start = BytesStart::new(node.name());
    for (key, value) in node.attributes() {
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: match escape_attribute(value) {
                Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
                Cow::Owned(s) => Cow::Owned(s.into_bytes()),
            },
        });
    }
    start
}

/// Escapes an attribute value, writing tabs and line breaks as character
/// references so that attribute value normalization keeps them.
fn escape_attribute(value: &str) -> Cow<'_, str> {
    let escaped = escape(value);
    if !escaped.contains(['\t', '\n', '\r']) {
        return escaped;
    }
    let mut out = String::with_capacity(escaped.len() + 8);
    for c in escaped.chars() {
        match c {
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
