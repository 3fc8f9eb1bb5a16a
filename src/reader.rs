//! Incremental XML parser.
//!
//! This module provides a push-style parser: bytes are handed to
//! [`IncrementalParser::feed`] in arbitrarily sized pieces, the element tree
//! is extended as far as the bytes allow, and the elements opened and
//! closed along the way are surfaced by [`IncrementalParser::drain_events`].
//! Lexing is done by `quick-xml`; markup cut off at the end of a piece is
//! kept and scanned again once more bytes arrive that could complete it.
//!
//! General entities declared in the DOCTYPE internal subset are expanded
//! as text and attribute values are read, so the tree never refers back
//! to the DOCTYPE.
//!
//! # Example
//!
//! ```rust
//! use xml_burst::reader::{IncrementalParser, ParseEvent};
//!
//! let mut parser = IncrementalParser::new();
//! parser.feed(b"<root><item>one</it").unwrap();
//! parser.feed(b"em><item/></root>").unwrap();
//!
//! let closed = parser
//!     .drain_events()
//!     .into_iter()
//!     .filter(|e| matches!(e, ParseEvent::Closed(_)))
//!     .count();
//! assert_eq!(closed, 3);
//! ```

use std::collections::HashMap;
use std::str;

use quick_xml::errors::SyntaxError;
use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::tree::{Content, Document, NodeId};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Length of `<![CDATA[`, the longest `<!` prefix that quick-xml must see
/// before it can classify the construct.
const LONGEST_BANG_PREFIX: usize = 9;

/// Structural events produced while parsing, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseEvent {
    /// An element's start tag was parsed
    Opened(NodeId),
    /// An element's end tag (or an empty-element tag) was parsed
    Closed(NodeId),
}

/// How the input ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The root element was closed
    Complete,
    /// Input ended with elements still open
    Truncated {
        /// Names of the open elements, outermost first
        open: Vec<String>,
    },
}

/// Where in the document the parser currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    /// Before the root element's start tag
    Prolog,
    /// Inside the root element
    InRoot,
    /// After the root element's end tag
    Epilog,
    /// `finish` has been called
    Done,
}

/// General entities declared in the DOCTYPE, by name.
type Entities = HashMap<String, String>;

/// Owned markup extracted from a quick-xml event.
enum Markup {
    Start {
        name: String,
        attributes: Vec<(String, String)>,
        empty: bool,
    },
    End {
        name: String,
    },
    Text(String),
    CData(String),
    Comment(String),
    Pi(String),
    Decl {
        encoding: Option<String>,
    },
    DocType,
}

/// A push parser that builds a [`Document`] incrementally.
pub struct IncrementalParser {
    document: Document,
    state: ParserState,
    /// Bytes received but not yet consumed
    pending: Vec<u8>,
    /// Absolute source offset of `pending[0]`
    offset: u64,
    /// Currently open elements, innermost last
    open: Vec<NodeId>,
    events: Vec<ParseEvent>,
    entities: Entities,
    /// Byte sequence that must arrive before the pending construct can
    /// complete
    awaiting: Option<&'static [u8]>,
    /// Length of the `pending` prefix already searched for `awaiting`
    searched: usize,
    bom_checked: bool,
    seen_markup: bool,
}

/// Result of scanning the pending bytes.
struct Scanned {
    markup: Vec<(u64, Markup)>,
    consumed: usize,
    awaiting: Option<&'static [u8]>,
}

impl Default for IncrementalParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalParser {
    /// Creates a parser with an empty document.
    pub fn new() -> Self {
        Self {
            document: Document::new(),
            state: ParserState::Prolog,
            pending: Vec::new(),
            offset: 0,
            open: Vec::new(),
            events: Vec::new(),
            entities: Entities::new(),
            awaiting: None,
            searched: 0,
            bom_checked: false,
            seen_markup: false,
        }
    }

    /// Appends bytes and parses every construct they complete.
    ///
    /// Fails on the first well-formedness violation. Such an error is not
    /// recoverable; the parser should be discarded.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<()> {
        if self.state == ParserState::Done {
            return Err(Error::ParserFinished);
        }
        self.pending.extend_from_slice(bytes);
        if !self.skip_bom() || !self.may_complete() {
            return Ok(());
        }
        self.advance(false)
    }

    /// Returns the events produced since the previous call.
    pub fn drain_events(&mut self) -> Vec<ParseEvent> {
        std::mem::take(&mut self.events)
    }

    /// Signals end of input and reports how the document ended.
    ///
    /// Trailing character data is flushed into the tree first. Fails with
    /// [`Error::MissingRoot`] if no root element was ever opened.
    pub fn finish(&mut self) -> Result<Completion> {
        if self.state == ParserState::Done {
            return Err(Error::ParserFinished);
        }
        self.bom_checked = true;
        self.advance(true)?;

        let state = std::mem::replace(&mut self.state, ParserState::Done);
        match state {
            ParserState::Prolog => Err(Error::MissingRoot),
            ParserState::InRoot | ParserState::Epilog if !self.pending.is_empty() => {
                Err(malformed(
                    self.offset,
                    "unterminated markup at end of input".to_string(),
                ))
            }
            ParserState::Epilog => Ok(Completion::Complete),
            ParserState::InRoot | ParserState::Done => Ok(Completion::Truncated {
                open: self
                    .open
                    .iter()
                    .filter_map(|&id| self.document.node(id))
                    .map(|node| node.name().to_string())
                    .collect(),
            }),
        }
    }

    /// The tree built so far.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access to the tree, used to evict finished elements.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Whether the root element's end tag has been parsed.
    pub fn root_closed(&self) -> bool {
        matches!(self.state, ParserState::Epilog)
            || (self.state == ParserState::Done && self.open.is_empty())
    }

    /// Absolute offset of the first byte not yet consumed.
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Number of received bytes waiting for the rest of their construct.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Strips a leading UTF-8 byte-order mark. Returns false while the
    /// received bytes are still a prefix of one.
    fn skip_bom(&mut self) -> bool {
        if self.bom_checked {
            return true;
        }
        if self.pending.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(&self.pending) {
            return false;
        }
        if self.pending.starts_with(UTF8_BOM) {
            self.pending.drain(..UTF8_BOM.len());
            self.offset += UTF8_BOM.len() as u64;
        }
        self.bom_checked = true;
        true
    }

    /// Whether the bytes received since the last scan could complete the
    /// pending construct. Only the new bytes are searched.
    fn may_complete(&mut self) -> bool {
        let Some(terminator) = self.awaiting else {
            return true;
        };
        let from = self.searched.saturating_sub(terminator.len() - 1);
        self.searched = self.pending.len();
        self.pending[from..]
            .windows(terminator.len())
            .any(|window| window == terminator)
    }

    /// Scans the pending bytes and applies every complete construct.
    fn advance(&mut self, at_eof: bool) -> Result<()> {
        let scanned = scan(&self.pending, self.offset, at_eof, &mut self.entities)?;
        for (position, item) in scanned.markup {
            self.apply(position, item)?;
        }
        self.pending.drain(..scanned.consumed);
        self.offset += scanned.consumed as u64;
        self.awaiting = scanned.awaiting;
        self.searched = self.pending.len();
        Ok(())
    }

    fn apply(&mut self, position: u64, item: Markup) -> Result<()> {
        let first = !self.seen_markup;
        self.seen_markup = true;

        match item {
            Markup::Start {
                name,
                attributes,
                empty,
            } => {
                if self.state == ParserState::Epilog {
                    return Err(malformed(
                        position,
                        format!("second root element <{name}>"),
                    ));
                }
                let parent = self.open.last().copied();
                let id = self.document.create_element(name, attributes, parent);
                self.state = ParserState::InRoot;
                self.events.push(ParseEvent::Opened(id));
                if empty {
                    self.close(id);
                } else {
                    self.open.push(id);
                }
            }
            Markup::End { name } => {
                let Some(id) = self.open.pop() else {
                    return Err(malformed(position, format!("unexpected end tag </{name}>")));
                };
                let expected = self
                    .document
                    .node(id)
                    .map(|node| node.name())
                    .unwrap_or_default();
                if expected != name {
                    return Err(malformed(
                        position,
                        format!("expected </{expected}>, found </{name}>"),
                    ));
                }
                self.close(id);
            }
            Markup::Text(text) => match self.open.last() {
                Some(&parent) => self.document.append_text(parent, text),
                None if is_xml_whitespace(&text) => {}
                None => {
                    return Err(malformed(
                        position,
                        "character data outside the root element".to_string(),
                    ))
                }
            },
            Markup::CData(text) => match self.open.last() {
                Some(&parent) => self.document.append(parent, Content::CData(text)),
                None => {
                    return Err(malformed(
                        position,
                        "CDATA section outside the root element".to_string(),
                    ))
                }
            },
            Markup::Comment(text) => {
                if let Some(&parent) = self.open.last() {
                    self.document.append(parent, Content::Comment(text));
                }
            }
            Markup::Pi(text) => {
                if let Some(&parent) = self.open.last() {
                    self.document
                        .append(parent, Content::ProcessingInstruction(text));
                }
            }
            Markup::Decl { encoding } => {
                if !first {
                    return Err(malformed(
                        position,
                        "XML declaration is only allowed at the start of the document"
                            .to_string(),
                    ));
                }
                if let Some(encoding) = encoding {
                    let lower = encoding.to_ascii_lowercase();
                    if !matches!(lower.as_str(), "utf-8" | "utf8" | "us-ascii" | "ascii") {
                        return Err(malformed(
                            position,
                            format!("unsupported encoding {encoding}, only UTF-8 is supported"),
                        ));
                    }
                }
            }
            Markup::DocType => {
                if self.state != ParserState::Prolog {
                    return Err(malformed(
                        position,
                        "DOCTYPE declaration after the root element started".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn close(&mut self, id: NodeId) {
        self.document.mark_closed(id);
        self.events.push(ParseEvent::Closed(id));
        if self.open.is_empty() {
            self.state = ParserState::Epilog;
        }
    }
}

/// Scans `input` with quick-xml and returns the complete constructs found,
/// each with its absolute position, plus the number of bytes they span.
///
/// Scanning stops at the first construct cut off by the end of `input`,
/// and reports what it is waiting for. Unless `at_eof` is set, trailing
/// character data is treated as cut off too, since it may continue (or end
/// in a split entity reference). Entity declarations found in a DOCTYPE
/// are added to `entities` as the scan passes them.
fn scan(input: &[u8], base: u64, at_eof: bool, entities: &mut Entities) -> Result<Scanned> {
    let mut reader = Reader::from_reader(input);
    let config = reader.config_mut();
    config.trim_text_start = false;
    config.trim_text_end = false;
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.check_comments = true;
    config.expand_empty_elements = false;

    let mut markup = Vec::new();
    let mut consumed = 0usize;
    let mut awaiting = None;

    loop {
        let position = base + consumed as u64;
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => match cut_off_terminator(&err, input.len() - consumed) {
                Some(terminator) => {
                    awaiting = terminator;
                    break;
                }
                None => {
                    return Err(Error::Parse {
                        position: base + reader.error_position() as u64,
                        source: err,
                    })
                }
            },
        };

        let item = match event {
            XmlEvent::Start(ref e) => Markup::Start {
                name: element_name(e)?,
                attributes: extract_attrs(e, position, resolver(entities))?,
                empty: false,
            },
            XmlEvent::Empty(ref e) => Markup::Start {
                name: element_name(e)?,
                attributes: extract_attrs(e, position, resolver(entities))?,
                empty: true,
            },
            XmlEvent::End(ref e) => Markup::End {
                name: str::from_utf8(e.name().as_ref())?.to_string(),
            },
            XmlEvent::Text(ref e) => {
                if !at_eof && reader.buffer_position() as usize == input.len() {
                    awaiting = Some(b"<".as_slice());
                    break;
                }
                let text = e
                    .unescape_with(resolver(entities))
                    .map_err(|source| Error::Parse { position, source })?;
                Markup::Text(text.into_owned())
            }
            XmlEvent::CData(ref e) => Markup::CData(str::from_utf8(e.as_ref())?.to_string()),
            XmlEvent::Comment(ref e) => Markup::Comment(str::from_utf8(e.as_ref())?.to_string()),
            XmlEvent::PI(ref e) => Markup::Pi(str::from_utf8(e.as_ref())?.to_string()),
            XmlEvent::Decl(ref e) => {
                let encoding = match e.encoding() {
                    Some(Ok(encoding)) => Some(str::from_utf8(&encoding)?.to_string()),
                    Some(Err(err)) => {
                        return Err(Error::Parse {
                            position,
                            source: quick_xml::Error::InvalidAttr(err),
                        })
                    }
                    None => None,
                };
                Markup::Decl { encoding }
            }
            XmlEvent::DocType(ref e) => {
                declare_entities(str::from_utf8(e.as_ref())?, position, entities)?;
                Markup::DocType
            }
            XmlEvent::Eof => break,
        };

        consumed = reader.buffer_position() as usize;
        markup.push((position, item));
    }

    Ok(Scanned {
        markup,
        consumed,
        awaiting,
    })
}

/// Classifies a quick-xml error that only means the construct is not
/// complete yet. Returns the byte sequence that ends the construct, or
/// `Some(None)` when any further byte may help.
fn cut_off_terminator(
    err: &quick_xml::Error,
    remaining: usize,
) -> Option<Option<&'static [u8]>> {
    let quick_xml::Error::Syntax(syntax) = err else {
        return None;
    };
    let terminator: &'static [u8] = match syntax {
        SyntaxError::InvalidBangMarkup if remaining < LONGEST_BANG_PREFIX => return Some(None),
        SyntaxError::InvalidBangMarkup => return None,
        SyntaxError::UnclosedComment => b"-->",
        SyntaxError::UnclosedCData => b"]]>",
        SyntaxError::UnclosedPIOrXmlDecl => b"?>",
        _ => b">",
    };
    Some(Some(terminator))
}

/// Records the general entities declared in a DOCTYPE internal subset.
///
/// Parameter entities and external entities are skipped. The first
/// declaration of a name wins. Replacement text is unescaped against the
/// entities declared before it.
fn declare_entities(doctype: &str, position: u64, entities: &mut Entities) -> Result<()> {
    const KEYWORD: &str = "<!ENTITY";

    let mut rest = doctype;
    while let Some(start) = rest.find(KEYWORD) {
        let decl = rest[start + KEYWORD.len()..].trim_start();
        rest = decl;
        if decl.starts_with('%') {
            continue;
        }
        let name_end = decl
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(decl.len());
        let (name, value) = decl.split_at(name_end);
        let value = value.trim_start();
        let Some(quote) = value.chars().next().filter(|&c| c == '"' || c == '\'') else {
            // SYSTEM or PUBLIC
            continue;
        };
        let Some(len) = value[1..].find(quote) else {
            return Err(malformed(
                position,
                format!("unterminated value for entity {name}"),
            ));
        };
        let raw = &value[1..1 + len];
        rest = &value[2 + len..];

        if entities.contains_key(name) {
            continue;
        }
        let replacement = unescape_with(raw, resolver(entities))
            .map_err(|err| malformed(position, format!("invalid value for entity {name}: {err}")))?
            .into_owned();
        entities.insert(name.to_string(), replacement);
    }
    Ok(())
}

fn element_name(e: &BytesStart<'_>) -> Result<String> {
    Ok(str::from_utf8(e.name().as_ref())?.to_string())
}

/// Resolves predefined entities and the ones declared so far.
fn resolver<'a>(entities: &'a Entities) -> impl FnMut(&str) -> Option<&'a str> + 'a {
    move |name: &str| {
        resolve_predefined_entity(name).or_else(|| entities.get(name).map(String::as_str))
    }
}

/// Extracts attributes from a start tag as owned, unescaped data.
fn extract_attrs<'entity>(
    e: &BytesStart<'_>,
    position: u64,
    mut resolve: impl FnMut(&str) -> Option<&'entity str>,
) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Parse {
            position,
            source: quick_xml::Error::InvalidAttr(err),
        })?;
        let key = str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr
            .unescape_value_with(&mut resolve)
            .map_err(|source| Error::Parse { position, source })?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn malformed(position: u64, message: String) -> Error {
    Error::Malformed { position, message }
}

fn is_xml_whitespace(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RDF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- export -->
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:dc="http://purl.org/dc/elements/1.1/">
  <rdf:Description rdf:about="http://example.org/1">
    <dc:title>Fish &amp; Chips</dc:title>
    <dc:note><![CDATA[<raw> text]]></dc:note>
  </rdf:Description>
  <rdf:Description rdf:about="http://example.org/2">
    <!-- a > b -->
    <dc:title xml:lang="en">Two</dc:title>
    <?render mode="full"?>
  </rdf:Description>
  <rdf:Description rdf:about="http://example.org/3"/>
</rdf:RDF>
"#;

    /// Renders a subtree in a compact form for comparisons.
    fn dump(doc: &Document, id: NodeId) -> String {
        let node = doc.node(id).unwrap();
        let mut out = format!("({}", node.name());
        for (key, value) in node.attributes() {
            out.push_str(&format!(" @{key}={value:?}"));
        }
        for item in node.content() {
            match item {
                Content::Element(child) => out.push_str(&dump(doc, *child)),
                Content::Text(t) => out.push_str(&format!(" t{t:?}")),
                Content::CData(t) => out.push_str(&format!(" cdata{t:?}")),
                Content::Comment(t) => out.push_str(&format!(" c{t:?}")),
                Content::ProcessingInstruction(t) => out.push_str(&format!(" pi{t:?}")),
            }
        }
        out.push(')');
        out
    }

    fn parse_in_pieces(input: &[u8], piece: usize) -> (IncrementalParser, Vec<ParseEvent>) {
        let mut parser = IncrementalParser::new();
        let mut events = Vec::new();
        for chunk in input.chunks(piece) {
            parser.feed(chunk).unwrap();
            events.extend(parser.drain_events());
        }
        assert_eq!(parser.finish().unwrap(), Completion::Complete);
        events.extend(parser.drain_events());
        (parser, events)
    }

    fn root_dump(parser: &IncrementalParser) -> String {
        dump(parser.document(), NodeId(0))
    }

    #[test]
    fn test_event_order() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"<root><a><b/></a><c></c></root>").unwrap();
        let events = parser.drain_events();

        let doc = parser.document();
        let names: Vec<String> = events
            .iter()
            .map(|event| match event {
                ParseEvent::Opened(id) => format!("+{}", doc.node(*id).unwrap().name()),
                ParseEvent::Closed(id) => format!("-{}", doc.node(*id).unwrap().name()),
            })
            .collect();
        assert_eq!(
            names,
            vec!["+root", "+a", "+b", "-b", "-a", "+c", "-c", "-root"]
        );
        assert!(parser.root_closed());
    }

    #[test]
    fn test_events_delivered_once() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"<root><a/>").unwrap();
        assert_eq!(parser.drain_events().len(), 3);
        assert!(parser.drain_events().is_empty());
        parser.feed(b"</root>").unwrap();
        assert_eq!(parser.drain_events().len(), 1);
    }

    #[test]
    fn test_tree_content() {
        let (parser, _) = parse_in_pieces(RDF.as_bytes(), RDF.len());
        let doc = parser.document();
        let root = NodeId(0);
        assert_eq!(doc.node(root).unwrap().name(), "rdf:RDF");

        let children = doc.element_children(root);
        assert_eq!(children.len(), 3);
        let first = doc.node(children[0]).unwrap();
        assert_eq!(first.attribute("rdf:about"), Some("http://example.org/1"));

        let title = doc.element_children(children[0])[0];
        assert_eq!(
            doc.node(title).unwrap().text(),
            Some("Fish & Chips".to_string())
        );
        let note = doc.element_children(children[0])[1];
        assert_eq!(
            doc.node(note).unwrap().content(),
            &[Content::CData("<raw> text".to_string())]
        );
        assert!(doc.node(children[2]).unwrap().content().is_empty());
    }

    #[test]
    fn test_any_split_builds_same_tree() {
        let (whole, whole_events) = parse_in_pieces(RDF.as_bytes(), RDF.len());
        let expected = root_dump(&whole);

        for piece in [1, 2, 3, 5, 7, 16, 64] {
            let (parser, events) = parse_in_pieces(RDF.as_bytes(), piece);
            assert_eq!(root_dump(&parser), expected, "piece size {piece}");
            assert_eq!(events, whole_events, "piece size {piece}");
        }
    }

    #[test]
    fn test_split_entity_reference() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"<root>a &am").unwrap();
        parser.feed(b"p; b</root>").unwrap();
        parser.finish().unwrap();
        assert_eq!(
            parser.document().node(NodeId(0)).unwrap().text(),
            Some("a & b".to_string())
        );
    }

    #[test]
    fn test_incomplete_tag_is_buffered() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"<root><ite").unwrap();
        assert_eq!(parser.drain_events().len(), 1);
        assert_eq!(parser.buffered(), 4);
        assert_eq!(parser.position(), 6);

        parser.feed(b"m/>").unwrap();
        assert_eq!(parser.drain_events().len(), 2);
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.depth(), 1);
    }

    #[test]
    fn test_split_bom() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"\xEF").unwrap();
        parser.feed(b"\xBB").unwrap();
        parser.feed(b"\xBF<root/>").unwrap();
        assert_eq!(parser.finish().unwrap(), Completion::Complete);
        assert_eq!(parser.position(), 10);
    }

    #[test]
    fn test_mismatched_end_tag() {
        let mut parser = IncrementalParser::new();
        let err = parser.feed(b"<root><a><b></a></root>").unwrap_err();
        match err {
            Error::Malformed { position, message } => {
                assert_eq!(position, 12);
                assert!(message.contains("expected </b>"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_mismatch_across_feeds() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"<root><a>").unwrap();
        let err = parser.feed(b"</b></root>").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_unexpected_end_tag() {
        let mut parser = IncrementalParser::new();
        let err = parser.feed(b"</root>").unwrap_err();
        assert!(matches!(err, Error::Malformed { position: 0, .. }));
    }

    #[test]
    fn test_second_root() {
        let mut parser = IncrementalParser::new();
        let err = parser.feed(b"<a/><b/>").unwrap_err();
        assert!(matches!(err, Error::Malformed { position: 4, .. }));
    }

    #[test]
    fn test_text_outside_root() {
        let mut parser = IncrementalParser::new();
        let err = parser.feed(b"oops<root/>").unwrap_err();
        assert!(err.is_malformed());

        let mut parser = IncrementalParser::new();
        parser.feed(b"<root/>trailing").unwrap();
        assert!(parser.finish().unwrap_err().is_malformed());
    }

    #[test]
    fn test_duplicate_attribute() {
        let mut parser = IncrementalParser::new();
        let err = parser.feed(br#"<root a="1" a="2"/>"#).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_unsupported_encoding() {
        let mut parser = IncrementalParser::new();
        let err = parser
            .feed(br#"<?xml version="1.0" encoding="ISO-8859-1"?><root/>"#)
            .unwrap_err();
        assert!(err.to_string().contains("unsupported encoding"));
    }

    #[test]
    fn test_epilog_misc_is_accepted() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"<root/>\n<!-- done -->\n<?tail x?>\n").unwrap();
        assert_eq!(parser.finish().unwrap(), Completion::Complete);
    }

    #[test]
    fn test_unterminated_epilog_markup() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"<root/><!-- never").unwrap();
        assert!(matches!(
            parser.finish(),
            Err(Error::Malformed { position: 7, .. })
        ));
    }

    #[test]
    fn test_truncated_root() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"<root><a>1</a><b><c>partial").unwrap();
        let completion = parser.finish().unwrap();
        assert_eq!(
            completion,
            Completion::Truncated {
                open: vec!["root".to_string(), "b".to_string(), "c".to_string()],
            }
        );
        assert!(!parser.root_closed());
    }

    #[test]
    fn test_input_ending_inside_tag_is_malformed() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"<root><a>1</a><b attr=\"x").unwrap();
        assert!(matches!(
            parser.finish(),
            Err(Error::Malformed { position: 14, .. })
        ));
    }

    #[test]
    fn test_unclosed_quote_swallowing_input_is_malformed() {
        let input = br#"<root><a/><b x="1></b><c/><d/></root>"#;
        for piece in [4, input.len()] {
            let mut parser = IncrementalParser::new();
            for chunk in input.chunks(piece) {
                parser.feed(chunk).unwrap();
            }
            assert!(
                matches!(parser.finish(), Err(Error::Malformed { position: 10, .. })),
                "piece size {piece}"
            );
        }
    }

    #[test]
    fn test_unclosed_comment_swallowing_input_is_malformed() {
        let input = b"<root><a/><!-- never closed <c/><d/></root>";
        for piece in [4, input.len()] {
            let mut parser = IncrementalParser::new();
            for chunk in input.chunks(piece) {
                parser.feed(chunk).unwrap();
            }
            assert!(
                matches!(parser.finish(), Err(Error::Malformed { position: 10, .. })),
                "piece size {piece}"
            );
        }
    }

    const WITH_ENTITIES: &str = r#"<?xml version="1.0"?>
<!DOCTYPE rdf:RDF [
  <!ENTITY rdf "http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <!ENTITY ex 'http://example.org/'>
  <!ENTITY item "&ex;item/">
  <!ENTITY % local "ignored">
]>
<rdf:RDF xmlns:rdf="&rdf;">
  <rdf:Description rdf:about="&item;1"><rdf:type rdf:resource="&rdf;Bag"/>Tom &amp; &ex;</rdf:Description>
</rdf:RDF>
"#;

    #[test]
    fn test_doctype_entities_are_expanded() {
        let (whole, _) = parse_in_pieces(WITH_ENTITIES.as_bytes(), WITH_ENTITIES.len());
        let expected = root_dump(&whole);

        for piece in [1, 3, 7, 13, 64] {
            let (parser, _) = parse_in_pieces(WITH_ENTITIES.as_bytes(), piece);
            assert_eq!(root_dump(&parser), expected, "piece size {piece}");
        }

        let doc = whole.document();
        let root = doc.node(NodeId(0)).unwrap();
        assert_eq!(
            root.attribute("xmlns:rdf"),
            Some("http://www.w3.org/1999/02/22-rdf-syntax-ns#")
        );
        let description = doc.element_children(NodeId(0))[0];
        let node = doc.node(description).unwrap();
        assert_eq!(node.attribute("rdf:about"), Some("http://example.org/item/1"));
        assert_eq!(node.text(), Some("Tom & http://example.org/".to_string()));
        let kind = doc.element_children(description)[0];
        assert_eq!(
            doc.node(kind).unwrap().attribute("rdf:resource"),
            Some("http://www.w3.org/1999/02/22-rdf-syntax-ns#Bag")
        );
    }

    #[test]
    fn test_entity_reference_split_across_feeds() {
        let mut parser = IncrementalParser::new();
        parser
            .feed(b"<!DOCTYPE r [<!ENTITY ex \"http://exa")
            .unwrap();
        parser.feed(b"mple.org/\">]><r a=\"&e").unwrap();
        parser.feed(b"x;b\">see &e").unwrap();
        parser.feed(b"x;</r>").unwrap();
        assert_eq!(parser.finish().unwrap(), Completion::Complete);

        let root = parser.document().node(NodeId(0)).unwrap();
        assert_eq!(root.attribute("a"), Some("http://example.org/b"));
        assert_eq!(root.text(), Some("see http://example.org/".to_string()));
    }

    #[test]
    fn test_undeclared_entity() {
        let mut parser = IncrementalParser::new();
        let err = parser.feed(b"<root a=\"&nope;\"/>").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_long_text_waits_for_next_markup() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"<root>").unwrap();
        for _ in 0..1000 {
            parser.feed(b"abcdefgh").unwrap();
        }
        assert_eq!(parser.awaiting, Some(b"<".as_slice()));
        assert_eq!(parser.searched, 8000);
        assert_eq!(parser.buffered(), 8000);

        parser.feed(b"</root>").unwrap();
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.finish().unwrap(), Completion::Complete);
        let text = parser.document().node(NodeId(0)).unwrap().text().unwrap();
        assert_eq!(text.len(), 8000);
    }

    #[test]
    fn test_cdata_terminator_split_across_feeds() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"<root><![CDATA[").unwrap();
        assert_eq!(parser.awaiting, Some(b"]]>".as_slice()));
        parser.feed(b"a > b ]").unwrap();
        parser.feed(b"]").unwrap();
        assert_eq!(parser.buffered(), 17);
        parser.feed(b"></root>").unwrap();
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.finish().unwrap(), Completion::Complete);
        assert_eq!(
            parser.document().node(NodeId(0)).unwrap().content(),
            &[Content::CData("a > b ".to_string())]
        );
    }

    #[test]
    fn test_missing_root() {
        let mut parser = IncrementalParser::new();
        assert!(matches!(parser.finish(), Err(Error::MissingRoot)));

        let mut parser = IncrementalParser::new();
        parser.feed(b"<?xml version=\"1.0\"?>\n<!-- nothing -->").unwrap();
        assert!(matches!(parser.finish(), Err(Error::MissingRoot)));
    }

    #[test]
    fn test_feed_after_finish() {
        let mut parser = IncrementalParser::new();
        parser.feed(b"<root/>").unwrap();
        parser.finish().unwrap();
        assert!(matches!(parser.feed(b" "), Err(Error::ParserFinished)));
        assert!(matches!(parser.finish(), Err(Error::ParserFinished)));
    }
}
