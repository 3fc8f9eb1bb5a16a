//! Burst controller.
//!
//! Drives the split: every buffer read from the source is fed to the
//! [`IncrementalParser`], the resulting events are scanned for closed
//! direct children of the root, and if any closed during that feed cycle
//! they are handed to a [`ChunkSink`] as one chunk and evicted from the
//! tree. Chunk boundaries therefore follow read-buffer boundaries: larger
//! buffers give fewer, larger chunks.
//!
//! # Example
//!
//! ```rust
//! use xml_burst::burst::{burst, BurstConfig};
//! use xml_burst::emitter::ChunkSink;
//! use xml_burst::tree::{Document, NodeId};
//! use std::io::Cursor;
//!
//! /// Counts children per chunk instead of writing files.
//! struct Counter(Vec<usize>);
//!
//! impl ChunkSink for Counter {
//!     fn emit(
//!         &mut self,
//!         _doc: &Document,
//!         _root: NodeId,
//!         children: &[NodeId],
//!         _index: usize,
//!     ) -> xml_burst::Result<()> {
//!         self.0.push(children.len());
//!         Ok(())
//!     }
//! }
//!
//! let xml = "<root><a/><b/><c/></root>";
//! let mut counter = Counter(Vec::new());
//! let report = burst(Cursor::new(xml), &mut counter, &BurstConfig::default()).unwrap();
//!
//! assert_eq!(counter.0, vec![3]);
//! assert_eq!(report.children, 3);
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::emitter::{create_output_dir, ChunkSink, DirectoryEmitter};
use crate::error::{Error, Result};
use crate::feeder::ByteFeeder;
use crate::reader::{Completion, IncrementalParser, ParseEvent};
use crate::tree::NodeId;
use crate::writer::WriterConfig;

/// Default read buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// What to do when input ends before the root element is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TruncationPolicy {
    /// Keep the chunks emitted so far and end normally. Any unfinished
    /// trailing child is discarded.
    #[default]
    EmitPartial,
    /// Keep the chunks emitted so far and fail with [`Error::TruncatedRoot`].
    Fail,
}

/// Configuration of a burst run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstConfig {
    /// Maximum number of bytes read per feed cycle
    pub buffer_size: usize,
    /// Handling of a root element that never closes
    pub truncation: TruncationPolicy,
    /// Serialization options for chunk files
    pub writer: WriterConfig,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            truncation: TruncationPolicy::default(),
            writer: WriterConfig::default(),
        }
    }
}

impl BurstConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the read buffer size.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Sets the truncation policy.
    pub fn with_truncation(mut self, truncation: TruncationPolicy) -> Self {
        self.truncation = truncation;
        self
    }

    /// Sets the chunk writer configuration.
    pub fn with_writer(mut self, writer: WriterConfig) -> Self {
        self.writer = writer;
        self
    }

    /// Checks the configuration before a run.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::InvalidBufferSize(self.buffer_size));
        }
        Ok(())
    }
}

/// One emitted chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSummary {
    /// Burst index, starting at 0
    pub index: usize,
    /// Number of root children in the chunk
    pub children: usize,
}

/// Outcome of a burst run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BurstReport {
    /// Name of the root element
    pub root: Option<String>,
    /// Emitted chunks, in index order
    pub chunks: Vec<ChunkSummary>,
    /// Total number of root children emitted
    pub children: usize,
    /// Total number of bytes read from the source
    pub bytes_read: u64,
    /// Number of feed cycles run
    pub feed_cycles: usize,
    /// Whether input ended before the root element closed
    pub truncated: bool,
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BurstState {
    /// No element seen yet
    SeekingRoot,
    /// Root bound; collecting its closed children
    Bursting,
}

/// Splits a document into chunks, one feed cycle at a time.
pub struct BurstController {
    parser: IncrementalParser,
    state: BurstState,
    /// Direct children closed since the last eviction
    pending: Vec<NodeId>,
    burst_index: usize,
    report: BurstReport,
}

impl Default for BurstController {
    fn default() -> Self {
        Self::new()
    }
}

impl BurstController {
    /// Creates a controller with a fresh parser.
    pub fn new() -> Self {
        Self {
            parser: IncrementalParser::new(),
            state: BurstState::SeekingRoot,
            pending: Vec::new(),
            burst_index: 0,
            report: BurstReport::default(),
        }
    }

    /// Runs one feed cycle.
    ///
    /// Parses `bytes`, collects the direct children of the root closed by
    /// them and, if there are any, emits them as the next chunk and evicts
    /// them from the tree. Returns the emitted chunk, if any.
    pub fn feed<S: ChunkSink + ?Sized>(
        &mut self,
        bytes: &[u8],
        sink: &mut S,
    ) -> Result<Option<ChunkSummary>> {
        self.report.feed_cycles += 1;
        self.report.bytes_read += bytes.len() as u64;
        debug!(cycle = self.report.feed_cycles, bytes = bytes.len(), "feeding buffer");

        self.parser.feed(bytes)?;
        debug!(
            position = self.parser.position(),
            buffered = self.parser.buffered(),
            depth = self.parser.depth(),
            "buffer parsed"
        );
        self.collect_events();
        self.flush(sink)
    }

    /// Ends the run and applies the truncation policy.
    pub fn finish(mut self, truncation: TruncationPolicy) -> Result<BurstReport> {
        let completion = self.parser.finish()?;
        // Only trailing character data can be flushed at this point.
        self.collect_events();

        if let Completion::Truncated { open } = completion {
            let root = open.first().cloned().unwrap_or_default();
            match truncation {
                TruncationPolicy::EmitPartial => {
                    warn!(
                        root = %root,
                        open = open.len(),
                        "input ended before the root element was closed"
                    );
                    self.report.truncated = true;
                }
                TruncationPolicy::Fail => {
                    return Err(Error::TruncatedRoot {
                        root,
                        open: open.len(),
                    })
                }
            }
        }

        debug!(
            chunks = self.report.chunks.len(),
            children = self.report.children,
            "done"
        );
        Ok(self.report)
    }

    /// The parser, and through it the tree being built.
    pub fn parser(&self) -> &IncrementalParser {
        &self.parser
    }

    /// Number of chunks emitted so far; also the index of the next chunk.
    pub fn burst_index(&self) -> usize {
        self.burst_index
    }

    /// The report accumulated so far.
    pub fn report(&self) -> &BurstReport {
        &self.report
    }

    fn collect_events(&mut self) {
        for event in self.parser.drain_events() {
            match (self.state, event) {
                (BurstState::SeekingRoot, ParseEvent::Opened(id)) => {
                    let doc = self.parser.document_mut();
                    if doc.bind_root(id) {
                        let name = doc.node(id).map(|node| node.name().to_string());
                        debug!(root = name.as_deref().unwrap_or_default(), "root bound");
                        self.report.root = name;
                        self.state = BurstState::Bursting;
                    }
                }
                (BurstState::Bursting, ParseEvent::Closed(id)) => {
                    let doc = self.parser.document();
                    if doc.is_direct_child(id) {
                        if let Some(node) = doc.node(id) {
                            debug!(tag = node.name(), "closed direct child");
                        }
                        self.pending.push(id);
                    }
                }
                _ => {}
            }
        }
    }

    fn flush<S: ChunkSink + ?Sized>(&mut self, sink: &mut S) -> Result<Option<ChunkSummary>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let root = self.parser.document().root().ok_or(Error::MissingRoot)?;

        sink.emit(self.parser.document(), root, &self.pending, self.burst_index)?;
        self.parser.document_mut().evict(root, &self.pending);

        let summary = ChunkSummary {
            index: self.burst_index,
            children: self.pending.len(),
        };
        info!(index = summary.index, children = summary.children, "chunk emitted");

        self.pending.clear();
        self.burst_index += 1;
        self.report.children += summary.children;
        self.report.chunks.push(summary);
        Ok(Some(summary))
    }
}

/// Splits the document read from `source`, handing chunks to `sink`.
pub fn burst<R: Read, S: ChunkSink + ?Sized>(
    source: R,
    sink: &mut S,
    config: &BurstConfig,
) -> Result<BurstReport> {
    config.validate()?;
    let mut controller = BurstController::new();
    for buffer in ByteFeeder::new(source, config.buffer_size)? {
        controller.feed(&buffer?, sink)?;
    }
    controller.finish(config.truncation)
}

/// Splits the XML file at `input` into chunk files in `output_dir`.
///
/// The output directory is created and must not exist yet. Chunk files are
/// named after the input file: `{stem}-{index}{suffix}`.
pub fn burst_file(
    input: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &BurstConfig,
) -> Result<BurstReport> {
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();
    config.validate()?;

    let file = File::open(input)?;
    create_output_dir(output_dir)?;
    info!(input = %input.display(), output = %output_dir.display(), "bursting");

    let mut emitter = DirectoryEmitter::new(output_dir, input, config.writer.clone());
    let report = burst(file, &mut emitter, config)?;
    info!(
        files = emitter.written().len(),
        output = %emitter.dir().display(),
        "chunk files written"
    );
    Ok(report)
}
