//! Split large XML documents into well-formed chunks.
//!
//! Bulk linked-data exports (RDF/XML dumps and the like) are usually one
//! huge root element with a very large number of direct children. This
//! crate reads such a document as a stream and writes it back out as a
//! sequence of smaller, independently well-formed documents. Each one
//! repeats the root element (name, namespace declarations, attributes) and
//! carries a consecutive run of the original children.
//!
//! # Features
//!
//! - **Bounded memory**: Children are evicted from the in-memory tree as
//!   soon as they have been written, so memory use depends on chunk size,
//!   not document size.
//! - **Incremental parsing**: Input is fed in fixed-size buffers; markup
//!   split across buffers is handled transparently.
//! - **Exactly once**: Every child of the root lands in exactly one chunk,
//!   in document order.
//! - **Safe output**: Chunk files are written atomically and never
//!   overwrite existing files.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xml_burst::{burst_file, BurstConfig};
//!
//! let config = BurstConfig::default().with_buffer_size(1 << 20);
//! let report = burst_file("dump.rdf", "dump-chunks", &config).unwrap();
//! println!("wrote {} chunks", report.chunks.len());
//! ```
//!
//! # Module Structure
//!
//! - [`feeder`] - Fixed-size byte buffers from a source
//! - [`reader`] - Incremental parser building the element tree
//! - [`tree`] - Arena-backed element tree
//! - [`burst`] - Chunking controller and entry points
//! - [`emitter`] - Chunk sinks and output files
//! - [`writer`] - Chunk serialization
//! - [`error`] - Error types
//!
//! # Logging
//!
//! Progress is reported through [`tracing`]. The library never installs a
//! subscriber; callers choose where events go, for instance by running a
//! burst under `tracing::subscriber::with_default`.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod burst;
pub mod emitter;
pub mod error;
pub mod feeder;
pub mod reader;
pub mod tree;
pub mod writer;

// Re-export commonly used types at the crate root
pub use burst::{
    burst, burst_file, BurstConfig, BurstController, BurstReport, ChunkSummary,
    TruncationPolicy, DEFAULT_BUFFER_SIZE,
};
pub use emitter::{ChunkSink, DirectoryEmitter};
pub use error::{Error, Result};
pub use reader::{Completion, IncrementalParser, ParseEvent};
pub use tree::{Content, Document, ElementNode, NodeId};
pub use writer::{ChunkWriter, WriterConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
