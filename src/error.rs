//! Error types for the burst library.

use std::path::PathBuf;

use thiserror::Error;

use crate::tree::NodeId;

/// Errors that can occur while splitting an XML document.
#[derive(Error, Debug)]
pub enum Error {
    /// Lexical well-formedness error reported by quick-xml
    #[error("XML parsing error at byte {position}: {source}")]
    Parse {
        /// Absolute byte offset in the source where the error was detected
        position: u64,
        /// The underlying quick-xml error
        #[source]
        source: quick_xml::Error,
    },

    /// Structural well-formedness error (tag nesting, root uniqueness, ...)
    #[error("Malformed XML at byte {position}: {message}")]
    Malformed {
        /// Absolute byte offset in the source of the offending construct
        position: u64,
        /// Description of the violation
        message: String,
    },

    /// The input never opened a root element
    #[error("No root element found in input")]
    MissingRoot,

    /// The input ended while the root element was still open
    #[error("Input ended before <{root}> was closed ({open} element(s) still open)")]
    TruncatedRoot {
        /// Name of the root element
        root: String,
        /// Number of elements still open at end of input, root included
        open: usize,
    },

    /// XML serialization error
    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output directory or chunk file already exists
    #[error("Output already exists: {}", .0.display())]
    OutputExists(PathBuf),

    /// UTF-8 conversion error
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Read buffer size must be positive
    #[error("Invalid buffer size: {0}")]
    InvalidBufferSize(usize),

    /// A node handle that is not part of the document
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// The parser was fed after end of input was signalled
    #[error("Parser already finished")]
    ParserFinished,
}

impl Error {
    /// Returns true for errors caused by input that is not well-formed XML.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::Parse { .. } | Error::Malformed { .. } | Error::MissingRoot
        )
    }
}

/// Result type alias for burst operations.
pub type Result<T> = std::result::Result<T, Error>;
