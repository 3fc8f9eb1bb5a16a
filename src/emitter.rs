//! Chunk emission.
//!
//! [`ChunkSink`] is what the burst controller hands finished chunks to.
//! [`DirectoryEmitter`] is the on-disk implementation: every chunk becomes
//! a file named `{stem}-{index}{suffix}` after the input file, written to a
//! temporary file first and then moved into place without replacing
//! anything already there.

use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::tree::{Document, NodeId};
use crate::writer::{ChunkWriter, WriterConfig};

/// Receiver of completed chunks.
pub trait ChunkSink {
    /// Emits `root` with `children` as chunk number `index`.
    ///
    /// Must not modify the tree; eviction is the caller's business.
    fn emit(
        &mut self,
        doc: &Document,
        root: NodeId,
        children: &[NodeId],
        index: usize,
    ) -> Result<()>;
}

/// Writes each chunk to its own file in an output directory.
#[derive(Debug)]
pub struct DirectoryEmitter {
    dir: PathBuf,
    stem: String,
    suffix: String,
    writer: ChunkWriter,
    written: Vec<PathBuf>,
}

impl DirectoryEmitter {
    /// Creates an emitter naming its files after `input`.
    ///
    /// The directory must already exist; see [`create_output_dir`].
    pub fn new(dir: impl Into<PathBuf>, input: impl AsRef<Path>, config: WriterConfig) -> Self {
        let input = input.as_ref();
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix = input
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        Self {
            dir: dir.into(),
            stem,
            suffix,
            writer: ChunkWriter::with_config(config),
            written: Vec::new(),
        }
    }

    /// Path of the file for chunk `index`.
    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.dir
            .join(chunk_file_name(&self.stem, &self.suffix, index))
    }

    /// Files written so far, in chunk order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// The output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ChunkSink for DirectoryEmitter {
    fn emit(
        &mut self,
        doc: &Document,
        root: NodeId,
        children: &[NodeId],
        index: usize,
    ) -> Result<()> {
        let path = self.chunk_path(index);
        if path.exists() {
            return Err(Error::OutputExists(path));
        }

        let mut tmp = Builder::new()
            .prefix(".burst-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            self.writer.write(doc, root, children, &mut out)?;
            out.flush()?;
        }

        tmp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                Error::OutputExists(path.clone())
            } else {
                Error::Io(e.error)
            }
        })?;

        debug!(path = %path.display(), children = children.len(), "chunk persisted");
        self.written.push(path);
        Ok(())
    }
}

/// Builds the file name of chunk `index`: `{stem}-{index}{suffix}`.
pub fn chunk_file_name(stem: &str, suffix: &str, index: usize) -> String {
    format!("{stem}-{index}{suffix}")
}

/// Creates the output directory, failing if it already exists.
pub fn create_output_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir(path).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => Error::OutputExists(path.to_path_buf()),
        _ => Error::Io(e),
    })
}
