//! Fixed-size byte feeder.
//!
//! Reads a source in buffers of a configured maximum size. Every buffer is
//! filled completely except the last one, so the sequence of buffers (and
//! therefore the chunk boundaries derived from it) only depends on the
//! source content and the buffer size.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// Iterator over the non-empty byte buffers of a source.
///
/// The iterator is finite and fused: once the source is exhausted or a
/// read fails it yields nothing more.
pub struct ByteFeeder<R: Read> {
    source: R,
    buffer_size: usize,
    exhausted: bool,
}

impl<R: Read> ByteFeeder<R> {
    /// Creates a feeder reading `buffer_size` bytes at a time.
    pub fn new(source: R, buffer_size: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(Error::InvalidBufferSize(buffer_size));
        }
        Ok(Self {
            source,
            buffer_size,
            exhausted: false,
        })
    }

    /// Returns the configured buffer size.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

impl ByteFeeder<File> {
    /// Opens a file and creates a feeder over it.
    pub fn open(path: impl AsRef<Path>, buffer_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file, buffer_size)
    }
}

impl<R: Read> Iterator for ByteFeeder<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let mut buf = Vec::with_capacity(self.buffer_size);
        match self
            .source
            .by_ref()
            .take(self.buffer_size as u64)
            .read_to_end(&mut buf)
        {
            Ok(0) => {
                self.exhausted = true;
                None
            }
            Ok(n) => {
                // A short fill means read_to_end hit end of input.
                if n < self.buffer_size {
                    self.exhausted = true;
                }
                Some(Ok(buf))
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    /// Reader that hands out at most `step` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device error"))
        }
    }

    #[test]
    fn test_fixed_size_buffers() {
        let feeder = ByteFeeder::new(Cursor::new(b"abcdefghij".to_vec()), 4).unwrap();
        let chunks: Vec<Vec<u8>> = feeder.collect::<Result<_>>().unwrap();
        assert_eq!(chunks, vec![b"abcd".to_vec(), b"efgh".to_vec(), b"ij".to_vec()]);
    }

    #[test]
    fn test_short_reads_are_filled() {
        let source = Trickle {
            data: b"0123456789",
            step: 3,
        };
        let chunks: Vec<Vec<u8>> = ByteFeeder::new(source, 5)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(chunks, vec![b"01234".to_vec(), b"56789".to_vec()]);
    }

    #[test]
    fn test_empty_source() {
        let mut feeder = ByteFeeder::new(Cursor::new(Vec::new()), 8).unwrap();
        assert!(feeder.next().is_none());
        assert!(feeder.next().is_none());
    }

    #[test]
    fn test_zero_buffer_size_rejected() {
        let result = ByteFeeder::new(Cursor::new(b"x".to_vec()), 0);
        assert!(matches!(result, Err(Error::InvalidBufferSize(0))));
    }

    #[test]
    fn test_read_error_is_fused() {
        let mut feeder = ByteFeeder::new(Failing, 16).unwrap();
        assert!(matches!(feeder.next(), Some(Err(Error::Io(_)))));
        assert!(feeder.next().is_none());
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xml");
        std::fs::write(&path, b"<root/>").unwrap();

        let feeder = ByteFeeder::open(&path, 3).unwrap();
        assert_eq!(feeder.buffer_size(), 3);
        assert_eq!(feeder.count(), 3);
    }
}
