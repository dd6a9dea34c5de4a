//! Random-access reads over a database source.
//!
//! A [`Reader`](crate::Reader) always owns a [`PositionalIo`] and may also
//! hold a [`MappedView`] of the same file. Both satisfy [`RandomAccess`];
//! the reader prefers the mapping and drops it for good the first time a
//! mapped read fails.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use memmap2::Mmap;

/// Read `len` bytes starting at `offset`.
pub trait RandomAccess {
    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Cow<'_, [u8]>>;

    /// Total size of the underlying data in bytes.
    fn size(&mut self) -> io::Result<u64>;
}

/// Read-only memory map of a database file.
#[derive(Debug)]
pub struct MappedView {
    map: Mmap,
}

impl MappedView {
    pub fn open(file: &File) -> io::Result<Self> {
        // SAFETY: database files are immutable once their writer has closed,
        // and the reader never hands out slices that outlive the mapping.
        let map = unsafe { Mmap::map(file)? };
        Ok(Self { map })
    }

    /// Returns `true` if `[offset, offset + len)` lies inside the mapping.
    pub fn covers(&self, offset: u64, len: usize) -> bool {
        offset
            .checked_add(len as u64)
            .is_some_and(|end| end <= self.map.len() as u64)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl RandomAccess for MappedView {
    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Cow<'_, [u8]>> {
        if !self.covers(offset, len) {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "mapped read of {len} bytes at {offset} past end of {} byte map",
                    self.map.len()
                ),
            ));
        }
        let start = offset as usize;
        Ok(Cow::Borrowed(&self.map[start..start + len]))
    }

    fn size(&mut self) -> io::Result<u64> {
        Ok(self.map.len() as u64)
    }
}

/// Seek-then-read access over any `Read + Seek` source.
#[derive(Debug)]
pub struct PositionalIo<R> {
    inner: R,
}

impl<R: Read + Seek> PositionalIo<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read + Seek> RandomAccess for PositionalIo<R> {
    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Cow<'_, [u8]>> {
        self.inner.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(Cow::Owned(buf))
    }

    fn size(&mut self) -> io::Result<u64> {
        self.inner.seek(SeekFrom::End(0))
    }
}
