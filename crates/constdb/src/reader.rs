use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use constdb_types::{
    bucket_index, hash, probe_start, HeaderTable, Layout, Mode, ReaderConfig, CDB64_MAGIC,
};
use tracing::{debug, trace, warn};

use crate::access::{MappedView, PositionalIo, RandomAccess};
use crate::error::{CdbError, Result};

/// Largest key length accepted from a record header (1 MiB).
pub const MAX_KEY_LEN: u64 = 1 << 20;

/// Largest value length accepted from a record header (1 GiB).
pub const MAX_VALUE_LEN: u64 = 1 << 30;

/// Serves lookups and full scans over a finished database file.
///
/// Reads go through a memory map when one was established at open time.
/// The first mapped read that fails drops the map and every later read
/// uses seek-and-read on the source instead; results are the same either
/// way.
///
/// A reader keeps mutable access state and is not meant to be shared
/// across threads; open one reader per thread instead.
#[derive(Debug)]
pub struct Reader<R> {
    positional: Option<PositionalIo<R>>,
    mapped: Option<MappedView>,
    layout: Layout,
    header: HeaderTable,
    file_size: u64,
}

impl Reader<File> {
    /// Open a named file, detecting its mode and memory-mapping it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &ReaderConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: &ReaderConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let mapped = if config.mmap {
            match MappedView::open(&file) {
                // Nothing to gain from mapping a file too short to be valid.
                Ok(view) if view.is_empty() => None,
                Ok(view) => Some(view),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "memory map unavailable; using positional reads");
                    None
                }
            }
        } else {
            None
        };

        Self::from_parts(PositionalIo::new(file), mapped, config.mode)
    }
}

impl<R: Read + Seek> Reader<R> {
    /// Read from any seekable source, detecting the mode.
    pub fn new(source: R) -> Result<Self> {
        Self::from_parts(PositionalIo::new(source), None, None)
    }

    /// Read from any seekable source. `config.mmap` has no effect here:
    /// only files opened by path are mapped.
    pub fn with_config(source: R, config: &ReaderConfig) -> Result<Self> {
        Self::from_parts(PositionalIo::new(source), None, config.mode)
    }

    fn from_parts(
        mut positional: PositionalIo<R>,
        mapped: Option<MappedView>,
        requested: Option<Mode>,
    ) -> Result<Self> {
        let file_size = positional.size()?;
        let trailer_len = CDB64_MAGIC.len() as u64;
        if file_size < trailer_len {
            return Err(CdbError::MissingTrailer { len: file_size });
        }
        let detected = Mode::detect(&positional.read_at(file_size - trailer_len, CDB64_MAGIC.len())?);

        if let Some(requested) = requested {
            if requested != detected {
                return Err(CdbError::ModeMismatch {
                    detected,
                    requested,
                });
            }
        }

        let layout = Layout::new(detected);
        let mut reader = Self {
            positional: Some(positional),
            mapped,
            layout,
            header: HeaderTable::zeroed(),
            file_size,
        };
        reader.header = reader.read_header()?;
        if reader.header.is_blank() {
            return Err(CdbError::EmptyDirectory);
        }

        debug!(
            mode = %detected,
            mapped = reader.is_mapped(),
            size = file_size,
            "reader opened"
        );
        Ok(reader)
    }

    fn read_header(&mut self) -> Result<HeaderTable> {
        let layout = self.layout;
        let hash_size = layout.hash_size();
        if self.file_size < hash_size as u64 {
            return Err(CdbError::Truncated {
                offset: 0,
                needed: hash_size as u64,
                len: self.file_size,
            });
        }
        let bytes = self.read_at(0, hash_size)?;
        Ok(HeaderTable::decode(&bytes, &layout)?)
    }

    /// All values stored under `key`, in store order.
    pub fn values(&mut self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.lookup(key, false)
    }

    /// The first value stored under `key`.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.lookup(key, true)?.into_iter().next())
    }

    pub fn contains_key(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Probe the key's slot table from its start slot until an empty slot,
    /// collecting every record whose hash and key match.
    fn lookup(&mut self, key: &[u8], first_only: bool) -> Result<Vec<Vec<u8>>> {
        self.ensure_open()?;
        let layout = self.layout;
        let h = hash(key);
        let bucket = self.header.bucket(bucket_index(h));
        let mut found = Vec::new();

        if bucket.is_empty() {
            return Ok(found);
        }

        let slot_size = layout.slot_size();
        let mut probe = probe_start(h, bucket.slot_count);
        // A table packed at fill factor 1.0 has no empty slot; one full
        // pass over it ends the search.
        for _ in 0..bucket.slot_count {
            let slot_offset = bucket.offset + probe * slot_size as u64;
            let (stored_hash, record_offset) = {
                let bytes = self.read_at(slot_offset, slot_size)?;
                layout.decode_slot(&bytes)
            };
            if record_offset == 0 {
                break;
            }
            if record_offset < layout.hash_size() as u64 {
                return Err(CdbError::MalformedSlot {
                    offset: slot_offset,
                    record_offset,
                });
            }
            if stored_hash == u64::from(h) {
                if let Some(value) = self.value_if_key(record_offset, key)? {
                    found.push(value);
                    if first_only {
                        break;
                    }
                }
            }
            probe = (probe + 1) % bucket.slot_count;
        }

        trace!(hash = h, bucket = bucket_index(h), found = found.len(), "lookup");
        Ok(found)
    }

    /// The value of the record at `pos` if its key equals `key`.
    fn value_if_key(&mut self, pos: u64, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let (key_len, value_len) = self.read_record_header(pos)?;
        if key_len != key.len() as u64 {
            return Ok(None);
        }
        let start = pos + self.layout.record_header_size() as u64;
        if self.read_at(start, key.len())?.as_ref() != key {
            return Ok(None);
        }
        let value = self.read_at(start + key_len, value_len as usize)?;
        Ok(Some(value.into_owned()))
    }

    /// Decode the record at `pos` into `(key, value)`.
    fn read_entry(&mut self, pos: u64) -> Result<(Vec<u8>, Vec<u8>)> {
        let (key_len, value_len) = self.read_record_header(pos)?;
        let start = pos + self.layout.record_header_size() as u64;
        let body = self.read_at(start, (key_len + value_len) as usize)?;
        let (key, value) = body.split_at(key_len as usize);
        Ok((key.to_vec(), value.to_vec()))
    }

    fn read_record_header(&mut self, pos: u64) -> Result<(u64, u64)> {
        let layout = self.layout;
        let (key_len, value_len) = {
            let bytes = self.read_at(pos, layout.record_header_size())?;
            layout.decode_record_header(&bytes)
        };
        if key_len > MAX_KEY_LEN {
            return Err(CdbError::OversizedLength {
                offset: pos,
                field: "key",
                length: key_len,
                limit: MAX_KEY_LEN,
            });
        }
        if value_len > MAX_VALUE_LEN {
            return Err(CdbError::OversizedLength {
                offset: pos,
                field: "value",
                length: value_len,
                limit: MAX_VALUE_LEN,
            });
        }
        Ok((key_len, value_len))
    }

    /// Read through the map if there is one, demoting to positional reads
    /// for the rest of this reader's life on the first mapped failure.
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Cow<'_, [u8]>> {
        if let Some(view) = &self.mapped {
            if !view.covers(offset, len) {
                warn!(
                    offset,
                    len,
                    map_len = view.len(),
                    "mapped read failed; falling back to positional reads"
                );
                self.mapped = None;
            }
        }
        match self.mapped.as_mut() {
            Some(view) => Ok(view.read_at(offset, len)?),
            None => {
                let io = self.positional.as_mut().ok_or(CdbError::ReaderClosed)?;
                Ok(io.read_at(offset, len)?)
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.positional.is_none() {
            return Err(CdbError::ReaderClosed);
        }
        Ok(())
    }

    /// Every `(key, value)` pair in on-disk order, duplicates included.
    ///
    /// Each call starts a fresh scan.
    pub fn iter(&mut self) -> Iter<'_, R> {
        let pos = self.layout.hash_size() as u64;
        let end = self.header.records_end();
        Iter {
            reader: self,
            pos,
            end,
            done: false,
        }
    }
}

impl<R> Reader<R> {
    pub fn mode(&self) -> Mode {
        self.layout.mode()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The decoded 256-entry bucket directory.
    pub fn header(&self) -> &HeaderTable {
        &self.header
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Whether reads currently go through a memory map. This can turn
    /// `false` after any read, never back to `true`.
    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.positional.is_none()
    }

    /// Release the memory map and the source. Calling it again does nothing.
    pub fn close(&mut self) {
        self.mapped = None;
        if self.positional.take().is_some() {
            debug!("reader closed");
        }
    }
}

/// Lazy full scan returned by [`Reader::iter`].
pub struct Iter<'a, R> {
    reader: &'a mut Reader<R>,
    pos: u64,
    end: u64,
    done: bool,
}

impl<R: Read + Seek> Iterator for Iter<'_, R> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Err(e) = self.reader.ensure_open() {
            self.done = true;
            return Some(Err(e));
        }
        if self.pos >= self.end {
            self.done = true;
            return None;
        }
        match self.reader.read_entry(self.pos) {
            Ok((key, value)) => {
                self.pos += self.reader.layout.record_header_size() as u64
                    + key.len() as u64
                    + value.len() as u64;
                Some(Ok((key, value)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a, R: Read + Seek> IntoIterator for &'a mut Reader<R> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;
    type IntoIter = Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
