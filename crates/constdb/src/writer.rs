use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use constdb_types::{
    bucket_index, hash, probe_start, BucketPointer, HeaderTable, Layout, Mode, WriterConfig,
    NUM_BUCKETS,
};
use tracing::{debug, trace, warn};

use crate::error::{CdbError, Result};

/// A stored record's hash and file offset, buffered until [`Writer::close`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct IndexEntry {
    hash: u32,
    offset: u64,
}

impl IndexEntry {
    /// Records never start at offset 0, so a zero offset marks a free slot.
    const EMPTY: Self = Self { hash: 0, offset: 0 };

    fn is_empty(&self) -> bool {
        self.offset == 0
    }
}

/// Builds a database file in one pass.
///
/// Records are written to the sink as soon as they are stored. Only a
/// `(hash, offset)` pair per record is kept in memory; the slot tables and
/// the real header table are written by [`close`](Self::close).
///
/// A writer that is dropped without `close` leaves a file whose header is
/// still all zeros, which readers reject. The same holds after any failed
/// write: the writer refuses further work with [`CdbError::WriterFailed`].
pub struct Writer<W: Write + Seek> {
    sink: W,
    layout: Layout,
    hash_fill_factor: f64,
    buckets: Vec<Vec<IndexEntry>>,
    pos: u64,
    state: WriteState,
}

/// Lifecycle of a writer. Dropping it before `close` logs a warning.
#[derive(Debug, Default)]
struct WriteState {
    records: u64,
    closed: bool,
    failed: bool,
}

impl Drop for WriteState {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                records = self.records,
                failed = self.failed,
                "writer dropped without close; database file is incomplete"
            );
        }
    }
}

impl Writer<BufWriter<File>> {
    /// Create (or truncate) the file at `path` and start writing to it.
    pub fn create(path: impl AsRef<Path>, config: WriterConfig) -> Result<Self> {
        config.validate()?;
        let file = File::create(path.as_ref())?;
        Self::new(BufWriter::new(file), config)
    }
}

impl<W: Write + Seek> Writer<W> {
    /// Start writing to `sink`, which is overwritten from offset 0.
    pub fn new(mut sink: W, config: WriterConfig) -> Result<Self> {
        config.validate()?;
        let layout = Layout::new(config.mode);

        sink.seek(SeekFrom::Start(0))?;
        sink.write_all(&HeaderTable::zeroed().encode(&layout))?;

        debug!(
            mode = %config.mode,
            fill_factor = config.hash_fill_factor,
            "writer created"
        );

        Ok(Self {
            sink,
            layout,
            hash_fill_factor: config.hash_fill_factor,
            buckets: vec![Vec::new(); NUM_BUCKETS],
            pos: layout.hash_size() as u64,
            state: WriteState::default(),
        })
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.state.closed {
            return Err(CdbError::WriterClosed);
        }
        if self.state.failed {
            return Err(CdbError::WriterFailed);
        }
        Ok(())
    }

    /// Append a record. Storing the same key again adds another value.
    pub fn store(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        let key_len = key.len() as u64;
        let value_len = value.len() as u64;
        self.check_fits(key_len.max(value_len))?;

        let size = self.layout.record_header_size() as u64 + key_len + value_len;
        let end = self.pos.saturating_add(size);
        self.check_fits(end)?;

        let mut header = Vec::with_capacity(self.layout.record_header_size());
        self.layout
            .encode_record_header(&mut header, key_len, value_len);
        // The sink cursor is unknown after a partial write, so every offset
        // recorded from here on would be wrong.
        let written = self
            .sink
            .write_all(&header)
            .and_then(|()| self.sink.write_all(key))
            .and_then(|()| self.sink.write_all(value));
        if let Err(e) = written {
            self.state.failed = true;
            return Err(e.into());
        }

        let h = hash(key);
        self.buckets[bucket_index(h)].push(IndexEntry {
            hash: h,
            offset: self.pos,
        });
        trace!(offset = self.pos, hash = h, size, "record stored");

        self.pos = end;
        self.state.records += 1;
        Ok(())
    }

    /// Write the slot tables, the header table and (in 64-bit mode) the
    /// magic trailer, then flush the sink.
    ///
    /// The writer cannot be used afterwards, even if closing fails.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_writable()?;
        self.state.closed = true;

        let layout = self.layout;
        let mut header = HeaderTable::zeroed();
        let mut table_bytes = Vec::new();
        let mut non_empty = 0usize;

        let buckets = std::mem::take(&mut self.buckets);
        for (index, entries) in buckets.into_iter().enumerate() {
            if entries.is_empty() {
                header.set(
                    index,
                    BucketPointer {
                        offset: self.pos,
                        slot_count: 0,
                    },
                );
                continue;
            }

            let count = slot_count(entries.len(), self.hash_fill_factor);
            let end = count
                .checked_mul(layout.slot_size() as u64)
                .and_then(|size| self.pos.checked_add(size))
                .ok_or(CdbError::SlotTableTooLarge {
                    bucket: index,
                    slots: count,
                })?;
            self.check_fits(end)?;
            let slots = build_slot_table(index, &entries, count)?;

            table_bytes.clear();
            for slot in &slots {
                layout.encode_slot(&mut table_bytes, u64::from(slot.hash), slot.offset);
            }
            self.sink.write_all(&table_bytes)?;

            header.set(
                index,
                BucketPointer {
                    offset: self.pos,
                    slot_count: count,
                },
            );
            self.pos = end;
            non_empty += 1;
        }

        if let Some(trailer) = layout.trailer() {
            self.sink.write_all(trailer)?;
        }

        self.sink.seek(SeekFrom::Start(0))?;
        self.sink.write_all(&header.encode(&layout))?;
        self.sink.flush()?;

        debug!(
            records = self.state.records,
            buckets = non_empty,
            size = self.pos + layout.trailer().map_or(0, |t| t.len() as u64),
            "writer closed"
        );
        Ok(())
    }

    fn check_fits(&self, needed: u64) -> Result<()> {
        let limit = self.layout.max_field_value();
        if needed > limit {
            return Err(CdbError::OffsetOverflow {
                mode: self.layout.mode(),
                needed,
                limit,
            });
        }
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.layout.mode()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Size of the header table region.
    pub fn hash_size(&self) -> usize {
        self.layout.hash_size()
    }

    pub fn hash_fill_factor(&self) -> f64 {
        self.hash_fill_factor
    }

    /// Number of records stored so far.
    pub fn len(&self) -> u64 {
        self.state.records
    }

    pub fn is_empty(&self) -> bool {
        self.state.records == 0
    }

    /// Offset the next record (or, once closing, the next slot table) goes to.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed
    }

    /// Whether a write to the sink has failed, leaving the file unusable.
    pub fn is_failed(&self) -> bool {
        self.state.failed
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Close the database and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.close()?;
        Ok(self.sink)
    }
}

/// Slots allotted to a bucket holding `entries` records.
pub(crate) fn slot_count(entries: usize, fill_factor: f64) -> u64 {
    (entries as f64 / fill_factor).ceil() as u64
}

/// Lay out one bucket's entries over `count` slots with linear probing,
/// in store order.
fn build_slot_table(bucket: usize, entries: &[IndexEntry], count: u64) -> Result<Vec<IndexEntry>> {
    let too_large = || CdbError::SlotTableTooLarge {
        bucket,
        slots: count,
    };
    let len = usize::try_from(count).map_err(|_| too_large())?;
    let mut slots = Vec::new();
    slots.try_reserve_exact(len).map_err(|_| too_large())?;
    slots.resize(len, IndexEntry::EMPTY);

    for (placed, entry) in entries.iter().enumerate() {
        if placed as u64 >= count {
            return Err(CdbError::SlotTableFull {
                bucket,
                slots: count,
            });
        }
        let mut probe = probe_start(entry.hash, count) as usize;
        while !slots[probe].is_empty() {
            probe = (probe + 1) % slots.len();
        }
        slots[probe] = *entry;
    }
    Ok(slots)
}
