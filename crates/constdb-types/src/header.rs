use crate::error::LayoutError;
use crate::layout::{Layout, NUM_BUCKETS};

/// One header-table entry: where a bucket's slot table starts and how many
/// slots it has. A `slot_count` of zero marks an empty bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BucketPointer {
    pub offset: u64,
    pub slot_count: u64,
}

impl BucketPointer {
    pub fn is_empty(&self) -> bool {
        self.slot_count == 0
    }
}

/// The fixed 256-entry directory at the start of every file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderTable {
    buckets: [BucketPointer; NUM_BUCKETS],
}

impl HeaderTable {
    /// All-zero table, as written for the creation-time placeholder.
    pub fn zeroed() -> Self {
        Self {
            buckets: [BucketPointer::default(); NUM_BUCKETS],
        }
    }

    pub fn bucket(&self, index: usize) -> BucketPointer {
        self.buckets[index]
    }

    pub fn set(&mut self, index: usize, pointer: BucketPointer) {
        self.buckets[index] = pointer;
    }

    pub fn iter(&self) -> impl Iterator<Item = &BucketPointer> {
        self.buckets.iter()
    }

    /// Returns `true` if every offset and every slot count is zero.
    ///
    /// A finished file never looks like this: even an empty database points
    /// every bucket at the end of the header region.
    pub fn is_blank(&self) -> bool {
        self.buckets
            .iter()
            .all(|b| b.offset == 0 && b.slot_count == 0)
    }

    /// Offset where the record region ends, i.e. where bucket 0's slot table starts.
    pub fn records_end(&self) -> u64 {
        self.buckets[0].offset
    }

    pub fn encode(&self, layout: &Layout) -> Vec<u8> {
        let mut buf = Vec::with_capacity(layout.hash_size());
        for bucket in &self.buckets {
            Layout::put_field(&mut buf, layout.hashptr_size(), bucket.offset);
            Layout::put_field(&mut buf, layout.hashptr_size(), bucket.slot_count);
        }
        buf
    }

    pub fn decode(bytes: &[u8], layout: &Layout) -> Result<Self, LayoutError> {
        if bytes.len() != layout.hash_size() {
            return Err(LayoutError::HeaderLength {
                expected: layout.hash_size(),
                actual: bytes.len(),
            });
        }
        let width = layout.hashptr_size();
        let mut table = Self::zeroed();
        for (bucket, entry) in table.buckets.iter_mut().zip(bytes.chunks_exact(2 * width)) {
            bucket.offset = Layout::get_field(entry, width);
            bucket.slot_count = Layout::get_field(&entry[width..], width);
        }
        Ok(table)
    }
}

impl Default for HeaderTable {
    fn default() -> Self {
        Self::zeroed()
    }
}
